/*
[INPUT]:  Wallet endpoint JSON payloads
[OUTPUT]: Wallet balance snapshot and sync result models
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balance snapshot returned by GET /api/v1/payments/balance
///
/// Replaced wholesale on every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: i64,
    pub balance: Decimal,
    #[serde(rename = "yescoin_balance", alias = "bonus_balance")]
    pub bonus_balance: Decimal,
    #[serde(default)]
    pub total_earned: Decimal,
    #[serde(default)]
    pub total_spent: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// Result of POST /api/v1/wallet/sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    #[serde(rename = "yescoin_balance", alias = "bonus_balance")]
    pub bonus_balance: Decimal,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub has_changes: bool,
}
