/*
[INPUT]:  Refresh tokens and wallet identity
[OUTPUT]: Typed request bodies for auth and wallet endpoints
[POS]:    Data layer - outbound request payloads
[UPDATE]: When request schemas change
*/

use serde::{Deserialize, Serialize};

/// Body of POST /api/v1/auth/refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Body of POST /api/v1/wallet/sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSyncRequest {
    pub user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}
