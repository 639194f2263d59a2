/*
[INPUT]:  Auth endpoint JSON responses
[OUTPUT]: Typed token response with optional expiry hints
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When the refresh response schema changes
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response from POST /api/v1/auth/refresh
///
/// The backend answers in snake_case; camelCase spellings are accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "tokenType")]
    pub token_type: Option<String>,
    #[serde(default, alias = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Lifetime in seconds, used when `expires_at` is absent
    #[serde(default, alias = "expiresIn")]
    pub expires_in: Option<i64>,
}
