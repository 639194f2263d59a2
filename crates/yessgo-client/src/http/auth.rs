/*
[INPUT]:  Refresh token
[OUTPUT]: New token response or classified refresh failure
[POS]:    HTTP layer - auth endpoints (sent without bearer interception)
[UPDATE]: When the refresh endpoint or its status handling changes
*/

use reqwest::{Method, StatusCode};
use tracing::warn;

use crate::http::{REFRESH_ENDPOINT, Result, YessClient, YessError};
use crate::types::{RefreshTokenRequest, TokenResponse};

impl YessClient {
    /// Exchange a refresh token for a new token pair
    ///
    /// POST /api/v1/auth/refresh
    ///
    /// Sent on the bare client so a 401 here can never trigger another refresh.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenResponse> {
        let body = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        let response = self
            .request(Method::POST, REFRESH_ENDPOINT)?
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(YessError::RefreshRejected);
        }

        let bytes = response.bytes().await?;
        if !status.is_success() {
            let message = String::from_utf8_lossy(&bytes).trim().to_string();
            warn!(status = status.as_u16(), "token refresh returned an error status");
            return Err(YessError::api_error(status, message));
        }

        let token: TokenResponse = serde_json::from_slice(&bytes)
            .map_err(|e| YessError::MalformedResponse(format!("refresh body: {e}")))?;
        if token.access_token.trim().is_empty() {
            return Err(YessError::MalformedResponse(
                "refresh response has an empty access_token".to_string(),
            ));
        }

        Ok(token)
    }
}
