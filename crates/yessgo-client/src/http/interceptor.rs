/*
[INPUT]:  Outbound requests, AuthRefreshCoordinator
[OUTPUT]: Responses for bearer-authenticated calls, with one reactive retry on 401
[POS]:    HTTP layer - authenticated request pipeline
[UPDATE]: When proactive/reactive refresh rules or header handling change
*/

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::{AuthRefreshCoordinator, is_expiring_soon};
use crate::http::{REFRESH_ENDPOINT, Result, YessClient, YessError, decode_json};

/// Sends requests with the current bearer token and recovers from a single 401.
///
/// Per request there is at most one proactive refresh (token about to expire)
/// and at most one reactive refresh followed by one resend.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    client: YessClient,
    auth: AuthRefreshCoordinator,
    threshold_minutes: i64,
}

impl RequestInterceptor {
    pub fn new(auth: AuthRefreshCoordinator) -> Self {
        let client = auth.client().clone();
        let threshold_minutes = client.config().expiry_threshold_minutes;
        Self {
            client,
            auth,
            threshold_minutes,
        }
    }

    pub fn auth(&self) -> &AuthRefreshCoordinator {
        &self.auth
    }

    pub fn client(&self) -> &YessClient {
        &self.client
    }

    /// Send `request`, attaching the bearer token and handling a 401 once.
    ///
    /// A 401 that survives the retry, or whose refresh failed, is returned
    /// unchanged; other statuses pass through untouched.
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        let is_refresh = is_refresh_request(request.url());
        let mut token = self.auth.access_token();

        if !is_refresh {
            if let Some(current) = token.as_deref() {
                if is_expiring_soon(current, self.threshold_minutes) {
                    debug!(url = %request.url(), "access token expiring soon, refreshing proactively");
                    if self.auth.refresh_if_needed().await {
                        token = self.auth.access_token();
                    }
                }
            }
        }

        if let Some(current) = token.as_deref() {
            attach_bearer(&mut request, current)?;
        }

        let retry = request.try_clone();
        let response = self.client.execute(request).await?;

        if response.status() != StatusCode::UNAUTHORIZED || is_refresh {
            return Ok(response);
        }

        warn!(url = %response.url(), "received 401, attempting token refresh");
        if !self.auth.refresh_if_needed().await {
            warn!("token refresh failed, re-authentication required");
            return Ok(response);
        }

        let (Some(mut retry), Some(current)) = (retry, self.auth.access_token()) else {
            return Ok(response);
        };
        attach_bearer(&mut retry, &current)?;

        let response = self.client.execute(retry).await?;
        debug!(status = response.status().as_u16(), "retried request after token refresh");
        Ok(response)
    }

    /// GET an endpoint and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let request = self.client.request(Method::GET, endpoint)?.build()?;
        let response = self.execute(request).await?;
        decode_json(response).await
    }

    /// POST a JSON body to an endpoint and decode the JSON response
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let request = self
            .client
            .request(Method::POST, endpoint)?
            .json(body)
            .build()?;
        let response = self.execute(request).await?;
        decode_json(response).await
    }
}

fn is_refresh_request(url: &Url) -> bool {
    url.path()
        .to_ascii_lowercase()
        .contains(REFRESH_ENDPOINT.trim_start_matches("/api/v1"))
}

fn attach_bearer(request: &mut Request, token: &str) -> Result<()> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| YessError::Config(format!("access token is not a valid header value: {e}")))?;
    value.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_path_detection() {
        let refresh = Url::parse("https://yessgo.org/api/v1/auth/refresh").unwrap();
        let upper = Url::parse("https://yessgo.org/API/V1/Auth/Refresh").unwrap();
        let balance = Url::parse("https://yessgo.org/api/v1/payments/balance").unwrap();

        assert!(is_refresh_request(&refresh));
        assert!(is_refresh_request(&upper));
        assert!(!is_refresh_request(&balance));
    }

    #[test]
    fn test_attach_bearer_replaces_header() {
        let client = reqwest::Client::new();
        let mut request = client
            .get("https://yessgo.org/api/v1/payments/balance")
            .header(AUTHORIZATION, "Bearer old")
            .build()
            .unwrap();

        attach_bearer(&mut request, "new").unwrap();
        let values: Vec<_> = request.headers().get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "Bearer new");
        assert!(values[0].is_sensitive());
    }

    #[test]
    fn test_attach_bearer_rejects_newlines() {
        let client = reqwest::Client::new();
        let mut request = client.get("https://yessgo.org/").build().unwrap();
        let err = attach_bearer(&mut request, "bad\ntoken").unwrap_err();
        assert!(matches!(err, YessError::Config(_)));
    }
}
