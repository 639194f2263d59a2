/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for yessgo-client tests

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use wiremock::MockServer;
use yessgo_client::{
    AuthRefreshCoordinator, ClientConfig, MemoryTokenStorage, RequestInterceptor, TokenPair,
    TokenStore, YessClient,
};

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Build an unsigned JWT-shaped token expiring `expires_in_secs` from now
pub fn make_test_jwt(subject: &str, expires_in_secs: i64) -> String {
    let header = serde_json::json!({"alg": "HS256", "typ": "JWT"});
    let payload = serde_json::json!({
        "sub": subject,
        "exp": Utc::now().timestamp() + expires_in_secs,
    });

    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());

    format!("{header_b64}.{payload_b64}.signature")
}

/// Client pointed at the mock server with default tuning
pub fn client_for(server: &MockServer) -> YessClient {
    YessClient::with_config_and_base_url(ClientConfig::default(), &server.uri())
        .expect("client init")
}

/// Coordinator already logged in with `pair`
#[allow(dead_code)]
pub async fn logged_in_coordinator(server: &MockServer, pair: TokenPair) -> AuthRefreshCoordinator {
    let store = TokenStore::new(Arc::new(MemoryTokenStorage::new()));
    let auth = AuthRefreshCoordinator::with_cooldown(client_for(server), store, Duration::from_secs(30));
    auth.login(pair).await.expect("login");
    auth
}

/// Interceptor already logged in with `pair`
#[allow(dead_code)]
pub async fn logged_in_interceptor(server: &MockServer, pair: TokenPair) -> RequestInterceptor {
    RequestInterceptor::new(logged_in_coordinator(server, pair).await)
}
