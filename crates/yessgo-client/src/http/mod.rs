/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod auth;
pub mod client;
pub mod error;
pub mod interceptor;
pub mod wallet;

pub use error::{DecodeError, Result, YessError};

pub use client::{ClientConfig, YessClient, decode_json};
pub use interceptor::RequestInterceptor;

/// Token refresh endpoint; requests to it are never retried after a 401
pub const REFRESH_ENDPOINT: &str = "/api/v1/auth/refresh";
/// Wallet balance snapshot for a user
pub const BALANCE_ENDPOINT: &str = "/api/v1/payments/balance";
/// Device/user wallet reconciliation
pub const WALLET_SYNC_ENDPOINT: &str = "/api/v1/wallet/sync";
