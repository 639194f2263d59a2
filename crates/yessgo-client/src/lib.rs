/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public YessGo client crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod text;
pub mod types;
pub mod wallet;

// Re-export commonly used types from auth
pub use auth::{
    AuthRefreshCoordinator,
    FileTokenStorage,
    MemoryTokenStorage,
    RefreshStatus,
    TokenPair,
    TokenStorage,
    TokenStore,
    is_expiring_soon,
};

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    DecodeError,
    RequestInterceptor,
    Result,
    YessClient,
    YessError,
};

// Re-export all types
pub use types::*;

pub use wallet::WalletSyncCoordinator;
