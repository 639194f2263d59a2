/*
[INPUT]:  Bearer tokens, refresh tokens and a storage backend
[OUTPUT]: Current access token, expiry decisions and serialized refreshes
[POS]:    Auth layer - handles YessGo session token lifecycle
[UPDATE]: When the token lifecycle or storage backends change
*/

pub mod coordinator;
pub mod expiry;
pub mod storage;
pub mod store;

pub use coordinator::{AuthRefreshCoordinator, RefreshStatus};
pub use expiry::{decode_expiry, is_expiring_soon, is_expiring_soon_at};
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use store::{TokenPair, TokenStore};
