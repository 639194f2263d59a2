/*
[INPUT]:  RequestInterceptor and wallet identity
[OUTPUT]: Balance snapshots and guarded, periodic wallet sync
[POS]:    Wallet layer - balance reconciliation
[UPDATE]: When sync scheduling or snapshot policy changes
*/

pub mod sync;

pub use sync::WalletSyncCoordinator;
