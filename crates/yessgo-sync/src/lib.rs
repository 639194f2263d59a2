/*
[INPUT]:  Public API exports for yessgo-sync crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod runner;

pub use config::SyncConfig;
pub use runner::SyncRunner;
