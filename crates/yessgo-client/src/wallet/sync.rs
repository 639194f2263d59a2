/*
[INPUT]:  RequestInterceptor, user id, optional device id, sync interval
[OUTPUT]: Latest WalletBalance snapshot, SyncResult, last sync time
[POS]:    Wallet layer - single-flight sync and auto-sync timer
[UPDATE]: When sync guard, snapshot replacement or scheduling changes
[UPDATE]: Auto-sync task holds a weak handle and stops with its coordinator
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::{RequestInterceptor, Result, YessError};
use crate::types::{SyncResult, WalletBalance};

#[derive(Debug)]
struct AutoSync {
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps the wallet balance of one user in step with the backend.
///
/// Only one sync runs at a time per coordinator; a sync requested while
/// another is in flight returns `None` immediately and is not queued.
/// Clones share state.
#[derive(Debug, Clone)]
pub struct WalletSyncCoordinator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    api: RequestInterceptor,
    device_id: Option<String>,
    is_syncing: AtomicBool,
    last_sync_time: RwLock<Option<DateTime<Utc>>>,
    last_balance: RwLock<Option<WalletBalance>>,
    auto_sync: Mutex<Option<AutoSync>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let auto_sync = self
            .auto_sync
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(auto_sync) = auto_sync {
            auto_sync.shutdown.cancel();
        }
    }
}

/// Releases the sync flag on every exit path, including cancellation
struct SyncGuard<'a>(&'a AtomicBool);

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WalletSyncCoordinator {
    pub fn new(api: RequestInterceptor) -> Self {
        Self::with_device_id(api, None)
    }

    /// Create a coordinator that reports `device_id` on automatic syncs
    pub fn with_device_id(api: RequestInterceptor, device_id: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                device_id,
                is_syncing: AtomicBool::new(false),
                last_sync_time: RwLock::new(None),
                last_balance: RwLock::new(None),
                auto_sync: Mutex::new(None),
            }),
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        self.inner.device_id.as_deref()
    }

    /// Fetch the balance once and keep it as the latest snapshot; no retries
    pub async fn get_balance(&self, user_id: i64) -> Result<WalletBalance> {
        let balance = self.inner.api.query_balance(user_id).await?;
        *self
            .inner
            .last_balance
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(balance.clone());
        Ok(balance)
    }

    /// Latest snapshot from [`get_balance`](Self::get_balance) or a sync that reported changes
    pub fn last_balance(&self) -> Option<WalletBalance> {
        self.inner
            .last_balance
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Time of the last successful sync
    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        *self
            .inner
            .last_sync_time
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.is_syncing.load(Ordering::Acquire)
    }

    /// Sync the wallet, logging failures.
    ///
    /// `None` when another sync is in flight or the sync failed.
    pub async fn sync_balance(&self, user_id: i64, device_id: Option<&str>) -> Option<SyncResult> {
        match self.try_sync_balance(user_id, device_id).await {
            Ok(result) => result,
            Err(err) => {
                warn!(user_id, error = %err, "wallet sync failed");
                None
            }
        }
    }

    /// Sync the wallet; `Ok(None)` when another sync is already in flight
    pub async fn try_sync_balance(
        &self,
        user_id: i64,
        device_id: Option<&str>,
    ) -> Result<Option<SyncResult>> {
        let Some(_guard) = SyncGuard::acquire(&self.inner.is_syncing) else {
            debug!(user_id, "wallet sync already in progress, skipping");
            return Ok(None);
        };

        let result = self.inner.api.sync_wallet(user_id, device_id).await?;
        *self
            .inner
            .last_sync_time
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());

        if result.has_changes {
            debug!(user_id, "wallet changed on server, refreshing balance snapshot");
            if let Err(err) = self.get_balance(user_id).await {
                warn!(user_id, error = %err, "balance refresh after sync failed");
            }
        }

        Ok(Some(result))
    }

    /// Sync now, then every `interval` until [`stop_auto_sync`](Self::stop_auto_sync).
    ///
    /// Replaces any running schedule. Returns the result of the immediate sync.
    pub async fn start_auto_sync(
        &self,
        user_id: i64,
        interval: Duration,
    ) -> Result<Option<SyncResult>> {
        if interval.is_zero() {
            return Err(YessError::Config(
                "auto-sync interval must be greater than zero".to_string(),
            ));
        }

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run_auto_sync(
            Arc::downgrade(&self.inner),
            user_id,
            interval,
            shutdown.clone(),
        ));

        let previous = self
            .inner
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(AutoSync { shutdown, handle });
        if let Some(previous) = previous {
            previous.shutdown.cancel();
            debug!(user_id, "previous auto-sync schedule replaced");
        }
        info!(user_id, interval_ms = interval.as_millis() as u64, "wallet auto-sync started");

        let device_id = self.inner.device_id.clone();
        Ok(self.sync_balance(user_id, device_id.as_deref()).await)
    }

    /// Cancel the periodic schedule; a sync already in flight runs to completion
    pub fn stop_auto_sync(&self) {
        let previous = self
            .inner
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(auto_sync) = previous {
            auto_sync.shutdown.cancel();
            info!("wallet auto-sync stopped");
        }
    }

    pub fn is_auto_syncing(&self) -> bool {
        self.inner
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|auto_sync| !auto_sync.handle.is_finished())
    }
}

/// Periodic sync loop; ends on cancellation or once every coordinator handle is gone
async fn run_auto_sync(
    inner: Weak<Inner>,
    user_id: i64,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(inner) = inner.upgrade() else {
            debug!(user_id, "wallet coordinator dropped, auto-sync exiting");
            break;
        };
        let coordinator = WalletSyncCoordinator { inner };
        let device_id = coordinator.inner.device_id.clone();
        coordinator.sync_balance(user_id, device_id.as_deref()).await;
    }
}
