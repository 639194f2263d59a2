/*
[INPUT]:  SyncConfig, persisted TokenPair, CancellationToken
[OUTPUT]: Running wallet auto-sync for one user until shutdown
[POS]:    Execution layer - wires storage, auth, interceptor and wallet sync
[UPDATE]: When changing startup/shutdown guarantees or wiring
*/

use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;
use yessgo_client::{
    AuthRefreshCoordinator, FileTokenStorage, RequestInterceptor, TokenStorage, TokenStore,
    WalletSyncCoordinator, YessClient,
};

use crate::config::SyncConfig;

/// Owns the client stack for one user and drives auto-sync until cancelled
#[derive(Debug)]
pub struct SyncRunner {
    config: SyncConfig,
    auth: AuthRefreshCoordinator,
    wallet: WalletSyncCoordinator,
    shutdown: CancellationToken,
}

impl SyncRunner {
    /// Build the runner with tokens persisted at `config.token_file`
    pub async fn from_config(config: SyncConfig) -> Result<Self> {
        let storage = Arc::new(FileTokenStorage::new(config.token_file.clone()));
        Self::with_storage(config, storage).await
    }

    pub async fn with_storage(config: SyncConfig, storage: Arc<dyn TokenStorage>) -> Result<Self> {
        let client = YessClient::with_config_and_base_url(config.client_config(), &config.api_base_url)
            .context("build http client")?;
        let store = TokenStore::restore(storage)
            .await
            .context("restore persisted tokens")?;
        let auth = AuthRefreshCoordinator::new(client, store);

        let device_id = config
            .device_id
            .clone()
            .unwrap_or_else(|| format!("yessgo-sync-{}", Uuid::new_v4()));
        let wallet =
            WalletSyncCoordinator::with_device_id(RequestInterceptor::new(auth.clone()), Some(device_id));

        Ok(Self {
            config,
            auth,
            wallet,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn auth(&self) -> &AuthRefreshCoordinator {
        &self.auth
    }

    pub fn wallet(&self) -> &WalletSyncCoordinator {
        &self.wallet
    }

    /// Fetch the balance, start auto-sync and wait for the shutdown token.
    ///
    /// Fails fast when no tokens are stored; balance or sync failures after
    /// startup are logged and retried on the next tick.
    pub async fn run(&self) -> Result<()> {
        if !self.auth.is_authenticated() {
            bail!(
                "no stored tokens at {}; log in with the app first",
                self.config.token_file.display()
            );
        }

        let user_id = self.config.user_id;
        match self.wallet.get_balance(user_id).await {
            Ok(balance) => info!(
                user_id,
                balance = %balance.balance,
                bonus_balance = %balance.bonus_balance,
                "initial wallet balance"
            ),
            Err(err) => warn!(user_id, error = %err, "initial balance fetch failed"),
        }

        let first = self
            .wallet
            .start_auto_sync(user_id, self.config.sync_interval())
            .await
            .context("start auto-sync")?;
        info!(
            user_id,
            device_id = self.wallet.device_id().unwrap_or_default(),
            interval_secs = self.config.sync_interval_secs,
            synced = first.is_some(),
            "wallet sync running"
        );

        self.shutdown.cancelled().await;
        self.wallet.stop_auto_sync();

        if !self.auth.is_authenticated() {
            warn!(user_id, "session ended while syncing, re-authentication required");
        }
        info!(
            user_id,
            last_sync = ?self.wallet.last_sync_time(),
            "wallet sync stopped"
        );
        Ok(())
    }
}
