/*
[INPUT]:  YessClient (bare, no interception) and the TokenStore
[OUTPUT]: Current access token and serialized, single-flight token refreshes
[POS]:    Auth layer - orchestrates the token refresh lifecycle
[UPDATE]: When refresh states, cooldown policy or failure handling change
[UPDATE]: Refreshes started before a login/logout no longer touch the new session
*/

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::{TokenPair, TokenStore};
use crate::http::{Result, YessClient, YessError};

type RefreshFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Upper bound for the failure cooldown
const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// Result of one network refresh, shared by every caller that awaited it
#[derive(Debug, Clone, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    /// The pair changed (login, logout) while the refresh was in flight
    Superseded,
    NoRefreshToken,
    Rejected,
    Malformed(String),
    Failed(String),
}

impl RefreshOutcome {
    fn into_result(self) -> Result<()> {
        match self {
            RefreshOutcome::Refreshed | RefreshOutcome::Superseded => Ok(()),
            RefreshOutcome::NoRefreshToken => Err(YessError::NoRefreshToken),
            RefreshOutcome::Rejected => Err(YessError::RefreshRejected),
            RefreshOutcome::Malformed(message) => Err(YessError::MalformedResponse(message)),
            RefreshOutcome::Failed(message) => Err(YessError::RefreshFailed(message)),
        }
    }

    fn is_failure(&self) -> bool {
        matches!(
            self,
            RefreshOutcome::Rejected | RefreshOutcome::Malformed(_) | RefreshOutcome::Failed(_)
        )
    }
}

enum RefreshState {
    Idle,
    Refreshing(RefreshFlight),
    Failed {
        failed_at: DateTime<Utc>,
        cooldown_until: Instant,
    },
}

/// Refresh state plus the session epoch it belongs to.
///
/// `login` and `logout` bump the epoch; a flight only settles the state of
/// the epoch it started in.
struct Machine {
    state: RefreshState,
    epoch: u64,
}

/// Observable state of the refresh state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    Idle,
    Refreshing,
    Failed {
        failed_at: DateTime<Utc>,
        cooldown_until: Instant,
    },
}

/// Serializes token refreshes for one token store.
///
/// Concurrent callers of [`refresh`](Self::refresh) while a refresh is in
/// flight await that same refresh instead of starting another one. Clones
/// share state.
#[derive(Clone)]
pub struct AuthRefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    client: YessClient,
    store: TokenStore,
    cooldown: Duration,
    machine: Mutex<Machine>,
}

/// Settles the flight's state on every exit path, including a panic in the
/// refresh future; an unsettled flight counts as failed.
struct FlightGuard<'a> {
    inner: &'a Inner,
    epoch: u64,
    outcome: Option<RefreshOutcome>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let failed = self.outcome.as_ref().is_none_or(RefreshOutcome::is_failure);
        let mut machine = self.inner.lock_machine();
        if machine.epoch != self.epoch {
            return;
        }
        machine.state = if failed {
            RefreshState::Failed {
                failed_at: Utc::now(),
                cooldown_until: Instant::now() + self.inner.cooldown,
            }
        } else {
            RefreshState::Idle
        };
    }
}

impl AuthRefreshCoordinator {
    /// Create a coordinator using the client's configured refresh cooldown
    pub fn new(client: YessClient, store: TokenStore) -> Self {
        let cooldown = client.config().refresh_cooldown;
        Self::with_cooldown(client, store, cooldown)
    }

    /// Create a coordinator with an explicit cooldown after failed refreshes (capped at one day)
    pub fn with_cooldown(client: YessClient, store: TokenStore, cooldown: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                store,
                cooldown: cooldown.min(MAX_COOLDOWN),
                machine: Mutex::new(Machine {
                    state: RefreshState::Idle,
                    epoch: 0,
                }),
            }),
        }
    }

    pub fn client(&self) -> &YessClient {
        &self.inner.client
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.inner.store
    }

    /// Current access token, no network I/O
    pub fn access_token(&self) -> Option<String> {
        self.inner.store.access_token()
    }

    /// True if an access or refresh token is held
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.has_tokens()
    }

    pub fn status(&self) -> RefreshStatus {
        match &self.inner.lock_machine().state {
            RefreshState::Idle => RefreshStatus::Idle,
            RefreshState::Refreshing(_) => RefreshStatus::Refreshing,
            RefreshState::Failed {
                failed_at,
                cooldown_until,
            } => RefreshStatus::Failed {
                failed_at: *failed_at,
                cooldown_until: *cooldown_until,
            },
        }
    }

    /// Install a pair obtained from a login and clear any failure cooldown.
    ///
    /// A refresh still in flight for the previous pair can no longer
    /// replace or clear this one.
    pub async fn login(&self, pair: TokenPair) -> Result<()> {
        self.inner.start_epoch();
        self.inner.store.replace(pair).await?;
        info!("session tokens installed");
        Ok(())
    }

    /// Drop both tokens locally and from persistent storage
    pub async fn logout(&self) -> Result<()> {
        self.inner.start_epoch();
        self.inner.store.clear().await?;
        info!("session tokens cleared");
        Ok(())
    }

    /// Refresh the token pair, joining an in-flight refresh if there is one.
    ///
    /// Returns `true` once new tokens are stored.
    pub async fn refresh_if_needed(&self) -> bool {
        self.refresh().await.is_ok()
    }

    /// Like [`refresh_if_needed`](Self::refresh_if_needed), reporting why a refresh failed
    pub async fn refresh(&self) -> Result<()> {
        let flight = {
            let mut machine = self.inner.lock_machine();
            let joined = match &machine.state {
                RefreshState::Refreshing(flight) => Some(flight.clone()),
                RefreshState::Failed { cooldown_until, .. } if Instant::now() < *cooldown_until => {
                    debug!("token refresh skipped during failure cooldown");
                    return Err(YessError::RefreshCoolingDown);
                }
                _ => None,
            };

            match joined {
                Some(flight) => {
                    debug!("joining in-flight token refresh");
                    flight
                }
                None => {
                    let inner = Arc::clone(&self.inner);
                    let epoch = machine.epoch;
                    let flight = async move { inner.run_refresh(epoch).await }.boxed().shared();
                    machine.state = RefreshState::Refreshing(flight.clone());
                    flight
                }
            }
        };

        flight.await.into_result()
    }
}

impl Inner {
    fn lock_machine(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Detach any in-flight refresh from the state and reset to `Idle`
    fn start_epoch(&self) {
        let mut machine = self.lock_machine();
        machine.epoch = machine.epoch.wrapping_add(1);
        machine.state = RefreshState::Idle;
    }

    async fn run_refresh(self: Arc<Self>, epoch: u64) -> RefreshOutcome {
        let mut guard = FlightGuard {
            inner: &self,
            epoch,
            outcome: None,
        };
        let outcome = self.refresh_once().await;
        guard.outcome = Some(outcome.clone());
        outcome
    }

    async fn refresh_once(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.store.refresh_token() else {
            debug!("no refresh token stored, cannot refresh");
            return RefreshOutcome::NoRefreshToken;
        };

        match self.client.refresh_tokens(&refresh_token).await {
            Ok(response) => {
                let pair = TokenPair::from_response(response);
                match self.store.replace_if_current(&refresh_token, pair).await {
                    Ok(false) => return superseded(),
                    Ok(true) => {}
                    Err(err) => warn!(error = %err, "refreshed tokens could not be persisted"),
                }
                info!("access token refreshed");
                RefreshOutcome::Refreshed
            }
            Err(YessError::RefreshRejected) => {
                match self.store.clear_if_current(&refresh_token).await {
                    Ok(false) => return superseded(),
                    Ok(true) => {}
                    Err(err) => warn!(error = %err, "failed to clear persisted tokens"),
                }
                warn!("refresh token rejected, session tokens cleared");
                RefreshOutcome::Rejected
            }
            Err(YessError::MalformedResponse(message)) => {
                warn!(%message, "token refresh returned a malformed response");
                RefreshOutcome::Malformed(message)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                RefreshOutcome::Failed(err.to_string())
            }
        }
    }
}

fn superseded() -> RefreshOutcome {
    debug!("session changed during token refresh, discarding its result");
    RefreshOutcome::Superseded
}

impl fmt::Debug for AuthRefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRefreshCoordinator")
            .field("status", &self.status())
            .field("authenticated", &self.is_authenticated())
            .field("cooldown", &self.inner.cooldown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::auth::MemoryTokenStorage;
    use crate::http::{ClientConfig, REFRESH_ENDPOINT};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn coordinator_for(server: &MockServer, cooldown: Duration) -> AuthRefreshCoordinator {
        let client = YessClient::with_config_and_base_url(ClientConfig::default(), &server.uri())
            .expect("client init");
        let store = TokenStore::new(Arc::new(MemoryTokenStorage::new()));
        AuthRefreshCoordinator::with_cooldown(client, store, cooldown)
    }

    #[tokio::test]
    async fn test_refresh_replaces_both_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .and(body_json(serde_json::json!({ "refresh_token": "r1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "a2",
                "refresh_token": "r2",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(30)).await;
        auth.login(TokenPair::new("a1", Some("r1".to_string())))
            .await
            .unwrap();

        assert!(auth.refresh_if_needed().await);
        assert_eq!(auth.access_token(), Some("a2".to_string()));
        assert_eq!(auth.token_store().refresh_token(), Some("r2".to_string()));
        assert_eq!(auth.status(), RefreshStatus::Idle);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(30)).await;
        auth.login(TokenPair::new("a1", None)).await.unwrap();

        let err = auth.refresh().await.unwrap_err();
        assert!(matches!(err, YessError::NoRefreshToken));
        assert_eq!(auth.access_token(), Some("a1".to_string()));
        assert_eq!(auth.status(), RefreshStatus::Idle);
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(30)).await;
        auth.login(TokenPair::new("a1", Some("r1".to_string())))
            .await
            .unwrap();

        assert!(!auth.refresh_if_needed().await);
        assert!(auth.access_token().is_none());
        assert!(!auth.is_authenticated());
        assert!(matches!(auth.status(), RefreshStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_tokens_and_cools_down() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(60)).await;
        auth.login(TokenPair::new("a1", Some("r1".to_string())))
            .await
            .unwrap();

        let first = auth.refresh().await.unwrap_err();
        assert!(matches!(first, YessError::RefreshFailed(_)));
        assert_eq!(auth.access_token(), Some("a1".to_string()));

        let second = auth.refresh().await.unwrap_err();
        assert!(matches!(second, YessError::RefreshCoolingDown));
    }

    #[tokio::test]
    async fn test_refresh_retried_after_cooldown_elapses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::ZERO).await;
        auth.login(TokenPair::new("a1", Some("r1".to_string())))
            .await
            .unwrap();

        assert!(!auth.refresh_if_needed().await);
        assert!(!auth.refresh_if_needed().await);
    }

    #[tokio::test]
    async fn test_login_resets_failed_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(60)).await;
        auth.login(TokenPair::new("a1", Some("r1".to_string())))
            .await
            .unwrap();
        assert!(!auth.refresh_if_needed().await);

        auth.login(TokenPair::new("a2", Some("r2".to_string())))
            .await
            .unwrap();
        assert_eq!(auth.status(), RefreshStatus::Idle);
        assert_eq!(auth.access_token(), Some("a2".to_string()));
    }

    #[tokio::test]
    async fn test_logout_clears_tokens() {
        let server = MockServer::start().await;
        let auth = coordinator_for(&server, Duration::from_secs(30)).await;
        auth.login(TokenPair::new("a1", Some("r1".to_string())))
            .await
            .unwrap();

        auth.logout().await.unwrap();
        assert!(!auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_refresh_keeps_tokens_and_cools_down() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(60)).await;
        auth.login(TokenPair::new("a1", Some("r1".to_string())))
            .await
            .unwrap();

        let err = auth.refresh().await.unwrap_err();
        assert!(matches!(err, YessError::MalformedResponse(_)));
        assert!(err.is_terminal());
        assert_eq!(auth.access_token(), Some("a1".to_string()));
        assert_eq!(auth.token_store().refresh_token(), Some("r1".to_string()));
        assert!(matches!(auth.status(), RefreshStatus::Failed { .. }));

        let again = auth.refresh().await.unwrap_err();
        assert!(matches!(again, YessError::RefreshCoolingDown));
    }

    #[tokio::test]
    async fn test_overflowing_expires_in_does_not_wedge_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "a2",
                "refresh_token": "r2",
                "expires_in": 9_000_000_000_000_000_i64,
            })))
            .expect(2)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(30)).await;
        auth.login(TokenPair::new("a1", Some("r1".to_string())))
            .await
            .unwrap();

        assert!(auth.refresh_if_needed().await);
        assert_eq!(auth.status(), RefreshStatus::Idle);
        assert!(auth.token_store().snapshot().unwrap().expires_at.is_none());
        assert!(auth.refresh_if_needed().await);
    }

    #[tokio::test]
    async fn test_unsettled_flight_is_recorded_as_failure() {
        let server = MockServer::start().await;
        let auth = coordinator_for(&server, Duration::from_secs(30)).await;

        drop(FlightGuard {
            inner: &auth.inner,
            epoch: 0,
            outcome: None,
        });
        assert!(matches!(auth.status(), RefreshStatus::Failed { .. }));

        auth.logout().await.unwrap();
        drop(FlightGuard {
            inner: &auth.inner,
            epoch: 0,
            outcome: None,
        });
        assert_eq!(auth.status(), RefreshStatus::Idle);
    }

    #[tokio::test]
    async fn test_login_during_rejected_refresh_keeps_new_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .and(body_json(serde_json::json!({ "refresh_token": "stale-r" })))
            .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
            .expect(1)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(30)).await;
        auth.login(TokenPair::new("stale", Some("stale-r".to_string())))
            .await
            .unwrap();

        let pending = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.refresh_if_needed().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        auth.login(TokenPair::new("fresh", Some("fresh-r".to_string())))
            .await
            .unwrap();
        pending.await.unwrap();

        assert_eq!(auth.access_token(), Some("fresh".to_string()));
        assert_eq!(auth.token_store().refresh_token(), Some("fresh-r".to_string()));
        assert_eq!(auth.status(), RefreshStatus::Idle);
    }

    #[tokio::test]
    async fn test_login_during_successful_refresh_is_not_overwritten() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({
                        "access_token": "late",
                        "refresh_token": "late-r",
                    }))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(30)).await;
        auth.login(TokenPair::new("stale", Some("stale-r".to_string())))
            .await
            .unwrap();

        let pending = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.refresh_if_needed().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        auth.login(TokenPair::new("fresh", Some("fresh-r".to_string())))
            .await
            .unwrap();
        pending.await.unwrap();

        assert_eq!(auth.access_token(), Some("fresh".to_string()));
        assert_eq!(auth.status(), RefreshStatus::Idle);
    }

    #[tokio::test]
    async fn test_logout_during_refresh_stays_logged_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_ENDPOINT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "late" }))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let auth = coordinator_for(&server, Duration::from_secs(30)).await;
        auth.login(TokenPair::new("a1", Some("r1".to_string())))
            .await
            .unwrap();

        let pending = {
            let auth = auth.clone();
            tokio::spawn(async move { auth.refresh_if_needed().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        auth.logout().await.unwrap();
        pending.await.unwrap();

        assert!(!auth.is_authenticated());
        assert_eq!(auth.status(), RefreshStatus::Idle);
    }
}
