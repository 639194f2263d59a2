/*
[INPUT]:  Token pairs from login or refresh, persistent storage backend
[OUTPUT]: Consistent snapshots of the current access/refresh token pair
[POS]:    Auth layer - token lifecycle management
[UPDATE]: When changing token fields or the persistence strategy
*/

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::auth::expiry::decode_expiry;
use crate::auth::storage::TokenStorage;
use crate::http::Result;
use crate::types::TokenResponse;

/// Access/refresh token pair with its expiry, when known
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenPair {
    /// Build a pair, reading the expiry from the access token's `exp` claim when possible
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        let access_token = access_token.into();
        let expires_at = decode_expiry(&access_token).ok();
        Self {
            access_token,
            refresh_token: refresh_token.filter(|t| !t.trim().is_empty()),
            expires_at,
        }
    }

    /// Build a pair from a refresh response, preferring explicit expiry hints.
    ///
    /// An `expires_in` that does not fit a timestamp is ignored.
    pub fn from_response(response: TokenResponse) -> Self {
        let explicit = response.expires_at.or_else(|| {
            response
                .expires_in
                .and_then(TimeDelta::try_seconds)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        });
        let mut pair = Self::new(response.access_token, response.refresh_token);
        if explicit.is_some() {
            pair.expires_at = explicit;
        }
        pair
    }

    /// Check if the pair is past its known expiry; unknown expiry counts as valid
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Holds the current token pair in memory and mirrors it to a storage backend.
///
/// Readers clone the whole pair under a read lock; writers replace it
/// wholesale, so a half-updated pair is never observable.
#[derive(Debug, Clone)]
pub struct TokenStore {
    current: Arc<RwLock<Option<TokenPair>>>,
    storage: Arc<dyn TokenStorage>,
    /// Held across swap + persist so the backend sees writes in memory order
    write_permit: Arc<AsyncMutex<()>>,
}

impl TokenStore {
    /// Create an empty store backed by `storage`
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            storage,
            write_permit: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Create a store and restore whatever pair the backend holds
    pub async fn restore(storage: Arc<dyn TokenStorage>) -> Result<Self> {
        let pair = storage.load().await?;
        Ok(Self {
            current: Arc::new(RwLock::new(pair)),
            storage,
            write_permit: Arc::new(AsyncMutex::new(())),
        })
    }

    /// Current pair, if any
    pub fn snapshot(&self) -> Option<TokenPair> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|pair| pair.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().and_then(|pair| pair.refresh_token.clone())
    }

    /// True if either token is present
    pub fn has_tokens(&self) -> bool {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        guard.is_some()
    }

    /// Replace both tokens at once, then persist the new pair.
    ///
    /// The in-memory pair is swapped even if persisting fails.
    pub async fn replace(&self, pair: TokenPair) -> Result<()> {
        let _permit = self.write_permit.lock().await;
        self.swap(Some(pair.clone()));
        self.storage.save(&pair).await
    }

    /// Drop the pair from memory and from the backend
    pub async fn clear(&self) -> Result<()> {
        let _permit = self.write_permit.lock().await;
        self.swap(None);
        self.storage.clear().await
    }

    /// [`replace`](Self::replace) only while `refresh_token` is still the stored refresh token.
    ///
    /// Returns `Ok(false)` without touching memory or backend when the pair
    /// was replaced or cleared in the meantime.
    pub async fn replace_if_current(&self, refresh_token: &str, pair: TokenPair) -> Result<bool> {
        let _permit = self.write_permit.lock().await;
        if !self.swap_if_current(refresh_token, Some(pair.clone())) {
            return Ok(false);
        }
        self.storage.save(&pair).await?;
        Ok(true)
    }

    /// [`clear`](Self::clear) only while `refresh_token` is still the stored refresh token
    pub async fn clear_if_current(&self, refresh_token: &str) -> Result<bool> {
        let _permit = self.write_permit.lock().await;
        if !self.swap_if_current(refresh_token, None) {
            return Ok(false);
        }
        self.storage.clear().await?;
        Ok(true)
    }

    fn swap(&self, next: Option<TokenPair>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }

    fn swap_if_current(&self, refresh_token: &str, next: Option<TokenPair>) -> bool {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let held = guard.as_ref().and_then(|pair| pair.refresh_token.as_deref());
        if held != Some(refresh_token) {
            return false;
        }
        *guard = next;
        true
    }
}
