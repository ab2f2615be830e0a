//! Token Vault
//!
//! Holds the access/refresh token pair and its expiry across an in-memory
//! cache and two storage backends with different lifetimes. Which backend a
//! field is read from or written to is decided by the persisted "stay signed
//! in" preference, selected once per operation from its current value.
//!
//! ## Security
//!
//! - Token values are never logged or included in error messages
//! - Only the access token is cached in memory; the refresh token always
//!   lives in a backend and is read on demand
//! - Clearing wipes both backends, not just the selected one

use crate::error::{Result, SessionError};
use crate::types::{
    TokenPayload, ACCESS_TOKEN_KEY, DEFAULT_EXPIRES_IN_SECS, EXPIRY_MARGIN_MS, REFRESH_TOKEN_KEY,
    REMEMBER_ME_KEY, TOKEN_EXPIRES_KEY,
};
use host_traits::error::HostError;
use host_traits::storage::KeyValueStore;
use host_traits::time::Clock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

fn storage_error(context: &str, err: HostError) -> SessionError {
    warn!(
        context = context,
        error = %err,
        "Token storage operation failed"
    );
    SessionError::StorageUnavailable(err.to_string())
}

/// Dual-backend store for the session's token set.
///
/// Explicitly constructed and injected rather than global, so tests can run
/// against isolated instances.
pub struct TokenVault {
    /// Session-scoped backend, selected while "stay signed in" is off.
    session: Arc<dyn KeyValueStore>,
    /// Long-lived backend, selected while "stay signed in" is on. Also the
    /// only home of the preference flag itself.
    persistent: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    /// Fast path for the access token; kept in sync on every write and
    /// dropped on clear. The refresh token is deliberately not cached.
    cached_access: Mutex<Option<String>>,
}

impl TokenVault {
    pub fn new(
        session: Arc<dyn KeyValueStore>,
        persistent: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        debug!("Initializing token vault");
        Self {
            session,
            persistent,
            clock,
            cached_access: Mutex::new(None),
        }
    }

    /// Backend selected by the given preference value.
    fn backend(&self, remember: bool) -> &dyn KeyValueStore {
        if remember {
            self.persistent.as_ref()
        } else {
            self.session.as_ref()
        }
    }

    /// Read the persisted "stay signed in" preference.
    ///
    /// The flag lives in the long-lived backend only; an absent key means
    /// false.
    pub async fn remember_me(&self) -> Result<bool> {
        let value = self
            .persistent
            .get(REMEMBER_ME_KEY)
            .await
            .map_err(|e| storage_error("read preference", e))?;
        Ok(value.as_deref() == Some("true"))
    }

    /// Current access token: memory cache first, then the backend selected
    /// by the current preference.
    pub async fn access_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.cached_access.lock().await.clone() {
            return Ok(Some(token));
        }

        let remember = self.remember_me().await?;
        self.backend(remember)
            .get(ACCESS_TOKEN_KEY)
            .await
            .map_err(|e| storage_error("read access token", e))
    }

    /// Store the access token and persist the preference that selected its
    /// backend.
    ///
    /// A false preference is recorded by clearing the flag, not by writing
    /// `"false"`.
    pub async fn set_access_token(&self, token: &str, remember: bool) -> Result<()> {
        *self.cached_access.lock().await = Some(token.to_string());

        self.backend(remember)
            .set(ACCESS_TOKEN_KEY, token)
            .await
            .map_err(|e| storage_error("write access token", e))?;

        if remember {
            self.persistent
                .set(REMEMBER_ME_KEY, "true")
                .await
                .map_err(|e| storage_error("write preference", e))?;
        } else {
            self.persistent
                .remove(REMEMBER_ME_KEY)
                .await
                .map_err(|e| storage_error("clear preference", e))?;
        }

        Ok(())
    }

    /// Current refresh token, read from the selected backend. Never cached.
    pub async fn refresh_token(&self) -> Result<Option<String>> {
        let remember = self.remember_me().await?;
        self.backend(remember)
            .get(REFRESH_TOKEN_KEY)
            .await
            .map_err(|e| storage_error("read refresh token", e))
    }

    pub async fn set_refresh_token(&self, token: &str, remember: bool) -> Result<()> {
        self.backend(remember)
            .set(REFRESH_TOKEN_KEY, token)
            .await
            .map_err(|e| storage_error("write refresh token", e))
    }

    /// Record the expiry as an absolute epoch-millisecond timestamp computed
    /// from a lifetime in seconds.
    pub async fn set_token_expiry(&self, expires_in_secs: i64, remember: bool) -> Result<()> {
        let expires_at = self.clock.unix_timestamp_millis() + expires_in_secs * 1_000;
        self.backend(remember)
            .set(TOKEN_EXPIRES_KEY, &expires_at.to_string())
            .await
            .map_err(|e| storage_error("write token expiry", e))
    }

    /// Stored expiry in epoch milliseconds, if present and parseable.
    pub async fn token_expires_at(&self) -> Result<Option<i64>> {
        let remember = self.remember_me().await?;
        let stored = self
            .backend(remember)
            .get(TOKEN_EXPIRES_KEY)
            .await
            .map_err(|e| storage_error("read token expiry", e))?;

        Ok(stored.and_then(|value| match value.parse::<i64>() {
            Ok(ms) => Some(ms),
            Err(_) => {
                warn!("Stored token expiry is not a valid timestamp");
                None
            }
        }))
    }

    /// Whether the stored expiry falls inside the given window of now.
    ///
    /// A missing or unreadable expiry counts as inside the window, matching
    /// [`is_token_expired`](Self::is_token_expired)'s treatment of missing
    /// expiry.
    pub async fn expires_within(&self, window_ms: i64) -> Result<bool> {
        match self.token_expires_at().await? {
            Some(expires_at) => Ok(self.clock.unix_timestamp_millis() > expires_at - window_ms),
            None => Ok(true),
        }
    }

    /// Whether the access token should be treated as expired.
    ///
    /// True when no expiry is stored, or when now is within
    /// [`EXPIRY_MARGIN_MS`] of the stored expiry.
    pub async fn is_token_expired(&self) -> Result<bool> {
        self.expires_within(EXPIRY_MARGIN_MS).await
    }

    /// Persist whatever fields a token payload carries.
    ///
    /// An access token always gets an expiry alongside it, defaulting to
    /// [`DEFAULT_EXPIRES_IN_SECS`] when the server omitted one. Absent
    /// fields leave the stored values untouched.
    pub async fn save_tokens(&self, payload: &TokenPayload, remember: bool) -> Result<()> {
        if let Some(access_token) = payload.access_token.as_deref() {
            self.set_access_token(access_token, remember).await?;
            let expires_in = payload.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
            self.set_token_expiry(expires_in, remember).await?;
        }

        if let Some(refresh_token) = payload.refresh_token.as_deref() {
            self.set_refresh_token(refresh_token, remember).await?;
        }

        info!(
            has_access_token = payload.access_token.is_some(),
            has_refresh_token = payload.refresh_token.is_some(),
            remember = remember,
            "Saved token payload"
        );

        Ok(())
    }

    /// Drop the cache and remove every token, expiry, and preference key
    /// from both backends.
    ///
    /// Both backends on purpose, even though every other accessor touches
    /// only the selected one: a preference flip must not leave a stale token
    /// set alive in the backend that is no longer selected.
    pub async fn clear_tokens(&self) -> Result<()> {
        self.cached_access.lock().await.take();

        for backend in [self.session.as_ref(), self.persistent.as_ref()] {
            for key in [
                ACCESS_TOKEN_KEY,
                REFRESH_TOKEN_KEY,
                TOKEN_EXPIRES_KEY,
                REMEMBER_ME_KEY,
            ] {
                backend
                    .remove(key)
                    .await
                    .map_err(|e| storage_error("clear tokens", e))?;
            }
        }

        info!("Cleared tokens from both backends");
        Ok(())
    }

    /// An access token is present and not within the hard expiry margin.
    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.access_token().await?.is_some() && !self.is_token_expired().await?)
    }
}
