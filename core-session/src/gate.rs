//! Refresh Gate
//!
//! Single-flight coordinator for the token-refresh call. When any number of
//! concurrent requests discover they need a fresh token at the same time,
//! exactly one network call reaches the refresh endpoint; everyone else
//! parks on the gate and resumes with that call's result.
//!
//! The gate is a two-state machine, Idle and Refreshing, guarded by one
//! async mutex. The check-and-set on entry and the waiter-queue drain on
//! exit each happen under a single lock acquisition, so no interleaved task
//! can observe a half-transition or inherit a waiter from an earlier cycle.

use crate::error::{Result, SessionError};
use crate::events::{SessionEvent, SessionEvents};
use crate::store::TokenVault;
use crate::types::TokenPayload;
use host_traits::http::{HttpMethod, HttpRequest, HttpTransport};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, instrument, warn};

/// Token or error message broadcast to parked waiters. Carried as a plain
/// message string because the same failure has to reach every waiter.
type RefreshOutcome = std::result::Result<String, String>;

enum GateState {
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// Request body for the refresh endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Single-flight token-refresh coordinator.
///
/// Talks to the transport directly: routing the refresh call through the
/// authenticated request pipeline would re-enter this gate and deadlock
/// against the very refresh it is waiting on.
pub struct RefreshGate {
    vault: Arc<TokenVault>,
    transport: Arc<dyn HttpTransport>,
    refresh_url: String,
    state: Mutex<GateState>,
    events: SessionEvents,
}

impl RefreshGate {
    pub fn new(
        vault: Arc<TokenVault>,
        transport: Arc<dyn HttpTransport>,
        refresh_url: impl Into<String>,
        events: SessionEvents,
    ) -> Self {
        Self {
            vault,
            transport,
            refresh_url: refresh_url.into(),
            state: Mutex::new(GateState::Idle),
            events,
        }
    }

    /// Whether a refresh is currently in flight.
    pub async fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock().await, GateState::Refreshing { .. })
    }

    /// Obtain a fresh access token, joining an in-flight refresh if one
    /// exists.
    ///
    /// The caller that finds the gate Idle drives the network call; callers
    /// arriving while it runs park on the gate and are all resolved from the
    /// one result. On failure every parked waiter is rejected before the
    /// gate returns to Idle, so nobody is left hanging into a later cycle.
    ///
    /// A missing refresh token fails immediately, without a network call and
    /// without touching stored state; what to clear is the caller's call.
    ///
    /// No timeout is imposed here beyond the transport's own: if the
    /// transport lets the refresh call hang forever, every parked waiter
    /// hangs with it.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<String> {
        let parked = {
            let mut state = self.state.lock().await;
            match &mut *state {
                GateState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    debug!(
                        queued = waiters.len(),
                        "Refresh already in flight, waiting for its result"
                    );
                    Some(rx)
                }
                GateState::Idle => {
                    *state = GateState::Refreshing {
                        waiters: Vec::new(),
                    };
                    None
                }
            }
        };

        if let Some(rx) = parked {
            return match rx.await {
                Ok(Ok(token)) => Ok(token),
                Ok(Err(message)) => Err(SessionError::RefreshFailed(message)),
                // The driving task drains the queue on every path; a closed
                // channel means it panicked mid-refresh.
                Err(_) => Err(SessionError::RefreshFailed(
                    "refresh task abandoned its waiters".to_string(),
                )),
            };
        }

        let outcome = self.execute_refresh().await;

        {
            let mut state = self.state.lock().await;
            if let GateState::Refreshing { waiters } =
                std::mem::replace(&mut *state, GateState::Idle)
            {
                if !waiters.is_empty() {
                    debug!(waiters = waiters.len(), "Resolving parked refresh waiters");
                }
                match &outcome {
                    Ok(token) => {
                        for waiter in waiters {
                            let _ = waiter.send(Ok(token.clone()));
                        }
                    }
                    Err(err) => {
                        let message = err.to_string();
                        for waiter in waiters {
                            let _ = waiter.send(Err(message.clone()));
                        }
                    }
                }
            }
        }

        if let Err(err) = &outcome {
            let _ = self.events.emit(SessionEvent::RefreshFailed {
                reason: err.to_string(),
            });
        }

        outcome
    }

    /// The actual refresh cycle: read the refresh token, call the endpoint,
    /// persist the new token set, and read back the new access token.
    async fn execute_refresh(&self) -> Result<String> {
        let refresh_token = self
            .vault
            .refresh_token()
            .await?
            .ok_or(SessionError::MissingRefreshToken)?;

        debug!("Refreshing access token");

        let request = HttpRequest::new(HttpMethod::Post, self.refresh_url.clone())
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .map_err(|e| SessionError::RefreshFailed(e.to_string()))?;

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| SessionError::RefreshFailed(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status = status, "Token refresh rejected by server");

            return Err(SessionError::RefreshFailed(format!(
                "Refresh endpoint returned {}: {}",
                status, error_body
            )));
        }

        let payload: TokenPayload = response
            .json()
            .map_err(|e| SessionError::RefreshFailed(e.to_string()))?;

        let remember = self.vault.remember_me().await?;
        self.vault.save_tokens(&payload, remember).await?;

        let token = self.vault.access_token().await?.ok_or_else(|| {
            SessionError::RefreshFailed("Refresh response carried no access token".to_string())
        })?;

        let expires_at = self.vault.token_expires_at().await?.unwrap_or_default();
        info!("Access token refreshed");
        let _ = self
            .events
            .emit(SessionEvent::TokenRefreshed { expires_at });

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use chrono::{DateTime, TimeZone, Utc};
    use futures::future::join_all;
    use host_traits::error::Result as HostResult;
    use host_traits::http::HttpResponse;
    use host_traits::storage::KeyValueStore;
    use host_traits::time::Clock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MemoryKv {
        entries: Mutex<HashMap<String, String>>,
    }

    impl MemoryKv {
        fn new() -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for MemoryKv {
        async fn get(&self, key: &str) -> HostResult<Option<String>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> HostResult<()> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> HostResult<()> {
            self.entries.lock().await.remove(key);
            Ok(())
        }

        async fn clear(&self) -> HostResult<()> {
            self.entries.lock().await.clear();
            Ok(())
        }
    }

    struct FixedClock {
        now_ms: i64,
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_millis_opt(self.now_ms)
                .single()
                .expect("valid timestamp")
        }
    }

    /// Transport double that counts calls and answers every request with a
    /// canned refresh response after a short pause, so concurrent callers
    /// genuinely overlap.
    struct CountingTransport {
        calls: AtomicUsize,
        status: u16,
        body: &'static str,
    }

    impl CountingTransport {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status: 200,
                body: r#"{ "accessToken": "fresh-token", "refreshToken": "fresh-refresh", "expiresIn": 3600 }"#,
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status,
                body: r#"{ "error": "refresh token revoked" }"#,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HttpTransport for CountingTransport {
        async fn execute(&self, _request: HttpRequest) -> HostResult<HttpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(HttpResponse {
                status: self.status,
                headers: HashMap::new(),
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    const NOW_MS: i64 = 1_700_000_000_000;

    fn gate_with(
        transport: Arc<CountingTransport>,
    ) -> (Arc<RefreshGate>, Arc<TokenVault>, SessionEvents) {
        let vault = Arc::new(TokenVault::new(
            Arc::new(MemoryKv::new()),
            Arc::new(MemoryKv::new()),
            Arc::new(FixedClock { now_ms: NOW_MS }),
        ));
        let events = SessionEvents::new(16);
        let gate = Arc::new(RefreshGate::new(
            vault.clone(),
            transport,
            "https://api.example.com/auth/refresh",
            events.clone(),
        ));
        (gate, vault, events)
    }

    #[tokio::test]
    async fn test_refresh_single_caller() {
        let transport = Arc::new(CountingTransport::ok());
        let (gate, vault, _) = gate_with(transport.clone());

        vault.set_refresh_token("r1", false).await.unwrap();

        let token = gate.refresh().await.unwrap();
        assert_eq!(token, "fresh-token");
        assert_eq!(transport.call_count(), 1);
        assert_eq!(
            vault.refresh_token().await.unwrap(),
            Some("fresh-refresh".to_string())
        );
        assert!(!gate.is_refreshing().await);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_call() {
        let transport = Arc::new(CountingTransport::ok());
        let (gate, vault, _) = gate_with(transport.clone());

        vault.set_refresh_token("r1", false).await.unwrap();

        let tokens = join_all((0..5).map(|_| {
            let gate = gate.clone();
            async move { gate.refresh().await }
        }))
        .await;

        assert_eq!(transport.call_count(), 1);
        for token in tokens {
            assert_eq!(token.unwrap(), "fresh-token");
        }
    }

    #[tokio::test]
    async fn test_failure_rejects_every_waiter_and_reopens_gate() {
        let transport = Arc::new(CountingTransport::failing(403));
        let (gate, vault, _) = gate_with(transport.clone());

        vault.set_refresh_token("r1", false).await.unwrap();

        let outcomes = join_all((0..3).map(|_| {
            let gate = gate.clone();
            async move { gate.refresh().await }
        }))
        .await;

        assert_eq!(transport.call_count(), 1);
        for outcome in outcomes {
            assert!(matches!(outcome, Err(SessionError::RefreshFailed(_))));
        }

        // The queue drained and the gate is Idle again: the next call starts
        // a fresh cycle instead of inheriting stale waiters
        assert!(!gate.is_refreshing().await);
        assert!(gate.refresh().await.is_err());
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_network_call() {
        let transport = Arc::new(CountingTransport::ok());
        let (gate, vault, _) = gate_with(transport.clone());

        vault.set_access_token("still-here", false).await.unwrap();

        let outcome = gate.refresh().await;
        assert!(matches!(outcome, Err(SessionError::MissingRefreshToken)));
        assert_eq!(transport.call_count(), 0);

        // Tokens are not cleared on this path; that decision belongs to the
        // caller
        assert_eq!(
            vault.access_token().await.unwrap(),
            Some("still-here".to_string())
        );
    }

    #[tokio::test]
    async fn test_refresh_persists_into_remembered_backend() {
        let transport = Arc::new(CountingTransport::ok());
        let (gate, vault, _) = gate_with(transport);

        vault.set_access_token("old", true).await.unwrap();
        vault.set_refresh_token("r1", true).await.unwrap();

        gate.refresh().await.unwrap();

        // Preference was true, so the rotated tokens land in the long-lived
        // backend and the preference survives
        assert!(vault.remember_me().await.unwrap());
        let rebuilt_view = vault.refresh_token().await.unwrap();
        assert_eq!(rebuilt_view, Some("fresh-refresh".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_emits_events() {
        let transport = Arc::new(CountingTransport::ok());
        let (gate, vault, events) = gate_with(transport);
        let mut receiver = events.subscribe();

        vault.set_refresh_token("r1", false).await.unwrap();
        gate.refresh().await.unwrap();

        assert!(matches!(
            receiver.try_recv().unwrap(),
            SessionEvent::TokenRefreshed { .. }
        ));
    }

    #[tokio::test]
    async fn test_failed_refresh_emits_event() {
        let transport = Arc::new(CountingTransport::failing(500));
        let (gate, vault, events) = gate_with(transport);
        let mut receiver = events.subscribe();

        vault.set_refresh_token("r1", false).await.unwrap();
        let _ = gate.refresh().await;

        assert!(matches!(
            receiver.try_recv().unwrap(),
            SessionEvent::RefreshFailed { .. }
        ));
    }

    #[test]
    fn test_refresh_request_wire_shape() {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: "r1",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "refreshToken": "r1" }));
    }
}
