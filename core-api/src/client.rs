//! Authenticated API Client
//!
//! Every outbound call runs through two interceptor stages:
//!
//! - **Request pipeline**: whitelist check, proactive token renewal, bearer
//!   header injection.
//! - **Response pipeline**: credential capture on login/register responses,
//!   401 recovery bounded to one refresh-and-retry, classified error
//!   propagation.
//!
//! The refresh call itself never passes through these stages; see
//! [`RefreshGate`](core_session::RefreshGate).

use crate::auth::{is_credential_path, is_whitelisted, REFRESH_PATH};
use crate::error::{ApiError, Result};
use bytes::Bytes;
use core_session::{
    RefreshGate, SessionEvent, SessionEvents, TokenPayload, TokenVault,
    PROACTIVE_REFRESH_WINDOW_MS,
};
use host_traits::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// HTTP client that keeps its bearer token valid behind the caller's back.
///
/// Constructed explicitly with its collaborators injected, so tests (and
/// multiple host shells) can run isolated instances side by side.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    vault: Arc<TokenVault>,
    gate: Arc<RefreshGate>,
    events: SessionEvents,
    base_url: String,
}

impl ApiClient {
    /// Create a client rooted at `base_url`.
    ///
    /// The refresh gate is wired to the same transport and vault so that
    /// refresh traffic shares the connection pool while bypassing the
    /// interceptors.
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        vault: Arc<TokenVault>,
        events: SessionEvents,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let gate = Arc::new(RefreshGate::new(
            vault.clone(),
            transport.clone(),
            format!("{}{}", base_url, REFRESH_PATH),
            events.clone(),
        ));

        Self {
            transport,
            vault,
            gate,
            events,
            base_url,
        }
    }

    /// The token vault backing this client.
    pub fn vault(&self) -> &Arc<TokenVault> {
        &self.vault
    }

    /// The session event bus this client emits on.
    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.dispatch(HttpMethod::Get, path, None, None).await?;
        decode(&response)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .dispatch(HttpMethod::Post, path, Some(encode(body)?), None)
            .await?;
        decode(&response)
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .dispatch(HttpMethod::Put, path, Some(encode(body)?), None)
            .await?;
        decode(&response)
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .dispatch(HttpMethod::Patch, path, Some(encode(body)?), None)
            .await?;
        decode(&response)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.dispatch(HttpMethod::Delete, path, None, None).await?;
        decode(&response)
    }

    /// Escape hatch: run the full pipelines but hand back the raw response,
    /// for callers that need headers or a non-JSON body.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<HttpResponse> {
        self.dispatch(method, path, body, None).await
    }

    /// Both pipelines around a single dispatch.
    ///
    /// `remember_override` is threaded down from the login/register helpers;
    /// everything else captures against the currently persisted preference.
    #[instrument(skip_all, fields(method = method.as_str(), path = path))]
    pub(crate) async fn dispatch(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Bytes>,
        remember_override: Option<bool>,
    ) -> Result<HttpResponse> {
        let whitelisted = is_whitelisted(path);

        if !whitelisted {
            self.renew_ahead_of_expiry().await?;
        }

        let mut request = self.build_request(method, path, body.as_ref());
        if !whitelisted {
            if let Some(token) = self.vault.access_token().await? {
                request = request.bearer_token(token);
            }
            // No token after renewal is not an error at this stage: the
            // request goes out unauthenticated and the server answers as it
            // sees fit.
        }

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if response.is_success() {
            if is_credential_path(path) {
                self.capture_tokens(&response, remember_override).await?;
            }
            return Ok(response);
        }

        if response.is_unauthorized() && !whitelisted {
            return self.recover_unauthorized(method, path, body).await;
        }

        Err(status_error(response))
    }

    fn build_request(&self, method: HttpMethod, path: &str, body: Option<&Bytes>) -> HttpRequest {
        let mut request = HttpRequest::new(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            request = request
                .header("Content-Type", "application/json")
                .body(body.clone());
        }
        request
    }

    /// Proactive half of the refresh logic: renew while the token still has
    /// less than the proactive window left, instead of waiting for a 401.
    async fn renew_ahead_of_expiry(&self) -> Result<()> {
        if self.vault.access_token().await?.is_none() {
            return Ok(());
        }
        if !self
            .vault
            .expires_within(PROACTIVE_REFRESH_WINDOW_MS)
            .await?
        {
            return Ok(());
        }

        debug!("Access token near expiry, renewing before dispatch");

        match self.gate.refresh().await {
            Ok(_) => Ok(()),
            Err(err) => {
                // Never dispatch with a stale token
                warn!(error = %err, "Proactive refresh failed, aborting request");
                self.sign_out_after_failure().await?;
                Err(err.into())
            }
        }
    }

    /// Reactive half: one refresh-and-retry per original request. The
    /// retry's outcome is surfaced as-is, so a second 401 cannot loop back
    /// here.
    async fn recover_unauthorized(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<HttpResponse> {
        debug!("Request rejected with 401, attempting refresh-and-retry");

        let token = match self.gate.refresh().await {
            Ok(token) => token,
            Err(err) => {
                // The refresh error replaces the original 401
                warn!(error = %err, "Refresh after 401 failed");
                self.sign_out_after_failure().await?;
                return Err(err.into());
            }
        };

        let retry = self
            .build_request(method, path, body.as_ref())
            .bearer_token(token);

        let response = self
            .transport
            .execute(retry)
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if response.is_success() {
            return Ok(response);
        }

        Err(status_error(response))
    }

    /// Success-path interceptor for login/register: persist whatever token
    /// payload the body carries, keeping the token lifecycle in one place
    /// even though the call site never asked for persistence.
    async fn capture_tokens(
        &self,
        response: &HttpResponse,
        remember_override: Option<bool>,
    ) -> Result<()> {
        let payload: TokenPayload = match response.json() {
            Ok(payload) => payload,
            Err(_) => {
                debug!("Credential response carried no token payload");
                return Ok(());
            }
        };

        if payload.is_empty() {
            return Ok(());
        }

        let remember = match remember_override {
            Some(remember) => remember,
            None => self.vault.remember_me().await?,
        };

        self.vault.save_tokens(&payload, remember).await?;
        let _ = self.events.emit(SessionEvent::SignedIn);
        Ok(())
    }

    /// Irrecoverable refresh failure: drop the credentials so
    /// `is_authenticated` reads false and announce the sign-out.
    async fn sign_out_after_failure(&self) -> Result<()> {
        self.vault.clear_tokens().await?;
        let _ = self.events.emit(SessionEvent::SignedOut);
        Ok(())
    }
}

pub(crate) fn encode<B: Serialize>(body: &B) -> Result<Bytes> {
    let encoded = serde_json::to_vec(body).map_err(|e| ApiError::Encode(e.to_string()))?;
    Ok(Bytes::from(encoded))
}

pub(crate) fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    response.json().map_err(|e| ApiError::Decode(e.to_string()))
}

fn status_error(response: HttpResponse) -> ApiError {
    let message = response
        .text()
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    ApiError::Status {
        status: response.status,
        message,
    }
}
