//! HTTP Transport Abstraction
//!
//! Defines the raw network contract the core builds its authenticated client
//! on top of. Implementations own connection pooling, TLS, and low-level
//! retry; they know nothing about tokens or auth endpoints.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{HostError, Result};

/// HTTP method types supported by the client surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Uppercase method name, for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Builder-style HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the `Authorization: Bearer <token>` header.
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    /// Serialize `body` as JSON and set the content type accordingly.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)
            .map_err(|e| HostError::OperationFailed(format!("JSON serialization failed: {}", e)))?;
        self.body = Some(Bytes::from(encoded));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Whether an `Authorization` header has been set on this request.
    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key("Authorization")
    }
}

/// HTTP response as seen by the core: status, headers, raw body.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            HostError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Response body as a UTF-8 string.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| HostError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is 401 Unauthorized.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Retry configuration for transient transport failures.
///
/// Applies to connection errors and 5xx/429 responses only; application-level
/// statuses (including 401) are returned to the caller untouched.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Async HTTP transport trait.
///
/// The authenticated client in `core-api` layers token injection and 401
/// recovery on top of this; the refresh coordinator in `core-session` calls
/// it directly so that refresh traffic never re-enters the interceptors.
///
/// Implementations should provide a sane default request timeout; a transport
/// with no timeout at all lets a hung refresh call block every queued waiter
/// indefinitely.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute a single HTTP request.
    ///
    /// # Errors
    ///
    /// Returns an error for connection failures, timeouts, or exhausted
    /// transport-level retries. Non-2xx statuses are NOT errors at this
    /// layer; callers classify them.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute with an explicit retry policy.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let _ = policy;
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::new(HttpMethod::Get, "https://example.com/api/users")
            .header("Accept", "application/json")
            .bearer_token("secret")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com/api/users");
        assert_eq!(
            request.headers.get("Accept"),
            Some(&"application/json".to_string())
        );
        assert!(request.has_authorization());
        assert_eq!(
            request.headers.get("Authorization"),
            Some(&"Bearer secret".to_string())
        );
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let request = HttpRequest::new(HttpMethod::Post, "https://example.com")
            .json(&serde_json::json!({ "name": "ops" }))
            .unwrap();

        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
        assert!(request.body.is_some());
    }

    #[test]
    fn test_response_status_checks() {
        let response = HttpResponse {
            status: 401,
            headers: HashMap::new(),
            body: Bytes::new(),
        };

        assert!(!response.is_success());
        assert!(response.is_unauthorized());
        assert!(response.is_client_error());
        assert!(!response.is_server_error());
    }

    #[test]
    fn test_method_names() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}
