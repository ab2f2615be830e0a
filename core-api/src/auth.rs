//! Auth Endpoint Surface
//!
//! The three endpoints exempt from token logic, the credential wire types,
//! and the convenience methods the console and chat shells sign in through.

use crate::client::{decode, encode, ApiClient};
use crate::error::Result;
use core_session::SessionEvent;
use host_traits::http::HttpMethod;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use tracing::info;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Endpoints that must never carry a bearer token or trigger refresh logic.
/// Letting the refresh endpoint itself recurse into the gate would deadlock.
const UNAUTHENTICATED_PATHS: [&str; 3] = [LOGIN_PATH, REGISTER_PATH, REFRESH_PATH];

pub(crate) fn is_whitelisted(path: &str) -> bool {
    UNAUTHENTICATED_PATHS.contains(&path)
}

/// Paths whose success responses carry a token payload worth capturing.
pub(crate) fn is_credential_path(path: &str) -> bool {
    path == LOGIN_PATH || path == REGISTER_PATH
}

/// Login request body.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

// Keep the password out of trace output
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registration request body.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ApiClient {
    /// POST the credentials to the login endpoint.
    ///
    /// The response pipeline captures the returned token payload into the
    /// backend selected by `remember`; the deserialized body (user profile
    /// and whatever else the server includes) is handed back to the caller.
    pub async fn login<T: DeserializeOwned>(
        &self,
        credentials: &Credentials,
        remember: bool,
    ) -> Result<T> {
        let response = self
            .dispatch(
                HttpMethod::Post,
                LOGIN_PATH,
                Some(encode(credentials)?),
                Some(remember),
            )
            .await?;
        decode(&response)
    }

    /// POST a new account to the register endpoint; token capture works the
    /// same way as for login.
    pub async fn register<T: DeserializeOwned>(
        &self,
        registration: &Registration,
        remember: bool,
    ) -> Result<T> {
        let response = self
            .dispatch(
                HttpMethod::Post,
                REGISTER_PATH,
                Some(encode(registration)?),
                Some(remember),
            )
            .await?;
        decode(&response)
    }

    /// Client-side sign-out: drop the token set from both backends and
    /// announce it. No server call is involved.
    pub async fn logout(&self) -> Result<()> {
        self.vault().clear_tokens().await?;
        let _ = self.events().emit(SessionEvent::SignedOut);
        info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist_membership() {
        assert!(is_whitelisted("/auth/login"));
        assert!(is_whitelisted("/auth/register"));
        assert!(is_whitelisted("/auth/refresh"));
        assert!(!is_whitelisted("/auth/login/extra"));
        assert!(!is_whitelisted("/projects"));
    }

    #[test]
    fn test_credential_paths_exclude_refresh() {
        assert!(is_credential_path("/auth/login"));
        assert!(is_credential_path("/auth/register"));
        assert!(!is_credential_path("/auth/refresh"));
    }

    #[test]
    fn test_credentials_wire_shape() {
        let body = serde_json::to_value(Credentials {
            email: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({ "email": "ops@example.com", "password": "hunter2" })
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials {
            email: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
        };

        let debug_str = format!("{:?}", credentials);
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn test_registration_omits_absent_display_name() {
        let body = serde_json::to_value(Registration {
            email: "ops@example.com".to_string(),
            password: "hunter2".to_string(),
            display_name: None,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({ "email": "ops@example.com", "password": "hunter2" })
        );
    }
}
