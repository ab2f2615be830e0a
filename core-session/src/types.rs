use serde::{Deserialize, Serialize};
use std::fmt;

/// Hard expiry margin in milliseconds.
///
/// A token whose stored expiry is within this window of now is treated as
/// already expired, so a request never leaves with a token that lapses
/// mid-flight. This is the read-side check behind
/// [`TokenVault::is_token_expired`](crate::TokenVault::is_token_expired).
pub const EXPIRY_MARGIN_MS: i64 = 60_000;

/// Proactive refresh window in milliseconds.
///
/// The request pipeline starts a refresh this far ahead of expiry. Distinct
/// from (and wider than) [`EXPIRY_MARGIN_MS`]: the margin says "this token is
/// no longer usable", the window says "start renewing early so callers never
/// see a rejection".
pub const PROACTIVE_REFRESH_WINDOW_MS: i64 = 300_000;

/// Access-token lifetime assumed when the server omits `expiresIn`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3_600;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key for the stringified epoch-millisecond expiry.
pub const TOKEN_EXPIRES_KEY: &str = "token_expires";
/// Storage key for the persisted "stay signed in" preference. The value is
/// `"true"` when set; the key is absent otherwise.
pub const REMEMBER_ME_KEY: &str = "remember_me";

/// Token payload carried by login, register, and refresh response bodies.
///
/// All fields are optional: endpoints are free to return partial payloads
/// and older ones deliver the access token under the legacy `token` name.
/// Whatever is absent leaves the stored value untouched.
///
/// # Security
///
/// The `Debug` implementation redacts token values so payloads can appear in
/// trace output safely.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    #[serde(default, alias = "token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access-token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl TokenPayload {
    /// Whether the payload carries anything worth persisting.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for TokenPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPayload")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_deserializes_camel_case() {
        let json = r#"{
            "accessToken": "a-token",
            "refreshToken": "r-token",
            "expiresIn": 7200
        }"#;

        let payload: TokenPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.access_token.as_deref(), Some("a-token"));
        assert_eq!(payload.refresh_token.as_deref(), Some("r-token"));
        assert_eq!(payload.expires_in, Some(7200));
    }

    #[test]
    fn test_payload_accepts_legacy_token_field() {
        let json = r#"{ "token": "a-token" }"#;

        let payload: TokenPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.access_token.as_deref(), Some("a-token"));
        assert_eq!(payload.refresh_token, None);
        assert_eq!(payload.expires_in, None);
    }

    #[test]
    fn test_payload_tolerates_partial_bodies() {
        let json = r#"{ "refreshToken": "r-token", "user": { "id": 7 } }"#;

        let payload: TokenPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.access_token, None);
        assert_eq!(payload.refresh_token.as_deref(), Some("r-token"));
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_payload_debug_redacts() {
        let payload = TokenPayload {
            access_token: Some("secret_access".to_string()),
            refresh_token: Some("secret_refresh".to_string()),
            expires_in: Some(3600),
        };

        let debug_str = format!("{:?}", payload);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("secret_access"));
        assert!(!debug_str.contains("secret_refresh"));
    }

    #[test]
    fn test_empty_payload() {
        let payload: TokenPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.is_empty());
    }
}
