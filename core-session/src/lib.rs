//! # Session Module
//!
//! Token lifecycle for the authenticated HTTP client.
//!
//! ## Overview
//!
//! This crate owns the credentials a signed-in client carries between
//! requests: where the access/refresh token pair is stored, when the access
//! token counts as expired, and how it gets renewed. Renewal is coordinated
//! through a single-flight gate so any number of concurrent requests
//! discovering a stale token together produce exactly one call to the
//! refresh endpoint.
//!
//! ## Features
//!
//! - Dual storage backends (session-scoped vs. long-lived) selected by a
//!   persisted "stay signed in" preference
//! - In-memory fast path for the access token only
//! - Expiry margins: a hard 60-second margin for "is this token usable" and
//!   a wider 5-minute window for proactive renewal
//! - Single-flight refresh with a waiter queue drained on success and
//!   failure alike
//! - Auth-state event emission over a broadcast bus

pub mod error;
pub mod events;
pub mod gate;
pub mod store;
pub mod types;

pub use error::{Result, SessionError};
pub use events::{SessionEvent, SessionEvents};
pub use gate::RefreshGate;
pub use store::TokenVault;
pub use types::{
    TokenPayload, DEFAULT_EXPIRES_IN_SECS, EXPIRY_MARGIN_MS, PROACTIVE_REFRESH_WINDOW_MS,
};
