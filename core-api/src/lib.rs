//! # API Client Facade
//!
//! The authenticated HTTP client the console and chat shells talk through.
//!
//! ## Overview
//!
//! [`ApiClient`] exposes `get`/`post`/`put`/`patch`/`delete` and promises
//! callers one of two outcomes: the request succeeds with a valid bearer
//! token attached, or a classified [`ApiError`] comes back. Token renewal,
//! the login/register capture side effect, and 401 recovery all happen
//! inside the pipelines; calling code never sees them.
//!
//! ## Wiring
//!
//! ```ignore
//! use core_api::{ApiClient, Credentials};
//! use core_session::{SessionEvents, TokenVault};
//! use host_native::{MemoryKeyValueStore, ReqwestTransport, SqliteKeyValueStore};
//! use host_traits::time::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! let vault = Arc::new(TokenVault::new(
//!     Arc::new(MemoryKeyValueStore::new()),
//!     Arc::new(SqliteKeyValueStore::new("state/session.db".into()).await?),
//!     Arc::new(SystemClock),
//! ));
//! let client = ApiClient::new(
//!     "https://api.opsdesk.example",
//!     Arc::new(ReqwestTransport::new()),
//!     vault,
//!     SessionEvents::default(),
//! );
//!
//! let profile: serde_json::Value = client
//!     .login(&Credentials {
//!         email: "ops@example.com".into(),
//!         password: "secret".into(),
//!     }, true)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod logging;

pub use auth::{Credentials, Registration, LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};
pub use client::ApiClient;
pub use error::{ApiError, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
