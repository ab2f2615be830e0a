//! # Host Bridge Traits
//!
//! Platform abstraction traits implemented by each host shell.
//!
//! ## Overview
//!
//! This crate defines the contract between the shared core and
//! platform-specific adapters. The core never talks to the network, the
//! clock, or a storage backend directly; it goes through these traits so a
//! host (desktop shell, server-side renderer, test harness) can supply its
//! own implementations.
//!
//! ## Traits
//!
//! - [`HttpTransport`](http::HttpTransport) - raw HTTP execution with
//!   transport-level retry
//! - [`KeyValueStore`](storage::KeyValueStore) - string key-value backend for
//!   persisted session state
//! - [`Clock`](time::Clock) - time source for deterministic testing
//!
//! ## Error Handling
//!
//! All traits use [`HostError`](error::HostError). Adapters convert
//! platform-specific failures into it with actionable messages and must not
//! leak stored credential values into those messages.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; adapters are shared across async tasks
//! behind `Arc`.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::HostError;

// Re-export commonly used types
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, RetryPolicy};
pub use storage::KeyValueStore;
pub use time::{Clock, SystemClock};
