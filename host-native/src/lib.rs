//! # Native Host Adapters
//!
//! Concrete implementations of the `host-traits` contracts for native
//! (desktop/server) hosts:
//!
//! - [`ReqwestTransport`] - HTTP execution over reqwest with pooling and
//!   transport-level retry
//! - [`MemoryKeyValueStore`] - process-lifetime backend (session-scoped)
//! - [`SqliteKeyValueStore`] - on-disk backend (survives restarts)
//!
//! Browser shells supply their own adapters over the same traits; nothing in
//! the core crates depends on this one.

pub mod http;
pub mod storage;

pub use http::ReqwestTransport;
pub use storage::{MemoryKeyValueStore, SqliteKeyValueStore};
