//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-api`, `host-native`). Host shells can depend
//! on `opsdesk-workspace` and enable the documented features without needing
//! to wire each crate individually.
