#![deny(unsafe_code)]

//! Shared test utilities for the mmpost workspace.
//!
//! Provides config builders, gcode program builders and temp-dir workspaces
//! so that individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! mmpost-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod gcode;
pub mod workspace;
