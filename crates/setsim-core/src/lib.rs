#![forbid(unsafe_code)]
//! setsim-core: shared kernel types for the setsim workspace.
//!
//! This crate contains only *pure* types, small helpers, and interfaces
//! (traits) that other crates implement. There is **no threading**, **no I/O**,
//! and **no allocation policy** here.
//!
//! Crates that use this:
//! - setsim-mem: implements the MemoryBudget trait (guards live there).
//! - setsim-operators: kernels and operators over `Table`/`ListColumnView`.
//! - setsim-planner: builds `LazyPlan` values and lowers them to programs.
//! - setsim-exec: drives programs at `collect` time and emits a RunManifest.

pub mod budget;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod manifest;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
