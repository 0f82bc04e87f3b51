#![forbid(unsafe_code)]
//! setsim-exec: runs lowered plans and emits run manifests.
//!
//! The engine lowers a `LazyPlan`, walks its steps in order, evaluates each
//! step exactly once, and hands cached results to every consumer. Kernels do
//! their own data-parallel work; steps themselves run sequentially.

pub mod catalog;
pub mod literal;
pub mod metrics;
pub mod runtime;
pub mod scheduler;

pub use catalog::Catalog;
pub use runtime::{Engine, ExecError};
pub use scheduler::NodeState;
