#![forbid(unsafe_code)]
//! setsim-planner: lazy plan trees → physical program + operator bindings.
//!
//! Design:
//! - A `LazyPlan` is an immutable, `Arc`-shared tree. Builders (`select`,
//!   `lazy_apply_jaccard`, `lazy_sum`, ...) return new plans that share their
//!   inputs, so building never touches data.
//! - Kernel nodes wrap an `Operator` trait object (`node::LazyOperatorNode`);
//!   the same operator value backs the eager API.
//! - `lower` walks the tree once, assigning post-order `OpId`s, resolving
//!   schemas, and collapsing subtrees shared by `Arc` into a single step.
//!
//! Nothing here evaluates; `setsim-exec` runs the lowered program.

pub mod error;
pub mod lazy;
pub mod lower;
pub mod node;
pub mod physical;

pub use error::PlanError;
pub use lazy::{
    lazy_apply_jaccard, lazy_sum, lazy_sum_by, lazy_sum_columns, LazyPlan, PlanNode,
    SchemaProvider,
};
pub use lower::lower_to_physical;
pub use node::LazyOperatorNode;
pub use physical::{OperatorBinding, PhysicalProgram, PhysicalStep, StepKind};
