#![forbid(unsafe_code)]
//! setsim-operators: list-similarity and reduction kernels plus operators.
//!
//! Design intent:
//! - `kernels` are pure functions over borrowed column buffers; they know
//!   nothing about tables, plans, or budgets.
//! - Operators resolve columns, check types, acquire a budget guard for their
//!   output, and call a kernel. The same operator value backs the eager API
//!   and the lazy plan node, so both modes run identical code.

pub mod kernels;
pub mod plan;
pub mod traits;

pub mod filter;
pub mod jaccard;
pub mod project;
pub mod sum;

pub use filter::Filter;
pub use jaccard::{apply_jaccard, apply_jaccard_with, jaccard_output_name, JaccardOp};
pub use kernels::chunk::Parallelism;
pub use plan::{Footprint, OpPlan};
pub use project::Project;
pub use sum::{sum_table, sum_table_grouped, SumOp};
pub use traits::{EvalContext, OpError, Operator};
