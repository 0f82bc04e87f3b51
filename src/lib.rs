#![forbid(unsafe_code)]
//! setsim: row-wise Jaccard similarity and sum reductions over list columns,
//! usable eagerly on a `Table` or as nodes in a lazy plan.
//!
//! ```ignore
//! let mut engine = Engine::default();
//! engine.register_table("pairs", table);
//! let plan = lazy_apply_jaccard(&LazyPlan::scan("pairs"), "a", "b");
//! let out = engine.collect(&plan)?;
//! ```

pub use setsim_core::config::EngineConfig;
pub use setsim_core::manifest::RunManifest;
pub use setsim_core::prelude::{
    Column, ColumnData, DataType, Field, ListColumn, ListColumnView, PrimitiveColumn, Scalar,
    Schema, Table,
};

pub use setsim_operators::kernels::{jaccard, sum_column, sum_grouped, SimilarityResult};
pub use setsim_operators::{
    apply_jaccard, apply_jaccard_with, jaccard_output_name, sum_table, sum_table_grouped,
    OpError, Operator, Parallelism,
};

pub use setsim_planner::{
    lazy_apply_jaccard, lazy_sum, lazy_sum_by, lazy_sum_columns, LazyPlan, PlanError,
};

pub use setsim_exec::{Engine, ExecError};
