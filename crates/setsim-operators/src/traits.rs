//! Operator trait + common interfaces.
//!
//! The lowering step calls `plan(...)` to obtain an `OpPlan` (output schema,
//! footprint), then the executor invokes `eval_block(...)` once per run with
//! the already-materialized input tables.

pub use setsim_core::budget::MemoryBudget;
use setsim_core::prelude::{Schema, Table};
use setsim_mem::guard::BudgetGuardImpl;

use crate::kernels::chunk::Parallelism;
use crate::plan::{Footprint, OpPlan};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("planning error: {0}")]
    Plan(String),

    #[error("execution error: {0}")]
    Exec(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    #[error("shape mismatch: left has {left} rows, right has {right}")]
    ShapeMismatch { left: usize, right: usize },

    #[error("column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Budget(#[from] setsim_mem::Error),
}

impl From<setsim_core::Error> for OpError {
    fn from(e: setsim_core::Error) -> Self {
        use setsim_core::Error as E;
        match e {
            E::ShapeMismatch { left, right } => OpError::ShapeMismatch { left, right },
            E::ColumnType {
                column,
                expected,
                found,
            } => OpError::ColumnType {
                column,
                expected,
                found,
            },
            E::Schema(msg) => OpError::Schema(msg),
            other => OpError::Exec(other.to_string()),
        }
    }
}

/// What an operator gets to work with besides its inputs.
pub struct EvalContext<'a> {
    pub budget: &'a dyn MemoryBudget<Guard = BudgetGuardImpl>,
    pub parallelism: &'a Parallelism,
}

/// Trait that all operators must implement.
///
/// Invariants:
/// - Implementations MUST acquire a guard from the budget before allocating
///   output buffers proportional to the input.
/// - `eval_block` must be deterministic given the same inputs, regardless of
///   the worker count in `ctx.parallelism`.
pub trait Operator: Send + Sync + 'static {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Parameters for hashing and `explain` output.
    fn params(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Columns the operator reads from its input. Empty means "decided from
    /// the input schema" (e.g. sum over every numeric column).
    fn input_columns(&self) -> Vec<String> {
        Vec::new()
    }

    /// Quick/rough memory footprint model.
    fn memory_need(&self, rows: u64, bytes: u64) -> Footprint;

    /// Given input schemas, return the output schema and footprint.
    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError>;

    /// Evaluate the operator over materialized inputs.
    ///
    /// Unary operators read `inputs[0]`; binary ones get two inputs.
    fn eval_block(&self, inputs: &[Table], ctx: &EvalContext<'_>) -> Result<Table, OpError>;
}

/// Resolve `name` in `schema` or fail with `ColumnNotFound`.
pub(crate) fn require_field<'s>(
    schema: &'s Schema,
    name: &str,
) -> Result<&'s setsim_core::schema::Field, OpError> {
    schema
        .field_by_name(name)
        .ok_or_else(|| OpError::ColumnNotFound(name.to_string()))
}

/// Resolve `name` in `table` or fail with `ColumnNotFound`.
pub(crate) fn require_column<'t>(
    table: &'t Table,
    name: &str,
) -> Result<&'t setsim_core::types::Column, OpError> {
    table
        .column(name)
        .ok_or_else(|| OpError::ColumnNotFound(name.to_string()))
}

/// Fetch the single input of a unary operator.
pub(crate) fn single_input<'t>(inputs: &'t [Table], op: &str) -> Result<&'t Table, OpError> {
    match inputs {
        [one] => Ok(one),
        _ => Err(OpError::Exec(format!(
            "{op} expects one input, got {}",
            inputs.len()
        ))),
    }
}
