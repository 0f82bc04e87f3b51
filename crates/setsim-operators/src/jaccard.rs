//! Jaccard operator: appends a similarity column computed from two list
//! columns of the same table.

use serde::{Deserialize, Serialize};
use setsim_core::prelude::{DataType, Field, Schema, Table};
use setsim_mem::guard::{acquire, MemoryBudgetImpl};

use crate::kernels::chunk::Parallelism;
use crate::kernels::jaccard::{jaccard, BYTES_PER_ROW};
use crate::plan::{Footprint, OpPlan};
use crate::traits::{require_column, require_field, single_input, EvalContext, OpError, Operator};

/// Name of the output column for `jaccard(a, b)`.
pub fn jaccard_output_name(a: &str, b: &str) -> String {
    format!("{a}_{b}_jaccard")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JaccardOp {
    pub left: String,
    pub right: String,
    pub output: String,
}

impl JaccardOp {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        let left = left.into();
        let right = right.into();
        let output = jaccard_output_name(&left, &right);
        Self {
            left,
            right,
            output,
        }
    }

    fn check_list(&self, field: &Field) -> Result<(), OpError> {
        if field.data_type == DataType::list_i64() {
            Ok(())
        } else {
            Err(OpError::ColumnType {
                column: field.name.clone(),
                expected: DataType::list_i64().to_string(),
                found: field.data_type.to_string(),
            })
        }
    }
}

impl Operator for JaccardOp {
    fn name(&self) -> &'static str {
        "jaccard"
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn input_columns(&self) -> Vec<String> {
        vec![self.left.clone(), self.right.clone()]
    }

    fn memory_need(&self, _rows: u64, _bytes: u64) -> Footprint {
        // Scratch sets are per chunk.
        Footprint {
            bytes_per_row: BYTES_PER_ROW as u64,
            overhead_bytes: 4096,
        }
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schemas
            .first()
            .ok_or_else(|| OpError::Plan("jaccard expects one input".into()))?;
        let left = require_field(schema, &self.left)?;
        let right = require_field(schema, &self.right)?;
        self.check_list(left)?;
        self.check_list(right)?;

        let nullable = left.nullable || right.nullable;
        // Same placement as `Table::with_column`: replace in place, else append.
        let out = Field::new(self.output.clone(), DataType::Float64, nullable);
        let mut fields = schema.fields.clone();
        match schema.index_of(&self.output) {
            Some(idx) => fields[idx] = out,
            None => fields.push(out),
        }
        Ok(OpPlan::new(Schema::new(fields), self.memory_need(0, 0)))
    }

    fn eval_block(&self, inputs: &[Table], ctx: &EvalContext<'_>) -> Result<Table, OpError> {
        let input = single_input(inputs, self.name())?;
        let a = require_column(input, &self.left)?;
        let b = require_column(input, &self.right)?;
        self.check_list(&a.field())?;
        self.check_list(&b.field())?;
        let (Some(a), Some(b)) = (a.data.as_list(), b.data.as_list()) else {
            return Err(OpError::Exec("list column without list data".into()));
        };

        let _guard = acquire(ctx.budget, input.num_rows() * BYTES_PER_ROW, "jaccard_out")?;
        let scores = jaccard(&a.view(), &b.view(), ctx.parallelism)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            left = %self.left,
            right = %self.right,
            rows = scores.len(),
            workers = ctx.parallelism.workers(),
            "jaccard evaluated"
        );

        let column = scores.into_column(self.output.clone())?;
        Ok(input.with_column(column)?)
    }
}

/// Eagerly append `"{a}_{b}_jaccard"` to `table` using the global pool.
pub fn apply_jaccard(table: &Table, a: &str, b: &str) -> Result<Table, OpError> {
    apply_jaccard_with(table, a, b, &Parallelism::default())
}

/// Like [`apply_jaccard`] with an explicit worker configuration.
pub fn apply_jaccard_with(
    table: &Table,
    a: &str,
    b: &str,
    parallelism: &Parallelism,
) -> Result<Table, OpError> {
    let budget = MemoryBudgetImpl::unbounded();
    let ctx = EvalContext {
        budget: &budget,
        parallelism,
    };
    JaccardOp::new(a, b).eval_block(std::slice::from_ref(table), &ctx)
}
