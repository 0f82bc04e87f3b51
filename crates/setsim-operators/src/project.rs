//! Projection: keep a subset of columns, in the requested order.

use serde::{Deserialize, Serialize};
use setsim_core::prelude::{Schema, Table};

use crate::plan::{Footprint, OpPlan};
use crate::traits::{require_field, single_input, EvalContext, OpError, Operator};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub columns: Vec<String>,
}

impl Project {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }
}

impl Operator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn input_columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn memory_need(&self, _rows: u64, _bytes: u64) -> Footprint {
        // Buffers are shared with the input.
        Footprint::default()
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schemas
            .first()
            .ok_or_else(|| OpError::Plan("project expects one input".into()))?;
        let fields = self
            .columns
            .iter()
            .map(|c| require_field(schema, c).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OpPlan::new(Schema::new(fields), self.memory_need(0, 0)))
    }

    fn eval_block(&self, inputs: &[Table], _ctx: &EvalContext<'_>) -> Result<Table, OpError> {
        let input = single_input(inputs, self.name())?;
        if let Some(missing) = self.columns.iter().find(|c| input.column(c).is_none()) {
            return Err(OpError::ColumnNotFound(missing.clone()));
        }
        Ok(input.select(&self.columns)?)
    }
}
