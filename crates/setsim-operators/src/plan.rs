//! Operator planning surfaces: `Footprint` and `OpPlan`.

use setsim_core::prelude::Schema;
use serde::{Deserialize, Serialize};

/// Coarse memory model for a table flowing through an operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    /// Estimated output bytes per input row.
    pub bytes_per_row: u64,
    /// Estimated additional overhead (scratch hash sets, partials) per call.
    pub overhead_bytes: u64,
}

impl Footprint {
    /// Estimate total live bytes for `rows` at this operator.
    pub fn estimate_live(&self, rows: u64, _bytes: u64) -> u64 {
        self.overhead_bytes + self.bytes_per_row.saturating_mul(rows)
    }
}

/// Operator plan: output schema and a cached footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpPlan {
    pub output_schema: Schema,

    /// Footprint model cached to avoid recomputation.
    pub footprint: Footprint,
}

impl OpPlan {
    pub fn new(output_schema: Schema, footprint: Footprint) -> Self {
        Self {
            output_schema,
            footprint,
        }
    }
}
