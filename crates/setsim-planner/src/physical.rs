//! Physical program: ordered steps plus operator bindings.
//!
//! The exec runtime walks `steps` in order; every step's inputs appear before
//! it. Kernels and literal tables ride along outside the serialized form so the
//! program hash covers plan shape and parameters, not data.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use setsim_core::hash::{hash_serde, Hash256};
use setsim_core::id::OpId;
use setsim_core::prelude::{Schema, Table};
use setsim_operators::Operator;

/// Operator key (e.g. "jaccard", "sum") plus its JSON parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorBinding {
    pub key: String,
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StepKind {
    Scan { name: String },
    Literal { rows: usize },
    HStack,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalStep {
    pub id: OpId,
    pub kind: StepKind,
    pub inputs: Vec<OpId>,
    pub schema: Schema,
}

/// Lowered plan. `BTreeMap`s keep iteration deterministic for hashing.
#[derive(Clone, Serialize)]
pub struct PhysicalProgram {
    pub steps: Vec<PhysicalStep>,
    pub bindings: BTreeMap<OpId, OperatorBinding>,
    #[serde(skip)]
    pub(crate) kernels: BTreeMap<OpId, Arc<dyn Operator>>,
    #[serde(skip)]
    pub(crate) literals: BTreeMap<OpId, Arc<Table>>,
}

impl PhysicalProgram {
    /// The final step; lowering never produces an empty program.
    pub fn root(&self) -> &PhysicalStep {
        &self.steps[self.steps.len() - 1]
    }

    pub fn output_schema(&self) -> &Schema {
        &self.root().schema
    }

    pub fn kernel(&self, id: OpId) -> Option<&Arc<dyn Operator>> {
        self.kernels.get(&id)
    }

    pub fn literal(&self, id: OpId) -> Option<&Arc<Table>> {
        self.literals.get(&id)
    }

    /// Number of steps consuming each step's output.
    pub fn consumer_counts(&self) -> BTreeMap<OpId, usize> {
        let mut counts: BTreeMap<OpId, usize> = self.steps.iter().map(|s| (s.id, 0)).collect();
        for step in &self.steps {
            for input in &step.inputs {
                *counts.entry(*input).or_default() += 1;
            }
        }
        counts
    }

    pub fn plan_hash(&self) -> Result<Hash256, setsim_core::Error> {
        hash_serde(self)
    }
}

impl fmt::Debug for PhysicalProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicalProgram")
            .field("steps", &self.steps)
            .field("bindings", &self.bindings)
            .finish()
    }
}
