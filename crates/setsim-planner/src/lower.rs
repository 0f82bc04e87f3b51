//! Lowering: `LazyPlan` → `PhysicalProgram`.

use std::collections::{BTreeMap, HashMap};

use setsim_core::id::OpId;
use setsim_core::prelude::{Schema, Table};

use crate::error::PlanError;
use crate::lazy::{LazyPlan, PlanNode, SchemaProvider};
use crate::physical::{OperatorBinding, PhysicalProgram, PhysicalStep, StepKind};

struct Lowering<'a> {
    provider: &'a dyn SchemaProvider,
    seen: HashMap<usize, OpId>,
    program: PhysicalProgram,
}

impl Lowering<'_> {
    fn push(&mut self, kind: StepKind, inputs: Vec<OpId>, schema: Schema) -> OpId {
        let id = OpId::new(self.program.steps.len() as u64);
        self.program.steps.push(PhysicalStep {
            id,
            kind,
            inputs,
            schema,
        });
        id
    }

    fn schema_of(&self, id: OpId) -> &Schema {
        &self.program.steps[id.get() as usize].schema
    }

    fn visit(&mut self, plan: &LazyPlan) -> Result<OpId, PlanError> {
        if let Some(id) = self.seen.get(&plan.node_key()) {
            return Ok(*id);
        }

        let id = match plan.node() {
            PlanNode::Scan { name } => {
                let schema = self
                    .provider
                    .table_schema(name)
                    .ok_or_else(|| PlanError::UnknownTable(name.clone()))?;
                self.push(StepKind::Scan { name: name.clone() }, Vec::new(), schema)
            }
            PlanNode::Literal { table } => {
                let id = self.push(
                    StepKind::Literal {
                        rows: table.num_rows(),
                    },
                    Vec::new(),
                    table.schema(),
                );
                self.program.literals.insert(id, table.clone());
                id
            }
            PlanNode::HStack { left, right } => {
                let l = self.visit(left)?;
                let r = self.visit(right)?;
                // Resolve clashing names the same way `Table::hstack` does.
                let probe = Table::hstack(
                    &empty_like(self.schema_of(l)),
                    &empty_like(self.schema_of(r)),
                )?;
                let schema = Schema::new(
                    self.schema_of(l)
                        .fields
                        .iter()
                        .chain(self.schema_of(r).fields.iter())
                        .zip(probe.schema().fields)
                        .map(|(orig, named)| {
                            let mut f = orig.clone();
                            f.name = named.name;
                            f
                        })
                        .collect(),
                );
                self.push(StepKind::HStack, vec![l, r], schema)
            }
            PlanNode::Operator { input, node } => {
                let input_id = self.visit(input)?;
                let plan = node
                    .kernel()
                    .plan(std::slice::from_ref(self.schema_of(input_id)))
                    .map_err(|source| PlanError::Operator {
                        op: node.name(),
                        source,
                    })?;
                let id = self.push(StepKind::Operator, vec![input_id], plan.output_schema);
                self.program.bindings.insert(
                    id,
                    OperatorBinding {
                        key: node.name().to_string(),
                        config: node.params(),
                    },
                );
                self.program.kernels.insert(id, node.kernel().clone());
                id
            }
        };

        self.seen.insert(plan.node_key(), id);
        Ok(id)
    }
}

/// Zero-row table with `schema`'s column names, for name resolution.
fn empty_like(schema: &Schema) -> Table {
    use setsim_core::prelude::Column;
    let columns = schema
        .fields
        .iter()
        .map(|f| Column::int64(f.name.clone(), Vec::new()))
        .collect();
    Table::new(columns).unwrap_or_default()
}

/// Lower `plan` to an ordered program. Steps are post-order, so every input
/// precedes its consumers; a subtree reached through several `Arc` clones
/// becomes one step.
pub fn lower_to_physical(
    plan: &LazyPlan,
    provider: &dyn SchemaProvider,
) -> Result<PhysicalProgram, PlanError> {
    let mut lowering = Lowering {
        provider,
        seen: HashMap::new(),
        program: PhysicalProgram {
            steps: Vec::new(),
            bindings: BTreeMap::new(),
            kernels: BTreeMap::new(),
            literals: BTreeMap::new(),
        },
    };
    lowering.visit(plan)?;
    Ok(lowering.program)
}
