//! Per-execution node bookkeeping.
//!
//! Every step of a lowered program moves Registered → Scheduled → Evaluated,
//! once. Results are cached until their last consumer has taken them.

use std::collections::BTreeMap;
use std::sync::Arc;

use setsim_core::id::OpId;
use setsim_core::prelude::Table;
use setsim_planner::PhysicalProgram;

use crate::runtime::ExecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Registered,
    Scheduled,
    Evaluated,
}

struct Slot {
    state: NodeState,
    result: Option<Arc<Table>>,
    /// Consumers that have not read the result yet.
    pending_reads: usize,
}

pub struct NodeTracker {
    slots: BTreeMap<OpId, Slot>,
    root: OpId,
    evaluated: usize,
}

impl NodeTracker {
    /// Register every step of `program`.
    pub fn new(program: &PhysicalProgram) -> Self {
        let root = program.root().id;
        let slots = program
            .consumer_counts()
            .into_iter()
            .map(|(id, consumers)| {
                // The root is read once more by the caller.
                let pending_reads = consumers + usize::from(id == root);
                (
                    id,
                    Slot {
                        state: NodeState::Registered,
                        result: None,
                        pending_reads,
                    },
                )
            })
            .collect();
        Self {
            slots,
            root,
            evaluated: 0,
        }
    }

    fn slot_mut(&mut self, id: OpId) -> Result<&mut Slot, ExecError> {
        self.slots
            .get_mut(&id)
            .ok_or_else(|| ExecError::Invalid(format!("{id} is not part of this program")))
    }

    pub fn state(&self, id: OpId) -> Option<NodeState> {
        self.slots.get(&id).map(|s| s.state)
    }

    pub fn schedule(&mut self, id: OpId) -> Result<(), ExecError> {
        let slot = self.slot_mut(id)?;
        match slot.state {
            NodeState::Registered => {
                slot.state = NodeState::Scheduled;
                Ok(())
            }
            other => Err(ExecError::Invalid(format!(
                "{id} cannot be scheduled from state {other:?}"
            ))),
        }
    }

    /// Record the result of evaluating `id`. Fails unless `id` is Scheduled.
    pub fn complete(&mut self, id: OpId, table: Table) -> Result<(), ExecError> {
        let slot = self.slot_mut(id)?;
        match slot.state {
            NodeState::Scheduled => {
                slot.state = NodeState::Evaluated;
                if slot.pending_reads > 0 {
                    slot.result = Some(Arc::new(table));
                }
                self.evaluated += 1;
                Ok(())
            }
            NodeState::Evaluated => Err(ExecError::Invalid(format!("{id} evaluated twice"))),
            NodeState::Registered => Err(ExecError::Invalid(format!(
                "{id} evaluated before it was scheduled"
            ))),
        }
    }

    /// Read the cached result of `id`, dropping the cache after the last read.
    pub fn read(&mut self, id: OpId) -> Result<Arc<Table>, ExecError> {
        let slot = self.slot_mut(id)?;
        if slot.state != NodeState::Evaluated {
            return Err(ExecError::Invalid(format!("{id} read before evaluation")));
        }
        let table = slot
            .result
            .clone()
            .ok_or_else(|| ExecError::Invalid(format!("{id} result already consumed")))?;
        slot.pending_reads = slot.pending_reads.saturating_sub(1);
        if slot.pending_reads == 0 {
            slot.result = None;
        }
        Ok(table)
    }

    pub fn take_output(&mut self) -> Result<Arc<Table>, ExecError> {
        self.read(self.root)
    }

    pub fn evaluated(&self) -> usize {
        self.evaluated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setsim_core::prelude::{Column, Schema};
    use setsim_planner::{lower_to_physical, LazyPlan, SchemaProvider};

    struct NoTables;

    impl SchemaProvider for NoTables {
        fn table_schema(&self, _name: &str) -> Option<Schema> {
            None
        }
    }

    fn program() -> PhysicalProgram {
        let t = Table::new(vec![Column::int64("x", vec![1, 2])]).unwrap();
        let base = LazyPlan::from_table(t);
        lower_to_physical(&base.hstack(&base), &NoTables).unwrap()
    }

    fn one_row() -> Table {
        Table::new(vec![Column::int64("x", vec![1])]).unwrap()
    }

    #[test]
    fn evaluate_requires_schedule() {
        let mut tracker = NodeTracker::new(&program());
        let id = OpId::new(0);
        assert!(matches!(
            tracker.complete(id, one_row()),
            Err(ExecError::Invalid(_))
        ));
        tracker.schedule(id).unwrap();
        tracker.complete(id, one_row()).unwrap();
        assert_eq!(tracker.state(id), Some(NodeState::Evaluated));
        assert!(matches!(
            tracker.complete(id, one_row()),
            Err(ExecError::Invalid(_))
        ));
    }

    #[test]
    fn shared_result_survives_until_last_read() {
        let mut tracker = NodeTracker::new(&program());
        let id = OpId::new(0);
        tracker.schedule(id).unwrap();
        tracker.complete(id, one_row()).unwrap();
        // hstack(base, base) reads the same step twice.
        tracker.read(id).unwrap();
        tracker.read(id).unwrap();
        assert!(tracker.read(id).is_err());
        assert_eq!(tracker.evaluated(), 1);
    }
}
