//! Plan node wrapping a kernel operator.

use std::fmt;
use std::sync::Arc;

use setsim_operators::Operator;

/// Immutable plan node: which columns it reads and which kernel runs.
///
/// Output columns are resolved against the input schema at lowering time via
/// `Operator::plan`, so a node never caches a schema of its own.
#[derive(Clone)]
pub struct LazyOperatorNode {
    kernel: Arc<dyn Operator>,
}

impl LazyOperatorNode {
    pub fn new<O: Operator>(op: O) -> Self {
        Self {
            kernel: Arc::new(op),
        }
    }

    pub fn from_arc(kernel: Arc<dyn Operator>) -> Self {
        Self { kernel }
    }

    pub fn name(&self) -> &'static str {
        self.kernel.name()
    }

    pub fn input_names(&self) -> Vec<String> {
        self.kernel.input_columns()
    }

    pub fn params(&self) -> serde_json::Value {
        self.kernel.params()
    }

    pub fn kernel(&self) -> &Arc<dyn Operator> {
        &self.kernel
    }
}

impl fmt::Debug for LazyOperatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyOperatorNode")
            .field("name", &self.name())
            .field("params", &self.params())
            .finish()
    }
}
