//! Lazy plan trees.
//!
//! A `LazyPlan` is a cheap handle (`Arc`) to an immutable node. Builders never
//! evaluate anything; errors such as a missing column surface when the plan is
//! lowered, i.e. at `Engine::collect` (or `LazyPlan::schema`).

use std::fmt::Write as _;
use std::sync::Arc;

use setsim_core::prelude::{Schema, Table};
use setsim_operators::filter::Filter;
use setsim_operators::project::Project;
use setsim_operators::{JaccardOp, Operator, SumOp};

use crate::error::PlanError;
use crate::node::LazyOperatorNode;

/// Resolves table names used by `LazyPlan::scan`.
pub trait SchemaProvider {
    fn table_schema(&self, name: &str) -> Option<Schema>;
}

#[derive(Debug)]
pub enum PlanNode {
    /// Named table registered with the engine's catalog.
    Scan { name: String },
    /// Table embedded in the plan itself.
    Literal { table: Arc<Table> },
    /// Side-by-side concatenation of two plans with equal row counts.
    HStack { left: LazyPlan, right: LazyPlan },
    /// Unary kernel node.
    Operator {
        input: LazyPlan,
        node: LazyOperatorNode,
    },
}

#[derive(Debug, Clone)]
pub struct LazyPlan(Arc<PlanNode>);

impl LazyPlan {
    fn wrap(node: PlanNode) -> Self {
        Self(Arc::new(node))
    }

    /// Read a table registered under `name` at collect time.
    pub fn scan(name: impl Into<String>) -> Self {
        Self::wrap(PlanNode::Scan { name: name.into() })
    }

    /// Embed `table` in the plan. It is serialized into the execution
    /// context when the plan runs; prefer `scan` for large inputs.
    pub fn from_table(table: Table) -> Self {
        Self::wrap(PlanNode::Literal {
            table: Arc::new(table),
        })
    }

    /// Append a kernel node on top of this plan.
    pub fn with_operator<O: Operator>(&self, op: O) -> Self {
        self.with_node(LazyOperatorNode::new(op))
    }

    pub fn with_node(&self, node: LazyOperatorNode) -> Self {
        Self::wrap(PlanNode::Operator {
            input: self.clone(),
            node,
        })
    }

    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Self {
        self.with_operator(Project::new(columns))
    }

    /// Keep rows matching a "column op literal" predicate.
    pub fn filter(&self, expr: impl Into<String>) -> Self {
        self.with_operator(Filter::new(expr))
    }

    pub fn hstack(&self, right: &LazyPlan) -> Self {
        Self::wrap(PlanNode::HStack {
            left: self.clone(),
            right: right.clone(),
        })
    }

    pub fn node(&self) -> &PlanNode {
        &self.0
    }

    /// Identity of the shared node; equal for clones of the same plan.
    pub fn node_key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &LazyPlan) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Direct inputs of the root node.
    pub fn inputs(&self) -> Vec<&LazyPlan> {
        match self.node() {
            PlanNode::Scan { .. } | PlanNode::Literal { .. } => Vec::new(),
            PlanNode::HStack { left, right } => vec![left, right],
            PlanNode::Operator { input, .. } => vec![input],
        }
    }

    /// Output schema, resolving scans through `provider`.
    pub fn schema(&self, provider: &dyn SchemaProvider) -> Result<Schema, PlanError> {
        let program = crate::lower::lower_to_physical(self, provider)?;
        Ok(program.output_schema().clone())
    }

    /// Indented, one-node-per-line rendering of the tree.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        let _ = match self.node() {
            PlanNode::Scan { name } => writeln!(out, "{pad}SCAN {name}"),
            PlanNode::Literal { table } => writeln!(
                out,
                "{pad}LITERAL rows={} cols={}",
                table.num_rows(),
                table.num_columns()
            ),
            PlanNode::HStack { .. } => writeln!(out, "{pad}HSTACK"),
            PlanNode::Operator { node, .. } => {
                writeln!(out, "{pad}{} {}", node.name().to_uppercase(), node.params())
            }
        };
        for input in self.inputs() {
            input.explain_into(out, depth + 1);
        }
    }
}

/// Append `"{a}_{b}_jaccard"` to `plan` when it is collected.
pub fn lazy_apply_jaccard(plan: &LazyPlan, a: &str, b: &str) -> LazyPlan {
    plan.with_operator(JaccardOp::new(a, b))
}

/// One-row table of sums over every numeric column of `plan`.
pub fn lazy_sum(plan: &LazyPlan) -> LazyPlan {
    plan.with_operator(SumOp::all())
}

pub fn lazy_sum_columns<S: AsRef<str>>(plan: &LazyPlan, columns: &[S]) -> LazyPlan {
    plan.with_operator(SumOp::columns(columns))
}

/// Per-key sums, one row per distinct `key` in first-appearance order.
pub fn lazy_sum_by<S: AsRef<str>>(plan: &LazyPlan, key: &str, columns: &[S]) -> LazyPlan {
    plan.with_operator(SumOp::grouped(key, columns))
}
