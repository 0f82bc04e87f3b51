//! Runtime: lower a `LazyPlan`, execute its steps in order, and emit a
//! `RunManifest`.
//!
//! Behavior:
//! - Scans read from the engine's `Catalog` (shared buffers, no copy).
//! - Literal tables are round-tripped through serde_json first; the bytes are
//!   logged and recorded in the manifest.
//! - Kernel steps get the engine's memory budget and worker pool.
//! - Every step is evaluated exactly once; shared results are cached for all
//!   consumers (see `scheduler`).

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use setsim_core::config::EngineConfig;
use setsim_core::manifest::RunManifest;
use setsim_core::prelude::Table;

use setsim_mem::guard::MemoryBudgetImpl;

use setsim_operators::{EvalContext, OpError, Parallelism};

use setsim_planner::{lower_to_physical, LazyPlan, PhysicalStep, PlanError, StepKind};

use crate::catalog::Catalog;
use crate::literal;
use crate::metrics::emit_span;
use crate::scheduler::NodeTracker;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("config: {0}")]
    Config(String),
    #[error("planning failed: {0}")]
    Plan(#[from] PlanError),
    #[error("operator '{op}' failed: {source}")]
    Operator {
        op: &'static str,
        #[source]
        source: OpError,
    },
    #[error("invalid plan: {0}")]
    Invalid(String),
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("literal codec: {0}")]
    Codec(String),
}

/// Engine owns the memory budget, worker pool, and table catalog.
pub struct Engine {
    cfg: EngineConfig,
    budget: MemoryBudgetImpl,
    parallelism: Parallelism,
    catalog: Catalog,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Result<Self, ExecError> {
        cfg.validate().map_err(|e| ExecError::Config(e.to_string()))?;
        Ok(Self::build(cfg))
    }

    /// Engine configured from `SETSIM_*` environment variables.
    pub fn from_env() -> Result<Self, ExecError> {
        Self::new(EngineConfig::from_env())
    }

    fn build(cfg: EngineConfig) -> Self {
        Self {
            budget: MemoryBudgetImpl::new(cfg.mem_cap_bytes),
            parallelism: Parallelism::from_config(&cfg),
            catalog: Catalog::new(),
            cfg,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn budget(&self) -> &MemoryBudgetImpl {
        &self.budget
    }

    pub fn parallelism(&self) -> &Parallelism {
        &self.parallelism
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Make `table` available to `LazyPlan::scan(name)`.
    pub fn register_table(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        #[cfg(feature = "tracing")]
        tracing::debug!(table = %name, rows = table.num_rows(), "registered table");
        self.catalog.register(name, table);
    }

    pub fn deregister_table(&mut self, name: &str) -> bool {
        self.catalog.deregister(name).is_some()
    }

    /// Execute `plan` and return its output table.
    pub fn collect(&self, plan: &LazyPlan) -> Result<Table, ExecError> {
        self.collect_with_manifest(plan).map(|(table, _)| table)
    }

    /// Execute `plan`, returning the output and a manifest of the run.
    pub fn collect_with_manifest(
        &self,
        plan: &LazyPlan,
    ) -> Result<(Table, RunManifest), ExecError> {
        let started = now_millis();
        let program = lower_to_physical(plan, &self.catalog)?;
        let plan_hash = program
            .plan_hash()
            .map_err(|e| ExecError::Hash(e.to_string()))?;
        let mut manifest = RunManifest::new(plan_hash, started);

        let mut tracker = NodeTracker::new(&program);
        for step in &program.steps {
            tracker.schedule(step.id)?;
        }

        for step in &program.steps {
            let inputs = step
                .inputs
                .iter()
                .map(|id| tracker.read(*id).map(|t| (*t).clone()))
                .collect::<Result<Vec<Table>, _>>()?;

            let out = self.eval_step(&program, step, &inputs, &mut manifest)?;

            emit_span(
                "step",
                &[
                    ("id", step.id.to_string()),
                    ("kind", format!("{:?}", step.kind)),
                    ("rows", out.num_rows().to_string()),
                ],
            );
            #[cfg(feature = "tracing")]
            tracing::trace!(step = %step.id, inputs = step.inputs.len(), rows = out.num_rows(), "executed step");

            tracker.complete(step.id, out)?;
        }

        let output = tracker.take_output()?;
        manifest.nodes_evaluated = tracker.evaluated();
        let output = Table::clone(&output);
        let manifest = manifest.finish(now_millis(), output.num_rows());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            plan = %manifest.plan_hash,
            nodes = manifest.nodes_evaluated,
            literal_bytes = manifest.literal_bytes,
            rows = manifest.output_rows,
            "collect finished"
        );

        Ok((output, manifest))
    }

    fn eval_step(
        &self,
        program: &setsim_planner::PhysicalProgram,
        step: &PhysicalStep,
        inputs: &[Table],
        manifest: &mut RunManifest,
    ) -> Result<Table, ExecError> {
        match &step.kind {
            StepKind::Scan { name } => self
                .catalog
                .get(name)
                .map(|t| t.as_ref().clone())
                .ok_or_else(|| ExecError::Plan(PlanError::UnknownTable(name.clone()))),
            StepKind::Literal { .. } => {
                let table = program.literal(step.id).ok_or_else(|| {
                    ExecError::Invalid(format!("no literal table bound for {}", step.id))
                })?;
                let (decoded, bytes) = literal::round_trip(table)?;
                manifest.literal_bytes += bytes;
                if self.cfg.warn_on_literal_sources {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        step = %step.id,
                        bytes,
                        rows = decoded.num_rows(),
                        "literal table serialized into execution context; register it and use LazyPlan::scan to avoid the copy"
                    );
                }
                Ok(decoded)
            }
            StepKind::HStack => match inputs {
                [left, right] => Table::hstack(left, right).map_err(|e| ExecError::Operator {
                    op: "hstack",
                    source: e.into(),
                }),
                _ => Err(ExecError::Invalid(format!(
                    "hstack {} expects two inputs, got {}",
                    step.id,
                    inputs.len()
                ))),
            },
            StepKind::Operator => {
                let kernel = program.kernel(step.id).ok_or_else(|| {
                    ExecError::Invalid(format!("no operator bound for {}", step.id))
                })?;
                let ctx = EvalContext {
                    budget: &self.budget,
                    parallelism: &self.parallelism,
                };
                kernel
                    .eval_block(inputs, &ctx)
                    .map_err(|source| ExecError::Operator {
                        op: kernel.name(),
                        source,
                    })
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}

// --- helpers ---

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
