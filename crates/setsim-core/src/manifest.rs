//! Run manifest for audit.
//!
//! The engine emits a manifest after each successful `collect`: which program
//! ran, how many nodes it evaluated, and how much literal data had to be
//! serialized into the execution context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Stable hash of the lowered program (steps + operator bindings).
    pub plan_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Nodes evaluated during this run (each exactly once).
    pub nodes_evaluated: usize,

    /// Bytes serialized to move literal tables into the execution context.
    pub literal_bytes: usize,

    /// Rows in the collected output.
    pub output_rows: usize,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(plan_hash: Hash256, started_ms: u64) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            plan_hash,
            engine_version: crate::VERSION.to_string(),
            nodes_evaluated: 0,
            literal_bytes: 0,
            output_rows: 0,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, output_rows: usize) -> Self {
        self.finished_ms = finished_ms;
        self.output_rows = output_rows;
        self
    }
}
