//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard memory cap (in bytes) for kernel output buffers.
    pub mem_cap_bytes: usize,

    /// Worker threads per kernel call. `0` means one per available core.
    pub max_parallel_tasks: usize,

    /// Row chunks per worker for the Jaccard kernel; more chunks balance
    /// ragged rows better at the cost of task overhead.
    pub chunks_per_worker: usize,

    /// Fixed chunk length for sum reductions. Partials are combined in chunk
    /// order, so this (not the worker count) decides float rounding.
    pub sum_chunk_rows: usize,

    /// Emit a warning when a lazy plan embeds a literal table that has to be
    /// serialized into the execution context.
    pub warn_on_literal_sources: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mem_cap_bytes: 512 * 1024 * 1024, // 512 MiB default
            max_parallel_tasks: 0,
            chunks_per_worker: 4,
            sum_chunk_rows: 4096,
            warn_on_literal_sources: true,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SETSIM_MEM_CAP_BYTES`: memory cap in bytes
    /// - `SETSIM_MAX_PARALLEL_TASKS`: worker threads (0 = all cores)
    /// - `SETSIM_CHUNKS_PER_WORKER`: Jaccard chunks per worker
    /// - `SETSIM_SUM_CHUNK_ROWS`: rows per sum chunk
    /// - `SETSIM_WARN_ON_LITERAL_SOURCES`: `true`/`false`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("SETSIM_MEM_CAP_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.mem_cap_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("SETSIM_MAX_PARALLEL_TASKS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_parallel_tasks = v;
            }
        }

        if let Ok(s) = std::env::var("SETSIM_CHUNKS_PER_WORKER") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.chunks_per_worker = v;
            }
        }

        if let Ok(s) = std::env::var("SETSIM_SUM_CHUNK_ROWS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.sum_chunk_rows = v;
            }
        }

        if let Ok(s) = std::env::var("SETSIM_WARN_ON_LITERAL_SOURCES") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.warn_on_literal_sources = v;
            }
        }

        cfg
    }

    /// Reject settings the kernels cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunks_per_worker == 0 {
            return Err(Error::Config("chunks_per_worker must be at least 1".into()));
        }
        if self.sum_chunk_rows == 0 {
            return Err(Error::Config("sum_chunk_rows must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_chunking_is_rejected() {
        let cfg = EngineConfig {
            sum_chunk_rows: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = EngineConfig {
            max_parallel_tasks: 3,
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
