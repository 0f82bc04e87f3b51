use setsim_operators::OpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("operator '{op}' rejected its input: {source}")]
    Operator {
        op: &'static str,
        #[source]
        source: OpError,
    },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("hash error: {0}")]
    Hash(String),
}

impl From<setsim_core::Error> for PlanError {
    fn from(e: setsim_core::Error) -> Self {
        match e {
            setsim_core::Error::Hash(msg) => PlanError::Hash(msg),
            other => PlanError::Schema(other.to_string()),
        }
    }
}
