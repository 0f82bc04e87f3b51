//! Moving literal tables into the execution context.
//!
//! A table embedded in a plan by value is serialized and decoded again before
//! it enters the executor, the same path a plan shipped to another process
//! would take. Catalog scans skip this.

use setsim_core::prelude::Table;

use crate::runtime::ExecError;

/// Round-trip `table` through JSON. Returns the decoded table and the number
/// of bytes serialized.
pub fn round_trip(table: &Table) -> Result<(Table, usize), ExecError> {
    let bytes = serde_json::to_vec(table).map_err(|e| ExecError::Codec(e.to_string()))?;
    let decoded: Table =
        serde_json::from_slice(&bytes).map_err(|e| ExecError::Codec(e.to_string()))?;
    Ok((decoded, bytes.len()))
}
