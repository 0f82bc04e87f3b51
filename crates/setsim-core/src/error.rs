use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("shape mismatch: left has {left} rows, right has {right}")]
    ShapeMismatch { left: usize, right: usize },

    #[error("column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Hashing error: {0}")]
    Hash(String),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    // Downstream crates name the error through the crate root.
    fn shape_error() -> crate::Result<()> {
        Err(crate::Error::ShapeMismatch { left: 2, right: 3 })
    }

    #[test]
    fn root_reexport_is_the_error_type() {
        let err: crate::Error = shape_error().unwrap_err();
        assert!(matches!(err, super::Error::ShapeMismatch { left: 2, right: 3 }));
        assert_eq!(
            err.to_string(),
            "shape mismatch: left has 2 rows, right has 3"
        );
    }
}
