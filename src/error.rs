//! Error types for the Kohonen map engine.

use thiserror::Error;

/// The main error type for SOM operations.
#[derive(Error, Debug)]
pub enum KohonenError {
    /// A strategy name that no registry knows.
    #[error("Unknown {kind} '{name}'")]
    UnknownIdentifier {
        /// Strategy family (e.g. "decay", "metric").
        kind: &'static str,
        /// The identifier that failed to resolve.
        name: String,
    },

    /// A strategy was given the wrong number of positional arguments.
    #[error("Wrong number of arguments for '{name}': expected {expected}, got {found}")]
    ArgumentCount {
        /// Strategy identifier.
        name: String,
        /// Accepted argument counts, e.g. "2" or "0 or 2".
        expected: String,
        /// Number of arguments actually given.
        found: usize,
    },

    /// A positional argument could not be parsed or is out of range.
    #[error("Invalid argument for '{name}': {message}")]
    InvalidArgument {
        /// Strategy identifier.
        name: String,
        /// What went wrong.
        message: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A flat data array does not fit the declared column count.
    #[error("Shape error: {len} values do not fit {columns} columns")]
    Shape {
        /// Number of values in the array.
        len: usize,
        /// Declared number of columns.
        columns: usize,
    },

    /// A table's columns differ from its layer's columns.
    #[error("Column mismatch for layer '{layer}': expected {expected:?}, got {found:?}")]
    ColumnMismatch {
        /// Layer name.
        layer: String,
        /// The layer's columns.
        expected: Vec<String>,
        /// The table's columns.
        found: Vec<String>,
    },

    /// A sample's input vector does not have its layer's column count.
    #[error("Dimension mismatch for layer {layer}: expected {expected} values, got {found}")]
    DimensionMismatch {
        /// Layer position.
        layer: usize,
        /// The layer's column count.
        expected: usize,
        /// Length of the input vector.
        found: usize,
    },

    /// Tables that must be row-aligned have different row counts.
    #[error("Row count mismatch: expected {expected} rows, got {found}")]
    RowMismatch {
        /// Row count of the first table.
        expected: usize,
        /// Row count of the offending table.
        found: usize,
    },

    /// A map without layers was requested.
    #[error("A SOM needs at least one layer")]
    NoLayers,

    /// No layer was given a data table.
    #[error("At least one layer needs a data table")]
    NoTables,

    /// Layer lookup by name failed.
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// Index out of bounds.
    #[error("Index out of bounds: {index} >= {max}")]
    IndexOutOfBounds {
        /// The index that was out of bounds.
        index: usize,
        /// The maximum allowed index.
        max: usize,
    },

    /// Training error.
    #[error("Training error: {0}")]
    Training(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid model file.
    #[error("Invalid model format: {0}")]
    InvalidModelFormat(String),
}

/// Result type alias for SOM operations.
pub type Result<T> = std::result::Result<T, KohonenError>;

impl From<bincode::Error> for KohonenError {
    fn from(err: bincode::Error) -> Self {
        KohonenError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for KohonenError {
    fn from(err: serde_json::Error) -> Self {
        KohonenError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = KohonenError::UnknownIdentifier {
            kind: "decay",
            name: "cosine".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown decay 'cosine'");

        let err = KohonenError::ArgumentCount {
            name: "linear".to_string(),
            expected: "2".to_string(),
            found: 1,
        };
        assert!(err.to_string().contains("linear"));
        assert!(err.to_string().contains("got 1"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: KohonenError = io.into();
        assert!(matches!(err, KohonenError::Io(_)));
    }
}
