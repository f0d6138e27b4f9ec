use thiserror::Error;

/// Central error type for ledgergraph operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A record failed validation at the ingestion boundary.
    #[error("Invalid record #{index}: field `{field}` {reason}")]
    InvalidRecord {
        index: usize,
        field: &'static str,
        reason: String,
    },

    /// A mutation was attempted after the store was frozen.
    #[error("Store is frozen: `{operation}` is not allowed after freeze")]
    FrozenStore { operation: &'static str },

    /// A time-ordered read was attempted while the indices await sorting.
    #[error("Store is not indexed: `{operation}` requires a frozen store")]
    Unindexed { operation: &'static str },

    /// The null model was asked to permute a field the records do not carry.
    #[error("Shape mismatch on field `{field}`{}: {reason}", record_suffix(.record_index))]
    ShapeMismatch {
        field: String,
        record_index: Option<usize>,
        reason: String,
    },

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Invalid window: start {start} is after end {end}")]
    InvalidWindow { start: i64, end: i64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Computation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn record_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" (record #{i})"),
        None => String::new(),
    }
}

/// Convenience type alias for ledgergraph results.
pub type LedgerResult<T> = Result<T, LedgerError>;
