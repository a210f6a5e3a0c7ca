//! Store errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Failure to encode, decode or reach persisted execution state
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("JSON encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("bincode encoding failed: {0}")]
    BinarySerialization(#[from] bincode::Error),

    /// Execution id that cannot be mapped to a storage key
    #[error("Invalid execution id: {0}")]
    Invalid(String),

    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
