//! Error types for Bakehouse

use thiserror::Error;

/// Core error type for Bakehouse operations
///
/// The first three variants are the data-access taxonomy: drivers classify
/// their native failures into them and the gateway passes them through as-is.
#[derive(Error, Debug)]
pub enum BakehouseError {
    /// Backing store unreachable or credentials rejected
    #[error("Connection error: {0}")]
    Connection(String),

    /// Unknown procedure, parameter mismatch, or an error raised by the routine
    #[error("Procedure error: {0}")]
    Procedure(String),

    /// A column value could not be coerced into the target field type
    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-supplied data rejected before any procedure was invoked
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

impl BakehouseError {
    /// Whether this error belongs to the data-access taxonomy
    pub fn is_data_access(&self) -> bool {
        matches!(
            self,
            BakehouseError::Connection(_) | BakehouseError::Procedure(_) | BakehouseError::Mapping(_)
        )
    }
}

/// Result type alias for Bakehouse operations
pub type Result<T> = std::result::Result<T, BakehouseError>;
