use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputrankError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by a [`MetricsStore`](crate::contracts::MetricsStore).
///
/// The HTTP layer reports every variant as a store-unavailable error (500)
/// carrying the `Display` text.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("RocksDB error: {0}")]
    RocksDb(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Request validation failures for `POST /metrics`.
///
/// Each variant carries a distinct client-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Request body is required")]
    MissingBody,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid field types: {}", .0.join(", "))]
    InvalidTypes(Vec<&'static str>),

    #[error("Metric values must be positive numbers")]
    NegativeValue(&'static str),

    #[error("Invalid email format")]
    InvalidEmail,
}
