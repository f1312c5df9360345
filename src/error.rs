//! Error taxonomy. Wiring bugs (bad vector length, bad scaler params) fail fast;
//! collaborator failures are surfaced as values so callers can log and degrade.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("expected {expected}-length feature vector, received {actual}")]
    InvalidVectorLength { expected: usize, actual: usize },

    #[error("invalid scaler parameters: {0}")]
    InvalidScaler(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("payload encryption failed: {0}")]
    Crypto(String),

    #[error("baseline serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no model loaded")]
    Unavailable,

    #[error("onnx runtime: {0}")]
    Runtime(String),

    #[error("model returned no usable output")]
    InvalidOutput,

    #[error("inference exceeded {0} ms")]
    Timeout(u64),
}

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor permission denied: {0}")]
    PermissionDenied(String),

    #[error("sensor unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T, E = GuardError> = std::result::Result<T, E>;
