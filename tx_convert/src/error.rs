use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TxError {
    #[error("No input: {0}")]
    NoInput(String),

    #[error("No valid texture files found in {0}")]
    NoMatchingTextures(String),

    #[error("No textures matched recognized color spaces for processing ({skipped} skipped)")]
    NoRecognizedColorSpaces { skipped: usize },

    #[error("Conflicting backends selected: {0}")]
    ConflictingBackends(String),

    #[error("A batch run is already in progress")]
    BatchInFlight,

    #[error("Batch concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    #[error("Failed to access settings file {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file {path} is not valid: {source}")]
    SettingsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot start the conversion worker pool: {0}")]
    ThreadPool(String),
}

impl TxError {
    /// Precondition failures are raised before any batch starts and are the
    /// only errors fatal to a run; everything else is reported per texture.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TxError::NoInput(_)
                | TxError::NoMatchingTextures(_)
                | TxError::NoRecognizedColorSpaces { .. }
                | TxError::ConflictingBackends(_)
                | TxError::BatchInFlight
                | TxError::InvalidConcurrency(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TxError>;
