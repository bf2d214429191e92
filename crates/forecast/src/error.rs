//! Forecast error types.

use thiserror::Error;

use store::StoreError;

/// Errors that can occur in the forecasting pipeline.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Not enough monthly history to build a usable dataset.
    #[error(
        "insufficient sales history: {available} monthly buckets, need at least {required}; \
         repopulate the ledger and retry"
    )]
    InsufficientHistory { available: usize, required: usize },

    /// No trained model artifact is available.
    #[error("no trained model available")]
    ModelUnavailable,

    /// The regression could not be solved for this dataset.
    #[error("model training failed: {0}")]
    DegenerateModel(String),

    /// The persisted artifact names a feature this pipeline doesn't know.
    #[error("unknown feature column in model artifact: {0}")]
    UnknownFeature(String),

    /// An artifact file operation failed.
    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The ledger read failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;
