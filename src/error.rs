//! Error types for the weathercast crate

use thiserror::Error;

use crate::registry::BackendKind;

/// Custom error types for the weathercast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Input series violates the shape contract (ordering, duplicates, non-finite values)
    #[error("Malformed series: {0}")]
    MalformedSeries(String),

    /// Series is too short for the chosen backend
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// No trained artifact exists for the requested key
    #[error("No trained {kind} model for '{city}'")]
    ArtifactNotFound { kind: BackendKind, city: String },

    /// Artifact was produced by a different backend than the one invoking it
    #[error("Artifact incompatible: {0}")]
    ArtifactIncompatible(String),

    /// Underlying numeric fit failed for one backend/city pair
    #[error("Training {kind} for '{city}' failed: {message}")]
    TrainingFailure {
        kind: BackendKind,
        city: String,
        message: String,
    },

    /// Observation store has no rows for the requested city
    #[error("No observations for city '{0}'")]
    NoDataForCity(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error encoding or decoding a persisted artifact
    #[error("Artifact encoding error: {0}")]
    EncodingError(#[from] serde_json::Error),

    /// Error reading observation CSV files
    #[error("CSV error: {0}")]
    CsvError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}
