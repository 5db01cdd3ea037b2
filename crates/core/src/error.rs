//! Error types for the quantline system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the quantline system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A caller-supplied date matched none of the accepted formats.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A source row that could not be normalized.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The acquisition layer has no data for an instrument.
    #[error("Instrument unavailable: {0}")]
    Unavailable(String),

    /// No feature variant is registered under the given key.
    #[error("Unknown feature type: {0}")]
    UnknownFeature(String),

    /// A feature asked for data that was never materialized.
    #[error("Missing feature data: {0}")]
    MissingFeatureData(String),

    /// The grouped updates were released after matrix construction.
    #[error("Grouped instrument updates are not available: {0}")]
    UpdatesReleased(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an invalid date error.
    pub fn invalid_date(msg: impl Into<String>) -> Self {
        Error::InvalidDate(msg.into())
    }

    /// Create a malformed record error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedRecord(msg.into())
    }

    /// Create an unavailable instrument error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Error::Unavailable(msg.into())
    }

    /// Create an unknown feature error.
    pub fn unknown_feature(msg: impl Into<String>) -> Self {
        Error::UnknownFeature(msg.into())
    }

    /// Create a missing feature data error.
    pub fn missing_feature_data(msg: impl Into<String>) -> Self {
        Error::MissingFeatureData(msg.into())
    }

    /// Create an updates released error.
    pub fn updates_released(msg: impl Into<String>) -> Self {
        Error::UpdatesReleased(msg.into())
    }

    /// Whether this error only affects a single instrument.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable(_))
    }
}
