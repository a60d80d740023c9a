//! Domain error types.
//!
//! Three severities: configuration errors are fatal and rejected before any
//! simulation starts; insufficient-data and data-integrity errors are
//! per-ticker, reported and skipped without aborting the batch; adapter and
//! IO errors surface from the data layer.

/// Top-level error type for pullback.
#[derive(Debug, thiserror::Error)]
pub enum PullbackError {
    #[error("invalid configuration for {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("data integrity failure for {ticker}: {reason}")]
    DataIntegrity { ticker: String, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PullbackError {
    pub fn configuration(field: &str, reason: impl Into<String>) -> Self {
        PullbackError::Configuration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&PullbackError> for std::process::ExitCode {
    fn from(err: &PullbackError) -> Self {
        let code: u8 = match err {
            PullbackError::Io(_) => 1,
            PullbackError::Configuration { .. } => 2,
            PullbackError::Data { .. } => 3,
            PullbackError::InsufficientData { .. } | PullbackError::DataIntegrity { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
