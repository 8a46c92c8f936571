use reqwest::StatusCode;
use thiserror::Error;

/// Why a single city produced no [`WeatherRecord`](crate::WeatherRecord).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid city entry: {0}")]
    InvalidCity(String),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode forecast response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response contained no hourly data")]
    NoHourlyData,

    #[error("no hourly sample matching {target}")]
    MissingTargetHour { target: String },
}

impl FetchError {
    /// Skipped without any user-visible log line.
    pub fn is_silent(&self) -> bool {
        matches!(self, FetchError::NoHourlyData)
    }

    /// Reported as a warning rather than an error.
    pub fn is_warning(&self) -> bool {
        matches!(self, FetchError::MissingTargetHour { .. })
    }
}

/// The configured city list has none of the accepted shapes.
#[derive(Debug, Error)]
#[error("cities config is not valid: {found}")]
pub struct ConfigShapeError {
    pub found: String,
}
