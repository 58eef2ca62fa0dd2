use battery_traits::SourceError;
use thiserror::Error;

/// Outcome of a failed property query or write.
///
/// Contention on the sampling bus never shows up here; it is absorbed by the
/// cache fallback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("sampling source not ready, retry later")]
    RetryLater,
    #[error("sampling device absent")]
    DeviceAbsent,
    #[error("no data available")]
    NoData,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TelemetryError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        TelemetryError::InvalidRequest(msg.into())
    }
}

/// Failure during device bring-up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InitError {
    /// A dependency is not ready; the owner may retry the whole bring-up.
    #[error("deferred: {0}")]
    RetryLater(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl InitError {
    pub fn is_retry_later(&self) -> bool {
        matches!(self, InitError::RetryLater(_))
    }

    /// Attach what was being acquired to a source error.
    pub fn from_source(what: &str, err: SourceError) -> Self {
        match err {
            SourceError::RetryLater(msg) => InitError::RetryLater(format!("{what}: {msg}")),
            SourceError::Hard(msg) => InitError::Fatal(format!("{what}: {msg}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
