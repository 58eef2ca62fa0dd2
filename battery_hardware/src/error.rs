use battery_traits::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
    #[error("channel '{0}' already acquired")]
    ChannelInUse(String),
    #[error("unknown stream {0}")]
    UnknownStream(u32),
    #[error("stream {0} already running")]
    StreamRunning(u32),
    #[error("spawn sampling thread: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;

impl From<HwError> for SourceError {
    fn from(e: HwError) -> Self {
        SourceError::Hard(e.to_string())
    }
}
