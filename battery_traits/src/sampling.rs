//! Contract with the shared multiplexed sampling source.
//!
//! A source exposes named analog channels that can be read synchronously,
//! and a buffered stream that pushes raw sample words to a callback on the
//! source's own thread. Synchronous reads never wait for the stream: when the
//! bus is held they report [`ReadOutcome::Busy`].
use thiserror::Error;

/// One stream callback payload: `[current, voltage]`, reading in bits 0..=11.
pub type RawSampleWords = [u16; 2];

/// Callback bound to a registered stream. Runs on the source's thread.
pub type SampleCallback = Box<dyn FnMut(&RawSampleWords) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u32);

/// Result of a single synchronous channel read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Processed value straight from the converter.
    Fresh(i32),
    /// The bus is momentarily held by another consumer.
    Busy,
    /// The source asks to be retried later.
    RetryLater,
    /// The device is temporarily gone.
    Absent,
    /// Any other failure.
    Failed(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// A dependency is not ready yet; the whole operation may be retried.
    #[error("not ready, retry later: {0}")]
    RetryLater(String),
    #[error("{0}")]
    Hard(String),
}

impl SourceError {
    pub fn is_retry_later(&self) -> bool {
        matches!(self, SourceError::RetryLater(_))
    }
}

pub trait SamplingSource: Send + Sync {
    fn acquire_channel(&self, name: &str) -> Result<ChannelId, SourceError>;
    fn release_channel(&self, channel: ChannelId);

    /// Must return promptly; contention is reported, never waited out.
    fn read_fresh(&self, channel: ChannelId) -> ReadOutcome;

    fn register_stream(&self, callback: SampleCallback) -> Result<StreamId, SourceError>;
    fn start_stream(&self, stream: StreamId) -> Result<(), SourceError>;

    /// Idempotent. After it returns the callback is not invoked again. When
    /// called from inside the callback it must not wait for itself; the
    /// in-flight invocation is then the last one.
    fn stop_stream(&self, stream: StreamId);
    fn release_stream(&self, stream: StreamId);
}

impl<T: SamplingSource + ?Sized> SamplingSource for std::sync::Arc<T> {
    fn acquire_channel(&self, name: &str) -> Result<ChannelId, SourceError> {
        (**self).acquire_channel(name)
    }
    fn release_channel(&self, channel: ChannelId) {
        (**self).release_channel(channel)
    }
    fn read_fresh(&self, channel: ChannelId) -> ReadOutcome {
        (**self).read_fresh(channel)
    }
    fn register_stream(&self, callback: SampleCallback) -> Result<StreamId, SourceError> {
        (**self).register_stream(callback)
    }
    fn start_stream(&self, stream: StreamId) -> Result<(), SourceError> {
        (**self).start_stream(stream)
    }
    fn stop_stream(&self, stream: StreamId) {
        (**self).stop_stream(stream)
    }
    fn release_stream(&self, stream: StreamId) {
        (**self).release_stream(stream)
    }
}
