pub mod clock;
pub mod sampling;

pub use clock::{Clock, MonotonicClock};
pub use sampling::{
    ChannelId, RawSampleWords, ReadOutcome, SampleCallback, SamplingSource, SourceError, StreamId,
};

/// Binary hardware strap that classifies the installed battery pack.
///
/// The strap cannot change without removing the battery, so callers read it
/// once during bring-up.
pub trait StrapInput {
    fn read_line(&mut self) -> Result<bool, SourceError>;
}

impl<T: StrapInput + ?Sized> StrapInput for Box<T> {
    fn read_line(&mut self) -> Result<bool, SourceError> {
        (**self).read_line()
    }
}
