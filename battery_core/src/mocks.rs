//! Scripted collaborators for tests and benches.
//!
//! `ScriptedSource` answers fresh reads from per-channel queues (falling back
//! to a per-channel default), records every lifecycle call into a shared
//! [`EventLog`], and only invokes the stream callback when told to via
//! [`ScriptedSource::emit`].
use crate::error::InitError;
use crate::registry::{LocalRegistry, PowerSupply, RegistrationId, SupplyRegistry};
use battery_traits::{
    ChannelId, RawSampleWords, ReadOutcome, SampleCallback, SamplingSource, SourceError,
    StrapInput, StreamId,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    AcquireChannel(String),
    ReleaseChannel(String),
    RegisterStream,
    StartStream,
    StopStream,
    ReleaseStream,
    RegisterSupply(String),
    UnregisterSupply,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn push(&self, e: Event) {
        if let Ok(mut v) = self.0.lock() {
            v.push(e);
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[derive(Default)]
struct Inner {
    channels: Vec<String>,
    queued: HashMap<String, VecDeque<ReadOutcome>>,
    defaults: HashMap<String, ReadOutcome>,
    acquire_failures: HashMap<String, SourceError>,
    register_failure: Option<SourceError>,
    start_failure: Option<SourceError>,
    callback: Option<SampleCallback>,
    running: bool,
    reads: usize,
}

#[derive(Default)]
pub struct ScriptedSource {
    inner: Mutex<Inner>,
    log: EventLog,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: EventLog) -> Self {
        Self {
            inner: Mutex::default(),
            log,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Outcome returned for `channel` whenever its queue is empty.
    pub fn set_default(&self, channel: &str, outcome: ReadOutcome) -> &Self {
        self.lock().defaults.insert(channel.to_string(), outcome);
        self
    }

    /// Outcome returned by the next read of `channel`, ahead of the default.
    pub fn push_outcome(&self, channel: &str, outcome: ReadOutcome) -> &Self {
        self.lock()
            .queued
            .entry(channel.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn fail_acquire(&self, channel: &str, err: SourceError) -> &Self {
        self.lock()
            .acquire_failures
            .insert(channel.to_string(), err);
        self
    }

    pub fn fail_register(&self, err: SourceError) -> &Self {
        self.lock().register_failure = Some(err);
        self
    }

    pub fn fail_start(&self, err: SourceError) -> &Self {
        self.lock().start_failure = Some(err);
        self
    }

    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn has_callback(&self) -> bool {
        self.lock().callback.is_some()
    }

    /// Deliver one stream payload, as the source's thread would. Returns
    /// whether the callback ran.
    pub fn emit(&self, words: RawSampleWords) -> bool {
        let taken = {
            let mut inner = self.lock();
            if inner.running {
                inner.callback.take()
            } else {
                None
            }
        };
        match taken {
            Some(mut cb) => {
                cb(&words);
                let mut inner = self.lock();
                if inner.callback.is_none() {
                    inner.callback = Some(cb);
                }
                true
            }
            None => false,
        }
    }

    fn channel_name(&self, id: ChannelId) -> Option<String> {
        self.lock().channels.get(id.0 as usize).cloned()
    }
}

impl SamplingSource for ScriptedSource {
    fn acquire_channel(&self, name: &str) -> Result<ChannelId, SourceError> {
        let mut inner = self.lock();
        if let Some(err) = inner.acquire_failures.get(name) {
            return Err(err.clone());
        }
        inner.channels.push(name.to_string());
        self.log.push(Event::AcquireChannel(name.to_string()));
        Ok(ChannelId((inner.channels.len() - 1) as u32))
    }

    fn release_channel(&self, channel: ChannelId) {
        if let Some(name) = self.channel_name(channel) {
            self.log.push(Event::ReleaseChannel(name));
        }
    }

    fn read_fresh(&self, channel: ChannelId) -> ReadOutcome {
        let mut inner = self.lock();
        inner.reads += 1;
        let Some(name) = inner.channels.get(channel.0 as usize).cloned() else {
            return ReadOutcome::Failed("unknown channel".into());
        };
        if let Some(next) = inner.queued.get_mut(&name).and_then(VecDeque::pop_front) {
            return next;
        }
        inner
            .defaults
            .get(&name)
            .cloned()
            .unwrap_or_else(|| ReadOutcome::Failed("no scripted outcome".into()))
    }

    fn register_stream(&self, callback: SampleCallback) -> Result<StreamId, SourceError> {
        let mut inner = self.lock();
        if let Some(err) = inner.register_failure.clone() {
            return Err(err);
        }
        inner.callback = Some(callback);
        self.log.push(Event::RegisterStream);
        Ok(StreamId(0))
    }

    fn start_stream(&self, _stream: StreamId) -> Result<(), SourceError> {
        let mut inner = self.lock();
        if let Some(err) = inner.start_failure.clone() {
            return Err(err);
        }
        inner.running = true;
        self.log.push(Event::StartStream);
        Ok(())
    }

    fn stop_stream(&self, _stream: StreamId) {
        let mut inner = self.lock();
        if inner.running {
            inner.running = false;
            self.log.push(Event::StopStream);
        }
    }

    fn release_stream(&self, _stream: StreamId) {
        self.lock().callback = None;
        self.log.push(Event::ReleaseStream);
    }
}

/// Registry that records into an [`EventLog`] and can be told to refuse.
pub struct RecordingRegistry {
    inner: LocalRegistry,
    log: EventLog,
    failure: Mutex<Option<InitError>>,
}

impl RecordingRegistry {
    pub fn new(log: EventLog) -> Self {
        Self {
            inner: LocalRegistry::new(),
            log,
            failure: Mutex::new(None),
        }
    }

    pub fn fail_with(&self, err: InitError) {
        if let Ok(mut f) = self.failure.lock() {
            *f = Some(err);
        }
    }

    pub fn local(&self) -> &LocalRegistry {
        &self.inner
    }
}

impl SupplyRegistry for RecordingRegistry {
    fn register(&self, supply: Arc<dyn PowerSupply>) -> Result<RegistrationId, InitError> {
        if let Some(err) = self.failure.lock().ok().and_then(|f| f.clone()) {
            return Err(err);
        }
        let name = supply.name().to_string();
        let id = self.inner.register(supply)?;
        self.log.push(Event::RegisterSupply(name));
        Ok(id)
    }

    fn unregister(&self, id: RegistrationId) {
        self.inner.unregister(id);
        self.log.push(Event::UnregisterSupply);
    }
}

/// Strap with a fixed level (or a fixed failure) that counts its reads.
#[derive(Debug, Clone)]
pub struct FixedStrap {
    level: Result<bool, SourceError>,
    reads: usize,
}

impl FixedStrap {
    pub fn new(asserted: bool) -> Self {
        Self {
            level: Ok(asserted),
            reads: 0,
        }
    }

    pub fn failing(err: SourceError) -> Self {
        Self {
            level: Err(err),
            reads: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl StrapInput for FixedStrap {
    fn read_line(&mut self) -> Result<bool, SourceError> {
        self.reads += 1;
        self.level.clone()
    }
}
