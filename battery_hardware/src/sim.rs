//! Simulated two-channel multiplexed converter.
//!
//! One shared bus serves both the synchronous reads and the sample stream.
//! While a stream worker converts and runs its callback it holds the bus, and
//! a concurrent fresh read reports `Busy` instead of waiting. In exclusive
//! mode the bus belongs to the stream for as long as any stream runs, which is
//! how buffered converters behave on the reference board.
use crate::error::HwError;
use battery_traits::{
    ChannelId, RawSampleWords, ReadOutcome, SampleCallback, SamplingSource, SourceError, StreamId,
};
use crossbeam_channel as xch;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Converter reference in millivolts.
pub const REFERENCE_MV: i32 = 5002;
const CODE_MASK: u16 = 0x0FFF;
const ACK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimChannel {
    Voltage,
    Current,
}

impl SimChannel {
    fn index(self) -> usize {
        match self {
            SimChannel::Voltage => 0,
            SimChannel::Current => 1,
        }
    }

    /// Mux address the converter echoes in bits 12..=15 of each word.
    fn address(self) -> u16 {
        self.index() as u16
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "voltage" => Some(SimChannel::Voltage),
            "current" => Some(SimChannel::Current),
            _ => None,
        }
    }

    fn from_id(id: ChannelId) -> Option<Self> {
        match id.0 {
            0 => Some(SimChannel::Voltage),
            1 => Some(SimChannel::Current),
            _ => None,
        }
    }

    fn id(self) -> ChannelId {
        ChannelId(self.index() as u32)
    }
}

/// Processed value of a 12-bit code, in millivolts at the converter input.
#[inline]
pub fn processed(code: u16) -> i32 {
    (i32::from(code & CODE_MASK) * REFERENCE_MV) >> 12
}

struct Shared {
    bus: Mutex<()>,
    codes: [AtomicU16; 2],
    faults: Mutex<[Option<ReadOutcome>; 2]>,
    acquired: [AtomicBool; 2],
    running: AtomicU32,
    exclusive: bool,
    deliveries: AtomicU64,
}

impl Shared {
    fn words(&self) -> RawSampleWords {
        let word = |ch: SimChannel| {
            (self.codes[ch.index()].load(Ordering::Relaxed) & CODE_MASK) | (ch.address() << 12)
        };
        [word(SimChannel::Current), word(SimChannel::Voltage)]
    }

    fn deliver(&self, callback: &mut SampleCallback, words: &RawSampleWords, stop: &AtomicBool) {
        if stop.load(Ordering::Acquire) {
            return;
        }
        let _bus = self.bus.lock().unwrap_or_else(|e| e.into_inner());
        callback(words);
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        trace!(current = words[0], voltage = words[1], "stream sample delivered");
    }
}

enum Command {
    Push(RawSampleWords, xch::Sender<()>),
    Stop,
}

struct Worker {
    tx: xch::Sender<Command>,
    join: JoinHandle<SampleCallback>,
    thread: ThreadId,
    stop: Arc<AtomicBool>,
}

enum StreamSlot {
    Idle(SampleCallback),
    Running(Worker),
    /// Callback went away with a worker that stopped itself.
    Detached,
}

fn run_worker(
    shared: Arc<Shared>,
    rx: xch::Receiver<Command>,
    stop: Arc<AtomicBool>,
    period: Option<Duration>,
    mut callback: SampleCallback,
) -> SampleCallback {
    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let cmd = match period {
            Some(p) => match rx.recv_timeout(p) {
                Ok(cmd) => Some(cmd),
                Err(xch::RecvTimeoutError::Timeout) => None,
                Err(xch::RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break,
            },
        };
        match cmd {
            Some(Command::Stop) => break,
            Some(Command::Push(words, ack)) => {
                shared.deliver(&mut callback, &words, &stop);
                let _ = ack.send(());
            }
            None => {
                let words = shared.words();
                shared.deliver(&mut callback, &words, &stop);
            }
        }
    }
    trace!("stream worker exiting");
    callback
}

pub struct SimulatedAdc {
    shared: Arc<Shared>,
    streams: Mutex<HashMap<u32, StreamSlot>>,
    next_stream: AtomicU32,
    period: Option<Duration>,
    deferred: AtomicBool,
}

impl Default for SimulatedAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAdc {
    /// On-demand converter: the stream only emits via [`Self::push_and_wait`].
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                bus: Mutex::new(()),
                codes: [AtomicU16::new(0), AtomicU16::new(0)],
                faults: Mutex::new([None, None]),
                acquired: [AtomicBool::new(false), AtomicBool::new(false)],
                running: AtomicU32::new(0),
                exclusive: false,
                deliveries: AtomicU64::new(0),
            }),
            streams: Mutex::new(HashMap::new()),
            next_stream: AtomicU32::new(0),
            period: None,
            deferred: AtomicBool::new(false),
        }
    }

    /// Also emit the current codes on the stream `rate_hz` times per second.
    pub fn paced(mut self, rate_hz: u32) -> Self {
        // Rates above 1 MHz still get a non-zero period.
        let micros = (1_000_000 / u64::from(rate_hz.max(1))).max(1);
        self.period = Some(Duration::from_micros(micros));
        self
    }

    /// Report every fresh read as `Busy` while a stream runs.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.exclusive = exclusive;
        }
        self
    }

    pub fn with_codes(self, voltage: u16, current: u16) -> Self {
        self.set_code(SimChannel::Voltage, voltage);
        self.set_code(SimChannel::Current, current);
        self
    }

    pub fn set_code(&self, channel: SimChannel, code: u16) {
        self.shared.codes[channel.index()].store(code & CODE_MASK, Ordering::Relaxed);
    }

    pub fn code(&self, channel: SimChannel) -> u16 {
        self.shared.codes[channel.index()].load(Ordering::Relaxed)
    }

    /// Force every fresh read of `channel` to return `outcome`; `None` clears.
    pub fn inject_fault(&self, channel: SimChannel, outcome: Option<ReadOutcome>) {
        let mut faults = self.shared.faults.lock().unwrap_or_else(|e| e.into_inner());
        faults[channel.index()] = outcome;
    }

    /// Make channel acquisition report "not ready yet".
    pub fn set_deferred(&self, deferred: bool) {
        self.deferred.store(deferred, Ordering::Relaxed);
    }

    pub fn open_channels(&self) -> usize {
        self.shared
            .acquired
            .iter()
            .filter(|a| a.load(Ordering::Relaxed))
            .count()
    }

    pub fn open_streams(&self) -> usize {
        self.lock_streams().len()
    }

    pub fn running_streams(&self) -> u32 {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn deliveries(&self) -> u64 {
        self.shared.deliveries.load(Ordering::Relaxed)
    }

    fn lock_streams(&self) -> MutexGuard<'_, HashMap<u32, StreamSlot>> {
        self.streams.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver `words` to every running stream and wait until each callback
    /// has returned. Returns how many streams took the sample.
    pub fn push_and_wait(&self, words: RawSampleWords) -> usize {
        let senders: Vec<xch::Sender<Command>> = self
            .lock_streams()
            .values()
            .filter_map(|slot| match slot {
                StreamSlot::Running(w) => Some(w.tx.clone()),
                _ => None,
            })
            .collect();
        let mut delivered = 0;
        for tx in senders {
            let (ack_tx, ack_rx) = xch::bounded(1);
            if tx.send(Command::Push(words, ack_tx)).is_ok()
                && ack_rx.recv_timeout(ACK_TIMEOUT).is_ok()
            {
                delivered += 1;
            }
        }
        delivered
    }

    /// Push the current codes, as one paced tick would.
    pub fn tick(&self) -> usize {
        self.push_and_wait(self.shared.words())
    }

    fn spawn_worker(&self, id: u32, callback: SampleCallback) -> Result<Worker, HwError> {
        let (tx, rx) = xch::unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let shared = self.shared.clone();
        let period = self.period;
        let worker_stop = stop.clone();
        let join = thread::Builder::new()
            .name(format!("sim-adc-stream-{id}"))
            .spawn(move || run_worker(shared, rx, worker_stop, period, callback))?;
        let thread = join.thread().id();
        Ok(Worker {
            tx,
            join,
            thread,
            stop,
        })
    }
}

impl SamplingSource for SimulatedAdc {
    fn acquire_channel(&self, name: &str) -> Result<ChannelId, SourceError> {
        if self.deferred.load(Ordering::Relaxed) {
            return Err(SourceError::RetryLater("converter not probed yet".into()));
        }
        let channel =
            SimChannel::from_name(name).ok_or_else(|| HwError::UnknownChannel(name.into()))?;
        if self.shared.acquired[channel.index()].swap(true, Ordering::AcqRel) {
            return Err(HwError::ChannelInUse(name.into()).into());
        }
        debug!(name, "sim channel acquired");
        Ok(channel.id())
    }

    fn release_channel(&self, channel: ChannelId) {
        if let Some(ch) = SimChannel::from_id(channel) {
            self.shared.acquired[ch.index()].store(false, Ordering::Release);
        }
    }

    fn read_fresh(&self, channel: ChannelId) -> ReadOutcome {
        let Some(ch) = SimChannel::from_id(channel) else {
            return ReadOutcome::Failed(format!("unknown channel {}", channel.0));
        };
        if !self.shared.acquired[ch.index()].load(Ordering::Acquire) {
            return ReadOutcome::Failed("channel not acquired".into());
        }
        let fault = self
            .shared
            .faults
            .lock()
            .map(|f| f[ch.index()].clone())
            .unwrap_or(None);
        if let Some(outcome) = fault {
            return outcome;
        }
        if self.shared.exclusive && self.shared.running.load(Ordering::Acquire) > 0 {
            return ReadOutcome::Busy;
        }
        match self.shared.bus.try_lock() {
            Ok(_bus) => ReadOutcome::Fresh(processed(self.code(ch))),
            Err(TryLockError::WouldBlock) => ReadOutcome::Busy,
            Err(TryLockError::Poisoned(_)) => ReadOutcome::Failed("bus poisoned".into()),
        }
    }

    fn register_stream(&self, callback: SampleCallback) -> Result<StreamId, SourceError> {
        let id = self.next_stream.fetch_add(1, Ordering::Relaxed);
        self.lock_streams().insert(id, StreamSlot::Idle(callback));
        Ok(StreamId(id))
    }

    fn start_stream(&self, stream: StreamId) -> Result<(), SourceError> {
        let mut streams = self.lock_streams();
        let slot = streams
            .get_mut(&stream.0)
            .ok_or(HwError::UnknownStream(stream.0))?;
        let callback = match std::mem::replace(slot, StreamSlot::Detached) {
            StreamSlot::Idle(cb) => cb,
            running @ StreamSlot::Running(_) => {
                *slot = running;
                return Err(HwError::StreamRunning(stream.0).into());
            }
            StreamSlot::Detached => {
                return Err(SourceError::Hard(format!(
                    "stream {} lost its callback",
                    stream.0
                )));
            }
        };
        let worker = self.spawn_worker(stream.0, callback)?;
        *slot = StreamSlot::Running(worker);
        self.shared.running.fetch_add(1, Ordering::AcqRel);
        debug!(stream = stream.0, "sim stream started");
        Ok(())
    }

    fn stop_stream(&self, stream: StreamId) {
        let worker = {
            let mut streams = self.lock_streams();
            let Some(slot) = streams.get_mut(&stream.0) else {
                return;
            };
            match std::mem::replace(slot, StreamSlot::Detached) {
                StreamSlot::Running(w) => w,
                other => {
                    *slot = other;
                    return;
                }
            }
        };
        worker.stop.store(true, Ordering::Release);
        self.shared.running.fetch_sub(1, Ordering::AcqRel);

        if thread::current().id() == worker.thread {
            // Inside our own callback: the worker exits once it returns.
            debug!(stream = stream.0, "sim stream stopped from its callback");
            return;
        }

        let _ = worker.tx.send(Command::Stop);
        match worker.join.join() {
            Ok(callback) => {
                if let Some(slot) = self.lock_streams().get_mut(&stream.0) {
                    *slot = StreamSlot::Idle(callback);
                }
                debug!(stream = stream.0, "sim stream stopped");
            }
            Err(e) => warn!(?e, stream = stream.0, "stream worker panicked"),
        }
    }

    fn release_stream(&self, stream: StreamId) {
        self.stop_stream(stream);
        self.lock_streams().remove(&stream.0);
    }
}

impl Drop for SimulatedAdc {
    fn drop(&mut self) {
        let ids: Vec<u32> = self.lock_streams().keys().copied().collect();
        for id in ids {
            self.stop_stream(StreamId(id));
        }
    }
}
