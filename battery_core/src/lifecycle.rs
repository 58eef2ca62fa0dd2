//! Device bring-up and teardown.
//!
//! Resources are acquired in this order:
//! voltage channel → current channel → stream (callback bound) → strap read
//! → supply registration → stream start.
//!
//! Every acquired resource lives in a guard that undoes it on drop, so an
//! early return from [`BatteryDevice::init`] unwinds exactly what was
//! acquired, newest first. [`BatteryDevice::teardown`] releases in the same
//! strict reverse order and is safe to call more than once.
use crate::cache::FallbackCache;
use crate::chemistry::ChemistryState;
use crate::config::DeviceCfg;
use crate::decoder::decode_pair;
use crate::error::InitError;
use crate::registry::{PowerSupply, RegistrationId, SupplyRegistry};
use crate::telemetry::BatteryTelemetry;
use battery_traits::{
    ChannelId, Clock, MonotonicClock, RawSampleWords, SamplingSource, StrapInput, StreamId,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, trace};

struct ChannelGuard {
    source: Arc<dyn SamplingSource>,
    id: ChannelId,
    label: &'static str,
}

impl ChannelGuard {
    fn acquire(
        source: &Arc<dyn SamplingSource>,
        name: &str,
        label: &'static str,
    ) -> Result<Self, InitError> {
        let id = source
            .acquire_channel(name)
            .map_err(|e| InitError::from_source(&format!("{label} channel '{name}'"), e))?;
        debug!(label, name, id = id.0, "channel acquired");
        Ok(Self {
            source: source.clone(),
            id,
            label,
        })
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.source.release_channel(self.id);
        debug!(label = self.label, id = self.id.0, "channel released");
    }
}

struct StreamRegistration {
    source: Arc<dyn SamplingSource>,
    id: StreamId,
}

impl StreamRegistration {
    fn register(
        source: &Arc<dyn SamplingSource>,
        cache: Arc<FallbackCache>,
    ) -> Result<Self, InitError> {
        let clock = MonotonicClock::new();
        let epoch = cache.epoch();
        let callback = move |words: &RawSampleWords| {
            let pair = decode_pair(words);
            cache.store(pair, clock.ms_since(epoch));
            trace!(current = pair.current, voltage = pair.voltage, "sample decoded");
        };
        let id = source
            .register_stream(Box::new(callback))
            .map_err(|e| InitError::from_source("sample stream", e))?;
        debug!(id = id.0, "sample stream registered");
        Ok(Self {
            source: source.clone(),
            id,
        })
    }
}

impl Drop for StreamRegistration {
    fn drop(&mut self) {
        self.source.release_stream(self.id);
        debug!(id = self.id.0, "sample stream released");
    }
}

struct SupplyRegistration {
    registry: Arc<dyn SupplyRegistry>,
    id: RegistrationId,
}

impl Drop for SupplyRegistration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

struct RunningStream {
    source: Arc<dyn SamplingSource>,
    id: StreamId,
    stopped: AtomicBool,
}

impl RunningStream {
    fn start(source: &Arc<dyn SamplingSource>, id: StreamId) -> Result<Self, InitError> {
        source
            .start_stream(id)
            .map_err(|e| InitError::from_source("start sample stream", e))?;
        debug!(id = id.0, "sample stream started");
        Ok(Self {
            source: source.clone(),
            id,
            stopped: AtomicBool::new(false),
        })
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.source.stop_stream(self.id);
            debug!(id = self.id.0, "sample stream stopped");
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl Drop for RunningStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A brought-up battery: channels held, supply registered, stream running.
///
/// Field order is teardown order.
pub struct BatteryDevice {
    running: Option<RunningStream>,
    registration: Option<SupplyRegistration>,
    telemetry: Arc<BatteryTelemetry>,
    stream: Option<StreamRegistration>,
    current: Option<ChannelGuard>,
    voltage: Option<ChannelGuard>,
}

impl BatteryDevice {
    pub fn init(
        source: Arc<dyn SamplingSource>,
        strap: &mut dyn StrapInput,
        registry: Arc<dyn SupplyRegistry>,
        cfg: &DeviceCfg,
    ) -> Result<Self, InitError> {
        Self::try_init(source, strap, registry, cfg).inspect_err(|e| {
            if e.is_retry_later() {
                debug!(error = %e, device = %cfg.name, "battery bring-up deferred");
            } else {
                error!(error = %e, device = %cfg.name, "battery bring-up failed");
            }
        })
    }

    fn try_init(
        source: Arc<dyn SamplingSource>,
        strap: &mut dyn StrapInput,
        registry: Arc<dyn SupplyRegistry>,
        cfg: &DeviceCfg,
    ) -> Result<Self, InitError> {
        let voltage = ChannelGuard::acquire(&source, &cfg.voltage_channel, "voltage")?;
        let current = ChannelGuard::acquire(&source, &cfg.current_channel, "current")?;

        let cache = Arc::new(FallbackCache::default());
        let stream = StreamRegistration::register(&source, cache.clone())?;

        let rechargeable = strap
            .read_line()
            .map_err(|e| InitError::from_source("rechargeable strap", e))?;
        let chemistry = ChemistryState::detect(rechargeable);

        let telemetry = Arc::new(BatteryTelemetry::new(
            cfg.name.clone(),
            source.clone(),
            voltage.id,
            current.id,
            cache,
            chemistry,
        ));
        let supply: Arc<dyn PowerSupply> = telemetry.clone();
        let id = registry.register(supply)?;
        let registration = SupplyRegistration { registry, id };

        // Queries may arrive from here on; the stream only starts afterwards.
        let running = RunningStream::start(&source, stream.id)?;

        info!(
            device = %cfg.name,
            technology = %telemetry.technology(),
            "battery device up"
        );
        Ok(Self {
            running: Some(running),
            registration: Some(registration),
            telemetry,
            stream: Some(stream),
            current: Some(current),
            voltage: Some(voltage),
        })
    }

    pub fn telemetry(&self) -> &Arc<BatteryTelemetry> {
        &self.telemetry
    }

    pub fn name(&self) -> &str {
        self.telemetry.name()
    }

    /// Stop the sample stream without tearing the device down. Idempotent.
    pub fn stop_sampling(&self) {
        if let Some(running) = &self.running {
            running.stop();
        }
    }

    pub fn is_sampling(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.is_stopped())
    }

    pub fn is_torn_down(&self) -> bool {
        self.voltage.is_none()
    }

    /// Release everything in reverse acquisition order. Idempotent.
    pub fn teardown(&mut self) {
        if self.is_torn_down() {
            return;
        }
        drop(self.running.take());
        drop(self.registration.take());
        drop(self.stream.take());
        drop(self.current.take());
        drop(self.voltage.take());
        info!(device = %self.telemetry.name(), "battery device down");
    }
}

impl Drop for BatteryDevice {
    fn drop(&mut self) {
        self.teardown();
    }
}
