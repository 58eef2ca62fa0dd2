//! Property get/set surface of the battery.
//!
//! Live readings try a fresh channel read first. When the stream holds the
//! bus the last streamed value stands in; retry-later and absent outcomes
//! abort the whole property; anything else degrades to `NoData`.
use crate::cache::FallbackCache;
use crate::calibration::{current_from_raw, voltage_from_raw};
use crate::chemistry::{ChemistryState, Technology};
use crate::error::{Result, TelemetryError};
use crate::property::{BATTERY_PROPERTIES, Property, PropertyValue, Scope};
use crate::registry::PowerSupply;
use battery_traits::{ChannelId, ReadOutcome, SamplingSource};
use std::sync::Arc;
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Voltage,
    Current,
}

impl Channel {
    fn name(self) -> &'static str {
        match self {
            Channel::Voltage => "voltage",
            Channel::Current => "current",
        }
    }
}

pub struct BatteryTelemetry {
    name: String,
    source: Arc<dyn SamplingSource>,
    voltage: ChannelId,
    current: ChannelId,
    cache: Arc<FallbackCache>,
    chemistry: ChemistryState,
}

impl std::fmt::Debug for BatteryTelemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatteryTelemetry")
            .field("name", &self.name)
            .field("voltage", &self.voltage)
            .field("current", &self.current)
            .field("technology", &self.chemistry.technology())
            .finish_non_exhaustive()
    }
}

/// Map a fresh-read outcome to the count used for calibration.
///
/// `cached` is only consulted after the read came back busy, so a sample
/// stored while the read was contended is the one returned.
fn resolve(outcome: ReadOutcome, cached: impl FnOnce() -> i32, channel: &'static str) -> Result<i32> {
    match outcome {
        ReadOutcome::Fresh(v) => Ok(v),
        ReadOutcome::Busy => {
            let cached = cached();
            trace!(channel, cached, "channel busy, using streamed value");
            Ok(cached)
        }
        ReadOutcome::RetryLater => Err(TelemetryError::RetryLater),
        ReadOutcome::Absent => Err(TelemetryError::DeviceAbsent),
        ReadOutcome::Failed(reason) => {
            warn!(channel, %reason, "channel read failed");
            Err(TelemetryError::NoData)
        }
    }
}

impl BatteryTelemetry {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn SamplingSource>,
        voltage: ChannelId,
        current: ChannelId,
        cache: Arc<FallbackCache>,
        chemistry: ChemistryState,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            voltage,
            current,
            cache,
            chemistry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self) -> &FallbackCache {
        &self.cache
    }

    pub fn technology(&self) -> Technology {
        self.chemistry.technology()
    }

    fn read_channel(&self, channel: Channel) -> Result<i32> {
        let id = match channel {
            Channel::Voltage => self.voltage,
            Channel::Current => self.current,
        };
        let outcome = self.source.read_fresh(id);
        let cached = || match channel {
            Channel::Voltage => self.cache.voltage(),
            Channel::Current => self.cache.current(),
        };
        resolve(outcome, cached, channel.name())
    }

    pub fn current_now(&self) -> Result<i32> {
        let i_raw = self.read_channel(Channel::Current)?;
        Ok(current_from_raw(i_raw))
    }

    pub fn voltage_now(&self) -> Result<i32> {
        let v_raw = self.read_channel(Channel::Voltage)?;
        // current is only used for the shunt correction here
        let i_raw = self.read_channel(Channel::Current)?;
        Ok(voltage_from_raw(v_raw, i_raw))
    }

    pub fn get(&self, property: Property) -> Result<PropertyValue> {
        let value = match property {
            Property::Technology => PropertyValue::Technology(self.chemistry.technology()),
            Property::VoltageNow => PropertyValue::Int(self.voltage_now()?),
            Property::VoltageMaxDesign => PropertyValue::Int(self.chemistry.envelope().max_uv),
            Property::VoltageMinDesign => PropertyValue::Int(self.chemistry.envelope().min_uv),
            Property::CurrentNow => PropertyValue::Int(self.current_now()?),
            Property::Scope => PropertyValue::Scope(Scope::System),
        };
        Ok(value)
    }

    pub fn set(&self, property: Property, value: PropertyValue) -> Result<()> {
        match (property, value) {
            (Property::Technology, PropertyValue::Technology(t)) => self.chemistry.set(t),
            (Property::Technology, other) => Err(TelemetryError::invalid(format!(
                "'{other}' is not a technology"
            ))),
            (other, _) => Err(TelemetryError::invalid(format!("{other} is read-only"))),
        }
    }

    pub fn is_writable(&self, property: Property) -> bool {
        property == Property::Technology && self.chemistry.is_writable()
    }

    /// Read every property; a failure on one does not hide the others.
    pub fn snapshot(&self) -> Vec<(Property, Result<PropertyValue>)> {
        BATTERY_PROPERTIES
            .iter()
            .map(|&p| (p, self.get(p)))
            .collect()
    }
}

impl PowerSupply for BatteryTelemetry {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &[Property] {
        &BATTERY_PROPERTIES
    }

    fn get_property(&self, property: Property) -> Result<PropertyValue> {
        self.get(property)
    }

    fn set_property(&self, property: Property, value: PropertyValue) -> Result<()> {
        self.set(property, value)
    }

    fn property_is_writable(&self, property: Property) -> bool {
        self.is_writable(property)
    }
}
