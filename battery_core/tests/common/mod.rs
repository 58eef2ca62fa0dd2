#![allow(dead_code)]

use battery_core::mocks::{EventLog, FixedStrap, RecordingRegistry, ScriptedSource};
use battery_core::{BatteryDevice, DeviceCfg};
use std::sync::Arc;

pub const NAME: &str = "lego-ev3-battery";

pub struct Rig {
    pub log: EventLog,
    pub source: Arc<ScriptedSource>,
    pub registry: Arc<RecordingRegistry>,
}

impl Rig {
    pub fn new() -> Self {
        let log = EventLog::default();
        Self {
            source: Arc::new(ScriptedSource::with_log(log.clone())),
            registry: Arc::new(RecordingRegistry::new(log.clone())),
            log,
        }
    }

    pub fn init_with(
        &self,
        strap: &mut FixedStrap,
    ) -> Result<BatteryDevice, battery_core::InitError> {
        BatteryDevice::init(
            self.source.clone(),
            strap,
            self.registry.clone(),
            &DeviceCfg::default(),
        )
    }

    pub fn init(&self, rechargeable: bool) -> BatteryDevice {
        self.init_with(&mut FixedStrap::new(rechargeable))
            .expect("bring-up")
    }
}
