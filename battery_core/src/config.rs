//! Runtime configuration for the battery device.
//!
//! Separate from the TOML schema in `battery_config`; see `conversions`.

/// Names the device registers under and the channels it acquires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCfg {
    pub name: String,
    pub voltage_channel: String,
    pub current_channel: String,
}

impl Default for DeviceCfg {
    fn default() -> Self {
        Self {
            name: "lego-ev3-battery".to_string(),
            voltage_channel: "voltage".to_string(),
            current_channel: "current".to_string(),
        }
    }
}
