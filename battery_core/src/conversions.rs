//! `From` implementations bridging `battery_config` types to `battery_core` types.

use crate::config::DeviceCfg;

impl From<&battery_config::Config> for DeviceCfg {
    fn from(c: &battery_config::Config) -> Self {
        Self {
            name: c.device.name.clone(),
            voltage_channel: c.channels.voltage.clone(),
            current_channel: c.channels.current.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_default_device() {
        let cfg = battery_config::Config::default();
        assert_eq!(DeviceCfg::from(&cfg), DeviceCfg::default());
    }
}
