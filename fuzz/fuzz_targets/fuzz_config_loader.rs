#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate arbitrary TOML; errors are fine, panics are not.
    let Ok(cfg) = toml::from_str::<battery_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        let dev = battery_core::DeviceCfg::from(&cfg);
        assert!(!dev.name.trim().is_empty());
        assert_ne!(dev.voltage_channel, dev.current_channel);
    }
});
