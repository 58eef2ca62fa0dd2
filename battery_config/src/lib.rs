#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the battery telemetry service.
//!
//! `Config` and its sections are deserialized from TOML and validated. Every
//! section is optional; an empty file describes the reference board with the
//! simulated sampling source.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Device {
    /// Name the supply registers under.
    pub name: String,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            name: "lego-ev3-battery".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Channels {
    pub voltage: String,
    pub current: String,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            voltage: "voltage".to_string(),
            current: "current".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Strap {
    /// Level reported by the simulated strap (true = Li-ion pack fitted).
    pub rechargeable: bool,
    /// GPIO line of the strap; only used by hardware builds.
    pub gpio: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sampling {
    /// Stream rate of the simulated source.
    pub rate_hz: u32,
}

impl Default for Sampling {
    fn default() -> Self {
        Self { rate_hz: 100 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// 12-bit converter code on the voltage channel.
    pub voltage_code: u16,
    /// 12-bit converter code on the current channel.
    pub current_code: u16,
    /// Fresh reads report busy while the stream runs (buffered capture).
    pub exclusive: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            voltage_code: 3000,
            current_code: 120,
            exclusive: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Never,
    Daily,
    Hourly,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    pub rotation: Rotation,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub device: Device,
    pub channels: Channels,
    pub strap: Strap,
    pub sampling: Sampling,
    pub simulation: Simulation,
    pub logging: Logging,
}

pub const MAX_RATE_HZ: u32 = 10_000;
const MAX_CODE: u16 = 0x0FFF;

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.device.name.trim().is_empty() {
            eyre::bail!("device.name must not be empty");
        }

        if self.channels.voltage.trim().is_empty() {
            eyre::bail!("channels.voltage must not be empty");
        }
        if self.channels.current.trim().is_empty() {
            eyre::bail!("channels.current must not be empty");
        }
        if self.channels.voltage == self.channels.current {
            eyre::bail!("channels.voltage and channels.current must differ");
        }

        if self.sampling.rate_hz == 0 {
            eyre::bail!("sampling.rate_hz must be > 0");
        }
        if self.sampling.rate_hz > MAX_RATE_HZ {
            eyre::bail!("sampling.rate_hz must be <= {MAX_RATE_HZ}");
        }

        if self.simulation.voltage_code > MAX_CODE {
            eyre::bail!("simulation.voltage_code must fit in 12 bits");
        }
        if self.simulation.current_code > MAX_CODE {
            eyre::bail!("simulation.current_code must fit in 12 bits");
        }

        if let Some(level) = &self.logging.level
            && !matches!(
                level.to_ascii_lowercase().as_str(),
                "error" | "warn" | "info" | "debug" | "trace"
            )
        {
            eyre::bail!("logging.level must be one of error|warn|info|debug|trace");
        }

        Ok(())
    }
}
