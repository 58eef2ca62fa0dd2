//! Device bring-up on the configured sampling source and the query commands.

use crate::cli::Commands;
use battery_config::Config;
use battery_core::{
    BatteryDevice, DeviceCfg, LocalRegistry, Property, PropertyValue, TelemetryError,
};
use battery_hardware::{SimulatedAdc, SimulatedStrap};
use battery_traits::{Clock, MonotonicClock, StrapInput};
use eyre::{Result, WrapErr, eyre};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A brought-up device plus the collaborators it is wired to.
pub struct Session {
    device: BatteryDevice,
    adc: Arc<SimulatedAdc>,
    registry: Arc<LocalRegistry>,
}

fn simulated_strap(cfg: &Config, rechargeable: bool) -> Box<dyn StrapInput> {
    Box::new(SimulatedStrap::new(rechargeable || cfg.strap.rechargeable))
}

// --rechargeable always wins over the strap line.
#[cfg(all(feature = "hardware", target_os = "linux"))]
fn open_strap(cfg: &Config, rechargeable: bool) -> Result<Box<dyn StrapInput>> {
    match (cfg.strap.gpio, rechargeable) {
        (Some(pin), false) => {
            let strap = battery_hardware::gpio::GpioStrap::new(pin)
                .wrap_err_with(|| format!("open strap gpio {pin}"))?;
            Ok(Box::new(strap))
        }
        _ => Ok(simulated_strap(cfg, rechargeable)),
    }
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn open_strap(cfg: &Config, rechargeable: bool) -> Result<Box<dyn StrapInput>> {
    Ok(simulated_strap(cfg, rechargeable))
}

impl Session {
    pub fn open(cfg: &Config, rechargeable: bool) -> Result<Self> {
        let adc = Arc::new(
            SimulatedAdc::new()
                .paced(cfg.sampling.rate_hz)
                .exclusive(cfg.simulation.exclusive)
                .with_codes(cfg.simulation.voltage_code, cfg.simulation.current_code),
        );
        let registry = Arc::new(LocalRegistry::new());
        let mut strap = open_strap(cfg, rechargeable)?;
        let device = BatteryDevice::init(
            adc.clone(),
            strap.as_mut(),
            registry.clone(),
            &DeviceCfg::from(cfg),
        )
        .wrap_err("bring up battery device")?;

        if cfg.simulation.exclusive {
            // Fresh reads are refused while streaming; seed the cache.
            adc.tick();
        }
        Ok(Self {
            device,
            adc,
            registry,
        })
    }

    pub fn name(&self) -> &str {
        self.device.name()
    }

    pub fn close(mut self) {
        self.device.teardown();
        tracing::debug!(
            channels = self.adc.open_channels(),
            streams = self.adc.open_streams(),
            "session closed"
        );
    }
}

fn value_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Int(v) => json!(v),
        other => json!(other.to_string()),
    }
}

fn outcome_json(outcome: &std::result::Result<PropertyValue, TelemetryError>) -> Value {
    match outcome {
        Ok(v) => value_json(v),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

pub fn run(cmd: &Commands, cfg: &Config, rechargeable: bool, json: bool) -> Result<()> {
    let session = Session::open(cfg, rechargeable)?;
    let result = match cmd {
        Commands::Props => props(&session, json),
        Commands::Get { property } => get(&session, property, json),
        Commands::Set { property, value } => set(&session, property, value, json),
        Commands::Status => status(&session, json),
        Commands::Watch {
            interval_ms,
            count,
            csv,
        } => watch(&session, *interval_ms, *count, csv.as_deref(), json),
        Commands::SelfCheck => return self_check(session, json),
    };
    session.close();
    result
}

fn props(session: &Session, json: bool) -> Result<()> {
    let supply = session
        .registry
        .find(session.name())
        .ok_or_else(|| eyre!("supply '{}' is not registered", session.name()))?;
    let rows: Vec<(Property, bool)> = supply
        .properties()
        .iter()
        .map(|&p| (p, supply.property_is_writable(p)))
        .collect();
    if json {
        let list: Vec<Value> = rows
            .iter()
            .map(|(p, w)| json!({ "name": p.name(), "writable": w }))
            .collect();
        println!("{}", json!({ "supply": supply.name(), "properties": list }));
    } else {
        for (p, w) in rows {
            println!("{:<20} {}", p.name(), if w { "rw" } else { "ro" });
        }
    }
    Ok(())
}

fn get(session: &Session, property: &str, json: bool) -> Result<()> {
    let property: Property = property.parse()?;
    let value = session.registry.get(session.name(), property)?;
    if json {
        println!(
            "{}",
            json!({ "property": property.name(), "value": value_json(&value) })
        );
    } else {
        println!("{value}");
    }
    Ok(())
}

fn set(session: &Session, property: &str, value: &str, json: bool) -> Result<()> {
    let property: Property = property.parse()?;
    let value = PropertyValue::parse_for(property, value)?;
    session.registry.set(session.name(), property, value)?;

    let telemetry = session.device.telemetry();
    let technology = telemetry.technology();
    let envelope = technology.envelope();
    tracing::info!(%technology, "technology updated");
    if json {
        println!(
            "{}",
            json!({
                "technology": technology.as_str(),
                "voltage_min_design": envelope.min_uv,
                "voltage_max_design": envelope.max_uv,
            })
        );
    } else {
        println!(
            "technology={technology} voltage_min_design={} voltage_max_design={}",
            envelope.min_uv, envelope.max_uv
        );
    }
    Ok(())
}

fn status(session: &Session, json: bool) -> Result<()> {
    let telemetry = session.device.telemetry();
    let snapshot = telemetry.snapshot();
    let cache = telemetry.cache().snapshot();
    if json {
        let mut props = serde_json::Map::new();
        for (p, outcome) in &snapshot {
            props.insert(p.name().to_string(), outcome_json(outcome));
        }
        println!(
            "{}",
            json!({
                "supply": session.name(),
                "properties": props,
                "samples": cache.samples,
                "last_update_ms": cache.last_update_ms,
            })
        );
    } else {
        println!("supply: {}", session.name());
        for (p, outcome) in &snapshot {
            match outcome {
                Ok(v) => println!("  {:<20} {v}", p.name()),
                Err(e) => println!("  {:<20} <{e}>", p.name()),
            }
        }
        println!("  samples: {}", cache.samples);
    }
    Ok(())
}

fn watch(
    session: &Session,
    interval_ms: u64,
    count: Option<u64>,
    csv_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    let mut writer = match csv_path {
        Some(path) => {
            let mut w = csv::Writer::from_path(path)
                .wrap_err_with(|| format!("open csv {}", path.display()))?;
            w.write_record(["elapsed_ms", "voltage_uv", "current_ua", "samples"])?;
            Some(w)
        }
        None => None,
    };

    let clock = MonotonicClock::new();
    let start = clock.now();
    let telemetry = session.device.telemetry();
    let mut taken = 0u64;
    while !shutdown.load(Ordering::Relaxed) && count.is_none_or(|n| taken < n) {
        if taken > 0 {
            clock.sleep(Duration::from_millis(interval_ms));
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
        }
        let elapsed = clock.ms_since(start);
        let voltage = telemetry.voltage_now();
        let current = telemetry.current_now();
        let samples = telemetry.cache().samples();

        if let Some(w) = writer.as_mut() {
            let cell = |r: &std::result::Result<i32, TelemetryError>| {
                r.as_ref().map(ToString::to_string).unwrap_or_default()
            };
            w.write_record([
                elapsed.to_string(),
                cell(&voltage),
                cell(&current),
                samples.to_string(),
            ])?;
            w.flush()?;
        }

        if json {
            let field = |r: &std::result::Result<i32, TelemetryError>| match r {
                Ok(v) => json!(v),
                Err(e) => json!({ "error": e.to_string() }),
            };
            println!(
                "{}",
                json!({
                    "elapsed_ms": elapsed,
                    "voltage_now": field(&voltage),
                    "current_now": field(&current),
                    "samples": samples,
                })
            );
        } else {
            let show = |r: &std::result::Result<i32, TelemetryError>| match r {
                Ok(v) => v.to_string(),
                Err(e) => format!("<{e}>"),
            };
            println!(
                "{elapsed:>8} ms  voltage_now={}  current_now={}",
                show(&voltage),
                show(&current)
            );
        }
        taken += 1;
    }
    tracing::debug!(readings = taken, "watch finished");
    Ok(())
}

fn self_check(session: Session, json: bool) -> Result<()> {
    let name = session.name().to_string();
    let failure = session
        .device
        .telemetry()
        .snapshot()
        .into_iter()
        .find_map(|(p, r)| r.err().map(|e| (p, e)));

    let adc = session.adc.clone();
    let registry = session.registry.clone();
    session.close();
    if adc.open_channels() != 0 || adc.running_streams() != 0 || !registry.is_empty() {
        eyre::bail!("teardown left resources behind");
    }
    if let Some((property, err)) = failure {
        return Err(eyre::Report::new(err).wrap_err(format!("self-check read of {property}")));
    }

    if json {
        println!("{}", json!({ "status": "ok", "supply": name }));
    } else {
        println!("ok: {name} brought up and torn down");
    }
    Ok(())
}
