//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub const DEFAULT_CONFIG: &str = "etc/battery.toml";

#[derive(Parser, Debug)]
#[command(name = "battery", version, about = "Battery telemetry CLI")]
pub struct Cli {
    /// Path to config TOML; a missing default file means built-in defaults
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Print results and errors as JSON, log as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Report a rechargeable (Li-ion) pack on the simulated strap
    #[arg(long, action = ArgAction::SetTrue)]
    pub rechargeable: bool,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List exposed properties and whether they are writable
    Props,
    /// Print one property
    Get {
        /// Property name, e.g. voltage_now
        property: String,
    },
    /// Write a property (only `technology` accepts writes)
    Set {
        property: String,
        value: String,
    },
    /// Print every property in one object
    Status,
    /// Periodically print voltage and current until Ctrl-C or --count
    Watch {
        /// Delay between readings
        #[arg(long, value_name = "MS", default_value_t = 1000)]
        interval_ms: u64,
        /// Stop after this many readings
        #[arg(long, value_name = "N")]
        count: Option<u64>,
        /// Append readings to a CSV file
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Bring the device up and down once
    SelfCheck,
}
