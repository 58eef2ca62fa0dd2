#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `battery`: bring up the telemetry engine on the simulated converter and
//! query it.

mod cli;
mod error_fmt;
mod query;

use battery_config::{Config, Logging, Rotation};
use clap::Parser;
use cli::{Cli, DEFAULT_CONFIG, FILE_GUARD, JSON_MODE};
use error_fmt::{exit_code_for_error, format_error_json, humanize};
use eyre::{Result, eyre};
use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn load_config(path: &Path) -> Result<Config> {
    if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        return Ok(Config::default());
    }
    battery_config::load_file(path)
}

fn file_layer(logging: &Logging) -> Result<Option<BoxedLayer>> {
    let Some(file) = &logging.file else {
        return Ok(None);
    };
    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre!("logging.file '{file}' has no file name"))?;
    let appender = match logging.rotation {
        Rotation::Never => tracing_appender::rolling::never(dir, name),
        Rotation::Daily => tracing_appender::rolling::daily(dir, name),
        Rotation::Hourly => tracing_appender::rolling::hourly(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    let filter = EnvFilter::new(logging.level.as_deref().unwrap_or("info"));
    Ok(Some(
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    ))
}

fn init_tracing(json: bool, level: &str, logging: &Logging) -> Result<()> {
    // RUST_LOG wins over --log-level.
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console: BoxedLayer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let mut layers = vec![console];
    if let Some(file) = file_layer(logging)? {
        layers.push(file);
    }
    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre!("init logging: {e}"))
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");
    query::run(&cli.cmd, &cfg, cli.rechargeable, cli.json)
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(e) = run(&cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}
