#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Battery telemetry engine (hardware-agnostic).
//!
//! Turns samples from a shared two-channel sampling source into calibrated
//! voltage and current readings and tracks the pack chemistry. All hardware
//! access goes through `battery_traits::SamplingSource` and
//! `battery_traits::StrapInput`.
//!
//! ## Architecture
//!
//! - **Decoding**: raw stream words → counts (`decoder`)
//! - **Fallback cache**: last streamed counts, used when the bus is busy (`cache`)
//! - **Calibration**: counts → µV / µA (`calibration`)
//! - **Chemistry**: strap detection and the one-way NiMH override (`chemistry`)
//! - **Properties**: get/set surface for the query framework (`telemetry`, `registry`)
//! - **Lifecycle**: ordered bring-up and teardown (`lifecycle`)
//!
//! ## Units
//!
//! Voltages are reported in microvolts and currents in microamps, as `i32`.

pub mod cache;
pub mod calibration;
pub mod chemistry;
pub mod config;
pub mod conversions;
pub mod decoder;
pub mod error;
pub mod lifecycle;
pub mod mocks;
pub mod property;
pub mod registry;
pub mod telemetry;

pub use cache::{CacheSnapshot, FallbackCache};
pub use chemistry::{ChemistryState, Technology, VoltageEnvelope};
pub use config::DeviceCfg;
pub use error::{InitError, TelemetryError};
pub use lifecycle::BatteryDevice;
pub use property::{BATTERY_PROPERTIES, Property, PropertyValue, Scope};
pub use registry::{LocalRegistry, PowerSupply, RegistrationId, SupplyRegistry};
pub use telemetry::BatteryTelemetry;
