//! Sampling sources and strap inputs for the battery telemetry engine.
//!
//! The simulated converter is always available; the GPIO strap needs the
//! `hardware` feature on Linux.
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod sim;

use battery_traits::{SourceError, StrapInput};

pub use sim::{SimChannel, SimulatedAdc};

/// Strap with a level chosen at construction.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedStrap {
    asserted: bool,
}

impl SimulatedStrap {
    pub fn new(asserted: bool) -> Self {
        Self { asserted }
    }
}

impl StrapInput for SimulatedStrap {
    fn read_line(&mut self) -> Result<bool, SourceError> {
        tracing::debug!(asserted = self.asserted, "simulated strap read");
        Ok(self.asserted)
    }
}
