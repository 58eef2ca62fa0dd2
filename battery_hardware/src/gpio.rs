use battery_traits::{SourceError, StrapInput};
use rppal::gpio::{Gpio, InputPin};
use tracing::debug;

use crate::error::{HwError, Result};

/// Rechargeable-pack strap wired to a GPIO input (high = Li-ion pack).
pub struct GpioStrap {
    pin: InputPin,
}

impl GpioStrap {
    pub fn new(bcm_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(bcm_pin)
            .map_err(|e| HwError::Gpio(format!("strap pin {bcm_pin}: {e}")))?
            .into_input();
        Ok(Self { pin })
    }
}

impl StrapInput for GpioStrap {
    fn read_line(&mut self) -> std::result::Result<bool, SourceError> {
        let high = self.pin.is_high();
        debug!(high, "strap gpio read");
        Ok(high)
    }
}
