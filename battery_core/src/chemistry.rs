//! Battery chemistry identity and its design voltage envelope.
//!
//! The strap tells Li-ion packs apart from AA holders. Rechargeable AA cells
//! cannot be detected, so an Unknown pack may be declared NiMH once; nothing
//! moves a pack back to Unknown or away from a detected chemistry.
use crate::error::{Result, TelemetryError};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// Numbering follows the Linux power-supply class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Technology {
    Unknown = 0,
    NiMH = 1,
    LithiumIon = 2,
}

impl Technology {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Technology::NiMH,
            2 => Technology::LithiumIon,
            _ => Technology::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Technology::Unknown => "Unknown",
            Technology::NiMH => "NiMH",
            Technology::LithiumIon => "Li-ion",
        }
    }

    pub fn envelope(self) -> VoltageEnvelope {
        match self {
            // 6x AA alkaline, 9 V nominal
            Technology::Unknown => VoltageEnvelope::new(4_800_000, 9_000_000),
            // 6x AA NiMH, 7.2 V nominal
            Technology::NiMH => VoltageEnvelope::new(5_400_000, 7_800_000),
            // 2-cell Li-ion, 7.4 V nominal
            Technology::LithiumIon => VoltageEnvelope::new(6_000_000, 8_400_000),
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technology {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" | "0" => Ok(Technology::Unknown),
            "nimh" | "1" => Ok(Technology::NiMH),
            "li-ion" | "lion" | "liion" | "2" => Ok(Technology::LithiumIon),
            other => Err(TelemetryError::invalid(format!(
                "unknown technology '{other}'"
            ))),
        }
    }
}

/// Design voltage limits in microvolts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoltageEnvelope {
    pub min_uv: i32,
    pub max_uv: i32,
}

impl VoltageEnvelope {
    pub const fn new(min_uv: i32, max_uv: i32) -> Self {
        Self { min_uv, max_uv }
    }
}

/// Current chemistry. The envelope is a function of the technology, so the
/// pair is published by one atomic store and can never be read torn.
#[derive(Debug)]
pub struct ChemistryState {
    technology: AtomicU8,
}

impl ChemistryState {
    /// Classify from the rechargeable strap: asserted means a Li-ion pack.
    pub fn detect(strap_asserted: bool) -> Self {
        let technology = if strap_asserted {
            Technology::LithiumIon
        } else {
            Technology::Unknown
        };
        tracing::debug!(strap_asserted, %technology, "battery chemistry detected");
        Self {
            technology: AtomicU8::new(technology as u8),
        }
    }

    pub fn technology(&self) -> Technology {
        Technology::from_u8(self.technology.load(Ordering::Acquire))
    }

    pub fn envelope(&self) -> VoltageEnvelope {
        self.technology().envelope()
    }

    pub fn is_writable(&self) -> bool {
        self.technology() == Technology::Unknown
    }

    /// Declare the pack chemistry. Only Unknown → NiMH is accepted.
    pub fn set(&self, requested: Technology) -> Result<()> {
        if requested != Technology::NiMH {
            return Err(TelemetryError::invalid(format!(
                "technology cannot be set to {requested}"
            )));
        }
        self.technology
            .compare_exchange(
                Technology::Unknown as u8,
                Technology::NiMH as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| tracing::info!("battery technology set to NiMH"))
            .map_err(|held| {
                TelemetryError::invalid(format!(
                    "technology is locked at {}",
                    Technology::from_u8(held)
                ))
            })
    }
}
