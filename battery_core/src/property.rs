//! Property names and values exposed to the query framework.
use crate::chemistry::Technology;
use crate::error::TelemetryError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Technology,
    VoltageNow,
    VoltageMaxDesign,
    VoltageMinDesign,
    CurrentNow,
    Scope,
}

/// Registration order of the battery property table.
pub const BATTERY_PROPERTIES: [Property; 6] = [
    Property::Technology,
    Property::VoltageNow,
    Property::VoltageMaxDesign,
    Property::VoltageMinDesign,
    Property::CurrentNow,
    Property::Scope,
];

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::Technology => "technology",
            Property::VoltageNow => "voltage_now",
            Property::VoltageMaxDesign => "voltage_max_design",
            Property::VoltageMinDesign => "voltage_min_design",
            Property::CurrentNow => "current_now",
            Property::Scope => "scope",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BATTERY_PROPERTIES
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TelemetryError::invalid(format!("unknown property '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Powers the whole system.
    System,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::System => f.write_str("System"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValue {
    /// Microvolts or microamps, depending on the property.
    Int(i32),
    Technology(Technology),
    Scope(Scope),
}

impl PropertyValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_technology(&self) -> Option<Technology> {
        match self {
            PropertyValue::Technology(t) => Some(*t),
            _ => None,
        }
    }

    /// Parse a textual value for a writable property.
    pub fn parse_for(property: Property, s: &str) -> Result<Self, TelemetryError> {
        match property {
            Property::Technology => s.parse().map(PropertyValue::Technology),
            other => Err(TelemetryError::invalid(format!("{other} is read-only"))),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Technology(t) => write!(f, "{t}"),
            PropertyValue::Scope(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for p in BATTERY_PROPERTIES {
            assert_eq!(p.name().parse::<Property>().unwrap(), p);
        }
        assert!("capacity".parse::<Property>().is_err());
    }

    #[test]
    fn only_technology_parses_values() {
        assert_eq!(
            PropertyValue::parse_for(Property::Technology, "NiMH").unwrap(),
            PropertyValue::Technology(Technology::NiMH)
        );
        assert!(PropertyValue::parse_for(Property::VoltageNow, "1").is_err());
    }
}
