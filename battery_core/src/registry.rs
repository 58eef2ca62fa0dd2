//! Seam to the property query framework.
//!
//! The framework owns dispatch; a supply only answers get/set/is-writable for
//! the properties it registered. `LocalRegistry` is a small in-process
//! framework used by the CLI and tests.
use crate::error::{InitError, Result, TelemetryError};
use crate::property::{Property, PropertyValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub trait PowerSupply: Send + Sync {
    fn name(&self) -> &str;
    fn properties(&self) -> &[Property];
    fn get_property(&self, property: Property) -> Result<PropertyValue>;
    fn set_property(&self, property: Property, value: PropertyValue) -> Result<()>;
    fn property_is_writable(&self, property: Property) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);

pub trait SupplyRegistry: Send + Sync {
    fn register(&self, supply: Arc<dyn PowerSupply>) -> std::result::Result<RegistrationId, InitError>;
    fn unregister(&self, id: RegistrationId);
}

impl<T: SupplyRegistry + ?Sized> SupplyRegistry for Arc<T> {
    fn register(&self, supply: Arc<dyn PowerSupply>) -> std::result::Result<RegistrationId, InitError> {
        (**self).register(supply)
    }
    fn unregister(&self, id: RegistrationId) {
        (**self).unregister(id)
    }
}

#[derive(Default)]
pub struct LocalRegistry {
    next_id: AtomicU64,
    supplies: Mutex<HashMap<RegistrationId, Arc<dyn PowerSupply>>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn PowerSupply>> {
        let supplies = self.supplies.lock().ok()?;
        supplies.values().find(|s| s.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .supplies
            .lock()
            .map(|s| s.values().map(|p| p.name().to_string()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.supplies.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, name: &str, property: Property) -> Result<Arc<dyn PowerSupply>> {
        let supply = self
            .find(name)
            .ok_or_else(|| TelemetryError::invalid(format!("no supply named '{name}'")))?;
        if !supply.properties().contains(&property) {
            return Err(TelemetryError::invalid(format!(
                "{name} does not provide {property}"
            )));
        }
        Ok(supply)
    }

    pub fn get(&self, name: &str, property: Property) -> Result<PropertyValue> {
        self.lookup(name, property)?.get_property(property)
    }

    pub fn set(&self, name: &str, property: Property, value: PropertyValue) -> Result<()> {
        let supply = self.lookup(name, property)?;
        if !supply.property_is_writable(property) {
            return Err(TelemetryError::invalid(format!("{property} is not writable")));
        }
        supply.set_property(property, value)
    }
}

impl SupplyRegistry for LocalRegistry {
    fn register(&self, supply: Arc<dyn PowerSupply>) -> std::result::Result<RegistrationId, InitError> {
        let mut supplies = self
            .supplies
            .lock()
            .map_err(|_| InitError::Fatal("supply registry poisoned".into()))?;
        if supplies.values().any(|s| s.name() == supply.name()) {
            return Err(InitError::Fatal(format!(
                "supply '{}' already registered",
                supply.name()
            )));
        }
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(name = supply.name(), id = id.0, "supply registered");
        supplies.insert(id, supply);
        Ok(id)
    }

    fn unregister(&self, id: RegistrationId) {
        let removed = match self.supplies.lock() {
            Ok(mut supplies) => supplies.remove(&id),
            Err(_) => None,
        };
        if let Some(supply) = removed {
            tracing::debug!(name = supply.name(), id = id.0, "supply unregistered");
        }
    }
}
