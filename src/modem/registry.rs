//! Driver registry: modem name → factory
//!
//! Constructor-injected so tests (and alternative discovery mechanisms)
//! can swap the whole driver population without touching NetworkManager.
//! No process-wide tables.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{HologramError, Result};

use super::ModemDriver;

/// Builds drivers and answers "is this hardware present right now?"
pub trait DriverFactory: Send + Sync {
    /// Probe the host's serial/USB surface for this driver's hardware.
    /// Must be side-effect free and safe to call repeatedly.
    fn detect(&self) -> bool;

    fn build(&self) -> Box<dyn ModemDriver>;
}

/// Registry of discoverable modem drivers. Keys are unique driver names.
#[derive(Default, Clone)]
pub struct ModemRegistry {
    factories: BTreeMap<String, Arc<dyn DriverFactory>>,
}

impl ModemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn DriverFactory>) {
        let name = name.into();
        debug!("Registered modem driver '{}'", name);
        self.factories.insert(name, factory);
    }

    /// All registered driver names, detected or not
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Names whose hardware probe currently answers
    pub fn detect_all(&self) -> Vec<String> {
        self.factories
            .iter()
            .filter(|(_, factory)| factory.detect())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Construct the driver registered under `name`
    pub fn build(&self, name: &str) -> Result<Box<dyn ModemDriver>> {
        self.factories
            .get(name)
            .map(|factory| factory.build())
            .ok_or_else(|| HologramError::UnknownModem(name.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modem::mock::MockFactory;

    #[test]
    fn test_register_and_build() {
        let mut registry = ModemRegistry::new();
        assert!(registry.is_empty());

        registry.register("MockModem", Arc::new(MockFactory::detectable()));
        assert_eq!(registry.names(), vec!["MockModem".to_string()]);
        assert_eq!(registry.detect_all(), vec!["MockModem".to_string()]);

        let driver = registry.build("MockModem").unwrap();
        assert_eq!(driver.name(), "MockModem");
    }

    #[test]
    fn test_unknown_name_errors() {
        let registry = ModemRegistry::new();
        match registry.build("Nova") {
            Err(HologramError::UnknownModem(name)) => assert_eq!(name, "Nova"),
            other => panic!("expected UnknownModem, got {:?}", other.map(|d| d.name().to_string())),
        }
    }

    #[test]
    fn test_undetected_factory_excluded_from_scan() {
        let mut registry = ModemRegistry::new();
        registry.register("MockModem", Arc::new(MockFactory::detectable()));
        registry.register("Ghost", Arc::new(MockFactory::undetectable()));

        assert_eq!(registry.names().len(), 2);
        assert_eq!(registry.detect_all(), vec!["MockModem".to_string()]);
    }
}
