//! Named driver registry

use super::driver::Driver;
use super::transport::TcpDriver;
use crate::client::descriptor::SCHEME;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Name under which the built-in [`TcpDriver`] is registered
pub const DEFAULT_DRIVER: &str = SCHEME;

/// Drivers keyed by name
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<dyn Driver>>>,
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.names())
            .finish()
    }
}

impl DriverRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `clickhouse` driver
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry
            .drivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(DEFAULT_DRIVER.to_string(), Arc::new(TcpDriver::new()));
        registry
    }

    /// Process-wide registry, created with defaults on first use
    pub fn global() -> &'static DriverRegistry {
        static GLOBAL: OnceLock<DriverRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DriverRegistry::with_defaults)
    }

    /// Register `driver` under `name`
    ///
    /// Fails with [`Error::DriverRegistration`] if the name is taken.
    pub fn register(&self, name: &str, driver: Arc<dyn Driver>) -> Result<()> {
        let mut drivers = self
            .drivers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if drivers.contains_key(name) {
            return Err(Error::DriverRegistration(format!(
                "driver '{}' is already registered",
                name
            )));
        }
        drivers.insert(name.to_string(), driver);
        tracing::debug!(driver = name, "driver registered");
        Ok(())
    }

    /// Look up a driver
    pub fn get(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
