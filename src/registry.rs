//! Process-wide driver registry.
//!
//! Resolution order for an identifier: a driver already loaded under the
//! same identifier and entrypoint, then a statically registered init
//! function, then a shared library. Loaded drivers are cached for the life of
//! the registry and never unloaded while a handle refers to them.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError, RwLock};

use crate::config::ManagerConfig;
use crate::driver::{DriverLoader, LibraryLoader, ManagedDriver, StaticLoader};
use crate::error::ManagerError;
use crate::ffi::FFI_AdbcDriverInitFunc;

type CacheKey = (String, Option<String>);

/// Registry of statically linked drivers and cache of loaded ones.
#[derive(Debug)]
pub struct DriverRegistry {
    config: ManagerConfig,
    statics: RwLock<HashMap<String, FFI_AdbcDriverInitFunc>>,
    cache: Mutex<HashMap<CacheKey, ManagedDriver>>,
}

impl DriverRegistry {
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            statics: RwLock::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The shared registry, configured from the environment on first use.
    pub fn global() -> &'static DriverRegistry {
        static GLOBAL: OnceLock<DriverRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| DriverRegistry::new(ManagerConfig::from_env()))
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Makes an in-process init function resolvable as `name`.
    ///
    /// Re-registering a name replaces the init function for later loads;
    /// drivers already loaded under that name stay cached.
    pub fn register_static(&self, name: impl Into<String>, init: FFI_AdbcDriverInitFunc) {
        let name = name.into();
        tracing::debug!(driver = %name, "registered static driver");
        self.statics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, init);
    }

    /// Resolves an identifier to an initialized driver.
    ///
    /// Loads are serialized; concurrent resolutions of the same identifier
    /// share one driver table.
    pub fn resolve(
        &self,
        identifier: &str,
        entrypoint: Option<&str>,
    ) -> Result<ManagedDriver, ManagerError> {
        let key = (identifier.to_string(), entrypoint.map(str::to_string));
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(driver) = cache.get(&key) {
            return Ok(driver.clone());
        }

        let loader = self.loader(identifier, entrypoint);
        tracing::debug!(loader = ?loader, "loading driver");
        let driver = loader.load(self.config.version)?;
        cache.insert(key, driver.clone());
        Ok(driver)
    }

    fn loader(&self, identifier: &str, entrypoint: Option<&str>) -> Box<dyn DriverLoader> {
        let statics = self.statics.read().unwrap_or_else(PoisonError::into_inner);
        match statics.get(identifier) {
            Some(&init) => Box::new(StaticLoader {
                name: identifier.to_string(),
                init,
            }),
            None => Box::new(LibraryLoader {
                identifier: identifier.to_string(),
                entrypoint: entrypoint.map(str::to_string),
                search_paths: self.config.search_paths.clone(),
            }),
        }
    }

    /// Identifiers of the drivers loaded so far.
    pub fn loaded(&self) -> Vec<String> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = cache.keys().map(|(name, _)| name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}
