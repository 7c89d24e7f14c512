//! Manager configuration.
//!
//! Controls where bare driver names are searched for and which ABI revision
//! is requested from drivers first.

use std::path::PathBuf;

use adbc_core::options::AdbcVersion;

/// Environment variable holding extra driver directories (platform path list).
pub const DRIVER_PATH_ENV: &str = "ADBC_DRIVER_PATH";

/// Environment variable selecting the requested ABI revision (`1.0.0` or `1.1.0`).
pub const VERSION_ENV: &str = "ADBC_DRIVER_MANAGER_VERSION";

/// Settings for driver resolution.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Directories searched, in order, for `<prefix><name><suffix>`.
    pub search_paths: Vec<PathBuf>,
    /// Highest ABI revision requested. Drivers that reject 1.1.0 are retried at 1.0.0.
    pub version: AdbcVersion,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            version: AdbcVersion::V110,
        }
    }
}

impl ManagerConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(paths) = lookup(DRIVER_PATH_ENV) {
            config.search_paths = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(version) = lookup(VERSION_ENV) {
            match parse_version(&version) {
                Some(v) => config.version = v,
                None => tracing::warn!(value = %version, "ignoring unknown ADBC version"),
            }
        }
        config
    }

    /// Appends a driver search directory.
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Sets the requested ABI revision.
    pub fn with_version(mut self, version: AdbcVersion) -> Self {
        self.version = version;
        self
    }
}

/// Parses `1.0.0` / `1.1.0`.
pub fn parse_version(value: &str) -> Option<AdbcVersion> {
    match value.trim() {
        "1.0.0" | "1000000" => Some(AdbcVersion::V100),
        "1.1.0" | "1001000" => Some(AdbcVersion::V110),
        _ => None,
    }
}
