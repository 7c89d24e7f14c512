//! Managed database handles.
//!
//! A database is created in two steps, as with the C driver manager: options
//! are collected first (including `driver` and `entrypoint`, which select the
//! driver), then [`DatabaseBuilder::init`] resolves the driver, creates the
//! driver-side handle, replays the buffered options onto it and initializes
//! it. Connections opened from a [`ManagedDatabase`] count as its children.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use adbc_core::error::{Error, Result, Status};
use adbc_core::options::{OptionConnection, OptionDatabase, OptionValue};
use adbc_core::{Database, Optionable};

use crate::connection::ManagedConnection;
use crate::driver::{ManagedDriver, driver_call};
use crate::error::ManagerError;
use crate::ffi::FFI_AdbcDatabase;
use crate::lifecycle::{HandleKind, Node};
use crate::options;
use crate::registry::DriverRegistry;

/// Options for a database whose driver has not been chosen yet.
#[derive(Debug, Default, Clone)]
pub struct DatabaseBuilder {
    driver: Option<String>,
    entrypoint: Option<String>,
    options: Vec<(String, OptionValue)>,
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the driver identifier: a registered name, a library name or a path.
    pub fn driver(mut self, identifier: impl Into<String>) -> Self {
        self.driver = Some(identifier.into());
        self
    }

    /// Sets the init symbol to look up in the driver library.
    pub fn entrypoint(mut self, symbol: impl Into<String>) -> Self {
        self.entrypoint = Some(symbol.into());
        self
    }

    /// Adds an option, builder style.
    pub fn option(mut self, key: impl AsRef<str>, value: impl Into<OptionValue>) -> Result<Self> {
        self.set_option(key, value)?;
        Ok(self)
    }

    /// Records an option. `driver` and `entrypoint` are kept by the manager;
    /// everything else is buffered for the driver.
    pub fn set_option(&mut self, key: impl AsRef<str>, value: impl Into<OptionValue>) -> Result<()> {
        let key = key.as_ref();
        let value = value.into();
        let slot = match key {
            options::DRIVER => &mut self.driver,
            options::ENTRYPOINT => &mut self.entrypoint,
            _ => {
                self.options.retain(|(existing, _)| existing != key);
                self.options.push((key.to_string(), value));
                return Ok(());
            }
        };
        match value {
            OptionValue::String(value) => {
                *slot = Some(value);
                Ok(())
            }
            _ => Err(crate::error::raised(
                Error::with_message_and_status(
                    format!("Option '{}' must be a string", key),
                    Status::InvalidArguments,
                ),
                HandleKind::Database,
            )),
        }
    }

    /// Resolves the driver through the process-wide registry and opens the database.
    pub fn init(self) -> std::result::Result<ManagedDatabase, ManagerError> {
        self.init_with(DriverRegistry::global())
    }

    /// Resolves the driver through `registry` and opens the database.
    pub fn init_with(
        self,
        registry: &DriverRegistry,
    ) -> std::result::Result<ManagedDatabase, ManagerError> {
        let identifier = self
            .driver
            .ok_or_else(|| ManagerError::missing_option(options::DRIVER))?;
        let driver = registry.resolve(&identifier, self.entrypoint.as_deref())?;
        ManagedDatabase::open(driver, self.options)
    }
}

pub(crate) struct DatabaseInner {
    pub(crate) node: Arc<Node>,
    pub(crate) driver: ManagedDriver,
    raw: *mut FFI_AdbcDatabase,
    calls: Mutex<()>,
}

// The raw handle is only touched while `calls` is held, or by `Drop`.
unsafe impl Send for DatabaseInner {}
unsafe impl Sync for DatabaseInner {}

impl DatabaseInner {
    /// Serializes calls into the driver-side handle.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn raw(&self) -> *mut FFI_AdbcDatabase {
        self.raw
    }

    fn release(&self) -> Result<()> {
        driver_call!(&self.driver, HandleKind::Database, database_release(self.raw))
    }
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        if let Ok(guard) = self.node.guard() {
            tracing::debug!(driver = %self.driver.name(), "releasing AdbcDatabase on drop");
            if let Err(err) = guard.release(|| self.release()) {
                tracing::warn!(error = %err, "failed to release AdbcDatabase");
            }
        }
        drop(unsafe { Box::from_raw(self.raw) });
    }
}

/// A database opened through the manager.
///
/// Cloning yields another reference to the same database.
#[derive(Clone)]
pub struct ManagedDatabase {
    inner: Arc<DatabaseInner>,
}

impl ManagedDatabase {
    /// Creates, configures and initializes a database on `driver`.
    pub(crate) fn open(
        driver: ManagedDriver,
        options: Vec<(String, OptionValue)>,
    ) -> std::result::Result<Self, ManagerError> {
        let raw = Box::into_raw(Box::new(FFI_AdbcDatabase::default()));
        if let Err(err) = unsafe { construct(&driver, raw, &options) } {
            drop(unsafe { Box::from_raw(raw) });
            return Err(err.into());
        }
        tracing::debug!(driver = %driver.name(), options = options.len(), "opened AdbcDatabase");
        Ok(Self {
            inner: Arc::new(DatabaseInner {
                node: Node::root(HandleKind::Database),
                driver,
                raw,
                calls: Mutex::new(()),
            }),
        })
    }

    /// Driver this database was opened on.
    pub fn driver(&self) -> &ManagedDriver {
        &self.inner.driver
    }

    /// Number of connections currently open under this database.
    pub fn open_connections(&self) -> usize {
        self.inner.node.open_children()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.node.is_released()
    }

    /// Releases the driver-side database.
    ///
    /// Refused while connections are open; the database stays usable then.
    pub fn close(&self) -> std::result::Result<(), ManagerError> {
        let _calls = self.inner.lock();
        self.inner.node.guard()?.release(|| self.inner.release())
    }

    /// Opens a connection with string-keyed options.
    pub fn connect(
        &self,
        options: impl IntoIterator<Item = (String, OptionValue)>,
    ) -> Result<ManagedConnection> {
        ManagedConnection::open(Arc::clone(&self.inner), options.into_iter().collect())
    }
}

/// Runs new, option replay and init, releasing the handle if a later step fails.
unsafe fn construct(
    driver: &ManagedDriver,
    raw: *mut FFI_AdbcDatabase,
    options: &[(String, OptionValue)],
) -> Result<()> {
    driver_call!(driver, HandleKind::Database, database_new(raw))?;
    unsafe { (*raw).private_driver = driver.table() };

    let configured = options
        .iter()
        .try_for_each(|(key, value)| unsafe { driver.database_options().set(raw, key, value) })
        .and_then(|()| driver_call!(driver, HandleKind::Database, database_init(raw)));
    if configured.is_err() {
        if let Err(err) = driver_call!(driver, HandleKind::Database, database_release(raw)) {
            tracing::warn!(error = %err.message, "failed to release half-built AdbcDatabase");
        }
    }
    configured
}

impl Optionable for ManagedDatabase {
    type Option = OptionDatabase;

    fn set_option(&mut self, key: Self::Option, value: OptionValue) -> Result<()> {
        let _calls = self.inner.lock();
        self.inner.node.ensure_open()?;
        unsafe {
            self.inner
                .driver
                .database_options()
                .set(self.inner.raw, key.as_ref(), &value)
        }
    }

    fn get_option_string(&self, key: Self::Option) -> Result<String> {
        let _calls = self.inner.lock();
        self.inner.node.ensure_open()?;
        unsafe {
            self.inner
                .driver
                .database_options()
                .get_string(self.inner.raw, key.as_ref())
        }
    }

    fn get_option_bytes(&self, key: Self::Option) -> Result<Vec<u8>> {
        let _calls = self.inner.lock();
        self.inner.node.ensure_open()?;
        unsafe {
            self.inner
                .driver
                .database_options()
                .get_bytes(self.inner.raw, key.as_ref())
        }
    }

    fn get_option_int(&self, key: Self::Option) -> Result<i64> {
        let _calls = self.inner.lock();
        self.inner.node.ensure_open()?;
        unsafe {
            self.inner
                .driver
                .database_options()
                .get_int(self.inner.raw, key.as_ref())
        }
    }

    fn get_option_double(&self, key: Self::Option) -> Result<f64> {
        let _calls = self.inner.lock();
        self.inner.node.ensure_open()?;
        unsafe {
            self.inner
                .driver
                .database_options()
                .get_double(self.inner.raw, key.as_ref())
        }
    }
}

impl Database for ManagedDatabase {
    type ConnectionType = ManagedConnection;

    fn new_connection(&self) -> Result<Self::ConnectionType> {
        self.new_connection_with_opts(std::iter::empty())
    }

    fn new_connection_with_opts(
        &self,
        opts: impl IntoIterator<Item = (OptionConnection, OptionValue)>,
    ) -> Result<Self::ConnectionType> {
        self.connect(
            opts.into_iter()
                .map(|(key, value)| (key.as_ref().to_string(), value)),
        )
    }
}
