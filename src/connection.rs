//! Managed connections.
//!
//! A connection tracks its transaction mode next to the driver handle. The
//! mode starts as autocommit; disabling autocommit opens an implicit
//! transaction that `commit` and `rollback` end (a new one begins right
//! after). Enabling autocommit again commits pending work, which the driver
//! performs as part of the option change. `commit` and `rollback` in
//! autocommit mode are refused by the manager without a driver call.

#![allow(refining_impl_trait)]

use std::any::Any;
use std::collections::HashSet;
use std::ffi::{CString, c_char, c_int};
use std::ptr::null;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use adbc_core::error::{Error, Result, Status};
use adbc_core::options::{InfoCode, ObjectDepth, OptionConnection, OptionValue};
use adbc_core::{Connection, Optionable};
use arrow_schema::Schema;

use crate::database::DatabaseInner;
use crate::driver::{ManagedDriver, driver_call};
use crate::error::{ManagerError, arrow_error, invalid_state, nul_error, raised};
use crate::exchange::{SchemaHandle, StreamHandle};
use crate::ffi::FFI_AdbcConnection;
use crate::lifecycle::{HandleKind, Node};
use crate::metadata::{self, CatalogObjects, InfoValue};
use crate::options::{self, OPTION_VALUE_DISABLED, OPTION_VALUE_ENABLED};
use crate::reader::{ManagedReader, VecRecordBatchReader};
use crate::statement::ManagedStatement;

/// Transaction state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Every statement commits on its own.
    AutoCommit,
    /// Statements join an implicit transaction until commit or rollback.
    InTransaction,
}

pub(crate) struct ConnectionState {
    mode: TransactionMode,
}

pub(crate) struct ConnectionInner {
    pub(crate) node: Arc<Node>,
    pub(crate) driver: ManagedDriver,
    raw: *mut FFI_AdbcConnection,
    state: Mutex<ConnectionState>,
    // Keeps the database (and its driver handle) alive while connected.
    _database: Arc<DatabaseInner>,
}

// The raw handle is only touched while `state` is held, by cancel, or by `Drop`.
unsafe impl Send for ConnectionInner {}
unsafe impl Sync for ConnectionInner {}

impl ConnectionInner {
    fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the connection and checks that it is still open.
    pub(crate) fn enter(&self) -> Result<MutexGuard<'_, ConnectionState>> {
        let state = self.lock();
        self.node.ensure_open()?;
        Ok(state)
    }

    pub(crate) fn raw(&self) -> *mut FFI_AdbcConnection {
        self.raw
    }

    fn release(&self) -> Result<()> {
        driver_call!(&self.driver, HandleKind::Connection, connection_release(self.raw))
    }

    fn set_option(&self, state: &mut ConnectionState, key: &str, value: &OptionValue) -> Result<()> {
        let autocommit = if key == options::AUTOCOMMIT {
            Some(autocommit_flag(value)?)
        } else {
            None
        };
        unsafe { self.driver.connection_options().set(self.raw, key, value) }?;
        if let Some(enabled) = autocommit {
            let mode = mode_for(enabled);
            if mode != state.mode {
                tracing::debug!(from = ?state.mode, to = ?mode, "transaction mode changed");
            }
            state.mode = mode;
        }
        Ok(())
    }
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        if let Ok(guard) = self.node.guard() {
            tracing::debug!(driver = %self.driver.name(), "releasing AdbcConnection on drop");
            if let Err(err) = guard.release(|| self.release()) {
                tracing::warn!(error = %err, "failed to release AdbcConnection");
            }
        }
        drop(unsafe { Box::from_raw(self.raw) });
    }
}

/// Parses an autocommit value; anything but "true" or "false" is refused
/// before it reaches the driver.
fn autocommit_flag(value: &OptionValue) -> Result<bool> {
    match value {
        OptionValue::String(v) if v == OPTION_VALUE_ENABLED => Ok(true),
        OptionValue::String(v) if v == OPTION_VALUE_DISABLED => Ok(false),
        other => Err(raised(
            Error::with_message_and_status(
                format!(
                    "Invalid value for '{}': {:?} (expected '{}' or '{}')",
                    options::AUTOCOMMIT,
                    other,
                    OPTION_VALUE_ENABLED,
                    OPTION_VALUE_DISABLED
                ),
                Status::InvalidArguments,
            ),
            HandleKind::Connection,
        )),
    }
}

fn mode_for(autocommit: bool) -> TransactionMode {
    if autocommit {
        TransactionMode::AutoCommit
    } else {
        TransactionMode::InTransaction
    }
}

fn optional_cstring(value: Option<&str>, what: &str) -> Result<Option<CString>> {
    value
        .map(|v| CString::new(v).map_err(|_| nul_error(what)))
        .transpose()
}

fn ptr_or_null(value: &Option<CString>) -> *const c_char {
    value.as_ref().map_or(null(), |v| v.as_ptr())
}

/// A connection opened through the manager.
pub struct ManagedConnection {
    inner: Arc<ConnectionInner>,
}

impl ManagedConnection {
    /// Creates a connection under `database`, applying `options` before init.
    pub(crate) fn open(
        database: Arc<DatabaseInner>,
        options: Vec<(String, OptionValue)>,
    ) -> Result<Self> {
        let mode = match options.iter().rev().find(|(key, _)| key == options::AUTOCOMMIT) {
            Some((_, value)) => mode_for(autocommit_flag(value)?),
            None => TransactionMode::AutoCommit,
        };
        let driver = database.driver.clone();
        let _calls = database.lock();
        let mut parent = database.node.guard()?;

        let raw = Box::into_raw(Box::new(FFI_AdbcConnection::default()));
        if let Err(err) = unsafe { construct(&driver, raw, database.raw(), &options) } {
            drop(unsafe { Box::from_raw(raw) });
            return Err(err);
        }
        let node = parent.adopt(HandleKind::Connection);
        drop(parent);

        tracing::debug!(driver = %driver.name(), mode = ?mode, "opened AdbcConnection");

        Ok(Self {
            inner: Arc::new(ConnectionInner {
                node,
                driver,
                raw,
                state: Mutex::new(ConnectionState { mode }),
                _database: Arc::clone(&database),
            }),
        })
    }

    pub fn transaction_mode(&self) -> TransactionMode {
        self.inner.lock().mode
    }

    pub fn autocommit(&self) -> bool {
        self.transaction_mode() == TransactionMode::AutoCommit
    }

    /// Switches autocommit. Enabling it commits the open transaction.
    pub fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        let mut state = self.inner.enter()?;
        self.inner.set_option(
            &mut state,
            options::AUTOCOMMIT,
            &OptionValue::String(options::flag(enabled).to_string()),
        )
    }

    /// Number of statements currently open under this connection.
    pub fn open_statements(&self) -> usize {
        self.inner.node.open_children()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.node.is_released()
    }

    /// Number of metadata or partition streams still being read.
    pub fn open_readers(&self) -> usize {
        self.inner.node.open_readers()
    }

    /// Releases the driver-side connection.
    ///
    /// Refused while statements or result streams are open; the connection
    /// stays usable then.
    pub fn close(&self) -> std::result::Result<(), ManagerError> {
        let _state = self.inner.lock();
        self.inner.node.guard()?.release(|| self.inner.release())
    }

    /// Metadata values as `(code, value)` pairs, one per code.
    ///
    /// With `codes`, only those codes are returned; codes the driver does not
    /// know are left out.
    pub fn info(&self, codes: Option<&HashSet<InfoCode>>) -> Result<Vec<(u32, InfoValue)>> {
        let requested: Option<Vec<u32>> = codes
            .filter(|codes| !codes.is_empty())
            .map(|codes| codes.iter().map(u32::from).collect());
        let (ptr, len) = requested
            .as_ref()
            .map_or((null(), 0), |codes| (codes.as_ptr(), codes.len()));

        let reader = self.owned_stream(|out| {
            driver_call!(
                &self.inner.driver,
                HandleKind::Connection,
                connection_get_info(self.inner.raw, ptr, len, out)
            )
        })?;
        let mut entries = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| arrow_error("Failed to read info", e))?;
            entries.extend(
                metadata::decode_info(&batch).map_err(|e| arrow_error("Malformed info result", e))?,
            );
        }

        let filter: Option<HashSet<u32>> = requested.map(|codes| codes.into_iter().collect());
        Ok(metadata::filter_info(entries, filter.as_ref()))
    }

    /// Catalog tree decoded into plain values.
    pub fn objects(
        &self,
        depth: ObjectDepth,
        catalog: Option<&str>,
        db_schema: Option<&str>,
        table_name: Option<&str>,
        table_type: Option<Vec<&str>>,
        column_name: Option<&str>,
    ) -> Result<Vec<CatalogObjects>> {
        let reader = self.get_objects(depth, catalog, db_schema, table_name, table_type, column_name)?;
        let mut catalogs = Vec::new();
        for batch in reader {
            let batch = batch.map_err(|e| arrow_error("Failed to read objects", e))?;
            catalogs.extend(
                metadata::decode_objects(&batch)
                    .map_err(|e| arrow_error("Malformed objects result", e))?,
            );
        }
        Ok(catalogs)
    }

    /// Table type names as plain strings.
    pub fn table_types(&self) -> Result<Vec<String>> {
        let mut types = Vec::new();
        for batch in self.get_table_types()? {
            let batch = batch.map_err(|e| arrow_error("Failed to read table types", e))?;
            types.extend(
                metadata::decode_table_types(&batch)
                    .map_err(|e| arrow_error("Malformed table types result", e))?,
            );
        }
        Ok(types)
    }

    /// Writes the schema of a table into a caller-provided handle.
    pub fn get_table_schema_into(
        &self,
        catalog: Option<&str>,
        db_schema: Option<&str>,
        table_name: &str,
        out: &mut SchemaHandle,
    ) -> Result<()> {
        let catalog = optional_cstring(catalog, "catalog")?;
        let db_schema = optional_cstring(db_schema, "db_schema")?;
        let table_name = CString::new(table_name).map_err(|_| nul_error("table_name"))?;

        let _state = self.inner.enter()?;
        let ptr = out.producer_ptr()?;
        driver_call!(
            &self.inner.driver,
            HandleKind::Connection,
            connection_get_table_schema(
                self.inner.raw,
                ptr_or_null(&catalog),
                ptr_or_null(&db_schema),
                table_name.as_ptr(),
                ptr,
            )
        )?;
        out.mark_filled();
        Ok(())
    }

    fn owned_stream(
        &self,
        call: impl FnOnce(*mut arrow_array::ffi_stream::FFI_ArrowArrayStream) -> Result<()>,
    ) -> Result<ManagedReader> {
        let lease = self.inner.node.guard()?.lease();
        let mut out = StreamHandle::empty();
        {
            let _state = self.inner.enter()?;
            call(out.producer_ptr()?)?;
            out.mark_filled();
        }
        let owner: Arc<dyn Any + Send + Sync> = self.inner.clone();
        Ok(ManagedReader::new(out.import()?, lease, owner))
    }
}

/// Runs new, option replay and init, releasing the handle if a later step fails.
unsafe fn construct(
    driver: &ManagedDriver,
    raw: *mut FFI_AdbcConnection,
    database: *mut crate::ffi::FFI_AdbcDatabase,
    options: &[(String, OptionValue)],
) -> Result<()> {
    driver_call!(driver, HandleKind::Connection, connection_new(raw))?;
    unsafe { (*raw).private_driver = driver.table() };

    let configured = options
        .iter()
        .try_for_each(|(key, value)| unsafe { driver.connection_options().set(raw, key, value) })
        .and_then(|()| driver_call!(driver, HandleKind::Connection, connection_init(raw, database)));
    if configured.is_err() {
        if let Err(err) = driver_call!(driver, HandleKind::Connection, connection_release(raw)) {
            tracing::warn!(error = %err.message, "failed to release half-built AdbcConnection");
        }
    }
    configured
}

impl Optionable for ManagedConnection {
    type Option = OptionConnection;

    fn set_option(&mut self, key: Self::Option, value: OptionValue) -> Result<()> {
        let mut state = self.inner.enter()?;
        self.inner.set_option(&mut state, key.as_ref(), &value)
    }

    fn get_option_string(&self, key: Self::Option) -> Result<String> {
        let _state = self.inner.enter()?;
        unsafe {
            self.inner
                .driver
                .connection_options()
                .get_string(self.inner.raw, key.as_ref())
        }
    }

    fn get_option_bytes(&self, key: Self::Option) -> Result<Vec<u8>> {
        let _state = self.inner.enter()?;
        unsafe {
            self.inner
                .driver
                .connection_options()
                .get_bytes(self.inner.raw, key.as_ref())
        }
    }

    fn get_option_int(&self, key: Self::Option) -> Result<i64> {
        let _state = self.inner.enter()?;
        unsafe {
            self.inner
                .driver
                .connection_options()
                .get_int(self.inner.raw, key.as_ref())
        }
    }

    fn get_option_double(&self, key: Self::Option) -> Result<f64> {
        let _state = self.inner.enter()?;
        unsafe {
            self.inner
                .driver
                .connection_options()
                .get_double(self.inner.raw, key.as_ref())
        }
    }
}

impl Connection for ManagedConnection {
    type StatementType = ManagedStatement;

    fn new_statement(&mut self) -> Result<Self::StatementType> {
        ManagedStatement::open(Arc::clone(&self.inner))
    }

    /// Cancels the connection's in-flight call, if the driver supports it.
    fn cancel(&mut self) -> Result<()> {
        let guard = self.inner.node.guard()?;
        let result = driver_call!(
            &self.inner.driver,
            HandleKind::Connection,
            connection_cancel(self.inner.raw)
        );
        drop(guard);
        result
    }

    fn get_info(&self, codes: Option<HashSet<InfoCode>>) -> Result<VecRecordBatchReader> {
        let entries = self.info(codes.as_ref())?;
        let batch = metadata::encode_info(&entries)
            .map_err(|e| arrow_error("Failed to encode info", e))?;
        Ok(VecRecordBatchReader::new(vec![batch], metadata::info_schema()))
    }

    fn get_objects(
        &self,
        depth: ObjectDepth,
        catalog: Option<&str>,
        db_schema: Option<&str>,
        table_name: Option<&str>,
        table_type: Option<Vec<&str>>,
        column_name: Option<&str>,
    ) -> Result<ManagedReader> {
        let catalog = optional_cstring(catalog, "catalog")?;
        let db_schema = optional_cstring(db_schema, "db_schema")?;
        let table_name = optional_cstring(table_name, "table_name")?;
        let column_name = optional_cstring(column_name, "column_name")?;
        let table_types: Option<Vec<CString>> = table_type
            .map(|types| {
                types
                    .into_iter()
                    .map(|t| CString::new(t).map_err(|_| nul_error("table_type")))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;
        // Null-terminated array of pointers into `table_types`.
        let table_type_ptrs: Option<Vec<*const c_char>> = table_types.as_ref().map(|types| {
            types
                .iter()
                .map(|t| t.as_ptr())
                .chain(std::iter::once(null()))
                .collect()
        });
        let depth: c_int = depth.into();

        self.owned_stream(|out| {
            driver_call!(
                &self.inner.driver,
                HandleKind::Connection,
                connection_get_objects(
                    self.inner.raw,
                    depth,
                    ptr_or_null(&catalog),
                    ptr_or_null(&db_schema),
                    ptr_or_null(&table_name),
                    table_type_ptrs.as_ref().map_or(null(), |p| p.as_ptr()),
                    ptr_or_null(&column_name),
                    out,
                )
            )
        })
    }

    fn get_table_schema(
        &self,
        catalog: Option<&str>,
        db_schema: Option<&str>,
        table_name: &str,
    ) -> Result<Schema> {
        let mut out = SchemaHandle::empty();
        self.get_table_schema_into(catalog, db_schema, table_name, &mut out)?;
        out.import()
    }

    fn get_table_types(&self) -> Result<ManagedReader> {
        self.owned_stream(|out| {
            driver_call!(
                &self.inner.driver,
                HandleKind::Connection,
                connection_get_table_types(self.inner.raw, out)
            )
        })
    }

    fn get_statistic_names(&self) -> Result<ManagedReader> {
        self.owned_stream(|out| {
            driver_call!(
                &self.inner.driver,
                HandleKind::Connection,
                connection_get_statistic_names(self.inner.raw, out)
            )
        })
    }

    fn get_statistics(
        &self,
        catalog: Option<&str>,
        db_schema: Option<&str>,
        table_name: Option<&str>,
        approximate: bool,
    ) -> Result<ManagedReader> {
        let catalog = optional_cstring(catalog, "catalog")?;
        let db_schema = optional_cstring(db_schema, "db_schema")?;
        let table_name = optional_cstring(table_name, "table_name")?;
        self.owned_stream(|out| {
            driver_call!(
                &self.inner.driver,
                HandleKind::Connection,
                connection_get_statistics(
                    self.inner.raw,
                    ptr_or_null(&catalog),
                    ptr_or_null(&db_schema),
                    ptr_or_null(&table_name),
                    approximate as c_char,
                    out,
                )
            )
        })
    }

    fn commit(&mut self) -> Result<()> {
        let state = self.inner.enter()?;
        if state.mode == TransactionMode::AutoCommit {
            return Err(invalid_state(
                "Cannot commit when autocommit is enabled",
                HandleKind::Connection,
            ));
        }
        driver_call!(
            &self.inner.driver,
            HandleKind::Connection,
            connection_commit(self.inner.raw)
        )
    }

    fn rollback(&mut self) -> Result<()> {
        let state = self.inner.enter()?;
        if state.mode == TransactionMode::AutoCommit {
            return Err(invalid_state(
                "Cannot rollback when autocommit is enabled",
                HandleKind::Connection,
            ));
        }
        driver_call!(
            &self.inner.driver,
            HandleKind::Connection,
            connection_rollback(self.inner.raw)
        )
    }

    /// Opens a fresh stream over one partition.
    ///
    /// The descriptor is passed to the driver untouched; whether it can be
    /// redeemed here is up to the driver.
    fn read_partition(&self, partition: impl AsRef<[u8]>) -> Result<ManagedReader> {
        let partition = partition.as_ref();
        self.owned_stream(|out| {
            driver_call!(
                &self.inner.driver,
                HandleKind::Connection,
                connection_read_partition(self.inner.raw, partition.as_ptr(), partition.len(), out)
            )
        })
    }
}
