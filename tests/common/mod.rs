//! Common utilities for integration tests.
//!
//! Hosts an in-process ADBC driver written against the raw ABI. It keeps
//! tables in memory per database and understands a handful of queries:
//!
//! - `SELECT 1`
//! - `SELECT ?` echoes the bound parameters
//! - `SELECT * FROM <table>`
//! - `DELETE FROM <table>`
//! - `SELECT SLEEP` spins until cancelled
//!
//! Ingestion, transactions, partitions and the metadata calls are backed by
//! the same catalog. Every release is recorded per database URI so tests can
//! check that each handle is released exactly once.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_int, c_void};
use std::ptr::null_mut;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError};
use std::time::{Duration, Instant};

use adbc_core::error::{Error, Status};
use adbc_manager::ffi::{
    ADBC_STATUS_OK, ADBC_VERSION_1_0_0, ADBC_VERSION_1_1_0, FFI_AdbcConnection,
    FFI_AdbcDatabase, FFI_AdbcDriver, FFI_AdbcError, FFI_AdbcPartitions, FFI_AdbcStatement,
    FFI_AdbcStatusCode,
};
use adbc_manager::metadata::{
    self, CatalogObjects, ColumnObjects, DbSchemaObjects, InfoValue, TableObjects,
};
use adbc_manager::options::{self, IngestMode};
use adbc_manager::{DatabaseBuilder, DriverRegistry, ManagedDatabase};
use arrow_array::ffi::{FFI_ArrowArray, FFI_ArrowSchema, from_ffi};
use arrow_array::ffi_stream::{ArrowArrayStreamReader, FFI_ArrowArrayStream};
use arrow_array::{
    Int64Array, RecordBatch, RecordBatchIterator, RecordBatchReader, StringArray, StructArray,
};
use arrow_schema::{ArrowError, DataType, Field, Schema, SchemaRef};

/// Name the reference driver is registered under.
pub const REFERENCE: &str = "reference";

/// Same driver, but refusing to initialize at 1.1.0.
pub const REFERENCE_V100: &str = "reference_v100";

/// URI fragment that makes `DatabaseInit` fail.
pub const FAIL_INIT: &str = "fail-init";

/// Connection option that makes `ConnectionInit` fail.
pub const FAIL_CONNECT_OPTION: &str = "reference.fail_connect";

const CATALOG: &str = "memory";
const DB_SCHEMA: &str = "main";

static REGISTER: Once = Once::new();
static NEXT_URI: AtomicUsize = AtomicUsize::new(0);
static RELEASES: Mutex<Vec<(String, &'static str)>> = Mutex::new(Vec::new());
static DRIVER_RELEASES: AtomicUsize = AtomicUsize::new(0);

/// Initializes tracing output for tests. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Registers the reference drivers with the global registry.
pub fn register() {
    REGISTER.call_once(|| {
        let _ = dotenvy::dotenv();
        init_tracing();
        let registry = DriverRegistry::global();
        registry.register_static(REFERENCE, reference_init);
        registry.register_static(REFERENCE_V100, reference_init_v100);
    });
}

/// Returns a URI no other test uses.
pub fn unique_uri(tag: &str) -> String {
    format!("memory://{}-{}", tag, NEXT_URI.fetch_add(1, Ordering::SeqCst))
}

/// Opens a database on the reference driver.
pub fn open_database(uri: &str) -> ManagedDatabase {
    open_database_on(REFERENCE, uri)
}

/// Opens a database on one of the registered reference drivers.
pub fn open_database_on(driver: &str, uri: &str) -> ManagedDatabase {
    register();
    DatabaseBuilder::new()
        .driver(driver)
        .option(options::URI, uri)
        .expect("Failed to set uri")
        .init()
        .expect("Failed to open database")
}

/// How many times the driver released a handle of `kind` under `uri`.
pub fn releases(uri: &str, kind: &str) -> usize {
    RELEASES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .filter(|(u, k)| u == uri && *k == kind)
        .count()
}

/// How many driver tables were released so far.
pub fn driver_releases() -> usize {
    DRIVER_RELEASES.load(Ordering::SeqCst)
}

/// Two-column batch used by most tests.
pub fn sample_batch(ids: &[i64], names: &[&str]) -> RecordBatch {
    RecordBatch::try_new(
        sample_schema(),
        vec![
            Arc::new(Int64Array::from(ids.to_vec())),
            Arc::new(StringArray::from(names.to_vec())),
        ],
    )
    .expect("Failed to build sample batch")
}

pub fn sample_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
    ]))
}

/// Row count across a set of batches.
pub fn total_rows(batches: &[RecordBatch]) -> usize {
    batches.iter().map(RecordBatch::num_rows).sum()
}

// Driver state

#[derive(Debug, Clone)]
enum Stored {
    Text(String),
    Bytes(Vec<u8>),
    Int(i64),
    Double(f64),
}

#[derive(Debug, Clone)]
struct Table {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

type Catalog = HashMap<String, Table>;

#[derive(Default)]
struct DatabaseState {
    options: HashMap<String, Stored>,
    catalog: Arc<Mutex<Catalog>>,
    initialized: bool,
}

impl DatabaseState {
    fn uri(&self) -> String {
        match self.options.get(options::URI) {
            Some(Stored::Text(uri)) => uri.clone(),
            _ => String::new(),
        }
    }
}

struct ConnectionState {
    uri: String,
    catalog: Option<Arc<Mutex<Catalog>>>,
    autocommit: bool,
    // Uncommitted copy of the catalog while a transaction is open.
    working: Option<Catalog>,
    options: HashMap<String, Stored>,
}

impl ConnectionState {
    fn with_catalog<R>(&mut self, f: impl FnOnce(&mut Catalog) -> R) -> Result<R, Error> {
        if let Some(working) = self.working.as_mut() {
            return Ok(f(working));
        }
        let shared = self.catalog.as_ref().ok_or_else(uninitialized)?;
        Ok(f(&mut lock(shared)))
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<(), Error> {
        self.autocommit = enabled;
        let Some(shared) = self.catalog.clone() else {
            return Ok(());
        };
        match (enabled, self.working.take()) {
            // Turning autocommit back on commits the open transaction.
            (true, Some(working)) => *lock(&shared) = working,
            (false, None) => self.working = Some(lock(&shared).clone()),
            (_, working) => self.working = working,
        }
        Ok(())
    }
}

struct StatementState {
    query: Option<String>,
    prepared: bool,
    target: Option<String>,
    mode: IngestMode,
    bound: Option<(SchemaRef, Vec<RecordBatch>)>,
    options: HashMap<String, Stored>,
}

struct StatementHandle {
    connection: Arc<Mutex<ConnectionState>>,
    cancelled: AtomicBool,
    state: Mutex<StatementState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record_release(uri: String, kind: &'static str) {
    RELEASES
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push((uri, kind));
}

// Error plumbing

fn err(status: Status, message: impl Into<String>) -> Error {
    Error::with_message_and_status(message, status)
}

fn with_sqlstate(mut error: Error, code: &[u8; 5]) -> Error {
    error.sqlstate = std::array::from_fn(|i| code[i] as c_char);
    error
}

fn uninitialized() -> Error {
    err(Status::InvalidState, "Handle is not initialized")
}

fn table_not_found(name: &str) -> Error {
    with_sqlstate(
        err(Status::NotFound, format!("Table '{}' does not exist", name)),
        b"42S02",
    )
}

fn arrow(e: ArrowError) -> Error {
    err(Status::Internal, e.to_string())
}

fn respond(error: *mut FFI_AdbcError, result: Result<(), Error>) -> FFI_AdbcStatusCode {
    match result {
        Ok(()) => ADBC_STATUS_OK,
        Err(e) => unsafe { FFI_AdbcError::export(error, &e) },
    }
}

unsafe fn text(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

unsafe fn key(ptr: *const c_char) -> Result<String, Error> {
    unsafe { text(ptr) }.ok_or_else(|| err(Status::InvalidArguments, "Option key is null"))
}

unsafe fn database<'a>(raw: *mut FFI_AdbcDatabase) -> Result<&'a Mutex<DatabaseState>, Error> {
    let raw = unsafe { raw.as_ref() }.ok_or_else(uninitialized)?;
    unsafe { (raw.private_data as *const Mutex<DatabaseState>).as_ref() }.ok_or_else(uninitialized)
}

unsafe fn connection<'a>(
    raw: *mut FFI_AdbcConnection,
) -> Result<&'a Arc<Mutex<ConnectionState>>, Error> {
    let raw = unsafe { raw.as_ref() }.ok_or_else(uninitialized)?;
    unsafe { (raw.private_data as *const Arc<Mutex<ConnectionState>>).as_ref() }
        .ok_or_else(uninitialized)
}

unsafe fn statement<'a>(raw: *mut FFI_AdbcStatement) -> Result<&'a StatementHandle, Error> {
    let raw = unsafe { raw.as_ref() }.ok_or_else(uninitialized)?;
    unsafe { (raw.private_data as *const StatementHandle).as_ref() }.ok_or_else(uninitialized)
}

// Output helpers

unsafe fn write_stream(
    out: *mut FFI_ArrowArrayStream,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
) -> Result<(), Error> {
    if out.is_null() {
        return Err(err(Status::InvalidArguments, "Output stream is null"));
    }
    let reader = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
    unsafe { std::ptr::write(out, FFI_ArrowArrayStream::new(Box::new(reader))) };
    Ok(())
}

unsafe fn write_schema(out: *mut FFI_ArrowSchema, schema: &Schema) -> Result<(), Error> {
    if out.is_null() {
        return Err(err(Status::InvalidArguments, "Output schema is null"));
    }
    let exported = FFI_ArrowSchema::try_from(schema).map_err(arrow)?;
    unsafe { std::ptr::write(out, exported) };
    Ok(())
}

unsafe fn write_string(value: &str, out: *mut c_char, length: *mut usize) -> Result<(), Error> {
    let length = unsafe { length.as_mut() }
        .ok_or_else(|| err(Status::InvalidArguments, "Length is null"))?;
    let needed = value.len() + 1;
    if needed <= *length && !out.is_null() {
        unsafe {
            std::ptr::copy_nonoverlapping(value.as_ptr() as *const c_char, out, value.len());
            *out.add(value.len()) = 0;
        }
    }
    *length = needed;
    Ok(())
}

unsafe fn write_bytes(value: &[u8], out: *mut u8, length: *mut usize) -> Result<(), Error> {
    let length = unsafe { length.as_mut() }
        .ok_or_else(|| err(Status::InvalidArguments, "Length is null"))?;
    if value.len() <= *length && !out.is_null() {
        unsafe { std::ptr::copy_nonoverlapping(value.as_ptr(), out, value.len()) };
    }
    *length = value.len();
    Ok(())
}

fn lookup<'a>(options: &'a HashMap<String, Stored>, key: &str) -> Result<&'a Stored, Error> {
    options
        .get(key)
        .ok_or_else(|| err(Status::NotFound, format!("Unknown option '{}'", key)))
}

fn wrong_type(key: &str) -> Error {
    err(Status::InvalidArguments, format!("Option '{}' has a different type", key))
}

// Driver

unsafe extern "C" fn driver_release(
    driver: *mut FFI_AdbcDriver,
    _error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    if let Some(driver) = unsafe { driver.as_mut() } {
        driver.release = None;
    }
    DRIVER_RELEASES.fetch_add(1, Ordering::SeqCst);
    ADBC_STATUS_OK
}

/// Init function of the reference driver. Accepts 1.0.0 and 1.1.0.
pub unsafe extern "C" fn reference_init(
    version: c_int,
    raw: *mut c_void,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    if version != ADBC_VERSION_1_0_0 && version != ADBC_VERSION_1_1_0 {
        return respond(
            error,
            Err(err(Status::NotImplemented, format!("Unsupported ADBC version {}", version))),
        );
    }
    let Some(driver) = (unsafe { (raw as *mut FFI_AdbcDriver).as_mut() }) else {
        return respond(error, Err(err(Status::InvalidArguments, "Driver table is null")));
    };

    driver.release = Some(driver_release);
    driver.database_new = Some(database_new);
    driver.database_init = Some(database_init);
    driver.database_set_option = Some(database_set_option);
    driver.database_release = Some(database_release);
    driver.connection_new = Some(connection_new);
    driver.connection_init = Some(connection_init);
    driver.connection_set_option = Some(connection_set_option);
    driver.connection_release = Some(connection_release);
    driver.connection_commit = Some(connection_commit);
    driver.connection_rollback = Some(connection_rollback);
    driver.connection_get_info = Some(connection_get_info);
    driver.connection_get_objects = Some(connection_get_objects);
    driver.connection_get_table_schema = Some(connection_get_table_schema);
    driver.connection_get_table_types = Some(connection_get_table_types);
    driver.connection_read_partition = Some(connection_read_partition);
    driver.statement_new = Some(statement_new);
    driver.statement_release = Some(statement_release);
    driver.statement_set_option = Some(statement_set_option);
    driver.statement_set_sql_query = Some(statement_set_sql_query);
    driver.statement_prepare = Some(statement_prepare);
    driver.statement_bind = Some(statement_bind);
    driver.statement_bind_stream = Some(statement_bind_stream);
    driver.statement_execute_query = Some(statement_execute_query);
    driver.statement_execute_partitions = Some(statement_execute_partitions);
    driver.statement_get_parameter_schema = Some(statement_get_parameter_schema);

    if version >= ADBC_VERSION_1_1_0 {
        driver.database_get_option = Some(database_get_option);
        driver.database_get_option_int = Some(database_get_option_int);
        driver.database_set_option_int = Some(database_set_option_int);
        driver.connection_get_option = Some(connection_get_option);
        driver.statement_get_option = Some(statement_get_option);
        driver.statement_get_option_int = Some(statement_get_option_int);
        driver.statement_get_option_double = Some(statement_get_option_double);
        driver.statement_get_option_bytes = Some(statement_get_option_bytes);
        driver.statement_set_option_int = Some(statement_set_option_int);
        driver.statement_set_option_double = Some(statement_set_option_double);
        driver.statement_set_option_bytes = Some(statement_set_option_bytes);
        driver.statement_execute_schema = Some(statement_execute_schema);
        driver.statement_cancel = Some(statement_cancel);
    }
    ADBC_STATUS_OK
}

/// Init function that only speaks 1.0.0.
pub unsafe extern "C" fn reference_init_v100(
    version: c_int,
    raw: *mut c_void,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    if version != ADBC_VERSION_1_0_0 {
        return respond(
            error,
            Err(err(Status::NotImplemented, "Only ADBC 1.0.0 is supported")),
        );
    }
    unsafe { reference_init(version, raw, error) }
}

// Database

unsafe extern "C" fn database_new(
    raw: *mut FFI_AdbcDatabase,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let Some(raw) = (unsafe { raw.as_mut() }) else {
        return respond(error, Err(uninitialized()));
    };
    raw.private_data = Box::into_raw(Box::new(Mutex::new(DatabaseState::default()))) as *mut c_void;
    ADBC_STATUS_OK
}

unsafe extern "C" fn database_set_option(
    raw: *mut FFI_AdbcDatabase,
    key: *const c_char,
    value: *const c_char,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let state = unsafe { database(raw) }?;
        let key = unsafe { self::key(key) }?;
        let value = unsafe { text(value) }.unwrap_or_default();
        let mut state = lock(state);
        if state.initialized && key == options::URI {
            return Err(err(Status::InvalidState, "Cannot change uri after init"));
        }
        state.options.insert(key, Stored::Text(value));
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn database_set_option_int(
    raw: *mut FFI_AdbcDatabase,
    key: *const c_char,
    value: i64,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let state = unsafe { database(raw) }?;
        let key = unsafe { self::key(key) }?;
        lock(state).options.insert(key, Stored::Int(value));
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn database_get_option(
    raw: *mut FFI_AdbcDatabase,
    key: *const c_char,
    value: *mut c_char,
    length: *mut usize,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let state = lock(unsafe { database(raw) }?);
        let key = unsafe { self::key(key) }?;
        match lookup(&state.options, &key)? {
            Stored::Text(text) => unsafe { write_string(text, value, length) },
            _ => Err(wrong_type(&key)),
        }
    })();
    respond(error, result)
}

unsafe extern "C" fn database_get_option_int(
    raw: *mut FFI_AdbcDatabase,
    key: *const c_char,
    value: *mut i64,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let state = lock(unsafe { database(raw) }?);
        let key = unsafe { self::key(key) }?;
        match lookup(&state.options, &key)? {
            Stored::Int(v) => {
                unsafe { *value = *v };
                Ok(())
            }
            _ => Err(wrong_type(&key)),
        }
    })();
    respond(error, result)
}

unsafe extern "C" fn database_init(
    raw: *mut FFI_AdbcDatabase,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let mut state = lock(unsafe { database(raw) }?);
        let uri = state.uri();
        if uri.is_empty() {
            return Err(err(Status::InvalidArguments, "Must provide 'uri'"));
        }
        if uri.contains(FAIL_INIT) {
            return Err(with_sqlstate(
                err(Status::IO, format!("Cannot open {}", uri)),
                b"08001",
            ));
        }
        state.initialized = true;
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn database_release(
    raw: *mut FFI_AdbcDatabase,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let Some(raw) = (unsafe { raw.as_mut() }) else {
        return respond(error, Err(uninitialized()));
    };
    if raw.private_data.is_null() {
        return respond(error, Err(err(Status::InvalidState, "Database already released")));
    }
    let state = unsafe { Box::from_raw(raw.private_data as *mut Mutex<DatabaseState>) };
    raw.private_data = null_mut();
    record_release(lock(&state).uri(), "database");
    ADBC_STATUS_OK
}

// Connection

unsafe extern "C" fn connection_new(
    raw: *mut FFI_AdbcConnection,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let Some(raw) = (unsafe { raw.as_mut() }) else {
        return respond(error, Err(uninitialized()));
    };
    let state = Arc::new(Mutex::new(ConnectionState {
        uri: String::new(),
        catalog: None,
        autocommit: true,
        working: None,
        options: HashMap::new(),
    }));
    raw.private_data = Box::into_raw(Box::new(state)) as *mut c_void;
    ADBC_STATUS_OK
}

unsafe extern "C" fn connection_set_option(
    raw: *mut FFI_AdbcConnection,
    key: *const c_char,
    value: *const c_char,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let mut state = lock(unsafe { connection(raw) }?);
        let key = unsafe { self::key(key) }?;
        let value = unsafe { text(value) }.unwrap_or_default();
        if key == options::AUTOCOMMIT {
            // Numeric spellings are accepted too, as some drivers do.
            let enabled = match value.as_str() {
                options::OPTION_VALUE_ENABLED | "1" => true,
                options::OPTION_VALUE_DISABLED | "0" => false,
                other => {
                    return Err(err(
                        Status::InvalidArguments,
                        format!("Invalid autocommit value '{}'", other),
                    ));
                }
            };
            return state.set_autocommit(enabled);
        }
        state.options.insert(key, Stored::Text(value));
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn connection_get_option(
    raw: *mut FFI_AdbcConnection,
    key: *const c_char,
    value: *mut c_char,
    length: *mut usize,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let state = lock(unsafe { connection(raw) }?);
        let key = unsafe { self::key(key) }?;
        if key == options::AUTOCOMMIT {
            return unsafe { write_string(options::flag(state.autocommit), value, length) };
        }
        match lookup(&state.options, &key)? {
            Stored::Text(text) => unsafe { write_string(text, value, length) },
            _ => Err(wrong_type(&key)),
        }
    })();
    respond(error, result)
}

unsafe extern "C" fn connection_init(
    raw: *mut FFI_AdbcConnection,
    database_raw: *mut FFI_AdbcDatabase,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let db = lock(unsafe { database(database_raw) }?);
        if !db.initialized {
            return Err(err(Status::InvalidState, "Database is not initialized"));
        }
        let mut state = lock(unsafe { connection(raw) }?);
        state.uri = db.uri();
        if state.options.contains_key(FAIL_CONNECT_OPTION) {
            return Err(err(Status::Unauthenticated, "Connection refused"));
        }
        state.catalog = Some(Arc::clone(&db.catalog));
        let autocommit = state.autocommit;
        state.set_autocommit(autocommit)
    })();
    respond(error, result)
}

unsafe extern "C" fn connection_release(
    raw: *mut FFI_AdbcConnection,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let Some(raw) = (unsafe { raw.as_mut() }) else {
        return respond(error, Err(uninitialized()));
    };
    if raw.private_data.is_null() {
        return respond(error, Err(err(Status::InvalidState, "Connection already released")));
    }
    let state = unsafe { Box::from_raw(raw.private_data as *mut Arc<Mutex<ConnectionState>>) };
    raw.private_data = null_mut();
    let uri = lock(&state).uri.clone();
    record_release(uri, "connection");
    ADBC_STATUS_OK
}

unsafe extern "C" fn connection_commit(
    raw: *mut FFI_AdbcConnection,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let state = lock(unsafe { connection(raw) }?);
        let shared = state.catalog.clone().ok_or_else(uninitialized)?;
        let working = state
            .working
            .as_ref()
            .ok_or_else(|| err(Status::InvalidState, "No transaction is open"))?;
        *lock(&shared) = working.clone();
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn connection_rollback(
    raw: *mut FFI_AdbcConnection,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let mut state = lock(unsafe { connection(raw) }?);
        let shared = state.catalog.clone().ok_or_else(uninitialized)?;
        if state.working.is_none() {
            return Err(err(Status::InvalidState, "No transaction is open"));
        }
        state.working = Some(lock(&shared).clone());
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn connection_get_info(
    raw: *mut FFI_AdbcConnection,
    _codes: *const u32,
    _len: usize,
    out: *mut FFI_ArrowArrayStream,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    // Always returns everything, with a repeated code; the caller filters.
    let result = (|| -> Result<(), Error> {
        unsafe { connection(raw) }?;
        let entries = vec![
            (0, InfoValue::from("Reference")),
            (1, InfoValue::from("1.0")),
            (100, InfoValue::from("Reference Driver")),
            (101, InfoValue::from(env!("CARGO_PKG_VERSION"))),
            (103, InfoValue::Int64(i64::from(ADBC_VERSION_1_1_0))),
            (0, InfoValue::from("Shadowed")),
        ];
        let batch = metadata::encode_info(&entries).map_err(arrow)?;
        unsafe { write_stream(out, metadata::info_schema(), vec![batch]) }
    })();
    respond(error, result)
}

fn matches_pattern(pattern: Option<&str>, value: &str) -> bool {
    match pattern {
        None | Some("%") => true,
        Some(pattern) => match pattern.strip_suffix('%') {
            Some(prefix) => value.starts_with(prefix),
            None => pattern == value,
        },
    }
}

fn table_objects(
    catalog: &Catalog,
    depth: c_int,
    table_name: Option<&str>,
    table_types: Option<&[String]>,
    column_name: Option<&str>,
) -> Vec<TableObjects> {
    if table_types.is_some_and(|types| !types.iter().any(|t| t == "table")) {
        return Vec::new();
    }
    let mut names: Vec<&String> = catalog
        .keys()
        .filter(|name| matches_pattern(table_name, name))
        .collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let columns = (depth == 0).then(|| {
                catalog[name]
                    .schema
                    .fields()
                    .iter()
                    .enumerate()
                    .filter(|(_, field)| matches_pattern(column_name, field.name()))
                    .map(|(i, field)| ColumnObjects {
                        column_name: field.name().clone(),
                        ordinal_position: Some(i as i32 + 1),
                        xdbc_type_name: Some(field.data_type().to_string()),
                        xdbc_nullable: Some(i16::from(field.is_nullable())),
                        xdbc_is_nullable: Some(
                            if field.is_nullable() { "YES" } else { "NO" }.to_string(),
                        ),
                        ..Default::default()
                    })
                    .collect()
            });
            TableObjects {
                table_name: name.clone(),
                table_type: "table".to_string(),
                columns,
                constraints: (depth == 0).then(Vec::new),
            }
        })
        .collect()
}

unsafe extern "C" fn connection_get_objects(
    raw: *mut FFI_AdbcConnection,
    depth: c_int,
    catalog: *const c_char,
    db_schema: *const c_char,
    table_name: *const c_char,
    table_type: *const *const c_char,
    column_name: *const c_char,
    out: *mut FFI_ArrowArrayStream,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let catalog_filter = unsafe { text(catalog) };
        let schema_filter = unsafe { text(db_schema) };
        let table_filter = unsafe { text(table_name) };
        let column_filter = unsafe { text(column_name) };
        let mut table_types = None;
        if !table_type.is_null() {
            let mut types = Vec::new();
            let mut cursor = table_type;
            while let Some(name) = unsafe { text(*cursor) } {
                types.push(name);
                cursor = unsafe { cursor.add(1) };
            }
            table_types = Some(types);
        }

        let mut state = lock(unsafe { connection(raw) }?);
        let catalogs = if matches_pattern(catalog_filter.as_deref(), CATALOG) {
            let db_schemas = (depth != 1).then(|| {
                if !matches_pattern(schema_filter.as_deref(), DB_SCHEMA) {
                    return Ok(Vec::new());
                }
                let tables = if depth == 2 {
                    None
                } else {
                    Some(state.with_catalog(|catalog| {
                        table_objects(
                            catalog,
                            depth,
                            table_filter.as_deref(),
                            table_types.as_deref(),
                            column_filter.as_deref(),
                        )
                    })?)
                };
                Ok::<_, Error>(vec![DbSchemaObjects {
                    db_schema_name: Some(DB_SCHEMA.to_string()),
                    tables,
                }])
            });
            vec![CatalogObjects {
                catalog_name: Some(CATALOG.to_string()),
                db_schemas: db_schemas.transpose()?,
            }]
        } else {
            Vec::new()
        };
        let batch = metadata::encode_objects(&catalogs).map_err(arrow)?;
        unsafe { write_stream(out, metadata::objects_schema(), vec![batch]) }
    })();
    respond(error, result)
}

unsafe extern "C" fn connection_get_table_schema(
    raw: *mut FFI_AdbcConnection,
    _catalog: *const c_char,
    _db_schema: *const c_char,
    table_name: *const c_char,
    out: *mut FFI_ArrowSchema,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let name = unsafe { text(table_name) }
            .ok_or_else(|| err(Status::InvalidArguments, "Table name is null"))?;
        let mut state = lock(unsafe { connection(raw) }?);
        let schema = state
            .with_catalog(|catalog| catalog.get(&name).map(|t| Arc::clone(&t.schema)))?
            .ok_or_else(|| table_not_found(&name))?;
        unsafe { write_schema(out, &schema) }
    })();
    respond(error, result)
}

unsafe extern "C" fn connection_get_table_types(
    raw: *mut FFI_AdbcConnection,
    out: *mut FFI_ArrowArrayStream,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        unsafe { connection(raw) }?;
        let batch = metadata::encode_table_types(&["table", "view"]).map_err(arrow)?;
        unsafe { write_stream(out, metadata::table_types_schema(), vec![batch]) }
    })();
    respond(error, result)
}

/// Descriptors look like `<table>:<batch index>`.
fn parse_partition(descriptor: &[u8]) -> Result<(String, usize), Error> {
    let malformed = || err(Status::InvalidArguments, "Malformed partition descriptor");
    let descriptor = std::str::from_utf8(descriptor).map_err(|_| malformed())?;
    let (table, index) = descriptor.rsplit_once(':').ok_or_else(malformed)?;
    let index = index.parse().map_err(|_| malformed())?;
    Ok((table.to_string(), index))
}

unsafe extern "C" fn connection_read_partition(
    raw: *mut FFI_AdbcConnection,
    partition: *const u8,
    length: usize,
    out: *mut FFI_ArrowArrayStream,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let descriptor = if partition.is_null() {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(partition, length) }
        };
        let (name, index) = parse_partition(descriptor)?;
        let mut state = lock(unsafe { connection(raw) }?);
        let (schema, batch) = state
            .with_catalog(|catalog| {
                catalog
                    .get(&name)
                    .map(|t| (Arc::clone(&t.schema), t.batches.get(index).cloned()))
            })?
            .ok_or_else(|| table_not_found(&name))?;
        let batch = batch.ok_or_else(|| err(Status::NotFound, "Partition no longer exists"))?;
        unsafe { write_stream(out, schema, vec![batch]) }
    })();
    respond(error, result)
}

// Statement

unsafe extern "C" fn statement_new(
    connection_raw: *mut FFI_AdbcConnection,
    raw: *mut FFI_AdbcStatement,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let connection = Arc::clone(unsafe { connection(connection_raw) }?);
        let raw = unsafe { raw.as_mut() }.ok_or_else(uninitialized)?;
        let handle = StatementHandle {
            connection,
            cancelled: AtomicBool::new(false),
            state: Mutex::new(StatementState {
                query: None,
                prepared: false,
                target: None,
                mode: IngestMode::Create,
                bound: None,
                options: HashMap::new(),
            }),
        };
        raw.private_data = Box::into_raw(Box::new(handle)) as *mut c_void;
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_release(
    raw: *mut FFI_AdbcStatement,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let Some(raw) = (unsafe { raw.as_mut() }) else {
        return respond(error, Err(uninitialized()));
    };
    if raw.private_data.is_null() {
        return respond(error, Err(err(Status::InvalidState, "Statement already released")));
    }
    let handle = unsafe { Box::from_raw(raw.private_data as *mut StatementHandle) };
    raw.private_data = null_mut();
    let uri = lock(&handle.connection).uri.clone();
    record_release(uri, "statement");
    ADBC_STATUS_OK
}

unsafe extern "C" fn statement_set_sql_query(
    raw: *mut FFI_AdbcStatement,
    query: *const c_char,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let mut state = lock(&handle.state);
        state.query = unsafe { text(query) };
        state.target = None;
        state.prepared = false;
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_prepare(
    raw: *mut FFI_AdbcStatement,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let mut state = lock(&handle.state);
        if state.query.is_none() {
            return Err(err(Status::InvalidState, "No query to prepare"));
        }
        state.prepared = true;
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_set_option(
    raw: *mut FFI_AdbcStatement,
    key: *const c_char,
    value: *const c_char,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let key = unsafe { self::key(key) }?;
        let value = unsafe { text(value) }.unwrap_or_default();
        let mut state = lock(&handle.state);
        match key.as_str() {
            options::INGEST_TARGET_TABLE => {
                state.target = Some(value);
                state.query = None;
                state.prepared = false;
            }
            options::INGEST_MODE => {
                state.mode = IngestMode::parse(&value).ok_or_else(|| {
                    err(Status::InvalidArguments, format!("Unknown ingest mode '{}'", value))
                })?;
            }
            _ => {
                state.options.insert(key, Stored::Text(value));
            }
        }
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_set_option_int(
    raw: *mut FFI_AdbcStatement,
    key: *const c_char,
    value: i64,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let key = unsafe { self::key(key) }?;
        lock(&handle.state).options.insert(key, Stored::Int(value));
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_set_option_double(
    raw: *mut FFI_AdbcStatement,
    key: *const c_char,
    value: f64,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let key = unsafe { self::key(key) }?;
        lock(&handle.state).options.insert(key, Stored::Double(value));
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_set_option_bytes(
    raw: *mut FFI_AdbcStatement,
    key: *const c_char,
    value: *const u8,
    length: usize,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let key = unsafe { self::key(key) }?;
        let bytes = if value.is_null() {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(value, length) }.to_vec()
        };
        lock(&handle.state).options.insert(key, Stored::Bytes(bytes));
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_get_option(
    raw: *mut FFI_AdbcStatement,
    key: *const c_char,
    value: *mut c_char,
    length: *mut usize,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let key = unsafe { self::key(key) }?;
        let state = lock(&handle.state);
        match key.as_str() {
            options::INGEST_TARGET_TABLE => {
                let target = state
                    .target
                    .as_deref()
                    .ok_or_else(|| err(Status::NotFound, "No ingest target set"))?;
                unsafe { write_string(target, value, length) }
            }
            options::INGEST_MODE => unsafe { write_string(state.mode.as_str(), value, length) },
            _ => match lookup(&state.options, &key)? {
                Stored::Text(text) => unsafe { write_string(text, value, length) },
                _ => Err(wrong_type(&key)),
            },
        }
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_get_option_bytes(
    raw: *mut FFI_AdbcStatement,
    key: *const c_char,
    value: *mut u8,
    length: *mut usize,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let key = unsafe { self::key(key) }?;
        let state = lock(&handle.state);
        match lookup(&state.options, &key)? {
            Stored::Bytes(bytes) => unsafe { write_bytes(bytes, value, length) },
            _ => Err(wrong_type(&key)),
        }
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_get_option_int(
    raw: *mut FFI_AdbcStatement,
    key: *const c_char,
    value: *mut i64,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let key = unsafe { self::key(key) }?;
        let state = lock(&handle.state);
        match lookup(&state.options, &key)? {
            Stored::Int(v) => {
                unsafe { *value = *v };
                Ok(())
            }
            _ => Err(wrong_type(&key)),
        }
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_get_option_double(
    raw: *mut FFI_AdbcStatement,
    key: *const c_char,
    value: *mut f64,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let key = unsafe { self::key(key) }?;
        let state = lock(&handle.state);
        match lookup(&state.options, &key)? {
            Stored::Double(v) => {
                unsafe { *value = *v };
                Ok(())
            }
            _ => Err(wrong_type(&key)),
        }
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_bind(
    raw: *mut FFI_AdbcStatement,
    array: *mut FFI_ArrowArray,
    schema: *mut FFI_ArrowSchema,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        if array.is_null() || schema.is_null() {
            return Err(err(Status::InvalidArguments, "Bind needs an array and a schema"));
        }
        let array = unsafe { FFI_ArrowArray::from_raw(array) };
        let schema = unsafe { FFI_ArrowSchema::from_raw(schema) };
        let data = unsafe { from_ffi(array, &schema) }.map_err(arrow)?;
        let batch = RecordBatch::from(StructArray::from(data));
        lock(&handle.state).bound = Some((batch.schema(), vec![batch]));
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_bind_stream(
    raw: *mut FFI_AdbcStatement,
    stream: *mut FFI_ArrowArrayStream,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        if stream.is_null() {
            return Err(err(Status::InvalidArguments, "Bind stream is null"));
        }
        let reader = unsafe { ArrowArrayStreamReader::from_raw(stream) }.map_err(arrow)?;
        let schema = reader.schema();
        let batches = reader.collect::<Result<Vec<_>, _>>().map_err(arrow)?;
        lock(&handle.state).bound = Some((schema, batches));
        Ok(())
    })();
    respond(error, result)
}

enum Outcome {
    Rows(SchemaRef, Vec<RecordBatch>),
    Affected(i64),
}

fn ingest(
    connection: &Mutex<ConnectionState>,
    target: &str,
    mode: IngestMode,
    bound: Option<(SchemaRef, Vec<RecordBatch>)>,
) -> Result<Outcome, Error> {
    let (schema, batches) =
        bound.ok_or_else(|| err(Status::InvalidState, "Ingestion needs bound data"))?;
    let rows = total_rows(&batches) as i64;
    lock(connection).with_catalog(|catalog| {
        let exists = catalog.contains_key(target);
        match mode {
            IngestMode::Create if exists => {
                return Err(with_sqlstate(
                    err(Status::AlreadyExists, format!("Table '{}' already exists", target)),
                    b"42S01",
                ));
            }
            IngestMode::Append if !exists => return Err(table_not_found(target)),
            IngestMode::Append | IngestMode::CreateAppend if exists => {
                let table = catalog.get_mut(target).ok_or_else(|| table_not_found(target))?;
                if table.schema.fields() != schema.fields() {
                    return Err(err(
                        Status::InvalidArguments,
                        format!("Data does not match the schema of '{}'", target),
                    ));
                }
                table.batches.extend(batches);
                return Ok(());
            }
            _ => {}
        }
        catalog.insert(target.to_string(), Table { schema, batches });
        Ok(())
    })??;
    Ok(Outcome::Affected(rows))
}

fn run_sql(handle: &StatementHandle, state: &StatementState, sql: &str) -> Result<Outcome, Error> {
    let normalized = sql.trim();
    let upper = normalized.to_ascii_uppercase();
    if upper == "SELECT 1" {
        let schema = Arc::new(Schema::new(vec![Field::new("1", DataType::Int64, false)]));
        let batch = RecordBatch::try_new(Arc::clone(&schema), vec![Arc::new(Int64Array::from(vec![1]))])
            .map_err(arrow)?;
        return Ok(Outcome::Rows(schema, vec![batch]));
    }
    if upper == "SELECT ?" {
        let (schema, batches) = state
            .bound
            .clone()
            .ok_or_else(|| err(Status::InvalidState, "No parameters bound"))?;
        return Ok(Outcome::Rows(schema, batches));
    }
    if upper == "SELECT SLEEP" {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if handle.cancelled.swap(false, Ordering::SeqCst) {
                return Err(err(Status::Cancelled, "Query was cancelled"));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        return Err(err(Status::Timeout, "Query timed out"));
    }
    if upper.starts_with("SELECT * FROM ") {
        let name = normalized["SELECT * FROM ".len()..].trim().to_string();
        let table = lock(&handle.connection)
            .with_catalog(|catalog| catalog.get(&name).cloned())?
            .ok_or_else(|| table_not_found(&name))?;
        return Ok(Outcome::Rows(table.schema, table.batches));
    }
    if upper.starts_with("DELETE FROM ") {
        let name = normalized["DELETE FROM ".len()..].trim().to_string();
        let removed = lock(&handle.connection)
            .with_catalog(|catalog| {
                catalog
                    .get_mut(&name)
                    .map(|table| total_rows(&std::mem::take(&mut table.batches)))
            })?
            .ok_or_else(|| table_not_found(&name))?;
        return Ok(Outcome::Affected(removed as i64));
    }
    Err(with_sqlstate(
        err(Status::InvalidArguments, format!("Unsupported query: {}", sql)),
        b"42000",
    ))
}

fn execute(handle: &StatementHandle) -> Result<Outcome, Error> {
    let mut state = lock(&handle.state);
    if let Some(target) = state.target.clone() {
        let bound = state.bound.take();
        return ingest(&handle.connection, &target, state.mode, bound);
    }
    let sql = state
        .query
        .clone()
        .ok_or_else(|| err(Status::InvalidState, "No query set"))?;
    run_sql(handle, &state, &sql)
}

unsafe extern "C" fn statement_execute_query(
    raw: *mut FFI_AdbcStatement,
    out: *mut FFI_ArrowArrayStream,
    rows_affected: *mut i64,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let (schema, batches, rows) = match execute(handle)? {
            Outcome::Rows(schema, batches) => (schema, batches, -1),
            Outcome::Affected(rows) => (Arc::new(Schema::empty()), Vec::new(), rows),
        };
        if let Some(rows_affected) = unsafe { rows_affected.as_mut() } {
            *rows_affected = rows;
        }
        if out.is_null() {
            return Ok(());
        }
        unsafe { write_stream(out, schema, batches) }
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_execute_schema(
    raw: *mut FFI_AdbcStatement,
    out: *mut FFI_ArrowSchema,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let sql = lock(&handle.state)
            .query
            .clone()
            .ok_or_else(|| err(Status::InvalidState, "No query set"))?;
        if !sql.trim().to_ascii_uppercase().starts_with("SELECT") {
            return Err(err(Status::NotImplemented, "Only SELECT queries have a schema"));
        }
        match execute(handle)? {
            Outcome::Rows(schema, _) => unsafe { write_schema(out, &schema) },
            Outcome::Affected(_) => Err(err(Status::NotImplemented, "Query returns no rows")),
        }
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_get_parameter_schema(
    raw: *mut FFI_AdbcStatement,
    out: *mut FFI_ArrowSchema,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let state = lock(&handle.state);
        if !state.prepared {
            return Err(err(Status::InvalidState, "Statement is not prepared"));
        }
        let placeholders = state.query.as_deref().unwrap_or_default().matches('?').count();
        let fields: Vec<Field> = (0..placeholders)
            .map(|i| Field::new(i.to_string(), DataType::Null, true))
            .collect();
        unsafe { write_schema(out, &Schema::new(fields)) }
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_execute_partitions(
    raw: *mut FFI_AdbcStatement,
    schema_out: *mut FFI_ArrowSchema,
    partitions: *mut FFI_AdbcPartitions,
    rows_affected: *mut i64,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        let sql = lock(&handle.state)
            .query
            .clone()
            .ok_or_else(|| err(Status::InvalidState, "No query set"))?;
        if !sql.trim().to_ascii_uppercase().starts_with("SELECT * FROM ") {
            return Err(err(Status::NotImplemented, "Only table scans can be partitioned"));
        }
        let name = sql.trim()["SELECT * FROM ".len()..].trim().to_string();
        let table = lock(&handle.connection)
            .with_catalog(|catalog| catalog.get(&name).cloned())?
            .ok_or_else(|| table_not_found(&name))?;
        let descriptors: Vec<Vec<u8>> = (0..table.batches.len())
            .map(|i| format!("{}:{}", name, i).into_bytes())
            .collect();

        let partitions = unsafe { partitions.as_mut() }
            .ok_or_else(|| err(Status::InvalidArguments, "Partitions output is null"))?;
        unsafe { write_schema(schema_out, &table.schema) }?;
        *partitions = FFI_AdbcPartitions::from(descriptors);
        if let Some(rows_affected) = unsafe { rows_affected.as_mut() } {
            *rows_affected = -1;
        }
        Ok(())
    })();
    respond(error, result)
}

unsafe extern "C" fn statement_cancel(
    raw: *mut FFI_AdbcStatement,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode {
    let result = (|| -> Result<(), Error> {
        let handle = unsafe { statement(raw) }?;
        handle.cancelled.store(true, Ordering::SeqCst);
        Ok(())
    })();
    respond(error, result)
}
