//! Driver function tables and the strategies that produce them.
//!
//! A [`ManagedDriver`] owns one initialized `AdbcDriver` table and, for
//! dynamically loaded drivers, the shared library it came from. Clones share
//! the table; the library stays mapped until the last clone (and every
//! handle created through it) is gone.

use std::ffi::{CString, c_char, c_int, c_void};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use adbc_core::error::{Error, Result, Status};
use adbc_core::options::{AdbcVersion, OptionValue};
use adbc_core::{Driver, Optionable};

use crate::database::ManagedDatabase;
use crate::error::{ManagerError, check_status, nul_error, not_implemented};
use crate::ffi::{
    ADBC_STATUS_NOT_IMPLEMENTED, ADBC_VERSION_1_0_0, ADBC_VERSION_1_1_0, FFI_AdbcDatabase,
    FFI_AdbcDriver, FFI_AdbcDriverInitFunc, FFI_AdbcError, FFI_AdbcConnection, FFI_AdbcStatement,
    GetOptionBytesFn, GetOptionDoubleFn, GetOptionFn, GetOptionIntFn, SetOptionBytesFn,
    SetOptionDoubleFn, SetOptionFn, SetOptionIntFn,
};
use crate::lifecycle::HandleKind;

/// Symbol tried when no driver-specific entrypoint resolves.
pub const DEFAULT_ENTRYPOINT: &str = "AdbcDriverInit";

/// Calls one entry point of a driver table and converts its status.
///
/// Missing entry points yield `NOT_IMPLEMENTED` without a call.
macro_rules! driver_call {
    ($driver:expr, $kind:expr, $entry:ident ( $($arg:expr),* $(,)? )) => {{
        let driver: &$crate::driver::ManagedDriver = $driver;
        match driver.table().$entry {
            None => Err($crate::error::not_implemented(stringify!($entry), $kind)),
            Some(func) => {
                let mut error = driver.new_error();
                let status = unsafe { func($($arg,)* &mut error) };
                $crate::error::check_status(status, error, $kind)
            }
        }
    }};
}

pub(crate) use driver_call;

pub(crate) fn version_code(version: AdbcVersion) -> c_int {
    #[allow(unreachable_patterns)]
    match version {
        AdbcVersion::V100 => ADBC_VERSION_1_0_0,
        AdbcVersion::V110 => ADBC_VERSION_1_1_0,
        _ => ADBC_VERSION_1_1_0,
    }
}

struct DriverInner {
    table: Box<FFI_AdbcDriver>,
    version: c_int,
    name: String,
    // Dropped after `table` is released.
    _library: Option<libloading::Library>,
}

impl Drop for DriverInner {
    fn drop(&mut self) {
        let Some(release) = self.table.release else {
            return;
        };
        let mut error = FFI_AdbcError::empty();
        let status = unsafe { release(&mut *self.table, &mut error) };
        if let Err(err) = check_status(status, error, HandleKind::Driver) {
            tracing::warn!(driver = %self.name, error = %err.message, "driver release failed");
        }
    }
}

/// An initialized driver table, shared by every handle created from it.
#[derive(Clone)]
pub struct ManagedDriver {
    inner: Arc<DriverInner>,
}

impl Debug for ManagedDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedDriver")
            .field("name", &self.inner.name)
            .field("version", &self.inner.version)
            .finish()
    }
}

impl ManagedDriver {
    /// Initializes a driver linked into the process.
    pub fn load_static(
        name: &str,
        init: FFI_AdbcDriverInitFunc,
        version: AdbcVersion,
    ) -> std::result::Result<Self, ManagerError> {
        let (table, negotiated) = initialize(name, init, version_code(version))?;
        Self::verified(DriverInner {
            table,
            version: negotiated,
            name: name.to_string(),
            _library: None,
        })
    }

    /// Loads a shared library and initializes the driver it exports.
    ///
    /// With no explicit `entrypoint`, the name derived from the file name is
    /// tried first, then [`DEFAULT_ENTRYPOINT`].
    pub fn load_dynamic(
        path: &Path,
        entrypoint: Option<&str>,
        version: AdbcVersion,
    ) -> std::result::Result<Self, ManagerError> {
        let library = unsafe { libloading::Library::new(path) }.map_err(|e| {
            ManagerError::load(format!("{}: {}", path.display(), e))
        })?;
        let candidates = match entrypoint {
            Some(symbol) => vec![symbol.to_string()],
            None => vec![default_entrypoint(path), DEFAULT_ENTRYPOINT.to_string()],
        };

        let mut init = None;
        for symbol in &candidates {
            match unsafe { library.get::<FFI_AdbcDriverInitFunc>(symbol.as_bytes()) } {
                Ok(func) => {
                    init = Some(*func);
                    break;
                }
                Err(err) => tracing::trace!(symbol = %symbol, error = %err, "entrypoint not found"),
            }
        }
        let init = init.ok_or_else(|| {
            ManagerError::load(format!(
                "{}: none of the entrypoints [{}] were found",
                path.display(),
                candidates.join(", ")
            ))
        })?;

        let name = path.display().to_string();
        let (table, negotiated) = initialize(&name, init, version_code(version))?;
        Self::verified(DriverInner {
            table,
            version: negotiated,
            name,
            _library: Some(library),
        })
    }

    fn verified(inner: DriverInner) -> std::result::Result<Self, ManagerError> {
        let missing = missing_entry_points(&inner.table, inner.version);
        if !missing.is_empty() {
            return Err(ManagerError::invalid_driver(format!(
                "{} does not provide required entry points: {}",
                inner.name,
                missing.join(", ")
            )));
        }
        tracing::debug!(driver = %inner.name, version = inner.version, "loaded driver");
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Name or path the driver was loaded under.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// ABI revision the driver accepted.
    pub fn version(&self) -> AdbcVersion {
        if self.inner.version >= ADBC_VERSION_1_1_0 {
            AdbcVersion::V110
        } else {
            AdbcVersion::V100
        }
    }

    pub(crate) fn table(&self) -> &FFI_AdbcDriver {
        &self.inner.table
    }

    /// Error struct to pass into an entry point.
    pub(crate) fn new_error(&self) -> FFI_AdbcError {
        if self.inner.version >= ADBC_VERSION_1_1_0 {
            FFI_AdbcError::with_driver(self.table())
        } else {
            FFI_AdbcError::empty()
        }
    }

    pub(crate) fn database_options(&self) -> OptionEntries<'_, FFI_AdbcDatabase> {
        let t = self.table();
        OptionEntries {
            driver: self,
            kind: HandleKind::Database,
            set: t.database_set_option,
            set_bytes: t.database_set_option_bytes,
            set_int: t.database_set_option_int,
            set_double: t.database_set_option_double,
            get: t.database_get_option,
            get_bytes: t.database_get_option_bytes,
            get_int: t.database_get_option_int,
            get_double: t.database_get_option_double,
        }
    }

    pub(crate) fn connection_options(&self) -> OptionEntries<'_, FFI_AdbcConnection> {
        let t = self.table();
        OptionEntries {
            driver: self,
            kind: HandleKind::Connection,
            set: t.connection_set_option,
            set_bytes: t.connection_set_option_bytes,
            set_int: t.connection_set_option_int,
            set_double: t.connection_set_option_double,
            get: t.connection_get_option,
            get_bytes: t.connection_get_option_bytes,
            get_int: t.connection_get_option_int,
            get_double: t.connection_get_option_double,
        }
    }

    pub(crate) fn statement_options(&self) -> OptionEntries<'_, FFI_AdbcStatement> {
        let t = self.table();
        OptionEntries {
            driver: self,
            kind: HandleKind::Statement,
            set: t.statement_set_option,
            set_bytes: t.statement_set_option_bytes,
            set_int: t.statement_set_option_int,
            set_double: t.statement_set_option_double,
            get: t.statement_get_option,
            get_bytes: t.statement_get_option_bytes,
            get_int: t.statement_get_option_int,
            get_double: t.statement_get_option_double,
        }
    }
}

impl Driver for ManagedDriver {
    type DatabaseType = ManagedDatabase;

    fn new_database(&mut self) -> Result<Self::DatabaseType> {
        self.new_database_with_opts(std::iter::empty())
    }

    fn new_database_with_opts(
        &mut self,
        opts: impl IntoIterator<Item = (<Self::DatabaseType as Optionable>::Option, OptionValue)>,
    ) -> Result<Self::DatabaseType> {
        let options = opts
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_string(), value))
            .filter(|(key, _)| {
                let reserved = key == crate::options::DRIVER || key == crate::options::ENTRYPOINT;
                if reserved {
                    tracing::debug!(key = %key, "ignoring driver selection option on a loaded driver");
                }
                !reserved
            })
            .collect();
        Ok(ManagedDatabase::open(self.clone(), options)?)
    }
}

/// Runs the init function, retrying at 1.0.0 when 1.1.0 is refused.
fn initialize(
    name: &str,
    init: FFI_AdbcDriverInitFunc,
    requested: c_int,
) -> std::result::Result<(Box<FFI_AdbcDriver>, c_int), ManagerError> {
    let mut version = requested;
    loop {
        let mut table = Box::new(FFI_AdbcDriver::default());
        let mut error = FFI_AdbcError::empty();
        let status = unsafe { init(version, &mut *table as *mut FFI_AdbcDriver as *mut c_void, &mut error) };
        if status == ADBC_STATUS_NOT_IMPLEMENTED && version > ADBC_VERSION_1_0_0 {
            tracing::debug!(driver = %name, version, "driver refused ABI version, retrying with 1.0.0");
            version = ADBC_VERSION_1_0_0;
            continue;
        }
        check_status(status, error, HandleKind::Driver)?;
        return Ok((table, version));
    }
}

/// Entry points every driver must fill in for the revision it accepted.
fn missing_entry_points(table: &FFI_AdbcDriver, version: c_int) -> Vec<&'static str> {
    let mut required = vec![
        ("database_new", table.database_new.is_some()),
        ("database_init", table.database_init.is_some()),
        ("database_set_option", table.database_set_option.is_some()),
        ("database_release", table.database_release.is_some()),
        ("connection_new", table.connection_new.is_some()),
        ("connection_init", table.connection_init.is_some()),
        ("connection_set_option", table.connection_set_option.is_some()),
        ("connection_release", table.connection_release.is_some()),
        ("statement_new", table.statement_new.is_some()),
        ("statement_release", table.statement_release.is_some()),
        ("statement_set_sql_query", table.statement_set_sql_query.is_some()),
        ("statement_execute_query", table.statement_execute_query.is_some()),
    ];
    if version >= ADBC_VERSION_1_1_0 {
        required.extend([
            ("database_get_option", table.database_get_option.is_some()),
            ("connection_get_option", table.connection_get_option.is_some()),
            ("statement_get_option", table.statement_get_option.is_some()),
        ]);
    }
    required
        .into_iter()
        .filter_map(|(name, present)| (!present).then_some(name))
        .collect()
}

/// Derives a driver-specific init symbol from a library file name.
///
/// `libadbc_driver_sqlite.so` becomes `AdbcDriverSqliteInit`, `foo.dll`
/// becomes `AdbcFooInit`.
pub fn default_entrypoint(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = file.strip_prefix(std::env::consts::DLL_PREFIX).unwrap_or(&file);
    let stem = file.split('.').next().unwrap_or_default();

    let camel: String = stem
        .split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect();

    if camel.starts_with("Adbc") {
        format!("{}Init", camel)
    } else {
        format!("Adbc{}Init", camel)
    }
}

/// A way of producing a driver table.
pub trait DriverLoader: Send + Sync + Debug {
    /// Key under which the loaded driver is cached.
    fn identity(&self) -> String;

    fn load(&self, version: AdbcVersion) -> std::result::Result<ManagedDriver, ManagerError>;
}

/// Driver linked into the process and registered by name.
#[derive(Debug, Clone)]
pub struct StaticLoader {
    pub name: String,
    pub init: FFI_AdbcDriverInitFunc,
}

impl DriverLoader for StaticLoader {
    fn identity(&self) -> String {
        self.name.clone()
    }

    fn load(&self, version: AdbcVersion) -> std::result::Result<ManagedDriver, ManagerError> {
        ManagedDriver::load_static(&self.name, self.init, version)
    }
}

/// Driver shared library, named by path or by bare name.
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    pub identifier: String,
    pub entrypoint: Option<String>,
    pub search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Candidate files for the identifier, most specific first.
    ///
    /// A path (anything with a separator or an extension) is used as is. A
    /// bare name is expanded to the platform file name inside each search
    /// directory, then handed to the system loader.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let direct = Path::new(&self.identifier);
        if direct.components().count() > 1 || direct.extension().is_some() {
            return vec![direct.to_path_buf()];
        }
        let file = libloading::library_filename(&self.identifier);
        let mut candidates: Vec<PathBuf> = self
            .search_paths
            .iter()
            .map(|dir| dir.join(&file))
            .filter(|path| path.exists())
            .collect();
        candidates.push(PathBuf::from(file));
        candidates
    }
}

impl DriverLoader for LibraryLoader {
    fn identity(&self) -> String {
        self.identifier.clone()
    }

    fn load(&self, version: AdbcVersion) -> std::result::Result<ManagedDriver, ManagerError> {
        let mut failures = Vec::new();
        for path in self.candidates() {
            match ManagedDriver::load_dynamic(&path, self.entrypoint.as_deref(), version) {
                Ok(driver) => return Ok(driver),
                Err(err) if err.adbc_status() == Status::NotFound => failures.push(err.to_string()),
                Err(err) => return Err(err),
            }
        }
        Err(ManagerError::load(format!(
            "'{}' could not be loaded ({})",
            self.identifier,
            failures.join("; ")
        )))
    }
}

/// Option entry points of one handle class.
pub(crate) struct OptionEntries<'a, H> {
    driver: &'a ManagedDriver,
    kind: HandleKind,
    set: Option<SetOptionFn<H>>,
    set_bytes: Option<SetOptionBytesFn<H>>,
    set_int: Option<SetOptionIntFn<H>>,
    set_double: Option<SetOptionDoubleFn<H>>,
    get: Option<GetOptionFn<H>>,
    get_bytes: Option<GetOptionBytesFn<H>>,
    get_int: Option<GetOptionIntFn<H>>,
    get_double: Option<GetOptionDoubleFn<H>>,
}

const OPTION_BUFFER_LEN: usize = 128;

impl<H> OptionEntries<'_, H> {
    fn missing(&self, entry: &str) -> Error {
        not_implemented(entry, self.kind)
    }

    fn key(&self, key: &str) -> Result<CString> {
        CString::new(key).map_err(|_| nul_error("option key"))
    }

    /// Sets an option on `raw`.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live handle created by this driver.
    pub(crate) unsafe fn set(&self, raw: *mut H, key: &str, value: &OptionValue) -> Result<()> {
        let key = self.key(key)?;
        let mut error = self.driver.new_error();
        #[allow(unreachable_patterns)]
        let status = match value {
            OptionValue::String(value) => {
                let func = self.set.ok_or_else(|| self.missing("set_option"))?;
                let value = CString::new(value.as_str()).map_err(|_| nul_error("option value"))?;
                unsafe { func(raw, key.as_ptr(), value.as_ptr(), &mut error) }
            }
            OptionValue::Bytes(value) => {
                let func = self.set_bytes.ok_or_else(|| self.missing("set_option_bytes"))?;
                unsafe { func(raw, key.as_ptr(), value.as_ptr(), value.len(), &mut error) }
            }
            OptionValue::Int(value) => {
                let func = self.set_int.ok_or_else(|| self.missing("set_option_int"))?;
                unsafe { func(raw, key.as_ptr(), *value, &mut error) }
            }
            OptionValue::Double(value) => {
                let func = self.set_double.ok_or_else(|| self.missing("set_option_double"))?;
                unsafe { func(raw, key.as_ptr(), *value, &mut error) }
            }
            _ => return Err(self.missing("set_option for this value type")),
        };
        check_status(status, error, self.kind)
    }

    /// # Safety
    ///
    /// `raw` must point to a live handle created by this driver.
    pub(crate) unsafe fn get_string(&self, raw: *mut H, key: &str) -> Result<String> {
        let func = self.get.ok_or_else(|| self.missing("get_option"))?;
        let key = self.key(key)?;
        let mut buffer = vec![0 as c_char; OPTION_BUFFER_LEN];
        // The second round always fits: the driver reported the length it needs.
        for _ in 0..2 {
            let mut length = buffer.len();
            let mut error = self.driver.new_error();
            let status =
                unsafe { func(raw, key.as_ptr(), buffer.as_mut_ptr(), &mut length, &mut error) };
            check_status(status, error, self.kind)?;
            if length <= buffer.len() {
                let bytes: Vec<u8> = buffer[..length.saturating_sub(1)]
                    .iter()
                    .map(|&c| c as u8)
                    .collect();
                return String::from_utf8(bytes).map_err(|e| {
                    Error::with_message_and_status(
                        format!("Option value is not valid UTF-8: {}", e),
                        Status::InvalidData,
                    )
                });
            }
            buffer.resize(length, 0);
        }
        Err(Error::with_message_and_status(
            "Driver kept growing the option value",
            Status::Internal,
        ))
    }

    /// # Safety
    ///
    /// `raw` must point to a live handle created by this driver.
    pub(crate) unsafe fn get_bytes(&self, raw: *mut H, key: &str) -> Result<Vec<u8>> {
        let func = self.get_bytes.ok_or_else(|| self.missing("get_option_bytes"))?;
        let key = self.key(key)?;
        let mut buffer = vec![0u8; OPTION_BUFFER_LEN];
        for _ in 0..2 {
            let mut length = buffer.len();
            let mut error = self.driver.new_error();
            let status =
                unsafe { func(raw, key.as_ptr(), buffer.as_mut_ptr(), &mut length, &mut error) };
            check_status(status, error, self.kind)?;
            if length <= buffer.len() {
                buffer.truncate(length);
                return Ok(buffer);
            }
            buffer.resize(length, 0);
        }
        Err(Error::with_message_and_status(
            "Driver kept growing the option value",
            Status::Internal,
        ))
    }

    /// # Safety
    ///
    /// `raw` must point to a live handle created by this driver.
    pub(crate) unsafe fn get_int(&self, raw: *mut H, key: &str) -> Result<i64> {
        let func = self.get_int.ok_or_else(|| self.missing("get_option_int"))?;
        let key = self.key(key)?;
        let mut value = 0i64;
        let mut error = self.driver.new_error();
        let status = unsafe { func(raw, key.as_ptr(), &mut value, &mut error) };
        check_status(status, error, self.kind)?;
        Ok(value)
    }

    /// # Safety
    ///
    /// `raw` must point to a live handle created by this driver.
    pub(crate) unsafe fn get_double(&self, raw: *mut H, key: &str) -> Result<f64> {
        let func = self.get_double.ok_or_else(|| self.missing("get_option_double"))?;
        let key = self.key(key)?;
        let mut value = 0f64;
        let mut error = self.driver.new_error();
        let status = unsafe { func(raw, key.as_ptr(), &mut value, &mut error) };
        check_status(status, error, self.kind)?;
        Ok(value)
    }
}
