//! C layout of the ADBC driver ABI (`adbc.h`, revision 1.1.0).
//!
//! Every struct here is `#[repr(C)]` and shared with drivers compiled in any
//! language. The manager only ever reads driver tables; the helpers for
//! writing errors and partitions exist so in-process drivers (and the test
//! fixtures) can produce ABI values without hand-rolling the allocations.
//!
//! The columnar handles (`ArrowSchema`, `ArrowArray`, `ArrowArrayStream`)
//! come from `arrow_array::ffi` and `arrow_array::ffi_stream`.

#![allow(non_camel_case_types)]

use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr::{null, null_mut};

use adbc_core::error::{Error, Status};
use arrow_array::ffi::{FFI_ArrowArray, FFI_ArrowSchema};
use arrow_array::ffi_stream::FFI_ArrowArrayStream;

/// Status code returned by every driver entry point.
pub type FFI_AdbcStatusCode = u8;

pub const ADBC_STATUS_OK: FFI_AdbcStatusCode = 0;
pub const ADBC_STATUS_UNKNOWN: FFI_AdbcStatusCode = 1;
pub const ADBC_STATUS_NOT_IMPLEMENTED: FFI_AdbcStatusCode = 2;
pub const ADBC_STATUS_NOT_FOUND: FFI_AdbcStatusCode = 3;
pub const ADBC_STATUS_ALREADY_EXISTS: FFI_AdbcStatusCode = 4;
pub const ADBC_STATUS_INVALID_ARGUMENT: FFI_AdbcStatusCode = 5;
pub const ADBC_STATUS_INVALID_STATE: FFI_AdbcStatusCode = 6;
pub const ADBC_STATUS_INVALID_DATA: FFI_AdbcStatusCode = 7;
pub const ADBC_STATUS_INTEGRITY: FFI_AdbcStatusCode = 8;
pub const ADBC_STATUS_INTERNAL: FFI_AdbcStatusCode = 9;
pub const ADBC_STATUS_IO: FFI_AdbcStatusCode = 10;
pub const ADBC_STATUS_CANCELLED: FFI_AdbcStatusCode = 11;
pub const ADBC_STATUS_TIMEOUT: FFI_AdbcStatusCode = 12;
pub const ADBC_STATUS_UNAUTHENTICATED: FFI_AdbcStatusCode = 13;
pub const ADBC_STATUS_UNAUTHORIZED: FFI_AdbcStatusCode = 14;

/// ABI revision numbers passed to a driver's init function.
pub const ADBC_VERSION_1_0_0: c_int = 1_000_000;
pub const ADBC_VERSION_1_1_0: c_int = 1_001_000;

/// Signature of `AdbcDriverInit` and of driver-specific init symbols.
pub type FFI_AdbcDriverInitFunc = unsafe extern "C" fn(
    version: c_int,
    driver: *mut c_void,
    error: *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode;

/// Maps a raw status code to the `adbc_core` status.
///
/// Unrecognized codes map to [`Status::Unknown`].
pub fn status_from_code(code: FFI_AdbcStatusCode) -> Status {
    match code {
        ADBC_STATUS_OK => Status::Ok,
        ADBC_STATUS_NOT_IMPLEMENTED => Status::NotImplemented,
        ADBC_STATUS_NOT_FOUND => Status::NotFound,
        ADBC_STATUS_ALREADY_EXISTS => Status::AlreadyExists,
        ADBC_STATUS_INVALID_ARGUMENT => Status::InvalidArguments,
        ADBC_STATUS_INVALID_STATE => Status::InvalidState,
        ADBC_STATUS_INVALID_DATA => Status::InvalidData,
        ADBC_STATUS_INTEGRITY => Status::Integrity,
        ADBC_STATUS_INTERNAL => Status::Internal,
        ADBC_STATUS_IO => Status::IO,
        ADBC_STATUS_CANCELLED => Status::Cancelled,
        ADBC_STATUS_TIMEOUT => Status::Timeout,
        ADBC_STATUS_UNAUTHENTICATED => Status::Unauthenticated,
        ADBC_STATUS_UNAUTHORIZED => Status::Unauthorized,
        _ => Status::Unknown,
    }
}

/// Maps an `adbc_core` status to its raw code.
#[allow(unreachable_patterns)]
pub fn status_to_code(status: Status) -> FFI_AdbcStatusCode {
    match status {
        Status::Ok => ADBC_STATUS_OK,
        Status::Unknown => ADBC_STATUS_UNKNOWN,
        Status::NotImplemented => ADBC_STATUS_NOT_IMPLEMENTED,
        Status::NotFound => ADBC_STATUS_NOT_FOUND,
        Status::AlreadyExists => ADBC_STATUS_ALREADY_EXISTS,
        Status::InvalidArguments => ADBC_STATUS_INVALID_ARGUMENT,
        Status::InvalidState => ADBC_STATUS_INVALID_STATE,
        Status::InvalidData => ADBC_STATUS_INVALID_DATA,
        Status::Integrity => ADBC_STATUS_INTEGRITY,
        Status::Internal => ADBC_STATUS_INTERNAL,
        Status::IO => ADBC_STATUS_IO,
        Status::Cancelled => ADBC_STATUS_CANCELLED,
        Status::Timeout => ADBC_STATUS_TIMEOUT,
        Status::Unauthenticated => ADBC_STATUS_UNAUTHENTICATED,
        Status::Unauthorized => ADBC_STATUS_UNAUTHORIZED,
        _ => ADBC_STATUS_UNKNOWN,
    }
}

/// Out-of-band error detail filled in by a failing entry point.
#[repr(C)]
#[derive(Debug)]
pub struct FFI_AdbcError {
    pub message: *mut c_char,
    pub vendor_code: i32,
    /// SQLSTATE, or five NUL bytes when the driver has none.
    pub sqlstate: [c_char; 5],
    pub release: Option<unsafe extern "C" fn(error: *mut FFI_AdbcError)>,
    /// Driver-owned detail storage (1.1.0).
    pub private_data: *mut c_void,
    /// Driver that produced this error (1.1.0), used for detail lookups.
    pub private_driver: *const FFI_AdbcDriver,
}

/// Sentinel vendor code announcing the 1.1.0 error layout to a driver.
pub const ADBC_ERROR_VENDOR_CODE_PRIVATE_DATA: i32 = i32::MIN;

unsafe impl Send for FFI_AdbcError {}

impl FFI_AdbcError {
    /// Creates an empty error with the 1.1.0 layout marker set.
    pub fn empty() -> Self {
        Self {
            message: null_mut(),
            vendor_code: ADBC_ERROR_VENDOR_CODE_PRIVATE_DATA,
            sqlstate: [0; 5],
            release: None,
            private_data: null_mut(),
            private_driver: null(),
        }
    }

    /// Creates an owned error carrying `message`.
    pub fn new(message: &str, vendor_code: i32, sqlstate: [c_char; 5]) -> Self {
        // Interior NULs cannot cross the boundary.
        let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
        Self {
            message: message.into_raw(),
            vendor_code,
            sqlstate,
            release: Some(release_error),
            private_data: null_mut(),
            private_driver: null(),
        }
    }

    /// Creates an empty error bound to `driver`, so 1.1.0 detail lookups work.
    pub fn with_driver(driver: &FFI_AdbcDriver) -> Self {
        Self {
            private_driver: driver,
            ..Self::empty()
        }
    }

    /// Writes `error` into `dest` and returns the matching status code.
    ///
    /// # Safety
    ///
    /// `dest` must be null or valid for writes. Any previous contents of
    /// `dest` are released first.
    pub unsafe fn export(dest: *mut Self, error: &Error) -> FFI_AdbcStatusCode {
        if let Some(dest) = unsafe { dest.as_mut() } {
            *dest = Self::new(&error.message, error.vendor_code, error.sqlstate);
        }
        status_to_code(error.status)
    }

    /// Returns the message, if any.
    pub fn message(&self) -> Option<String> {
        if self.message.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(self.message) }.to_string_lossy().into_owned())
        }
    }

    /// Vendor code with the 1.1.0 marker filtered out.
    pub fn vendor_code(&self) -> i32 {
        if self.vendor_code == ADBC_ERROR_VENDOR_CODE_PRIVATE_DATA {
            0
        } else {
            self.vendor_code
        }
    }
}

impl Drop for FFI_AdbcError {
    fn drop(&mut self) {
        // The callback sees `release` still set and clears it itself.
        if let Some(release) = self.release {
            unsafe { release(self) };
            self.release = None;
        }
    }
}

unsafe extern "C" fn release_error(error: *mut FFI_AdbcError) {
    if let Some(error) = unsafe { error.as_mut() } {
        if !error.message.is_null() {
            drop(unsafe { CString::from_raw(error.message) });
        }
        error.message = null_mut();
        error.release = None;
    }
}

/// One key/value pair of extended error detail (1.1.0).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FFI_AdbcErrorDetail {
    pub key: *const c_char,
    pub value: *const u8,
    pub value_length: usize,
}

/// Driver-side database handle.
#[repr(C)]
#[derive(Debug)]
pub struct FFI_AdbcDatabase {
    pub private_data: *mut c_void,
    pub private_driver: *const FFI_AdbcDriver,
}

/// Driver-side connection handle.
#[repr(C)]
#[derive(Debug)]
pub struct FFI_AdbcConnection {
    pub private_data: *mut c_void,
    pub private_driver: *const FFI_AdbcDriver,
}

/// Driver-side statement handle.
#[repr(C)]
#[derive(Debug)]
pub struct FFI_AdbcStatement {
    pub private_data: *mut c_void,
    pub private_driver: *const FFI_AdbcDriver,
}

macro_rules! empty_handle {
    ($($handle:ident),*) => {
        $(
            impl Default for $handle {
                fn default() -> Self {
                    Self { private_data: null_mut(), private_driver: null() }
                }
            }

            unsafe impl Send for $handle {}
        )*
    };
}

empty_handle!(FFI_AdbcDatabase, FFI_AdbcConnection, FFI_AdbcStatement);

/// Partition descriptors produced by `StatementExecutePartitions`.
#[repr(C)]
#[derive(Debug)]
pub struct FFI_AdbcPartitions {
    pub num_partitions: usize,
    pub partitions: *mut *const u8,
    pub partition_lengths: *const usize,
    pub private_data: *mut c_void,
    pub release: Option<unsafe extern "C" fn(partitions: *mut FFI_AdbcPartitions)>,
}

struct PartitionStorage {
    _owned: Vec<Vec<u8>>,
    pointers: Vec<*const u8>,
    lengths: Vec<usize>,
}

impl Default for FFI_AdbcPartitions {
    fn default() -> Self {
        Self {
            num_partitions: 0,
            partitions: null_mut(),
            partition_lengths: null(),
            private_data: null_mut(),
            release: None,
        }
    }
}

impl FFI_AdbcPartitions {
    /// Copies every descriptor out of the driver-owned buffers.
    pub fn to_vec(&self) -> Vec<Vec<u8>> {
        if self.num_partitions == 0 || self.partitions.is_null() || self.partition_lengths.is_null()
        {
            return Vec::new();
        }
        let pointers = unsafe { std::slice::from_raw_parts(self.partitions, self.num_partitions) };
        let lengths =
            unsafe { std::slice::from_raw_parts(self.partition_lengths, self.num_partitions) };
        pointers
            .iter()
            .zip(lengths)
            .map(|(&ptr, &len)| {
                if ptr.is_null() || len == 0 {
                    Vec::new()
                } else {
                    unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec()
                }
            })
            .collect()
    }
}

impl From<Vec<Vec<u8>>> for FFI_AdbcPartitions {
    fn from(owned: Vec<Vec<u8>>) -> Self {
        let mut storage = Box::new(PartitionStorage {
            pointers: owned.iter().map(|p| p.as_ptr()).collect(),
            lengths: owned.iter().map(Vec::len).collect(),
            _owned: owned,
        });
        Self {
            num_partitions: storage.lengths.len(),
            partitions: storage.pointers.as_mut_ptr(),
            partition_lengths: storage.lengths.as_ptr(),
            private_data: Box::into_raw(storage) as *mut c_void,
            release: Some(release_partitions),
        }
    }
}

impl Drop for FFI_AdbcPartitions {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            unsafe { release(self) };
            self.release = None;
        }
    }
}

unsafe extern "C" fn release_partitions(partitions: *mut FFI_AdbcPartitions) {
    if let Some(partitions) = unsafe { partitions.as_mut() } {
        if !partitions.private_data.is_null() {
            drop(unsafe { Box::from_raw(partitions.private_data as *mut PartitionStorage) });
        }
        partitions.num_partitions = 0;
        partitions.partitions = null_mut();
        partitions.partition_lengths = null();
        partitions.private_data = null_mut();
        partitions.release = None;
    }
}

type DatabaseFn = unsafe extern "C" fn(*mut FFI_AdbcDatabase, *mut FFI_AdbcError) -> FFI_AdbcStatusCode;
type ConnectionFn =
    unsafe extern "C" fn(*mut FFI_AdbcConnection, *mut FFI_AdbcError) -> FFI_AdbcStatusCode;
type StatementFn =
    unsafe extern "C" fn(*mut FFI_AdbcStatement, *mut FFI_AdbcError) -> FFI_AdbcStatusCode;

pub(crate) type GetOptionFn<H> = unsafe extern "C" fn(
    *mut H,
    *const c_char,
    *mut c_char,
    *mut usize,
    *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode;
pub(crate) type GetOptionBytesFn<H> = unsafe extern "C" fn(
    *mut H,
    *const c_char,
    *mut u8,
    *mut usize,
    *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode;
pub(crate) type GetOptionDoubleFn<H> =
    unsafe extern "C" fn(*mut H, *const c_char, *mut f64, *mut FFI_AdbcError) -> FFI_AdbcStatusCode;
pub(crate) type GetOptionIntFn<H> =
    unsafe extern "C" fn(*mut H, *const c_char, *mut i64, *mut FFI_AdbcError) -> FFI_AdbcStatusCode;
pub(crate) type SetOptionFn<H> = unsafe extern "C" fn(
    *mut H,
    *const c_char,
    *const c_char,
    *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode;
pub(crate) type SetOptionBytesFn<H> = unsafe extern "C" fn(
    *mut H,
    *const c_char,
    *const u8,
    usize,
    *mut FFI_AdbcError,
) -> FFI_AdbcStatusCode;
pub(crate) type SetOptionDoubleFn<H> =
    unsafe extern "C" fn(*mut H, *const c_char, f64, *mut FFI_AdbcError) -> FFI_AdbcStatusCode;
pub(crate) type SetOptionIntFn<H> =
    unsafe extern "C" fn(*mut H, *const c_char, i64, *mut FFI_AdbcError) -> FFI_AdbcStatusCode;

/// The driver function table. Fields after `statement_set_substrait_plan`
/// are only read when the driver was initialized at 1.1.0.
#[repr(C)]
#[derive(Debug)]
pub struct FFI_AdbcDriver {
    pub private_data: *mut c_void,
    pub private_manager: *mut c_void,
    pub release:
        Option<unsafe extern "C" fn(*mut FFI_AdbcDriver, *mut FFI_AdbcError) -> FFI_AdbcStatusCode>,

    pub database_init: Option<DatabaseFn>,
    pub database_new: Option<DatabaseFn>,
    pub database_set_option: Option<SetOptionFn<FFI_AdbcDatabase>>,
    pub database_release: Option<DatabaseFn>,

    pub connection_commit: Option<ConnectionFn>,
    pub connection_get_info: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcConnection,
            *const u32,
            usize,
            *mut FFI_ArrowArrayStream,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub connection_get_objects: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcConnection,
            c_int,
            *const c_char,
            *const c_char,
            *const c_char,
            *const *const c_char,
            *const c_char,
            *mut FFI_ArrowArrayStream,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub connection_get_table_schema: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcConnection,
            *const c_char,
            *const c_char,
            *const c_char,
            *mut FFI_ArrowSchema,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub connection_get_table_types: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcConnection,
            *mut FFI_ArrowArrayStream,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub connection_init: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcConnection,
            *mut FFI_AdbcDatabase,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub connection_new: Option<ConnectionFn>,
    pub connection_set_option: Option<SetOptionFn<FFI_AdbcConnection>>,
    pub connection_read_partition: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcConnection,
            *const u8,
            usize,
            *mut FFI_ArrowArrayStream,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub connection_release: Option<ConnectionFn>,
    pub connection_rollback: Option<ConnectionFn>,

    pub statement_bind: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcStatement,
            *mut FFI_ArrowArray,
            *mut FFI_ArrowSchema,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub statement_bind_stream: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcStatement,
            *mut FFI_ArrowArrayStream,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub statement_execute_query: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcStatement,
            *mut FFI_ArrowArrayStream,
            *mut i64,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub statement_execute_partitions: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcStatement,
            *mut FFI_ArrowSchema,
            *mut FFI_AdbcPartitions,
            *mut i64,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub statement_get_parameter_schema: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcStatement,
            *mut FFI_ArrowSchema,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub statement_new: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcConnection,
            *mut FFI_AdbcStatement,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub statement_prepare: Option<StatementFn>,
    pub statement_release: Option<StatementFn>,
    pub statement_set_option: Option<SetOptionFn<FFI_AdbcStatement>>,
    pub statement_set_sql_query: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcStatement,
            *const c_char,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub statement_set_substrait_plan: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcStatement,
            *const u8,
            usize,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,

    pub error_get_detail_count: Option<unsafe extern "C" fn(*const FFI_AdbcError) -> c_int>,
    pub error_get_detail:
        Option<unsafe extern "C" fn(*const FFI_AdbcError, c_int) -> FFI_AdbcErrorDetail>,
    pub error_from_array_stream: Option<
        unsafe extern "C" fn(
            *mut FFI_ArrowArrayStream,
            *mut FFI_AdbcStatusCode,
        ) -> *const FFI_AdbcError,
    >,

    pub database_get_option: Option<GetOptionFn<FFI_AdbcDatabase>>,
    pub database_get_option_bytes: Option<GetOptionBytesFn<FFI_AdbcDatabase>>,
    pub database_get_option_double: Option<GetOptionDoubleFn<FFI_AdbcDatabase>>,
    pub database_get_option_int: Option<GetOptionIntFn<FFI_AdbcDatabase>>,
    pub database_set_option_bytes: Option<SetOptionBytesFn<FFI_AdbcDatabase>>,
    pub database_set_option_double: Option<SetOptionDoubleFn<FFI_AdbcDatabase>>,
    pub database_set_option_int: Option<SetOptionIntFn<FFI_AdbcDatabase>>,

    pub connection_cancel: Option<ConnectionFn>,
    pub connection_get_option: Option<GetOptionFn<FFI_AdbcConnection>>,
    pub connection_get_option_bytes: Option<GetOptionBytesFn<FFI_AdbcConnection>>,
    pub connection_get_option_double: Option<GetOptionDoubleFn<FFI_AdbcConnection>>,
    pub connection_get_option_int: Option<GetOptionIntFn<FFI_AdbcConnection>>,
    pub connection_get_statistics: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcConnection,
            *const c_char,
            *const c_char,
            *const c_char,
            c_char,
            *mut FFI_ArrowArrayStream,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub connection_get_statistic_names: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcConnection,
            *mut FFI_ArrowArrayStream,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub connection_set_option_bytes: Option<SetOptionBytesFn<FFI_AdbcConnection>>,
    pub connection_set_option_double: Option<SetOptionDoubleFn<FFI_AdbcConnection>>,
    pub connection_set_option_int: Option<SetOptionIntFn<FFI_AdbcConnection>>,

    pub statement_cancel: Option<StatementFn>,
    pub statement_execute_schema: Option<
        unsafe extern "C" fn(
            *mut FFI_AdbcStatement,
            *mut FFI_ArrowSchema,
            *mut FFI_AdbcError,
        ) -> FFI_AdbcStatusCode,
    >,
    pub statement_get_option: Option<GetOptionFn<FFI_AdbcStatement>>,
    pub statement_get_option_bytes: Option<GetOptionBytesFn<FFI_AdbcStatement>>,
    pub statement_get_option_double: Option<GetOptionDoubleFn<FFI_AdbcStatement>>,
    pub statement_get_option_int: Option<GetOptionIntFn<FFI_AdbcStatement>>,
    pub statement_set_option_bytes: Option<SetOptionBytesFn<FFI_AdbcStatement>>,
    pub statement_set_option_double: Option<SetOptionDoubleFn<FFI_AdbcStatement>>,
    pub statement_set_option_int: Option<SetOptionIntFn<FFI_AdbcStatement>>,
}

unsafe impl Send for FFI_AdbcDriver {}
unsafe impl Sync for FFI_AdbcDriver {}

impl Default for FFI_AdbcDriver {
    fn default() -> Self {
        Self {
            private_data: null_mut(),
            private_manager: null_mut(),
            release: None,
            database_init: None,
            database_new: None,
            database_set_option: None,
            database_release: None,
            connection_commit: None,
            connection_get_info: None,
            connection_get_objects: None,
            connection_get_table_schema: None,
            connection_get_table_types: None,
            connection_init: None,
            connection_new: None,
            connection_set_option: None,
            connection_read_partition: None,
            connection_release: None,
            connection_rollback: None,
            statement_bind: None,
            statement_bind_stream: None,
            statement_execute_query: None,
            statement_execute_partitions: None,
            statement_get_parameter_schema: None,
            statement_new: None,
            statement_prepare: None,
            statement_release: None,
            statement_set_option: None,
            statement_set_sql_query: None,
            statement_set_substrait_plan: None,
            error_get_detail_count: None,
            error_get_detail: None,
            error_from_array_stream: None,
            database_get_option: None,
            database_get_option_bytes: None,
            database_get_option_double: None,
            database_get_option_int: None,
            database_set_option_bytes: None,
            database_set_option_double: None,
            database_set_option_int: None,
            connection_cancel: None,
            connection_get_option: None,
            connection_get_option_bytes: None,
            connection_get_option_double: None,
            connection_get_option_int: None,
            connection_get_statistics: None,
            connection_get_statistic_names: None,
            connection_set_option_bytes: None,
            connection_set_option_double: None,
            connection_set_option_int: None,
            statement_cancel: None,
            statement_execute_schema: None,
            statement_get_option: None,
            statement_get_option_bytes: None,
            statement_get_option_double: None,
            statement_get_option_int: None,
            statement_set_option_bytes: None,
            statement_set_option_double: None,
            statement_set_option_int: None,
        }
    }
}

/// Byte size of the 1.0.0 prefix of [`FFI_AdbcDriver`].
///
/// A 1.0.0 driver may only write this many bytes during init.
pub const ADBC_DRIVER_1_0_0_SIZE: usize = std::mem::offset_of!(FFI_AdbcDriver, error_get_detail_count);
