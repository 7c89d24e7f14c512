//! Error types for the driver manager.
//!
//! Driver failures travel as [`adbc_core::error::Error`] with the driver's
//! status untouched. Conditions the manager detects on its own (open
//! children, use after close, spent exchange handles, missing options, load
//! failures) are [`ManagerError`]s, which convert into the ADBC error when
//! they cross a trait boundary.

use std::backtrace::Backtrace;
use std::ffi::CStr;
use std::fmt::{Display, Formatter};

use adbc_core::error::{Error, Status};
use arrow_schema::ArrowError;

use crate::ffi::{self, ADBC_STATUS_OK, FFI_AdbcError, FFI_AdbcStatusCode};
use crate::lifecycle::HandleKind;

/// Error detail key naming the handle class that raised an error.
pub const HANDLE_DETAIL_KEY: &str = "adbc.driver_manager.handle";

/// Error detail key set on lifecycle violations.
pub const VIOLATION_DETAIL_KEY: &str = "adbc.driver_manager.violation";

/// Error type for conditions detected by the manager itself.
///
/// Lifecycle violations (`is_open_children`, `is_closed`, `is_spent`) signal a
/// caller bug rather than a runtime condition; the handle that reported one
/// is left untouched.
#[derive(Debug)]
pub struct ManagerError {
    kind: ErrorKind,
    backtrace: Backtrace,
}

impl ManagerError {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// A handle still owns open children.
    pub(crate) fn open_children(handle: HandleKind, child: HandleKind, count: usize) -> Self {
        Self::new(ErrorKind::OpenChildren {
            handle,
            child,
            count,
        })
    }

    /// A handle still has result streams being read.
    pub(crate) fn open_readers(handle: HandleKind, count: usize) -> Self {
        Self::new(ErrorKind::OpenReaders { handle, count })
    }

    /// A handle was used or closed after it was already closed.
    pub(crate) fn closed(handle: HandleKind) -> Self {
        Self::new(ErrorKind::Closed(handle))
    }

    /// A move-once exchange handle was consumed twice.
    pub(crate) fn spent(what: &'static str) -> Self {
        Self::new(ErrorKind::Spent(what))
    }

    /// A required option was never supplied.
    pub(crate) fn missing_option(key: &str) -> Self {
        Self::new(ErrorKind::MissingOption(key.to_string()))
    }

    /// The driver could not be located or its init symbol could not be resolved.
    pub(crate) fn load(msg: String) -> Self {
        Self::new(ErrorKind::Load(msg))
    }

    /// The driver table is missing entry points it promised.
    pub(crate) fn invalid_driver(msg: String) -> Self {
        Self::new(ErrorKind::InvalidDriver(msg))
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Returns true if a close was refused because children or result
    /// streams are still open.
    pub fn is_open_children(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::OpenChildren { .. } | ErrorKind::OpenReaders { .. }
        )
    }

    /// Returns true if the handle was already closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.kind, ErrorKind::Closed(_))
    }

    /// Returns true if an exchange handle was reused after being consumed.
    pub fn is_spent(&self) -> bool {
        matches!(self.kind, ErrorKind::Spent(_))
    }

    /// Returns true for caller bugs: open children, use after close, spent handles.
    pub fn is_lifecycle_violation(&self) -> bool {
        self.is_open_children() || self.is_closed() || self.is_spent()
    }

    /// Returns the driver error when this wraps one.
    pub fn driver_error(&self) -> Option<&Error> {
        match &self.kind {
            ErrorKind::Driver(err) => Some(err),
            _ => None,
        }
    }

    /// Class of the child that blocked a close, if that is what happened.
    pub fn open_child_kind(&self) -> Option<HandleKind> {
        match self.kind {
            ErrorKind::OpenChildren { child, .. } => Some(child),
            _ => None,
        }
    }

    /// Returns the corresponding ADBC status code.
    pub fn adbc_status(&self) -> Status {
        match &self.kind {
            ErrorKind::OpenChildren { .. } => Status::InvalidState,
            ErrorKind::OpenReaders { .. } => Status::InvalidState,
            ErrorKind::Closed(_) => Status::InvalidState,
            ErrorKind::Spent(_) => Status::InvalidState,
            ErrorKind::MissingOption(_) => Status::InvalidArguments,
            ErrorKind::Load(_) => Status::NotFound,
            ErrorKind::InvalidDriver(_) => Status::Internal,
            ErrorKind::Driver(err) => err.status,
        }
    }

    fn violation(&self) -> Option<&'static str> {
        match self.kind {
            ErrorKind::OpenChildren { .. } | ErrorKind::OpenReaders { .. } => Some("open_children"),
            ErrorKind::Closed(_) => Some("closed"),
            ErrorKind::Spent(_) => Some("spent"),
            _ => None,
        }
    }
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::OpenChildren {
                handle,
                child,
                count,
            } => write!(f, "Cannot close {} with open {} ({} open)", handle, child, count),
            ErrorKind::OpenReaders { handle, count } => {
                write!(f, "Cannot close {} with open result streams ({} open)", handle, count)
            }
            ErrorKind::Closed(handle) => write!(f, "{} is already closed", handle),
            ErrorKind::Spent(what) => write!(f, "{} was already consumed", what),
            ErrorKind::MissingOption(key) => write!(f, "Must provide '{}' parameter", key),
            ErrorKind::Load(msg) => write!(f, "Could not load driver: {}", msg),
            ErrorKind::InvalidDriver(msg) => write!(f, "Invalid driver: {}", msg),
            ErrorKind::Driver(err) => write!(f, "{}", err.message),
        }
    }
}

impl std::error::Error for ManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Driver(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    OpenChildren {
        handle: HandleKind,
        child: HandleKind,
        count: usize,
    },
    OpenReaders {
        handle: HandleKind,
        count: usize,
    },
    Closed(HandleKind),
    Spent(&'static str),
    MissingOption(String),
    Load(String),
    InvalidDriver(String),
    Driver(Error),
}

impl From<Error> for ManagerError {
    fn from(err: Error) -> Self {
        Self::new(ErrorKind::Driver(err))
    }
}

impl From<libloading::Error> for ManagerError {
    fn from(err: libloading::Error) -> Self {
        Self::load(err.to_string())
    }
}

/// Converts `ManagerError` to ADBC `Error`, tagging lifecycle violations.
impl From<ManagerError> for Error {
    fn from(err: ManagerError) -> Self {
        let mut details = Vec::new();
        if let Some(violation) = err.violation() {
            details.push((VIOLATION_DETAIL_KEY.to_string(), violation.as_bytes().to_vec()));
        }
        if let ErrorKind::OpenChildren { handle, .. }
        | ErrorKind::OpenReaders { handle, .. }
        | ErrorKind::Closed(handle) = &err.kind
        {
            details.push((HANDLE_DETAIL_KEY.to_string(), handle.to_string().into_bytes()));
        }
        let message = err.to_string();
        let status = err.adbc_status();
        match err.kind {
            ErrorKind::Driver(inner) => inner,
            _ => {
                let mut adbc_err = Error::with_message_and_status(message, status);
                if !details.is_empty() {
                    adbc_err.details = Some(details);
                }
                adbc_err
            }
        }
    }
}

/// Returns true if `err` came from a lifecycle violation rather than a driver.
pub fn is_lifecycle_violation(err: &Error) -> bool {
    err.details
        .as_ref()
        .is_some_and(|details| details.iter().any(|(key, _)| key == VIOLATION_DETAIL_KEY))
}

/// Returns the handle class recorded on `err`, if any.
pub fn raised_by(err: &Error) -> Option<String> {
    err.details.as_ref()?.iter().find_map(|(key, value)| {
        (key == HANDLE_DETAIL_KEY).then(|| String::from_utf8_lossy(value).into_owned())
    })
}

/// Turns a driver status plus its error struct into a `Result`.
///
/// The driver's message and SQLSTATE are copied out; the error struct is
/// released when `error` goes out of scope.
pub(crate) fn check_status(
    status: FFI_AdbcStatusCode,
    error: FFI_AdbcError,
    handle: HandleKind,
) -> adbc_core::error::Result<()> {
    if status == ADBC_STATUS_OK {
        return Ok(());
    }
    let message = error
        .message()
        .unwrap_or_else(|| format!("{} call failed with status {}", handle, status));
    let mut err = Error::with_message_and_status(message, ffi::status_from_code(status));
    err.vendor_code = error.vendor_code();
    err.sqlstate = error.sqlstate;
    err.details = Some(driver_details(&error));
    Err(raised(err, handle))
}

/// Reads 1.1.0 error details through the producing driver, if it offers them.
fn driver_details(error: &FFI_AdbcError) -> Vec<(String, Vec<u8>)> {
    let Some(driver) = (unsafe { error.private_driver.as_ref() }) else {
        return Vec::new();
    };
    let (Some(count), Some(get)) = (driver.error_get_detail_count, driver.error_get_detail) else {
        return Vec::new();
    };
    let count = unsafe { count(error) };
    (0..count)
        .filter_map(|index| {
            let detail = unsafe { get(error, index) };
            if detail.key.is_null() {
                return None;
            }
            let key = unsafe { CStr::from_ptr(detail.key) }.to_string_lossy().into_owned();
            let value = if detail.value.is_null() {
                Vec::new()
            } else {
                unsafe { std::slice::from_raw_parts(detail.value, detail.value_length) }.to_vec()
            };
            Some((key, value))
        })
        .collect()
}

/// Tags an error with the handle class that raised it.
pub(crate) fn raised(mut err: Error, handle: HandleKind) -> Error {
    err.details
        .get_or_insert_with(Vec::new)
        .push((HANDLE_DETAIL_KEY.to_string(), handle.to_string().into_bytes()));
    err
}

/// Error for an entry point the driver does not provide.
pub(crate) fn not_implemented(entry: &str, handle: HandleKind) -> Error {
    raised(
        Error::with_message_and_status(
            format!("Driver does not implement {}", entry),
            Status::NotImplemented,
        ),
        handle,
    )
}

/// Error for a call the manager refuses in the handle's current state.
pub(crate) fn invalid_state(message: impl Into<String>, handle: HandleKind) -> Error {
    raised(Error::with_message_and_status(message, Status::InvalidState), handle)
}

/// Wraps an Arrow failure during import or export.
pub(crate) fn arrow_error(context: &str, err: ArrowError) -> Error {
    Error::with_message_and_status(format!("{}: {}", context, err), Status::Internal)
}

/// Error for strings that cannot cross the boundary.
pub(crate) fn nul_error(what: &str) -> Error {
    Error::with_message_and_status(
        format!("{} must not contain interior NUL bytes", what),
        Status::InvalidArguments,
    )
}
