//! Reserved option keys understood by the manager.

use adbc_core::options::OptionValue;

/// Database option naming the driver to load. Consumed by the manager.
pub const DRIVER: &str = "driver";

/// Database option naming the driver's init symbol. Consumed by the manager.
pub const ENTRYPOINT: &str = "entrypoint";

pub const URI: &str = "uri";

pub const AUTOCOMMIT: &str = "adbc.connection.autocommit";

pub const OPTION_VALUE_ENABLED: &str = "true";
pub const OPTION_VALUE_DISABLED: &str = "false";

pub const INGEST_TARGET_TABLE: &str = "adbc.ingest.target_table";
pub const INGEST_MODE: &str = "adbc.ingest.mode";

/// Ingestion behavior for bulk loads through `execute_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// Create the table; fail if it exists.
    #[default]
    Create,
    /// Append to an existing table; fail if it is missing.
    Append,
    /// Drop and recreate the table.
    Replace,
    /// Create the table if missing, then append.
    CreateAppend,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestMode::Create => "adbc.ingest.mode.create",
            IngestMode::Append => "adbc.ingest.mode.append",
            IngestMode::Replace => "adbc.ingest.mode.replace",
            IngestMode::CreateAppend => "adbc.ingest.mode.create_append",
        }
    }

    /// Parses an option value back into a mode.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "adbc.ingest.mode.create" => Some(IngestMode::Create),
            "adbc.ingest.mode.append" => Some(IngestMode::Append),
            "adbc.ingest.mode.replace" => Some(IngestMode::Replace),
            "adbc.ingest.mode.create_append" => Some(IngestMode::CreateAppend),
            _ => None,
        }
    }
}

impl From<IngestMode> for OptionValue {
    fn from(mode: IngestMode) -> Self {
        OptionValue::String(mode.as_str().to_string())
    }
}

/// Renders a boolean the way ADBC expects it in string options.
pub fn flag(enabled: bool) -> &'static str {
    if enabled {
        OPTION_VALUE_ENABLED
    } else {
        OPTION_VALUE_DISABLED
    }
}
