//! ADBC driver manager.
//!
//! Loads ADBC drivers, either linked into the process or from shared
//! libraries, and exposes them through the `adbc_core` traits. The manager
//! sits between an application and any number of drivers: it resolves the
//! driver named by the `driver` option, negotiates the API version, buffers
//! options until the driver-side handle exists, and enforces the
//! Database → Connection → Statement ownership order so that no handle is
//! released while its children are still open.
//!
//! # Quick Start
//!
//! ```ignore
//! use adbc_core::{Connection, Database, Statement};
//! use adbc_manager::DatabaseBuilder;
//!
//! let db = DatabaseBuilder::new()
//!     .driver("adbc_driver_sqlite")
//!     .option("uri", "file:demo.db")?
//!     .init()?;
//!
//! let mut conn = db.new_connection()?;
//! let mut stmt = conn.new_statement()?;
//! stmt.set_sql_query("SELECT 1")?;
//! for batch in stmt.execute()? {
//!     println!("Got {} rows", batch?.num_rows());
//! }
//! ```
//!
//! # Statically linked drivers
//!
//! ```ignore
//! use adbc_manager::{DatabaseBuilder, DriverRegistry};
//!
//! DriverRegistry::global().register_static("memory", my_driver_init);
//! let db = DatabaseBuilder::new().driver("memory").init()?;
//! ```
//!
//! # Module Structure
//!
//! - [`driver`]: Driver loading, version negotiation and the function table
//! - [`registry`]: Driver resolution and the process-wide cache
//! - [`database`]: Option buffering and database handles
//! - [`connection`]: Connections, metadata queries and transactions
//! - [`statement`]: Queries, parameter binding, ingestion and cancellation
//! - [`partitions`]: Partitioned execution results
//! - [`exchange`]: Move-once Arrow C data interface handles
//! - [`metadata`]: Arrow layouts of the info, objects and table type results
//! - [`lifecycle`]: Parent/child bookkeeping between handles
//! - [`ffi`]: The C ABI shared with drivers
//! - [`error`]: Error types

pub mod config;
pub mod connection;
pub mod database;
pub mod driver;
pub mod error;
pub mod exchange;
pub mod ffi;
pub mod lifecycle;
pub mod metadata;
pub mod options;
pub mod partitions;
pub mod reader;
pub mod registry;
pub mod statement;

pub use config::ManagerConfig;
pub use connection::{ManagedConnection, TransactionMode};
pub use database::{DatabaseBuilder, ManagedDatabase};
pub use driver::{ManagedDriver, default_entrypoint};
pub use error::{ManagerError, is_lifecycle_violation, raised_by};
pub use exchange::{ArrayHandle, SchemaHandle, SlotState, StreamHandle};
pub use lifecycle::HandleKind;
pub use metadata::{
    CatalogObjects, ColumnObjects, ConstraintObjects, DbSchemaObjects, InfoValue, TableObjects,
};
pub use options::IngestMode;
pub use partitions::{PartitionDescriptor, PartitionedQuery};
pub use reader::{ManagedReader, VecRecordBatchReader};
pub use registry::DriverRegistry;
pub use statement::{CancelHandle, ManagedStatement, StatementPhase, StatementQuery};
