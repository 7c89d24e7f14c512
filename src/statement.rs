//! Managed statements.
//!
//! A statement is either unprepared or prepared. Setting a new query (SQL or
//! Substrait) drops back to unprepared; `prepare` needs a query and is
//! refused without one. Bound parameters are handed to the driver as Arrow
//! C data and only take effect on the next execution.
//!
//! Ingestion is an update with no query: set the target table (and mode)
//! through options, bind the data, then call `execute_update`.

#![allow(refining_impl_trait)]

use std::any::Any;
use std::ffi::CString;
use std::ptr::null_mut;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use adbc_core::error::Result;
use adbc_core::options::{OptionStatement, OptionValue};
use adbc_core::{Optionable, PartitionedResult, Statement};
use arrow_array::ffi::{FFI_ArrowArray, FFI_ArrowSchema};
use arrow_array::{RecordBatch, RecordBatchReader};
use arrow_schema::Schema;

use crate::connection::ConnectionInner;
use crate::driver::{ManagedDriver, driver_call};
use crate::error::{ManagerError, invalid_state, nul_error};
use crate::exchange::{ArrayHandle, Exchangeable, SchemaHandle, SlotState, StreamHandle};
use crate::ffi::{FFI_AdbcPartitions, FFI_AdbcStatement};
use crate::lifecycle::{HandleKind, Node};
use crate::options::{self, IngestMode};
use crate::partitions::PartitionedQuery;
use crate::reader::ManagedReader;

/// Preparation state of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementPhase {
    Unprepared,
    Prepared,
}

/// What the statement will run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementQuery {
    None,
    Sql(String),
    Substrait,
    /// Bulk load into the named table.
    Ingest(String),
}

struct StatementState {
    phase: StatementPhase,
    query: StatementQuery,
}

pub(crate) struct StatementInner {
    node: Arc<Node>,
    driver: ManagedDriver,
    raw: *mut FFI_AdbcStatement,
    state: Mutex<StatementState>,
    // Keeps the connection alive while the statement is.
    _connection: Arc<ConnectionInner>,
}

// The raw handle is only touched while `state` is held, by cancel, or by `Drop`.
unsafe impl Send for StatementInner {}
unsafe impl Sync for StatementInner {}

impl StatementInner {
    fn lock(&self) -> MutexGuard<'_, StatementState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self) -> Result<MutexGuard<'_, StatementState>> {
        let state = self.lock();
        self.node.ensure_open()?;
        Ok(state)
    }

    fn release(&self) -> Result<()> {
        driver_call!(&self.driver, HandleKind::Statement, statement_release(self.raw))
    }

    /// Cancel runs without the state lock so it can interrupt an execute.
    fn cancel(&self) -> Result<()> {
        let _open = self.node.guard()?;
        driver_call!(&self.driver, HandleKind::Statement, statement_cancel(self.raw))
    }
}

impl Drop for StatementInner {
    fn drop(&mut self) {
        if let Ok(guard) = self.node.guard() {
            tracing::debug!(driver = %self.driver.name(), "releasing AdbcStatement on drop");
            if let Err(err) = guard.release(|| self.release()) {
                tracing::warn!(error = %err, "failed to release AdbcStatement");
            }
        }
        drop(unsafe { Box::from_raw(self.raw) });
    }
}

/// Cancels a statement from another thread.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<StatementInner>,
}

impl CancelHandle {
    /// Asks the driver to stop the statement's in-flight call.
    ///
    /// The interrupted call then fails with `CANCELLED`.
    pub fn cancel(&self) -> Result<()> {
        self.inner.cancel()
    }
}

/// A statement opened through the manager.
pub struct ManagedStatement {
    inner: Arc<StatementInner>,
}

impl ManagedStatement {
    pub(crate) fn open(connection: Arc<ConnectionInner>) -> Result<Self> {
        let driver = connection.driver.clone();
        let _state = connection.enter()?;
        let mut parent = connection.node.guard()?;

        let raw = Box::into_raw(Box::new(FFI_AdbcStatement::default()));
        if let Err(err) = driver_call!(
            &driver,
            HandleKind::Statement,
            statement_new(connection.raw(), raw)
        ) {
            drop(unsafe { Box::from_raw(raw) });
            return Err(err);
        }
        unsafe { (*raw).private_driver = driver.table() };
        let node = parent.adopt(HandleKind::Statement);
        drop(parent);

        Ok(Self {
            inner: Arc::new(StatementInner {
                node,
                driver,
                raw,
                state: Mutex::new(StatementState {
                    phase: StatementPhase::Unprepared,
                    query: StatementQuery::None,
                }),
                _connection: Arc::clone(&connection),
            }),
        })
    }

    pub fn phase(&self) -> StatementPhase {
        self.inner.lock().phase
    }

    pub fn query(&self) -> StatementQuery {
        self.inner.lock().query.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.node.is_released()
    }

    /// Handle that can cancel this statement while it executes elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of result streams from this statement still being read.
    pub fn open_readers(&self) -> usize {
        self.inner.node.open_readers()
    }

    /// Releases the driver-side statement.
    ///
    /// Refused while a reader from `execute` is still alive.
    pub fn close(&self) -> std::result::Result<(), ManagerError> {
        let _state = self.inner.lock();
        self.inner.node.guard()?.release(|| self.inner.release())
    }

    /// Hands an exported batch and its schema to the driver as parameters.
    ///
    /// Both handles must be filled; they are spent afterwards.
    pub fn bind_handles(&mut self, array: &mut ArrayHandle, schema: &mut SchemaHandle) -> Result<()> {
        let _state = self.inner.enter()?;
        if array.state() != SlotState::Filled {
            return Err(ManagerError::spent(FFI_ArrowArray::NAME).into());
        }
        if schema.state() != SlotState::Filled {
            return Err(ManagerError::spent(FFI_ArrowSchema::NAME).into());
        }
        let array = array.consumer_ptr()?;
        let schema = schema.consumer_ptr()?;
        driver_call!(
            &self.inner.driver,
            HandleKind::Statement,
            statement_bind(self.inner.raw, array, schema)
        )
    }

    /// Hands an exported stream to the driver as parameters.
    pub fn bind_stream_handle(&mut self, stream: &mut StreamHandle) -> Result<()> {
        let _state = self.inner.enter()?;
        let stream = stream.consumer_ptr()?;
        driver_call!(
            &self.inner.driver,
            HandleKind::Statement,
            statement_bind_stream(self.inner.raw, stream)
        )
    }

    /// Runs the query into a caller-provided stream handle.
    ///
    /// Returns the affected row count, if the driver knows it.
    pub fn execute_query_into(&mut self, out: &mut StreamHandle) -> Result<Option<i64>> {
        let _state = self.inner.enter()?;
        let ptr = out.producer_ptr()?;
        let mut rows = -1i64;
        driver_call!(
            &self.inner.driver,
            HandleKind::Statement,
            statement_execute_query(self.inner.raw, ptr, &mut rows)
        )?;
        out.mark_filled();
        Ok((rows >= 0).then_some(rows))
    }

    /// Runs the query and returns its batches plus the affected row count.
    ///
    /// The statement cannot be closed until the reader is dropped.
    pub fn execute_query(&mut self) -> Result<(ManagedReader, Option<i64>)> {
        let lease = self.inner.node.guard()?.lease();
        let mut out = StreamHandle::empty();
        let rows = self.execute_query_into(&mut out)?;
        let owner: Arc<dyn Any + Send + Sync> = self.inner.clone();
        Ok((ManagedReader::new(out.import()?, lease, owner), rows))
    }

    /// Runs the query in partitions.
    pub fn execute_partitioned(&mut self) -> Result<PartitionedQuery> {
        let _state = self.inner.enter()?;
        let mut schema = SchemaHandle::empty();
        let mut partitions = FFI_AdbcPartitions::default();
        let mut rows = -1i64;
        driver_call!(
            &self.inner.driver,
            HandleKind::Statement,
            statement_execute_partitions(
                self.inner.raw,
                schema.producer_ptr()?,
                &mut partitions,
                &mut rows,
            )
        )?;
        schema.mark_filled();
        let schema = schema.import()?;
        tracing::debug!(partitions = partitions.num_partitions, "executed partitioned query");
        Ok(PartitionedQuery::from_ffi(schema, partitions, rows))
    }

    /// Sets target table and mode for a bulk load.
    pub fn ingest(&mut self, target_table: &str, mode: IngestMode) -> Result<()> {
        self.set_option(
            OptionStatement::from(options::INGEST_TARGET_TABLE),
            OptionValue::String(target_table.to_string()),
        )?;
        self.set_option(OptionStatement::from(options::INGEST_MODE), mode.into())
    }

    fn schema_call(
        &self,
        call: impl FnOnce(*mut FFI_ArrowSchema) -> Result<()>,
    ) -> Result<Schema> {
        let _state = self.inner.enter()?;
        let mut out = SchemaHandle::empty();
        call(out.producer_ptr()?)?;
        out.mark_filled();
        out.import()
    }
}

impl Optionable for ManagedStatement {
    type Option = OptionStatement;

    fn set_option(&mut self, key: Self::Option, value: OptionValue) -> Result<()> {
        let mut state = self.inner.enter()?;
        let key = key.as_ref();
        unsafe {
            self.inner
                .driver
                .statement_options()
                .set(self.inner.raw, key, &value)
        }?;
        if key == options::INGEST_TARGET_TABLE {
            if let OptionValue::String(target) = value {
                state.query = StatementQuery::Ingest(target);
                state.phase = StatementPhase::Unprepared;
            }
        }
        Ok(())
    }

    fn get_option_string(&self, key: Self::Option) -> Result<String> {
        let _state = self.inner.enter()?;
        unsafe {
            self.inner
                .driver
                .statement_options()
                .get_string(self.inner.raw, key.as_ref())
        }
    }

    fn get_option_bytes(&self, key: Self::Option) -> Result<Vec<u8>> {
        let _state = self.inner.enter()?;
        unsafe {
            self.inner
                .driver
                .statement_options()
                .get_bytes(self.inner.raw, key.as_ref())
        }
    }

    fn get_option_int(&self, key: Self::Option) -> Result<i64> {
        let _state = self.inner.enter()?;
        unsafe {
            self.inner
                .driver
                .statement_options()
                .get_int(self.inner.raw, key.as_ref())
        }
    }

    fn get_option_double(&self, key: Self::Option) -> Result<f64> {
        let _state = self.inner.enter()?;
        unsafe {
            self.inner
                .driver
                .statement_options()
                .get_double(self.inner.raw, key.as_ref())
        }
    }
}

impl Statement for ManagedStatement {
    fn bind(&mut self, batch: RecordBatch) -> Result<()> {
        let (mut array, mut schema) = ArrayHandle::export(&batch)?;
        self.bind_handles(&mut array, &mut schema)
    }

    fn bind_stream(&mut self, reader: Box<dyn RecordBatchReader + Send>) -> Result<()> {
        let mut stream = StreamHandle::export(reader);
        self.bind_stream_handle(&mut stream)
    }

    fn execute(&mut self) -> Result<ManagedReader> {
        self.execute_query().map(|(reader, _)| reader)
    }

    fn execute_update(&mut self) -> Result<Option<i64>> {
        let _state = self.inner.enter()?;
        let mut rows = -1i64;
        driver_call!(
            &self.inner.driver,
            HandleKind::Statement,
            statement_execute_query(self.inner.raw, null_mut(), &mut rows)
        )?;
        Ok((rows >= 0).then_some(rows))
    }

    fn execute_schema(&mut self) -> Result<Schema> {
        self.schema_call(|out| {
            driver_call!(
                &self.inner.driver,
                HandleKind::Statement,
                statement_execute_schema(self.inner.raw, out)
            )
        })
    }

    fn execute_partitions(&mut self) -> Result<PartitionedResult> {
        self.execute_partitioned().map(PartitionedResult::from)
    }

    fn get_parameter_schema(&self) -> Result<Schema> {
        self.schema_call(|out| {
            driver_call!(
                &self.inner.driver,
                HandleKind::Statement,
                statement_get_parameter_schema(self.inner.raw, out)
            )
        })
    }

    fn prepare(&mut self) -> Result<()> {
        let mut state = self.inner.enter()?;
        if state.query == StatementQuery::None {
            return Err(invalid_state(
                "Must set a query before preparing",
                HandleKind::Statement,
            ));
        }
        driver_call!(
            &self.inner.driver,
            HandleKind::Statement,
            statement_prepare(self.inner.raw)
        )?;
        state.phase = StatementPhase::Prepared;
        Ok(())
    }

    fn set_sql_query(&mut self, query: impl AsRef<str>) -> Result<()> {
        let query = query.as_ref();
        let sql = CString::new(query).map_err(|_| nul_error("query"))?;
        let mut state = self.inner.enter()?;
        driver_call!(
            &self.inner.driver,
            HandleKind::Statement,
            statement_set_sql_query(self.inner.raw, sql.as_ptr())
        )?;
        state.query = StatementQuery::Sql(query.to_string());
        state.phase = StatementPhase::Unprepared;
        Ok(())
    }

    fn set_substrait_plan(&mut self, plan: impl AsRef<[u8]>) -> Result<()> {
        let plan = plan.as_ref();
        let mut state = self.inner.enter()?;
        driver_call!(
            &self.inner.driver,
            HandleKind::Statement,
            statement_set_substrait_plan(self.inner.raw, plan.as_ptr(), plan.len())
        )?;
        state.query = StatementQuery::Substrait;
        state.phase = StatementPhase::Unprepared;
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        self.inner.cancel()
    }
}
