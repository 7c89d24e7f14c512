//! Record batch readers handed back to callers.
//!
//! `ManagedReader` wraps a stream exported by a driver and keeps the handle
//! that produced it alive and open until the stream is dropped. `VecRecordBatchReader`
//! serves results the manager assembled itself.

use std::any::Any;
use std::sync::Arc;

use arrow_array::ffi_stream::ArrowArrayStreamReader;
use arrow_array::{RecordBatch, RecordBatchReader};
use arrow_schema::{ArrowError, SchemaRef};

use crate::lifecycle::ReaderLease;

/// Iterator-based RecordBatchReader for pre-loaded record batches.
pub struct VecRecordBatchReader {
    batches: std::vec::IntoIter<RecordBatch>,
    schema: SchemaRef,
}

impl VecRecordBatchReader {
    pub fn new(batches: Vec<RecordBatch>, schema: SchemaRef) -> Self {
        Self {
            batches: batches.into_iter(),
            schema,
        }
    }
}

impl RecordBatchReader for VecRecordBatchReader {
    fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }
}

impl Iterator for VecRecordBatchReader {
    type Item = Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.batches.next().map(Ok)
    }
}

/// Forward-only stream of batches pulled from a driver.
///
/// Each pull crosses the ABI boundary and may fail with the driver's error.
/// The stream is single-consumer and cannot be restarted. While it is alive
/// the producing handle refuses to close.
pub struct ManagedReader {
    // Field order is drop order: the stream goes back to the driver first.
    reader: ArrowArrayStreamReader,
    _lease: ReaderLease,
    _owner: Arc<dyn Any + Send + Sync>,
}

impl ManagedReader {
    pub(crate) fn new(
        reader: ArrowArrayStreamReader,
        lease: ReaderLease,
        owner: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            reader,
            _lease: lease,
            _owner: owner,
        }
    }
}

impl RecordBatchReader for ManagedReader {
    fn schema(&self) -> SchemaRef {
        self.reader.schema()
    }
}

impl Iterator for ManagedReader {
    type Item = Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next()
    }
}
