//! Partitioned execution results.
//!
//! A partitioned query yields one shared schema and a list of opaque
//! descriptors. Each descriptor can be redeemed with
//! `Connection::read_partition`, any number of times, into a fresh stream
//! over that slice of the result. The manager copies descriptor bytes out of
//! the driver's buffers and never interprets them.

use adbc_core::PartitionedResult;
use arrow_schema::Schema;

use crate::ffi::FFI_AdbcPartitions;

/// Opaque token for one partition of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionDescriptor(Vec<u8>);

impl PartitionDescriptor {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for PartitionDescriptor {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Descriptors and shared schema of a partitioned query.
#[derive(Debug, Clone)]
pub struct PartitionedQuery {
    pub schema: Schema,
    pub partitions: Vec<PartitionDescriptor>,
    /// Rows affected, when the driver reported a count.
    pub rows_affected: Option<i64>,
}

impl PartitionedQuery {
    /// Copies descriptors out of a driver result, then releases it.
    pub(crate) fn from_ffi(schema: Schema, raw: FFI_AdbcPartitions, rows_affected: i64) -> Self {
        let partitions = raw
            .to_vec()
            .into_iter()
            .map(PartitionDescriptor)
            .collect();
        drop(raw);
        Self {
            schema,
            partitions,
            rows_affected: (rows_affected >= 0).then_some(rows_affected),
        }
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

impl From<PartitionedQuery> for PartitionedResult {
    fn from(query: PartitionedQuery) -> Self {
        PartitionedResult {
            partitions: query
                .partitions
                .into_iter()
                .map(PartitionDescriptor::into_bytes)
                .collect(),
            schema: query.schema,
            rows_affected: query.rows_affected.unwrap_or(-1),
        }
    }
}
