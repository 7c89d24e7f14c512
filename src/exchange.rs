//! Move-once handles for the Arrow C data interface.
//!
//! A handle starts `Empty` (a producer may export into it), becomes `Filled`
//! once a producer has written a value, and ends `Spent` after the value was
//! imported or handed to a driver. Consuming a handle twice is reported as a
//! spent-handle error instead of touching freed memory. A handle dropped while
//! still `Filled` is a leak: it is logged and its value released.

use arrow_array::ffi::{FFI_ArrowArray, FFI_ArrowSchema, from_ffi, to_ffi};
use arrow_array::ffi_stream::{ArrowArrayStreamReader, FFI_ArrowArrayStream};
use arrow_array::{Array, RecordBatch, RecordBatchReader, StructArray};
use arrow_schema::Schema;

use crate::error::ManagerError;

/// Lifecycle of an exchange handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Filled,
    Spent,
}

/// C data interface structs that can travel through an [`Exchange`].
pub trait Exchangeable: Send {
    const NAME: &'static str;

    fn empty() -> Self;
}

impl Exchangeable for FFI_ArrowSchema {
    const NAME: &'static str = "ArrowSchema";

    fn empty() -> Self {
        FFI_ArrowSchema::empty()
    }
}

impl Exchangeable for FFI_ArrowArray {
    const NAME: &'static str = "ArrowArray";

    fn empty() -> Self {
        FFI_ArrowArray::empty()
    }
}

impl Exchangeable for FFI_ArrowArrayStream {
    const NAME: &'static str = "ArrowArrayStream";

    fn empty() -> Self {
        FFI_ArrowArrayStream::empty()
    }
}

/// Owning slot for one C data interface struct.
///
/// The struct lives on the heap so its address stays valid while a driver
/// writes into it.
pub struct Exchange<T: Exchangeable> {
    raw: Box<T>,
    state: SlotState,
}

pub type SchemaHandle = Exchange<FFI_ArrowSchema>;
pub type ArrayHandle = Exchange<FFI_ArrowArray>;
pub type StreamHandle = Exchange<FFI_ArrowArrayStream>;

impl<T: Exchangeable> Exchange<T> {
    /// An empty slot a producer can export into.
    pub fn empty() -> Self {
        Self {
            raw: Box::new(T::empty()),
            state: SlotState::Empty,
        }
    }

    fn filled(value: T) -> Self {
        Self {
            raw: Box::new(value),
            state: SlotState::Filled,
        }
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_spent(&self) -> bool {
        self.state == SlotState::Spent
    }

    /// Pointer for a producer to export into. Only valid on an empty slot.
    pub(crate) fn producer_ptr(&mut self) -> Result<*mut T, ManagerError> {
        match self.state {
            SlotState::Empty => Ok(&mut *self.raw),
            _ => Err(ManagerError::spent(T::NAME)),
        }
    }

    /// Records that a producer wrote into the slot.
    pub(crate) fn mark_filled(&mut self) {
        self.state = SlotState::Filled;
    }

    /// Pointer for a consumer that takes ownership (a driver's bind call).
    ///
    /// The slot is spent afterwards whether or not the consumer moved the
    /// value out; anything left behind is released when the slot drops.
    pub(crate) fn consumer_ptr(&mut self) -> Result<*mut T, ManagerError> {
        match self.state {
            SlotState::Filled => {
                self.state = SlotState::Spent;
                Ok(&mut *self.raw)
            }
            _ => Err(ManagerError::spent(T::NAME)),
        }
    }

    /// Moves the value out, leaving the slot spent.
    pub fn take(&mut self) -> Result<T, ManagerError> {
        match self.state {
            SlotState::Filled => {
                self.state = SlotState::Spent;
                Ok(std::mem::replace(&mut *self.raw, T::empty()))
            }
            _ => Err(ManagerError::spent(T::NAME)),
        }
    }
}

impl<T: Exchangeable> Default for Exchange<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Exchangeable> std::fmt::Debug for Exchange<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(T::NAME).field("state", &self.state).finish()
    }
}

impl<T: Exchangeable> Drop for Exchange<T> {
    fn drop(&mut self) {
        if self.state == SlotState::Filled {
            tracing::warn!(handle = T::NAME, "exported handle dropped without being imported");
        }
    }
}

impl SchemaHandle {
    /// Exports `schema` into a new handle.
    pub fn export(schema: &Schema) -> adbc_core::error::Result<Self> {
        let raw = FFI_ArrowSchema::try_from(schema)
            .map_err(|e| crate::error::arrow_error("Failed to export schema", e))?;
        Ok(Self::filled(raw))
    }

    /// Imports the schema, taking ownership of the exported value.
    pub fn import(&mut self) -> adbc_core::error::Result<Schema> {
        let raw = self.take()?;
        Schema::try_from(&raw).map_err(|e| crate::error::arrow_error("Failed to import schema", e))
    }
}

impl ArrayHandle {
    /// Exports `batch` as a struct array plus its schema.
    pub fn export(batch: &RecordBatch) -> adbc_core::error::Result<(Self, SchemaHandle)> {
        let data = StructArray::from(batch.clone()).into_data();
        let (array, schema) =
            to_ffi(&data).map_err(|e| crate::error::arrow_error("Failed to export batch", e))?;
        Ok((Self::filled(array), SchemaHandle::filled(schema)))
    }

    /// Imports a struct array and its schema back into a record batch.
    ///
    /// Both handles are spent afterwards.
    pub fn import(&mut self, schema: &mut SchemaHandle) -> adbc_core::error::Result<RecordBatch> {
        if self.state != SlotState::Filled {
            return Err(ManagerError::spent(FFI_ArrowArray::NAME).into());
        }
        let schema = schema.take()?;
        let array = self.take()?;
        let data = unsafe { from_ffi(array, &schema) }
            .map_err(|e| crate::error::arrow_error("Failed to import batch", e))?;
        Ok(RecordBatch::from(StructArray::from(data)))
    }

    /// Returns true while the exported array still owns its buffers.
    pub fn is_live(&self) -> bool {
        self.state == SlotState::Filled && !self.raw.is_released()
    }
}

impl StreamHandle {
    /// Exports a reader as a C stream.
    pub fn export(reader: Box<dyn RecordBatchReader + Send>) -> Self {
        Self::filled(FFI_ArrowArrayStream::new(reader))
    }

    /// Imports the stream, taking ownership of it.
    pub fn import(&mut self) -> adbc_core::error::Result<ArrowArrayStreamReader> {
        let raw = self.take()?;
        ArrowArrayStreamReader::try_new(raw)
            .map_err(|e| crate::error::arrow_error("Failed to import stream", e))
    }

    /// Returns true while the stream's release callback is still set.
    pub fn is_live(&self) -> bool {
        self.raw.release.is_some()
    }
}
