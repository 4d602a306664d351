//! Persistent backends for field values.
//!
//! The portal only needs to read and write one bounded string per editable
//! field, addressed by its schema index. How those bytes end up on a medium is
//! up to the backend.

use std::fmt::Debug;

use embedded_storage::{ReadStorage, Storage};
use thiserror::Error;

use crate::bounded::truncate_to;
use crate::schema::{FieldDescriptor, FieldSchema};

pub trait FieldStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the persisted value for `field`, `None` if nothing usable is stored.
    fn load(
        &mut self,
        index: usize,
        field: &FieldDescriptor,
    ) -> Result<Option<String>, Self::Error>;

    /// Replaces whatever is stored for `field` with `value`. Callers pass
    /// values already bounded to `field.max_len`.
    fn store(
        &mut self,
        index: usize,
        field: &FieldDescriptor,
        value: &str,
    ) -> Result<(), Self::Error>;
}

impl<T: FieldStorage + ?Sized> FieldStorage for &mut T {
    type Error = T::Error;

    fn load(
        &mut self,
        index: usize,
        field: &FieldDescriptor,
    ) -> Result<Option<String>, Self::Error> {
        T::load(self, index, field)
    }

    fn store(
        &mut self,
        index: usize,
        field: &FieldDescriptor,
        value: &str,
    ) -> Result<(), Self::Error> {
        T::store(self, index, field, value)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("write to field {index} rejected")]
pub struct MemoryStorageError {
    pub index: usize,
}

/// RAM-only backend, used on the host and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    slots: Vec<Option<String>>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates slot `index`, as if a previous boot had saved it.
    pub fn with_value(mut self, index: usize, value: &str) -> Self {
        self.slot_mut(index).replace(value.to_string());
        self
    }

    pub fn value(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|s| s.as_deref())
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    fn slot_mut(&mut self, index: usize) -> &mut Option<String> {
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        &mut self.slots[index]
    }
}

impl FieldStorage for MemoryStorage {
    type Error = MemoryStorageError;

    fn load(
        &mut self,
        index: usize,
        _field: &FieldDescriptor,
    ) -> Result<Option<String>, Self::Error> {
        Ok(self.value(index).map(str::to_string))
    }

    fn store(
        &mut self,
        index: usize,
        _field: &FieldDescriptor,
        value: &str,
    ) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MemoryStorageError { index });
        }
        self.slot_mut(index).replace(value.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SlotError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("slot layout needs {needed} bytes but the medium holds {capacity}")]
    OutOfBounds { needed: usize, capacity: usize },

    #[error("field {0} has no slot")]
    NoSlot(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    offset: u32,
    len: usize,
}

/// Fixed-size slots on a byte-addressable medium (EEPROM or emulated EEPROM).
///
/// Every editable field owns `max_len + 1` bytes, laid out back to back in
/// schema order starting at `base`. A slot holds the value followed by zero
/// padding up to its end, so the padding doubles as the terminator.
pub struct SlotStorage<S> {
    storage: S,
    slots: Vec<Option<Slot>>,
}

/// First byte of a never-written slot.
const ERASED: u8 = 0xFF;

impl<S> SlotStorage<S>
where
    S: Storage,
    S::Error: Debug,
{
    pub fn new(storage: S, base: u32, schema: &FieldSchema) -> Result<Self, SlotError> {
        let mut offset = base as usize;
        let mut slots = Vec::with_capacity(schema.len());
        for field in schema {
            if field.is_header() {
                slots.push(None);
                continue;
            }
            let len = field.max_len + 1;
            slots.push(Some(Slot {
                offset: offset as u32,
                len,
            }));
            offset += len;
        }

        let capacity = storage.capacity();
        if offset > capacity {
            return Err(SlotError::OutOfBounds {
                needed: offset,
                capacity,
            });
        }
        Ok(Self { storage, slots })
    }

    /// Total bytes the layout occupies, including `base`.
    pub fn end(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .last()
            .map_or(0, |s| s.offset as usize + s.len)
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    fn slot(&self, index: usize) -> Result<Slot, SlotError> {
        self.slots
            .get(index)
            .copied()
            .flatten()
            .ok_or(SlotError::NoSlot(index))
    }
}

impl<S> FieldStorage for SlotStorage<S>
where
    S: Storage,
    S::Error: Debug,
{
    type Error = SlotError;

    fn load(
        &mut self,
        index: usize,
        field: &FieldDescriptor,
    ) -> Result<Option<String>, Self::Error> {
        let slot = self.slot(index)?;
        let mut buf = vec![0u8; slot.len];
        self.storage
            .read(slot.offset, &mut buf)
            .map_err(|e| SlotError::Backend(format!("{:?}", e)))?;

        if buf[0] == ERASED {
            return Ok(None);
        }
        let Some(end) = buf.iter().position(|&b| b == 0) else {
            log::warn!("slot of '{}' has no terminator, using default", field.name);
            return Ok(None);
        };
        match std::str::from_utf8(&buf[..end]) {
            Ok(s) => Ok(Some(s.to_string())),
            Err(_) => {
                log::warn!("slot of '{}' is not valid UTF-8, using default", field.name);
                Ok(None)
            }
        }
    }

    fn store(
        &mut self,
        index: usize,
        field: &FieldDescriptor,
        value: &str,
    ) -> Result<(), Self::Error> {
        let slot = self.slot(index)?;
        // The whole slot is rewritten so nothing of a longer previous value survives.
        let mut buf = vec![0u8; slot.len];
        let value = truncate_to(value, field.max_len);
        buf[..value.len()].copy_from_slice(value.as_bytes());
        self.storage
            .write(slot.offset, &buf)
            .map_err(|e| SlotError::Backend(format!("{:?}", e)))
    }
}
