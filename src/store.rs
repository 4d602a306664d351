//! In-memory mirror of the persisted field values.

use crate::bounded::{truncate_to, BoundedValue};
use crate::error::StoreError;
use crate::schema::{FieldDescriptor, FieldSchema};
use crate::storage::FieldStorage;

/// Sole reader and writer of persisted field values.
///
/// One cached [`BoundedValue`] per schema entry; headers get a zero-capacity
/// slot so indices line up with the schema.
pub struct ValueStore<S> {
    schema: FieldSchema,
    storage: S,
    values: Vec<BoundedValue>,
}

impl<S: FieldStorage> ValueStore<S> {
    /// Loads every editable field from `storage`. Fields with nothing stored
    /// start out at their (bounded) default.
    pub fn load(schema: FieldSchema, mut storage: S) -> Result<Self, StoreError> {
        let mut values = Vec::with_capacity(schema.len());
        for (index, field) in schema.iter().enumerate() {
            if field.is_header() {
                values.push(BoundedValue::new(0));
                continue;
            }
            let stored = storage
                .load(index, field)
                .map_err(|e| StoreError::Storage {
                    name: field.name.to_string(),
                    source: Box::new(e),
                })?;
            let value = match stored {
                Some(v) => v,
                None => {
                    log::debug!("'{}' not stored yet, using default", field.name);
                    field.default.to_string()
                }
            };
            if value.len() > field.max_len {
                log::warn!("'{}' exceeds {} bytes, truncating", field.name, field.max_len);
            }
            values.push(BoundedValue::with_value(field.max_len, &value));
        }
        log::info!("loaded {} fields", values.len());

        Ok(Self {
            schema,
            storage,
            values,
        })
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Number of schema entries, headers included.
    pub fn count(&self) -> usize {
        self.schema.len()
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.schema.lookup(name)
    }

    pub fn descriptor(&self, index: usize) -> Option<&FieldDescriptor> {
        self.schema.get(index)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(BoundedValue::as_str)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        self.lookup(name).and_then(|ix| self.get(ix))
    }

    /// Current values in schema order (empty for headers).
    pub fn values(&self) -> Vec<&str> {
        self.values.iter().map(BoundedValue::as_str).collect()
    }

    /// Cuts `value` at the first NUL, truncates it to the field's bound, writes
    /// it through and then updates the cache. On a storage error the cache keeps its old value.
    pub fn set(&mut self, index: usize, value: &str) -> Result<(), StoreError> {
        let field = self
            .schema
            .get(index)
            .ok_or(StoreError::IndexOutOfRange(index))?;
        if field.is_header() {
            return Err(StoreError::NotEditable(field.name.to_string()));
        }

        // Slots and NVS strings both end at the first NUL.
        let value = match value.find('\0') {
            Some(end) => {
                log::debug!("'{}' cut at embedded NUL (byte {})", field.name, end);
                &value[..end]
            }
            None => value,
        };
        let bounded = truncate_to(value, field.max_len);
        if bounded.len() != value.len() {
            log::debug!(
                "'{}' truncated from {} to {} bytes",
                field.name,
                value.len(),
                bounded.len()
            );
        }

        self.storage
            .store(index, field, bounded)
            .map_err(|e| StoreError::Storage {
                name: field.name.to_string(),
                source: Box::new(e),
            })?;
        self.values[index].set(bounded);
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}
