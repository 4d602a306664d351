//! Length-bounded field values.

use std::fmt;

/// Returns the longest prefix of `value` that is at most `max_len` bytes and
/// still ends on a UTF-8 character boundary.
pub fn truncate_to(value: &str, max_len: usize) -> &str {
    if value.len() <= max_len {
        return value;
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// A string that never grows beyond `capacity` bytes.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct BoundedValue {
    buf: String,
    capacity: usize,
}

impl BoundedValue {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            capacity,
        }
    }

    pub fn with_value(capacity: usize, value: &str) -> Self {
        let mut v = Self::new(capacity);
        v.set(value);
        v
    }

    /// Replaces the content, truncating to capacity. Returns `true` when
    /// something was cut off.
    pub fn set(&mut self, value: &str) -> bool {
        let kept = truncate_to(value, self.capacity);
        self.buf.clear();
        self.buf.push_str(kept);
        kept.len() != value.len()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Debug for BoundedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundedValue({:?}, cap={})", self.buf, self.capacity)
    }
}

impl fmt::Display for BoundedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

impl AsRef<str> for BoundedValue {
    fn as_ref(&self) -> &str {
        &self.buf
    }
}
