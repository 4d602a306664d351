//! Static description of the editable configuration fields.

use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// One configuration item, or a section header when `max_len` is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Stable identifier, also used as the HTML form field name.
    pub name: Cow<'static, str>,
    #[serde(default)]
    pub default: Cow<'static, str>,
    /// Maximum value length in bytes.
    #[serde(default)]
    pub max_len: usize,
    #[serde(default)]
    pub help: Cow<'static, str>,
}

impl FieldDescriptor {
    pub const fn field(
        name: &'static str,
        default: &'static str,
        max_len: usize,
        help: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            default: Cow::Borrowed(default),
            max_len,
            help: Cow::Borrowed(help),
        }
    }

    /// A non-editable heading; `help` is rendered as its sub-caption.
    pub const fn header(name: &'static str, help: &'static str) -> Self {
        Self::field(name, "", 0, help)
    }

    pub fn is_header(&self) -> bool {
        self.max_len == 0
    }
}

/// Ordered, immutable list of field descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldDescriptor>,
}

impl FieldSchema {
    pub fn new(fields: impl Into<Vec<FieldDescriptor>>) -> Result<Self, SchemaError> {
        let fields = fields.into();
        let mut seen = HashSet::new();
        for (index, field) in fields.iter().enumerate() {
            if field.is_header() {
                continue;
            }
            if field.name.is_empty() {
                return Err(SchemaError::EmptyName { index });
            }
            if !seen.insert(field.name.as_ref()) {
                return Err(SchemaError::DuplicateName(field.name.to_string()));
            }
        }
        Ok(Self { fields })
    }

    /// The stock schema: credentials of the wifi network the device joins.
    pub fn wifi_credentials() -> Self {
        Self {
            fields: vec![
                FieldDescriptor::field(
                    "ssid",
                    "MySSID",
                    32,
                    "The ssid of the wifi network this device should connect to.",
                ),
                FieldDescriptor::field(
                    "password",
                    "MyPassword",
                    32,
                    "The password of the wifi network this device should connect to.",
                ),
            ],
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let fields: Vec<FieldDescriptor> = serde_json::from_str(json)?;
        Ok(Self::new(fields)?)
    }

    /// Number of entries, headers included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    /// Case-sensitive lookup among editable fields. Headers are not addressable.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| !f.is_header() && f.name == name)
    }
}

impl<'a> IntoIterator for &'a FieldSchema {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_may_repeat_but_fields_may_not() {
        let ok = FieldSchema::new(vec![
            FieldDescriptor::header("Network", ""),
            FieldDescriptor::field("ssid", "", 32, ""),
            FieldDescriptor::header("Network", "again"),
            FieldDescriptor::header("", ""),
        ]);
        assert!(ok.is_ok());

        let dup = FieldSchema::new(vec![
            FieldDescriptor::field("ssid", "", 32, ""),
            FieldDescriptor::field("ssid", "", 16, ""),
        ]);
        assert_eq!(dup, Err(SchemaError::DuplicateName("ssid".into())));
    }

    #[test]
    fn editable_fields_need_a_name() {
        let err = FieldSchema::new(vec![
            FieldDescriptor::header("Network", ""),
            FieldDescriptor::field("", "x", 4, ""),
        ]);
        assert_eq!(err, Err(SchemaError::EmptyName { index: 1 }));
    }

    #[test]
    fn lookup_is_exact_and_skips_headers() {
        let schema = FieldSchema::new(vec![
            FieldDescriptor::header("ssid", "a header sharing a field name"),
            FieldDescriptor::field("ssid", "", 32, ""),
        ])
        .unwrap();
        assert_eq!(schema.lookup("ssid"), Some(1));
        assert_eq!(schema.lookup("SSID"), None);
        assert_eq!(schema.lookup("ssid "), None);
        assert_eq!(schema.lookup("nope"), None);
    }

    #[test]
    fn schema_from_json() {
        let schema = FieldSchema::from_json(
            r#"[
                {"name": "Clock", "help": "Time keeping"},
                {"name": "tz", "default": "UTC", "max_len": 48, "help": "POSIX TZ string"}
            ]"#,
        )
        .unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.get(0).unwrap().is_header());
        assert_eq!(schema.get(1).unwrap().default, "UTC");
        assert_eq!(schema.lookup("tz"), Some(1));
    }
}
