use thiserror::Error;

/// Boxed error coming out of a [`FieldStorage`](crate::storage::FieldStorage) backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Rejections raised while building a [`FieldSchema`](crate::schema::FieldSchema).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// Editable fields double as HTML form names, so they need one.
    #[error("field at index {index} has an empty name")]
    EmptyName { index: usize },

    #[error("duplicate field name `{0}`")]
    DuplicateName(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("field index {0} is out of range")]
    IndexOutOfRange(usize),

    /// Section headers have no slot in storage.
    #[error("`{0}` is a section header and holds no value")]
    NotEditable(String),

    /// The backend refused a read or write. The cached value was left untouched.
    #[error("storage failed for field `{name}`: {source}")]
    Storage {
        name: String,
        #[source]
        source: BoxError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid portal configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("application name must not be empty")]
    EmptyAppName,
}
