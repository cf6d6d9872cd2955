//! Domain objects as seen by the mapper.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

/// A record of the primary datastore that can be indexed.
pub trait Entity: Send + Sync + Debug {
    /// Entity type name; also the name of its index.
    fn entity_type(&self) -> &str;

    /// Primary key, rendered as text.
    fn id(&self) -> String;

    /// Value of a named field, `None` if the entity has no such field.
    fn field(&self, name: &str) -> Option<FieldValue>;
}

/// Binary content attached to an entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// Original file name, used to guess the content type.
    pub filename: String,
    /// Raw content.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Create an attachment.
    pub fn new<S: Into<String>>(filename: S, data: Vec<u8>) -> Self {
        Attachment {
            filename: filename.into(),
            data,
        }
    }
}

/// Value of one entity field.
#[derive(Clone, Debug)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    /// File content, indexed through a text extractor.
    Attachment(Attachment),
    /// Another entity.
    Reference(Arc<dyn Entity>),
    /// Multi-valued field; never indexed.
    Collection(Vec<FieldValue>),
    Null,
}

impl FieldValue {
    /// Textual form of a scalar value.
    ///
    /// Attachments, collections and nulls have none; a reference renders as
    /// the related entity's id.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(text) => Some(text.clone()),
            FieldValue::Integer(value) => Some(value.to_string()),
            FieldValue::Float(value) => Some(value.to_string()),
            FieldValue::Boolean(value) => Some(value.to_string()),
            FieldValue::DateTime(value) => Some(value.to_rfc3339_opts(SecondsFormat::Secs, true)),
            FieldValue::Reference(entity) => Some(entity.id()),
            FieldValue::Attachment(_) | FieldValue::Collection(_) | FieldValue::Null => None,
        }
    }

    /// Whether this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}
