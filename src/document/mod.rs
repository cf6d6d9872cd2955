//! Index documents: the flat projection of one domain object.

mod document;
mod field;

pub use document::{Document, DocumentBuilder};
pub use field::{Field, FieldOptions};

/// Stored, untokenized identifier field. Delete key on re-index and lookup
/// key on hydration.
pub const DOC_ID_FIELD: &str = "_docID";

/// Aggregate field holding every value of a document, tokenized, not stored.
pub const ALL_FIELD: &str = "allfield";

/// Suffix of the untokenized shadow of a tokenized, sortable field.
pub const UNTOKENIZED_SUFFIX: &str = "_untokenized";

/// Name of the untokenized shadow field of `field`.
pub fn untokenized_name(field: &str) -> String {
    format!("{field}{UNTOKENIZED_SUFFIX}")
}
