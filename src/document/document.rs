//! Document structure.

use serde::{Deserialize, Serialize};

use crate::document::field::{Field, FieldOptions};
use crate::document::{ALL_FIELD, DOC_ID_FIELD};

/// A document represents a single item to be indexed.
///
/// Fields keep insertion order and a name may repeat. The identifier lives
/// in the `_docID` field.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    /// Create a document carrying only its identifier field.
    pub fn with_id<S: Into<String>>(doc_id: S) -> Self {
        let mut document = Document::new();
        document.add(Field::new(DOC_ID_FIELD, doc_id, FieldOptions::KEYWORD));
        document
    }

    /// Add a field.
    pub fn add(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// The identifier, if the document has one.
    pub fn doc_id(&self) -> Option<&str> {
        self.get(DOC_ID_FIELD).map(|f| f.value())
    }

    /// First field with the given name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// All values of the given field name.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |f| f.name() == name)
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Distinct field names in insertion order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for field in &self.fields {
            if !names.contains(&field.name()) {
                names.push(field.name());
            }
        }
        names
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Create a builder for constructing documents.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    /// Set the `_docID` identifier field.
    pub fn id<S: Into<String>>(mut self, doc_id: S) -> Self {
        self.document
            .add(Field::new(DOC_ID_FIELD, doc_id, FieldOptions::KEYWORD));
        self
    }

    /// Add a stored, tokenized text field.
    pub fn add_text<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document.add(Field::new(name, value, FieldOptions::TEXT));
        self
    }

    /// Add a stored, untokenized field.
    pub fn add_keyword<S: Into<String>, T: Into<String>>(mut self, name: S, value: T) -> Self {
        self.document
            .add(Field::new(name, value, FieldOptions::KEYWORD));
        self
    }

    /// Add a field with explicit options.
    pub fn add_field<S: Into<String>, T: Into<String>>(
        mut self,
        name: S,
        value: T,
        options: FieldOptions,
    ) -> Self {
        self.document.add(Field::new(name, value, options));
        self
    }

    /// Add the aggregate `allfield`.
    pub fn add_all<T: Into<String>>(mut self, value: T) -> Self {
        self.document
            .add(Field::new(ALL_FIELD, value, FieldOptions::INDEXED));
        self
    }

    /// Build the document.
    pub fn build(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::builder()
            .id("42")
            .add_text("title", "Intro to Rust")
            .add_keyword("isbn", "978-0")
            .add_all("Intro to Rust 978-0")
            .build();

        assert_eq!(doc.doc_id(), Some("42"));
        assert_eq!(doc.len(), 4);
        assert!(doc.has_field("title"));
        assert!(!doc.get(ALL_FIELD).unwrap().is_stored());
        assert_eq!(doc.field_names(), vec!["_docID", "title", "isbn", "allfield"]);
    }

    #[test]
    fn test_repeated_field_names() {
        let mut doc = Document::with_id("1");
        doc.add(Field::new("tag", "a", FieldOptions::KEYWORD));
        doc.add(Field::new("tag", "b", FieldOptions::KEYWORD));

        let tags: Vec<&str> = doc.get_all("tag").map(|f| f.value()).collect();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(doc.field_names(), vec!["_docID", "tag"]);
    }
}
