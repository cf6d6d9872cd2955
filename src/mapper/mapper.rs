//! Conversion of entities into index documents.

use std::sync::Arc;

use crate::document::{Document, DocumentBuilder, FieldOptions, untokenized_name};
use crate::error::Result;
use crate::mapper::entity::{Entity, FieldValue};
use crate::mapper::extract::TextExtractor;
use crate::mapper::mapping::{EntityMapping, FieldMapping, MappingRegistry};

/// Builds index documents from entities using their mappings.
///
/// The mapper is stateless apart from its metadata; it knows nothing about
/// storage or indexes.
#[derive(Clone)]
pub struct DocumentMapper {
    mappings: Arc<MappingRegistry>,
    extractor: Arc<dyn TextExtractor>,
}

impl std::fmt::Debug for DocumentMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentMapper")
            .field("mappings", &self.mappings)
            .field("extractor", &self.extractor.name())
            .finish()
    }
}

impl DocumentMapper {
    /// Create a mapper.
    pub fn new(mappings: Arc<MappingRegistry>, extractor: Arc<dyn TextExtractor>) -> Self {
        DocumentMapper {
            mappings,
            extractor,
        }
    }

    /// The mappings in use.
    pub fn mappings(&self) -> &Arc<MappingRegistry> {
        &self.mappings
    }

    /// Mapping of an entity's type, if it is indexed.
    pub fn mapping_for(&self, entity: &dyn Entity) -> Option<&Arc<EntityMapping>> {
        self.mappings.get(entity.entity_type())
    }

    /// Build the document of an entity; `None` if its type is not mapped.
    pub fn to_document(&self, entity: &dyn Entity) -> Result<Option<Document>> {
        match self.mapping_for(entity) {
            Some(mapping) => self.map_with(entity, mapping).map(Some),
            None => Ok(None),
        }
    }

    /// Build the document of an entity with an explicit mapping.
    pub fn map_with(&self, entity: &dyn Entity, mapping: &EntityMapping) -> Result<Document> {
        let mut builder = Document::builder().id(entity.id());
        let mut all_values: Vec<String> = Vec::new();

        for field in mapping.fields() {
            let value = match entity.field(&field.name) {
                None | Some(FieldValue::Null) | Some(FieldValue::Collection(_)) => continue,
                Some(value) => value,
            };

            match value {
                FieldValue::Reference(related) if !field.join_fields.is_empty() => {
                    for path in &field.join_fields {
                        if let Some(text) = self.resolve_path(related.as_ref(), path)? {
                            let name = format!("{}.{}", field.name, path);
                            builder = add_value(builder, &name, text, field, &mut all_values);
                        }
                    }
                }
                value => {
                    if let Some(text) = self.text_of(&value)? {
                        builder = add_value(builder, &field.name, text, field, &mut all_values);
                    }
                }
            }
        }

        Ok(builder.add_all(all_values.join(" ")).build())
    }

    fn text_of(&self, value: &FieldValue) -> Result<Option<String>> {
        match value {
            FieldValue::Attachment(attachment) => self.extractor.extract(attachment),
            other => Ok(other.as_text()),
        }
    }

    /// Follow a dotted path through referenced entities.
    fn resolve_path(&self, entity: &dyn Entity, path: &str) -> Result<Option<String>> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        match (entity.field(head), rest) {
            (Some(FieldValue::Reference(next)), Some(rest)) => self.resolve_path(next.as_ref(), rest),
            (Some(FieldValue::Collection(_)), _) | (None, _) | (_, Some(_)) => Ok(None),
            (Some(value), None) => self.text_of(&value),
        }
    }
}

fn add_value(
    builder: DocumentBuilder,
    name: &str,
    value: String,
    field: &FieldMapping,
    all_values: &mut Vec<String>,
) -> DocumentBuilder {
    let mut builder = builder.add_field(name, value.clone(), field.options());
    if field.is_forced_untokenized() {
        builder = builder.add_field(
            untokenized_name(name),
            value.clone(),
            FieldOptions::new(field.stored, false),
        );
    }
    all_values.push(value);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ALL_FIELD, DOC_ID_FIELD};
    use crate::mapper::entity::Attachment;
    use crate::mapper::extract::ExtractorRegistry;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct Record {
        kind: &'static str,
        id: String,
        fields: HashMap<&'static str, FieldValue>,
    }

    impl Entity for Record {
        fn entity_type(&self) -> &str {
            self.kind
        }

        fn id(&self) -> String {
            self.id.clone()
        }

        fn field(&self, name: &str) -> Option<FieldValue> {
            self.fields.get(name).cloned()
        }
    }

    fn record(kind: &'static str, id: &str, fields: Vec<(&'static str, FieldValue)>) -> Record {
        Record {
            kind,
            id: id.to_string(),
            fields: fields.into_iter().collect(),
        }
    }

    fn mapper() -> DocumentMapper {
        let mappings = MappingRegistry::new().register(
            EntityMapping::new("Article")
                .field(FieldMapping::new("title"))
                .field(FieldMapping::new("rank").sortable(true))
                .field(FieldMapping::new("tags"))
                .field(FieldMapping::new("body").stored(false))
                .field(FieldMapping::new("author"))
                .field(FieldMapping::new("company").join(["name", "address.city"]))
                .field(FieldMapping::new("file")),
        );
        DocumentMapper::new(Arc::new(mappings), Arc::new(ExtractorRegistry::new()))
    }

    fn values(doc: &Document, name: &str) -> Vec<String> {
        doc.get_all(name).map(|f| f.value().to_string()).collect()
    }

    #[test]
    fn test_unmapped_type() {
        let comment = record("Comment", "1", vec![("title", "x".into())]);
        assert!(mapper().to_document(&comment).unwrap().is_none());
    }

    #[test]
    fn test_scalar_fields() {
        let article = record(
            "Article",
            "7",
            vec![
                ("title", "Intro to Rust".into()),
                ("rank", FieldValue::Integer(2)),
                ("tags", FieldValue::Collection(vec!["a".into()])),
                ("body", FieldValue::Null),
            ],
        );
        let doc = mapper().to_document(&article).unwrap().unwrap();

        assert_eq!(doc.doc_id(), Some("7"));
        assert_eq!(values(&doc, "title"), vec!["Intro to Rust"]);
        assert_eq!(values(&doc, "rank"), vec!["2"]);
        assert_eq!(values(&doc, "rank_untokenized"), vec!["2"]);
        assert!(!doc.get("rank_untokenized").unwrap().is_tokenized());
        assert!(!doc.has_field("tags"));
        assert!(!doc.has_field("body"));
        assert!(!doc.has_field("title_untokenized"));
        assert_eq!(values(&doc, ALL_FIELD), vec!["Intro to Rust 2"]);
        assert!(!doc.get(DOC_ID_FIELD).unwrap().is_tokenized());
    }

    #[test]
    fn test_references_and_joins() {
        let address = Arc::new(record("Address", "a1", vec![("city", "Lyon".into())]));
        let company = Arc::new(record(
            "Company",
            "c1",
            vec![
                ("name", "Acme".into()),
                ("address", FieldValue::Reference(address)),
            ],
        ));
        let author = Arc::new(record("Author", "u9", vec![("name", "Ann".into())]));
        let article = record(
            "Article",
            "1",
            vec![
                ("author", FieldValue::Reference(author)),
                ("company", FieldValue::Reference(company)),
            ],
        );
        let doc = mapper().to_document(&article).unwrap().unwrap();

        assert_eq!(values(&doc, "author"), vec!["u9"]);
        assert_eq!(values(&doc, "company.name"), vec!["Acme"]);
        assert_eq!(values(&doc, "company.address.city"), vec!["Lyon"]);
        assert!(!doc.has_field("company"));
    }

    #[test]
    fn test_attachments() {
        let text = record(
            "Article",
            "1",
            vec![(
                "file",
                FieldValue::Attachment(Attachment::new("a.txt", b"attached words".to_vec())),
            )],
        );
        let doc = mapper().to_document(&text).unwrap().unwrap();
        assert_eq!(values(&doc, "file"), vec!["attached words"]);

        let pdf = record(
            "Article",
            "2",
            vec![(
                "file",
                FieldValue::Attachment(Attachment::new("a.pdf", vec![1, 2])),
            )],
        );
        let doc = mapper().to_document(&pdf).unwrap().unwrap();
        assert!(!doc.has_field("file"));
    }
}
