//! Field-mapping metadata, resolved once at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::document::FieldOptions;

/// How one entity field is indexed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field name on the entity.
    pub name: String,
    /// Keep the value retrievable from the index.
    #[serde(default = "default_true")]
    pub stored: bool,
    /// Split the value into terms.
    #[serde(default = "default_true")]
    pub tokenized: bool,
    /// Usable as a sort key.
    #[serde(default)]
    pub sortable: bool,
    /// Dotted paths pulled from a referenced entity instead of its id.
    #[serde(default)]
    pub join_fields: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl FieldMapping {
    /// A stored, tokenized field.
    pub fn new<S: Into<String>>(name: S) -> Self {
        FieldMapping {
            name: name.into(),
            stored: true,
            tokenized: true,
            sortable: false,
            join_fields: Vec::new(),
        }
    }

    /// Set whether the value is stored.
    pub fn stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }

    /// Set whether the value is tokenized.
    pub fn tokenized(mut self, tokenized: bool) -> Self {
        self.tokenized = tokenized;
        self
    }

    /// Set whether the field can be sorted on.
    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    /// Pull the given paths from the referenced entity.
    pub fn join<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.join_fields = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Tokenized and sortable: sorting needs the untokenized shadow field.
    pub fn is_forced_untokenized(&self) -> bool {
        self.tokenized && self.sortable
    }

    /// Index options for the field's values.
    pub fn options(&self) -> FieldOptions {
        FieldOptions::new(self.stored, self.tokenized)
    }

    /// Index field names this mapping produces values under.
    pub fn output_names(&self) -> Vec<String> {
        if self.join_fields.is_empty() {
            vec![self.name.clone()]
        } else {
            self.join_fields
                .iter()
                .map(|path| format!("{}.{}", self.name, path))
                .collect()
        }
    }
}

/// Index metadata of one entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMapping {
    entity_type: String,
    fields: Vec<FieldMapping>,
}

impl EntityMapping {
    /// Create a mapping with no fields.
    pub fn new<S: Into<String>>(entity_type: S) -> Self {
        EntityMapping {
            entity_type: entity_type.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field.
    pub fn field(mut self, field: FieldMapping) -> Self {
        self.fields.push(field);
        self
    }

    /// The entity type this mapping describes.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Look up a declared field.
    pub fn get(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether sorting on `name` must use its untokenized shadow.
    pub fn is_forced_untokenized(&self, name: &str) -> bool {
        self.get(name).is_some_and(FieldMapping::is_forced_untokenized)
    }

    /// Index fields holding verbatim values.
    pub fn untokenized_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !f.tokenized)
            .flat_map(FieldMapping::output_names)
            .collect()
    }
}

/// All entity mappings, keyed by entity type.
#[derive(Clone, Debug, Default)]
pub struct MappingRegistry {
    mappings: BTreeMap<String, Arc<EntityMapping>>,
}

impl MappingRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping, replacing any previous one for the same type.
    pub fn register(mut self, mapping: EntityMapping) -> Self {
        self.insert(mapping);
        self
    }

    /// Add a mapping in place.
    pub fn insert(&mut self, mapping: EntityMapping) {
        self.mappings
            .insert(mapping.entity_type().to_string(), Arc::new(mapping));
    }

    /// Mapping of an entity type.
    pub fn get(&self, entity_type: &str) -> Option<&Arc<EntityMapping>> {
        self.mappings.get(entity_type)
    }

    /// Whether an entity type is indexed.
    pub fn contains(&self, entity_type: &str) -> bool {
        self.mappings.contains_key(entity_type)
    }

    /// Mapped entity types, sorted.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }

    /// Number of mapped entity types.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Whether no entity type is mapped.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl FromIterator<EntityMapping> for MappingRegistry {
    fn from_iter<I: IntoIterator<Item = EntityMapping>>(iter: I) -> Self {
        let mut registry = MappingRegistry::new();
        for mapping in iter {
            registry.insert(mapping);
        }
        registry
    }
}
