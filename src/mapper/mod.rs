//! Mapping of domain entities to index documents.
//!
//! Which fields are indexed, and how, comes from [`EntityMapping`]
//! descriptors collected in a [`MappingRegistry`].

pub mod entity;
pub mod extract;
#[allow(clippy::module_inception)]
pub mod mapper;
pub mod mapping;

pub use entity::{Attachment, Entity, FieldValue};
pub use extract::{ExtensionGuesser, ExtractorRegistry, MimeGuesser, PlainTextExtractor, TextExtractor};
pub use mapper::DocumentMapper;
pub use mapping::{EntityMapping, FieldMapping, MappingRegistry};
