//! Lifecycle events of the host application.
//!
//! The host decides when records change; it hands each change to
//! [`Registry::on_event`](crate::store::Registry::on_event), which keeps the
//! matching index in step.

use std::sync::Arc;

use crate::mapper::Entity;

/// A change to one record of the primary datastore.
#[derive(Debug, Clone)]
pub enum EntityEvent {
    /// The record was created.
    Persisted(Arc<dyn Entity>),
    /// The record was modified.
    Updated(Arc<dyn Entity>),
    /// The record was removed.
    Deleted(Arc<dyn Entity>),
}

impl EntityEvent {
    /// The record the event is about.
    pub fn entity(&self) -> &Arc<dyn Entity> {
        match self {
            EntityEvent::Persisted(entity)
            | EntityEvent::Updated(entity)
            | EntityEvent::Deleted(entity) => entity,
        }
    }

    /// Whether the record should be removed from its index.
    pub fn is_removal(&self) -> bool {
        matches!(self, EntityEvent::Deleted(_))
    }
}
