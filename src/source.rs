//! Access to the primary datastore.

use std::sync::Arc;

use crate::error::Result;
use crate::mapper::Entity;

/// Stream of records returned by [`RecordSource::all`].
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Arc<dyn Entity>>> + Send + 'a>;

/// The primary datastore the indexes mirror.
///
/// Rebuilds enumerate it, drift checks count it and query hydration loads
/// single records from it by identifier.
pub trait RecordSource: Send + Sync {
    /// Every current record of an entity type.
    fn all(&self, entity_type: &str) -> Result<RecordIter<'_>>;

    /// Number of current records of an entity type.
    fn count(&self, entity_type: &str) -> Result<u64>;

    /// Load one record by identifier; `None` if it no longer exists.
    fn find(&self, entity_type: &str, id: &str) -> Result<Option<Arc<dyn Entity>>>;
}

/// A datastore without records, for tools that only inspect indexes.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl RecordSource for EmptySource {
    fn all(&self, _entity_type: &str) -> Result<RecordIter<'_>> {
        Ok(Box::new(std::iter::empty()))
    }

    fn count(&self, _entity_type: &str) -> Result<u64> {
        Ok(0)
    }

    fn find(&self, _entity_type: &str, _id: &str) -> Result<Option<Arc<dyn Entity>>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source() {
        let source = EmptySource;
        assert_eq!(source.all("Article").unwrap().count(), 0);
        assert_eq!(source.count("Article").unwrap(), 0);
        assert!(source.find("Article", "1").unwrap().is_none());
    }
}
