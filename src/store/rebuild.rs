//! Re-indexing from the primary datastore.
//!
//! [`Registry::rebuild_all`] wipes the index root and re-indexes every mapped
//! entity type. Queries fail while the root is gone, so it is for
//! maintenance windows only.
//!
//! [`Registry::rebuild`] rebuilds one index beside the live one under a
//! shadow name and swaps it in at the end. Writes made to the live index
//! while the shadow is being built are lost at the swap.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{PaviseError, Result};
use crate::mapper::EntityMapping;
use crate::store::handle::IndexHandle;
use crate::store::registry::Registry;

impl Registry {
    /// Delete every index and re-index all records of every mapped type.
    ///
    /// Returns the number of records indexed.
    pub fn rebuild_all(&self) -> Result<u64> {
        tracing::info!(target: "pavise::rebuild", root = %self.root().display(), "Rebuilding all indexes");

        self.close()?;
        if self.root().exists() {
            std::fs::remove_dir_all(self.root())?;
        }
        std::fs::create_dir_all(self.root())?;

        let mappings: Vec<Arc<EntityMapping>> = self
            .mappings()
            .entity_types()
            .filter_map(|entity_type| self.mappings().get(entity_type).cloned())
            .collect();

        let mut total = 0;
        for mapping in mappings {
            let handle = self.open(mapping.entity_type())?;
            let records = self.load_into(&handle, &mapping)?;
            handle.reopen()?;
            total += records;
        }

        tracing::info!(target: "pavise::rebuild", records = total, "Rebuilt all indexes");
        Ok(total)
    }

    /// Rebuild the named index in place from the primary datastore.
    ///
    /// The live index keeps serving reads until the rebuilt one replaces it.
    /// Returns the number of records indexed.
    pub fn rebuild(&self, name: &str) -> Result<u64> {
        let mapping = self
            .mappings()
            .get(name)
            .cloned()
            .ok_or_else(|| PaviseError::index(format!("No search mapping for index '{name}'")))?;
        let live = self.open(name)?;

        let shadow_name = format!("{name}-{}", Uuid::new_v4());
        tracing::info!(target: "pavise::rebuild", index = %name, shadow = %shadow_name, "Rebuilding index");

        let shadow = IndexHandle::open(
            shadow_name.as_str(),
            self.index_path(&shadow_name),
            self.options().clone(),
        )?;

        let records = match self.load_into(&shadow, &mapping) {
            Ok(records) => records,
            Err(e) => {
                discard(shadow);
                return Err(e);
            }
        };

        live.replace_with(shadow)?;

        tracing::info!(target: "pavise::rebuild", index = %name, records, "Rebuilt index");
        Ok(records)
    }

    /// Stream every record of the mapping's type into `handle`.
    fn load_into(&self, handle: &IndexHandle, mapping: &EntityMapping) -> Result<u64> {
        let mut records = 0;
        for entity in self.source().all(mapping.entity_type())? {
            let entity = entity?;
            let doc = self.mapper().map_with(entity.as_ref(), mapping)?;
            handle.write_deferred(doc)?;
            records += 1;
        }
        Ok(records)
    }
}

fn discard(shadow: IndexHandle) {
    let directory = shadow.directory().to_path_buf();
    if let Err(e) = shadow.close() {
        tracing::warn!(target: "pavise::rebuild", error = %e, "Failed to close shadow index");
    }
    drop(shadow);
    if let Err(e) = std::fs::remove_dir_all(&directory) {
        tracing::warn!(
            target: "pavise::rebuild",
            directory = %directory.display(),
            error = %e,
            "Failed to remove shadow index"
        );
    }
}
