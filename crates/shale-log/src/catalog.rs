//! Read-only view of the collection catalog.
//!
//! The catalog service owns collection lifecycle; the log only needs to ask
//! whether a collection still exists so garbage collection can detect log
//! state whose owning collection was deleted without the drop cascade
//! reaching the log. [`CatalogView`] is that single question as a trait, with
//! [`InMemoryCatalog`] for testing and a catalog-service client in
//! production.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use shale_core::CollectionId;

use crate::error::{Error, Result};

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::storage("lock poisoned")
}

/// Existence checks against the collection catalog.
#[async_trait]
pub trait CatalogView: Send + Sync {
    /// Returns whether the catalog knows the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be reached.
    async fn collection_exists(&self, collection_id: CollectionId) -> Result<bool>;
}

/// In-memory catalog membership for testing.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    collections: RwLock<HashSet<CollectionId>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn register(&self, collection_id: CollectionId) -> Result<()> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        collections.insert(collection_id);
        Ok(())
    }

    /// Removes a collection from the catalog, simulating a catalog-side
    /// deletion.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn deregister(&self, collection_id: CollectionId) -> Result<()> {
        let mut collections = self.collections.write().map_err(poison_err)?;
        collections.remove(&collection_id);
        Ok(())
    }
}

#[async_trait]
impl CatalogView for InMemoryCatalog {
    async fn collection_exists(&self, collection_id: CollectionId) -> Result<bool> {
        let collections = self.collections.read().map_err(poison_err)?;
        Ok(collections.contains(&collection_id))
    }
}
