use std::collections::BTreeMap;
use std::io;
use std::sync::{PoisonError, RwLock};

use flatdb_types::{validate_name, NameKind};

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::traits::DocumentStore;

type Collections = BTreeMap<String, BTreeMap<String, String>>;

/// In-memory document store.
///
/// Intended for tests and embedding. Records are kept as serialized JSON
/// text, exactly as the file store keeps them, so both backends report the
/// same errors for the same calls. Collections must be created with
/// [`InMemoryDocumentStore::ensure_collection`] before use.
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl InMemoryDocumentStore {
    /// Create an empty store with no collections.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create `collection` if it does not exist yet.
    pub fn ensure_collection(&self, collection: &str) -> StoreResult<()> {
        validate_name(NameKind::Collection, collection)?;
        self.write_map().entry(collection.to_string()).or_default();
        Ok(())
    }

    /// Total number of records across all collections.
    pub fn len(&self) -> usize {
        self.read_map().values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, Collections> {
        self.collections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> std::sync::RwLockWriteGuard<'_, Collections> {
        self.collections.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(collection: &str, key: &str) -> StoreResult<()> {
    validate_name(NameKind::Collection, collection)?;
    validate_name(NameKind::Key, key)?;
    Ok(())
}

fn missing_collection() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "collection does not exist")
}

impl DocumentStore for InMemoryDocumentStore {
    fn create(&self, collection: &str, key: &str, document: &Document) -> StoreResult<()> {
        validate(collection, key)?;
        let text = document.to_json()?;
        let mut map = self.write_map();
        let records = map
            .get_mut(collection)
            .ok_or_else(|| StoreError::write(collection, key, missing_collection()))?;
        if records.contains_key(key) {
            return Err(StoreError::already_exists(collection, key));
        }
        records.insert(key.to_string(), text);
        Ok(())
    }

    fn read(&self, collection: &str, key: &str) -> StoreResult<Document> {
        validate(collection, key)?;
        let map = self.read_map();
        let text = map
            .get(collection)
            .and_then(|records| records.get(key))
            .ok_or_else(|| StoreError::not_found(collection, key))?;
        // Text was produced by `Document::to_json`, so it always parses.
        Document::parse(text)
    }

    fn update(&self, collection: &str, key: &str, document: &Document) -> StoreResult<()> {
        validate(collection, key)?;
        let text = document.to_json()?;
        let mut map = self.write_map();
        let slot = map
            .get_mut(collection)
            .and_then(|records| records.get_mut(key))
            .ok_or_else(|| StoreError::not_found(collection, key))?;
        *slot = text;
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        validate(collection, key)?;
        let mut map = self.write_map();
        match map.get_mut(collection).and_then(|records| records.remove(key)) {
            Some(_) => Ok(()),
            None => Err(StoreError::delete(
                collection,
                key,
                io::Error::from(io::ErrorKind::NotFound),
            )),
        }
    }

    fn list(&self, collection: &str) -> StoreResult<Vec<String>> {
        validate_name(NameKind::Collection, collection)?;
        let map = self.read_map();
        Ok(map
            .get(collection)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn exists(&self, collection: &str, key: &str) -> StoreResult<bool> {
        validate(collection, key)?;
        let map = self.read_map();
        Ok(map.get(collection).is_some_and(|records| records.contains_key(key)))
    }

    fn list_collections(&self) -> StoreResult<Vec<String>> {
        Ok(self.read_map().keys().cloned().collect())
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("record_count", &self.len())
            .finish()
    }
}
