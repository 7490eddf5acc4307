use std::sync::Arc;

use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::traits::DocumentStore;

/// Cloneable async handle to a [`DocumentStore`].
///
/// Every call runs the blocking store operation on the tokio blocking pool,
/// so request handlers can issue operations concurrently without stalling
/// the runtime. Dropping the returned future does not cancel the operation;
/// it runs to completion in the background.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<dyn DocumentStore>,
}

impl SharedStore {
    pub fn new<S: DocumentStore + 'static>(store: S) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    pub fn from_arc(inner: Arc<dyn DocumentStore>) -> Self {
        Self { inner }
    }

    /// The underlying blocking store.
    pub fn blocking(&self) -> &Arc<dyn DocumentStore> {
        &self.inner
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DocumentStore) -> StoreResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub async fn create(&self, collection: &str, key: &str, document: Document) -> StoreResult<()> {
        let (collection, key) = (collection.to_owned(), key.to_owned());
        self.run(move |s| s.create(&collection, &key, &document)).await
    }

    pub async fn read(&self, collection: &str, key: &str) -> StoreResult<Document> {
        let (collection, key) = (collection.to_owned(), key.to_owned());
        self.run(move |s| s.read(&collection, &key)).await
    }

    pub async fn update(&self, collection: &str, key: &str, document: Document) -> StoreResult<()> {
        let (collection, key) = (collection.to_owned(), key.to_owned());
        self.run(move |s| s.update(&collection, &key, &document)).await
    }

    pub async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        let (collection, key) = (collection.to_owned(), key.to_owned());
        self.run(move |s| s.delete(&collection, &key)).await
    }

    pub async fn list(&self, collection: &str) -> StoreResult<Vec<String>> {
        let collection = collection.to_owned();
        self.run(move |s| s.list(&collection)).await
    }

    pub async fn exists(&self, collection: &str, key: &str) -> StoreResult<bool> {
        let (collection, key) = (collection.to_owned(), key.to_owned());
        self.run(move |s| s.exists(&collection, &key)).await
    }

    pub async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.run(|s| s.list_collections()).await
    }
}

impl std::fmt::Debug for SharedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStore").finish_non_exhaustive()
    }
}
