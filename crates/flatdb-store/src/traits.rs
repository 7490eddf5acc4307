use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::document::Document;
use crate::error::StoreResult;

/// Collection-scoped document storage.
///
/// All implementations must satisfy these invariants:
/// - `create` never overwrites an existing record.
/// - `update` never creates a missing record.
/// - A reader never observes a partially written document.
/// - Expected conditions (missing or existing record) are returned as
///   errors, never panics, and nothing is retried internally.
/// - The store never interprets document contents.
pub trait DocumentStore: Send + Sync {
    /// Store a new record. Fails with `AlreadyExists` if the key is taken.
    fn create(&self, collection: &str, key: &str, document: &Document) -> StoreResult<()>;

    /// Read a record.
    ///
    /// Absent, unreadable, and empty records are all `NotFound`.
    fn read(&self, collection: &str, key: &str) -> StoreResult<Document>;

    /// Replace an existing record. Fails with `NotFound` if it does not exist.
    fn update(&self, collection: &str, key: &str, document: &Document) -> StoreResult<()>;

    /// Remove a record.
    ///
    /// A record that is already gone is reported as a `Delete` error.
    fn delete(&self, collection: &str, key: &str) -> StoreResult<()>;

    /// List the keys of a collection in sorted order.
    ///
    /// An empty or nonexistent collection yields an empty list.
    fn list(&self, collection: &str) -> StoreResult<Vec<String>>;

    /// Check whether a record exists.
    fn exists(&self, collection: &str, key: &str) -> StoreResult<bool>;

    /// List the collections known to the store in sorted order.
    fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// Serialize `value` and store it as a new record.
    fn create_from<T: Serialize>(&self, collection: &str, key: &str, value: &T) -> StoreResult<()>
    where
        Self: Sized,
    {
        self.create(collection, key, &Document::from_serialize(value)?)
    }

    /// Read a record and deserialize it into `T`.
    fn read_as<T: DeserializeOwned>(&self, collection: &str, key: &str) -> StoreResult<T>
    where
        Self: Sized,
    {
        self.read(collection, key)?.deserialize_into()
    }
}
