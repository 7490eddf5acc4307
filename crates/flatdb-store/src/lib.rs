//! Collection-oriented flat-file document store.
//!
//! Records are grouped into collections. Each collection is a directory and
//! each record a single JSON file named by its key:
//!
//! ```text
//! <data_dir>/users/5551234567.json
//! <data_dir>/orders/k3j9x2.json
//! ```
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`FileDocumentStore`] -- the on-disk layout above
//! - [`InMemoryDocumentStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! [`SharedStore`] wraps either one for use from async request handlers.
//!
//! # Design Rules
//!
//! 1. `create` is exclusive: an existing record is never overwritten.
//! 2. `update` never creates: a missing record is `NotFound`.
//! 3. `update` replaces the file atomically (temp file + rename).
//! 4. Per-record reader/writer locks; no global lock.
//! 5. The store never interprets document contents.
//! 6. Expected conditions are returned as errors, never retried or panicked on.

pub mod config;
pub mod document;
pub mod error;
pub mod fs;
pub mod memory;
pub mod shared;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use document::Document;
pub use error::{StoreError, StoreResult};
pub use fs::{FileDocumentStore, RECORD_EXTENSION};
pub use memory::InMemoryDocumentStore;
pub use shared::SharedStore;
pub use traits::DocumentStore;
