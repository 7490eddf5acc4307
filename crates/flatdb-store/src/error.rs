use std::io;

use flatdb_types::{ErrorKind, NameError};

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `create` found a record already stored under this key.
    #[error("record already exists: {collection}/{key}")]
    AlreadyExists { collection: String, key: String },

    /// The record is absent, unreadable, or empty.
    #[error("record not found: {collection}/{key}")]
    NotFound { collection: String, key: String },

    /// Opening, writing, syncing, or renaming the record file failed.
    #[error("failed to write {collection}/{key}: {source}")]
    Write {
        collection: String,
        key: String,
        #[source]
        source: io::Error,
    },

    /// Removing the record file failed, including because it was already gone.
    #[error("failed to delete {collection}/{key}: {source}")]
    Delete {
        collection: String,
        key: String,
        #[source]
        source: io::Error,
    },

    /// The collection directory exists but could not be enumerated.
    #[error("failed to list collection {collection}: {source}")]
    List {
        collection: String,
        #[source]
        source: io::Error,
    },

    /// Stored content is not a JSON object. Only raised with strict reads.
    #[error("corrupt record {collection}/{key}: {reason}")]
    Corrupt {
        collection: String,
        key: String,
        reason: String,
    },

    /// A collection or key is not usable as a file name.
    #[error(transparent)]
    InvalidName(#[from] NameError),

    /// The document could not be serialized or converted.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error outside of a single record operation.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A blocking task running a store operation panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Coarse classification for callers deciding a response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } | Self::Corrupt { .. } => ErrorKind::NotFound,
            Self::Write { .. }
            | Self::Delete { .. }
            | Self::List { .. }
            | Self::Io(_)
            | Self::Task(_) => ErrorKind::Io,
            Self::InvalidName(_) | Self::Serialization(_) => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn not_found(collection: &str, key: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn already_exists(collection: &str, key: &str) -> Self {
        Self::AlreadyExists {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn write(collection: &str, key: &str, source: io::Error) -> Self {
        Self::Write {
            collection: collection.to_string(),
            key: key.to_string(),
            source,
        }
    }

    pub(crate) fn delete(collection: &str, key: &str, source: io::Error) -> Self {
        Self::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
