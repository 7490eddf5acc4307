use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a [`FileDocumentStore`](crate::FileDocumentStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory; each collection is a subdirectory of it.
    pub data_dir: PathBuf,
    /// Report unparsable records as [`StoreError::Corrupt`](crate::StoreError::Corrupt)
    /// instead of reading them as an empty document.
    pub strict_reads: bool,
    /// `fsync` record files before a create or update returns.
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".data"),
            strict_reads: false,
            sync_writes: true,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}
