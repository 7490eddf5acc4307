use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flatdb_types::{validate_name, KeyedLocks, NameKind};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::document::Document;
use crate::error::{StoreError, StoreResult};
use crate::traits::DocumentStore;

/// Prefix of temp files written by `update` before the atomic rename.
const UPDATE_TEMP_PREFIX: &str = ".upd.";

/// Extension of every record file.
pub const RECORD_EXTENSION: &str = "json";

/// Directory-backed document store.
///
/// On-disk layout:
/// ```text
/// <data_dir>/<collection>/<key>.json   compact JSON object, one per record
/// ```
///
/// Collection directories must exist before records are written to them;
/// the store only creates them through [`FileDocumentStore::ensure_collection`].
///
/// Every record is guarded by a reader/writer lock keyed on
/// `collection/key`. Mutations hold it exclusively, reads hold it shared, so
/// concurrent callers never see a half-written file. `update` writes to a
/// temp file beside the record and renames it into place, so a crash leaves
/// either the old or the new content.
pub struct FileDocumentStore {
    config: StoreConfig,
    locks: KeyedLocks,
}

impl FileDocumentStore {
    /// Open a store with the given configuration. No directories are created.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            locks: KeyedLocks::new(),
        }
    }

    /// Open a store rooted at `data_dir` with default settings.
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(StoreConfig::with_data_dir(data_dir))
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Create the directory backing `collection` if it does not exist yet.
    pub fn ensure_collection(&self, collection: &str) -> StoreResult<PathBuf> {
        let dir = self.collection_dir(collection)?;
        fs::create_dir_all(&dir)?;
        debug!(collection, "collection ready");
        Ok(dir)
    }

    fn collection_dir(&self, collection: &str) -> StoreResult<PathBuf> {
        validate_name(NameKind::Collection, collection)?;
        Ok(self.config.data_dir.join(collection))
    }

    fn record_path(&self, collection: &str, key: &str) -> StoreResult<PathBuf> {
        let dir = self.collection_dir(collection)?;
        validate_name(NameKind::Key, key)?;
        Ok(dir.join(format!("{key}.{RECORD_EXTENSION}")))
    }

    /// Write `text` to a temp file in `dir` and rename it over `path`.
    ///
    /// The temp name does not embed the key, so any key whose record file
    /// fits in the directory can also be updated.
    fn replace_file(&self, dir: &Path, path: &Path, text: &str) -> io::Result<()> {
        let previous = fs::metadata(path)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(UPDATE_TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().set_permissions(previous.permissions())?;
        if self.config.sync_writes {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Write `text` into a freshly created `out`, removing `path` on failure.
///
/// A partial record left behind would make every retried `create` fail
/// with `AlreadyExists`.
fn write_or_discard<W: Write>(
    path: &Path,
    mut out: W,
    text: &str,
    finish: impl FnOnce(&mut W) -> io::Result<()>,
) -> io::Result<()> {
    let written = out.write_all(text.as_bytes()).and_then(|()| finish(&mut out));
    if written.is_err() {
        drop(out);
        let _ = fs::remove_file(path);
    }
    written
}

fn lock_key(collection: &str, key: &str) -> String {
    // Names cannot contain '/', so this is unambiguous.
    format!("{collection}/{key}")
}

impl DocumentStore for FileDocumentStore {
    fn create(&self, collection: &str, key: &str, document: &Document) -> StoreResult<()> {
        let path = self.record_path(collection, key)?;
        let text = document.to_json()?;

        self.locks.with_write(&lock_key(collection, key), || {
            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(StoreError::already_exists(collection, key));
                }
                Err(e) => return Err(StoreError::write(collection, key, e)),
            };
            let sync = self.config.sync_writes;
            write_or_discard(&path, file, &text, |file| {
                if sync {
                    file.sync_all()
                } else {
                    Ok(())
                }
            })
            .map_err(|e| StoreError::write(collection, key, e))
        })?;

        debug!(collection, key, bytes = text.len(), "record created");
        Ok(())
    }

    fn read(&self, collection: &str, key: &str) -> StoreResult<Document> {
        let path = self.record_path(collection, key)?;

        let text = match self
            .locks
            .with_read(&lock_key(collection, key), || fs::read_to_string(&path))
        {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => return Err(StoreError::not_found(collection, key)),
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(collection, key, error = %e, "record unreadable");
                }
                return Err(StoreError::not_found(collection, key));
            }
        };

        match Document::parse(&text) {
            Ok(document) => Ok(document),
            Err(e) if self.config.strict_reads => Err(StoreError::Corrupt {
                collection: collection.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            }),
            Err(e) => {
                warn!(collection, key, error = %e, "unparsable record read as empty document");
                Ok(Document::new())
            }
        }
    }

    fn update(&self, collection: &str, key: &str, document: &Document) -> StoreResult<()> {
        let dir = self.collection_dir(collection)?;
        let path = self.record_path(collection, key)?;
        let text = document.to_json()?;

        self.locks.with_write(&lock_key(collection, key), || {
            match self.replace_file(&dir, &path, &text) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound && !path.exists() => {
                    Err(StoreError::not_found(collection, key))
                }
                Err(e) => Err(StoreError::write(collection, key, e)),
            }
        })?;

        debug!(collection, key, bytes = text.len(), "record updated");
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        let path = self.record_path(collection, key)?;

        self.locks
            .with_write(&lock_key(collection, key), || fs::remove_file(&path))
            .map_err(|e| StoreError::delete(collection, key, e))?;

        debug!(collection, key, "record deleted");
        Ok(())
    }

    fn list(&self, collection: &str) -> StoreResult<Vec<String>> {
        let dir = self.collection_dir(collection)?;
        let list_err = |source: io::Error| StoreError::List {
            collection: collection.to_string(),
            source,
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(list_err(e)),
        };

        let suffix = format!(".{RECORD_EXTENSION}");
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(list_err)?;
            if !entry.file_type().map_err(list_err)?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                warn!(collection, file = ?file_name, "skipping non UTF-8 file name");
                continue;
            };
            match name.strip_suffix(&suffix) {
                Some(key) if !key.is_empty() && !key.starts_with('.') => keys.push(key.to_string()),
                _ => {}
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn exists(&self, collection: &str, key: &str) -> StoreResult<bool> {
        let path = self.record_path(collection, key)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_collections(&self) -> StoreResult<Vec<String>> {
        let entries = match fs::read_dir(&self.config.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for FileDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDocumentStore")
            .field("data_dir", &self.config.data_dir)
            .field("locks", &self.locks)
            .finish()
    }
}
