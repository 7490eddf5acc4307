use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flatdb_types::{validate_name, KeyedLocks, NameKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::archive::{self, ARCHIVE_EXTENSION};
use crate::config::LogConfig;
use crate::error::{LogError, LogResult};

/// Extension of live topic files.
pub const LOG_EXTENSION: &str = "log";

/// Upper bound on suffixed archive ids tried when a rotation id is taken.
const MAX_ARCHIVE_ID_ATTEMPTS: u32 = 1000;

/// Whether a listed log file is a live topic or an archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    Live,
    Archive,
}

/// A file in the logs directory, named without its extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub name: String,
    pub kind: LogKind,
}

/// Outcome of rotating one topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation {
    pub topic: String,
    /// Archive written, or `None` if the topic was empty and left alone.
    pub archive: Option<String>,
    /// Bytes moved from the live topic into the archive.
    pub bytes: u64,
}

/// Outcome of rotating every live topic.
#[derive(Debug, Default)]
pub struct RotationReport {
    pub rotated: Vec<Rotation>,
    pub failed: Vec<(String, LogError)>,
}

impl RotationReport {
    /// Number of archives written.
    pub fn archived(&self) -> usize {
        self.rotated.iter().filter(|r| r.archive.is_some()).count()
    }
}

/// Append-only per-topic logs with on-demand archiving.
///
/// On-disk layout:
/// ```text
/// <logs_dir>/<topic>.log         newline-delimited plain text
/// <logs_dir>/<archive>.gz.b64    base64 of a gzip stream, immutable
/// ```
///
/// Every append opens, writes, and closes its own handle. Appends and
/// truncation hold the topic's exclusive lock, compression holds it shared,
/// so an archive always captures whole lines. `compress` never truncates;
/// callers that want rotation either sequence `compress` and `truncate`
/// themselves or use [`LogManager::rotate`], which does both under one lock.
pub struct LogManager {
    config: LogConfig,
    locks: KeyedLocks,
}

impl LogManager {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            locks: KeyedLocks::new(),
        }
    }

    /// Open a manager rooted at `logs_dir` with default settings.
    pub fn open(logs_dir: impl Into<PathBuf>) -> Self {
        Self::new(LogConfig::with_logs_dir(logs_dir))
    }

    pub fn dir(&self) -> &Path {
        &self.config.logs_dir
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Create the logs directory if it does not exist yet.
    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.config.logs_dir)
    }

    fn topic_path(&self, topic: &str) -> LogResult<PathBuf> {
        validate_name(NameKind::Topic, topic)?;
        Ok(self
            .config
            .logs_dir
            .join(format!("{topic}.{LOG_EXTENSION}")))
    }

    fn archive_path(&self, archive_id: &str) -> LogResult<PathBuf> {
        validate_name(NameKind::Archive, archive_id)?;
        Ok(self
            .config
            .logs_dir
            .join(format!("{archive_id}.{ARCHIVE_EXTENSION}")))
    }

    /// Append `line` and a newline to `topic`, creating the file if needed.
    pub fn append(&self, topic: &str, line: &str) -> LogResult<()> {
        let path = self.topic_path(topic)?;
        let append_err = |source: io::Error| LogError::Append {
            topic: topic.to_string(),
            source,
        };

        let mut entry = String::with_capacity(line.len() + 1);
        entry.push_str(line);
        entry.push('\n');

        self.locks.with_write(&topic_lock(topic), || -> LogResult<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(append_err)?;
            file.write_all(entry.as_bytes()).map_err(append_err)?;
            if self.config.sync_appends {
                file.sync_data().map_err(append_err)?;
            }
            Ok(())
        })
    }

    /// Names of live topics, followed by archives when `include_archives`.
    ///
    /// A missing logs directory lists as empty.
    pub fn list(&self, include_archives: bool) -> LogResult<Vec<String>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| include_archives || e.kind == LogKind::Live)
            .map(|e| e.name)
            .collect())
    }

    /// Every topic and archive in the logs directory, live topics first,
    /// each group sorted by name.
    pub fn entries(&self) -> LogResult<Vec<LogEntry>> {
        let dir_entries = match fs::read_dir(&self.config.logs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LogError::List(e)),
        };

        let live_suffix = format!(".{LOG_EXTENSION}");
        let archive_suffix = format!(".{ARCHIVE_EXTENSION}");
        let mut entries = Vec::new();

        for entry in dir_entries {
            let entry = entry.map_err(LogError::List)?;
            if !entry.file_type().map_err(LogError::List)?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if file_name.starts_with('.') {
                continue;
            }
            if let Some(name) = file_name.strip_suffix(&archive_suffix) {
                entries.push(LogEntry {
                    name: name.to_string(),
                    kind: LogKind::Archive,
                });
            } else if let Some(name) = file_name.strip_suffix(&live_suffix) {
                entries.push(LogEntry {
                    name: name.to_string(),
                    kind: LogKind::Live,
                });
            }
        }

        entries.retain(|e| !e.name.is_empty());
        entries.sort_by(|a, b| {
            (a.kind == LogKind::Archive, &a.name).cmp(&(b.kind == LogKind::Archive, &b.name))
        });
        Ok(entries)
    }

    /// Current contents of a live topic.
    pub fn read_live(&self, topic: &str) -> LogResult<String> {
        let path = self.topic_path(topic)?;
        self.locks
            .with_read(&topic_lock(topic), || fs::read_to_string(&path))
            .map_err(|e| read_error(&path, e))
    }

    /// Snapshot `topic` into a new archive named `archive_id`.
    ///
    /// Fails with `AlreadyExists` if the archive is taken. The live topic is
    /// not modified.
    pub fn compress(&self, topic: &str, archive_id: &str) -> LogResult<()> {
        let source = self.topic_path(topic)?;
        let target = self.archive_path(archive_id)?;

        let data = self
            .locks
            .with_read(&topic_lock(topic), || fs::read(&source))
            .map_err(|e| read_error(&source, e))?;
        let encoded = archive::encode(&data)?;
        self.write_archive(archive_id, &target, &encoded)?;

        debug!(topic, archive_id, bytes = data.len(), "topic compressed");
        Ok(())
    }

    /// Inflate an archive back to the text it captured.
    pub fn decompress(&self, archive_id: &str) -> LogResult<String> {
        let path = self.archive_path(archive_id)?;
        let text = self
            .locks
            .with_read(&archive_lock(archive_id), || fs::read_to_string(&path))
            .map_err(|e| read_error(&path, e))?;
        archive::decode(&text)
    }

    /// Reset a live topic to zero length. Does not archive anything first.
    pub fn truncate(&self, topic: &str) -> LogResult<()> {
        let path = self.topic_path(topic)?;
        self.locks
            .with_write(&topic_lock(topic), || truncate_file(&path))
            .map_err(|e| truncate_error(topic, &path, e))?;
        debug!(topic, "topic truncated");
        Ok(())
    }

    /// Archive `topic` under `<topic>-<unix millis>` and truncate it.
    ///
    /// Both steps run under the topic's exclusive lock, so no append can land
    /// between them and be lost. An empty topic is left untouched.
    pub fn rotate(&self, topic: &str) -> LogResult<Rotation> {
        let path = self.topic_path(topic)?;

        self.locks.with_write(&topic_lock(topic), || -> LogResult<Rotation> {
            let data = fs::read(&path).map_err(|e| read_error(&path, e))?;
            if data.is_empty() {
                return Ok(Rotation {
                    topic: topic.to_string(),
                    archive: None,
                    bytes: 0,
                });
            }

            let encoded = archive::encode(&data)?;
            let archive_id = self.write_rotation_archive(topic, &encoded)?;
            truncate_file(&path).map_err(|e| truncate_error(topic, &path, e))?;

            info!(topic, archive = %archive_id, bytes = data.len(), "topic rotated");
            Ok(Rotation {
                topic: topic.to_string(),
                archive: Some(archive_id),
                bytes: data.len() as u64,
            })
        })
    }

    /// Rotate every live topic.
    ///
    /// A failure on one topic is recorded in the report and the sweep
    /// continues with the next.
    pub fn rotate_all(&self) -> LogResult<RotationReport> {
        let mut report = RotationReport::default();
        for topic in self.list(false)? {
            match self.rotate(&topic) {
                Ok(rotation) => report.rotated.push(rotation),
                Err(e) => {
                    warn!(topic = %topic, error = %e, "topic rotation failed");
                    report.failed.push((topic, e));
                }
            }
        }
        Ok(report)
    }

    fn write_archive(&self, archive_id: &str, path: &Path, encoded: &str) -> LogResult<()> {
        self.locks
            .with_write(&archive_lock(archive_id), || write_new_file(path, encoded))
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => LogError::AlreadyExists {
                    archive: archive_id.to_string(),
                },
                _ => LogError::Write {
                    archive: archive_id.to_string(),
                    source: e,
                },
            })
    }

    /// Write a rotation archive, suffixing the id if the millisecond is taken.
    fn write_rotation_archive(&self, topic: &str, encoded: &str) -> LogResult<String> {
        let base = format!("{topic}-{}", chrono::Utc::now().timestamp_millis());
        let mut archive_id = base.clone();
        for attempt in 1..=MAX_ARCHIVE_ID_ATTEMPTS {
            let path = self.archive_path(&archive_id)?;
            match self.write_archive(&archive_id, &path, encoded) {
                Err(LogError::AlreadyExists { .. }) => {
                    archive_id = format!("{base}-{attempt}");
                }
                other => return other.map(|()| archive_id),
            }
        }
        Err(LogError::AlreadyExists { archive: base })
    }
}

impl std::fmt::Debug for LogManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogManager")
            .field("logs_dir", &self.config.logs_dir)
            .field("locks", &self.locks)
            .finish()
    }
}

fn topic_lock(topic: &str) -> String {
    format!("topic:{topic}")
}

fn archive_lock(archive_id: &str) -> String {
    format!("archive:{archive_id}")
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_error(path: &Path, e: io::Error) -> LogError {
    match e.kind() {
        io::ErrorKind::NotFound => LogError::NotFound {
            name: file_label(path),
        },
        _ => LogError::Read {
            name: file_label(path),
            source: e,
        },
    }
}

fn truncate_error(topic: &str, path: &Path, e: io::Error) -> LogError {
    match e.kind() {
        io::ErrorKind::NotFound => LogError::NotFound {
            name: file_label(path),
        },
        _ => LogError::Truncate {
            topic: topic.to_string(),
            source: e,
        },
    }
}

fn truncate_file(path: &Path) -> io::Result<()> {
    OpenOptions::new().write(true).open(path)?.set_len(0)
}

/// Exclusive-create `path` and write `text`. A partial file is removed.
fn write_new_file(path: &Path, text: &str) -> io::Result<()> {
    let mut file: File = OpenOptions::new().write(true).create_new(true).open(path)?;
    let written = file.write_all(text.as_bytes()).and_then(|()| file.sync_all());
    if written.is_err() {
        drop(file);
        let _ = fs::remove_file(path);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatdb_types::ErrorKind;
    use std::sync::Arc;
    use std::thread;

    fn manager() -> (tempfile::TempDir, LogManager) {
        let dir = tempfile::tempdir().unwrap();
        let manager = LogManager::open(dir.path());
        (dir, manager)
    }

    fn raw(dir: &tempfile::TempDir, file: &str) -> String {
        fs::read_to_string(dir.path().join(file)).unwrap()
    }

    // -----------------------------------------------------------------------
    // Append / truncate
    // -----------------------------------------------------------------------

    #[test]
    fn appends_are_newline_delimited() {
        let (dir, logs) = manager();
        logs.append("topic", "a").unwrap();
        logs.append("topic", "b").unwrap();
        assert_eq!(raw(&dir, "topic.log"), "a\nb\n");
        assert_eq!(logs.read_live("topic").unwrap(), "a\nb\n");
    }

    #[test]
    fn append_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let logs = LogManager::open(dir.path().join("absent"));
        let err = logs.append("topic", "a").unwrap_err();
        assert!(matches!(err, LogError::Append { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);

        logs.ensure_dir().unwrap();
        logs.append("topic", "a").unwrap();
    }

    #[test]
    fn truncate_then_append_leaves_no_residue() {
        let (dir, logs) = manager();
        logs.append("topic", "old line").unwrap();
        logs.truncate("topic").unwrap();
        logs.append("topic", "x").unwrap();
        assert_eq!(raw(&dir, "topic.log"), "x\n");
    }

    #[test]
    fn truncate_missing_topic_is_not_found() {
        let (_dir, logs) = manager();
        let err = logs.truncate("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    // -----------------------------------------------------------------------
    // Compress / decompress
    // -----------------------------------------------------------------------

    #[test]
    fn compress_snapshot_is_independent_of_later_appends() {
        let (dir, logs) = manager();
        logs.append("http", "GET /users 200").unwrap();
        logs.append("http", "POST /orders 201").unwrap();
        logs.compress("http", "http-1").unwrap();

        logs.append("http", "DELETE /users 200").unwrap();

        assert_eq!(
            logs.decompress("http-1").unwrap(),
            "GET /users 200\nPOST /orders 201\n"
        );
        assert_eq!(
            raw(&dir, "http.log"),
            "GET /users 200\nPOST /orders 201\nDELETE /users 200\n"
        );
        assert!(dir.path().join("http-1.gz.b64").exists());
    }

    #[test]
    fn compress_twice_to_same_archive_conflicts() {
        let (_dir, logs) = manager();
        logs.append("t", "one").unwrap();
        logs.compress("t", "snap").unwrap();
        logs.append("t", "two").unwrap();

        let err = logs.compress("t", "snap").unwrap_err();
        assert!(matches!(err, LogError::AlreadyExists { .. }));
        // The first archive is untouched.
        assert_eq!(logs.decompress("snap").unwrap(), "one\n");
    }

    #[test]
    fn compress_missing_topic_is_not_found() {
        let (dir, logs) = manager();
        let err = logs.compress("ghost", "ghost-1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!dir.path().join("ghost-1.gz.b64").exists());
    }

    #[test]
    fn compress_empty_topic_round_trips() {
        let (_dir, logs) = manager();
        logs.append("t", "x").unwrap();
        logs.truncate("t").unwrap();
        logs.compress("t", "empty").unwrap();
        assert_eq!(logs.decompress("empty").unwrap(), "");
    }

    #[test]
    fn decompress_errors() {
        let (dir, logs) = manager();
        assert_eq!(
            logs.decompress("missing").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        fs::write(dir.path().join("junk.gz.b64"), "@@@").unwrap();
        assert_eq!(
            logs.decompress("junk").unwrap_err().kind(),
            ErrorKind::Compression
        );
    }

    #[test]
    fn names_are_validated() {
        let (_dir, logs) = manager();
        assert_eq!(
            logs.append("../etc", "x").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert!(logs.compress("t", "a/b").is_err());
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    #[test]
    fn list_live_and_archives() {
        let (dir, logs) = manager();
        logs.append("workers", "tick").unwrap();
        logs.append("http", "GET /").unwrap();
        logs.compress("http", "http-100").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join(".hidden.log"), "").unwrap();

        assert_eq!(logs.list(false).unwrap(), vec!["http", "workers"]);
        assert_eq!(
            logs.list(true).unwrap(),
            vec!["http", "workers", "http-100"]
        );
        assert_eq!(
            logs.entries().unwrap()[2],
            LogEntry {
                name: "http-100".into(),
                kind: LogKind::Archive
            }
        );
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let logs = LogManager::open(dir.path().join("absent"));
        assert!(logs.list(true).unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Rotation
    // -----------------------------------------------------------------------

    #[test]
    fn rotate_archives_and_truncates() {
        let (dir, logs) = manager();
        logs.append("http", "a").unwrap();
        logs.append("http", "b").unwrap();

        let rotation = logs.rotate("http").unwrap();
        let archive = rotation.archive.clone().unwrap();
        assert!(archive.starts_with("http-"));
        assert_eq!(rotation.bytes, 4);
        assert_eq!(raw(&dir, "http.log"), "");
        assert_eq!(logs.decompress(&archive).unwrap(), "a\nb\n");
    }

    #[test]
    fn rotate_empty_topic_writes_nothing() {
        let (_dir, logs) = manager();
        logs.append("idle", "x").unwrap();
        logs.truncate("idle").unwrap();
        let rotation = logs.rotate("idle").unwrap();
        assert_eq!(rotation.archive, None);
        assert_eq!(logs.list(true).unwrap(), vec!["idle"]);
    }

    #[test]
    fn rapid_rotations_get_distinct_archives() {
        let (_dir, logs) = manager();
        let mut archives = Vec::new();
        for i in 0..5 {
            logs.append("t", &format!("line {i}")).unwrap();
            archives.push(logs.rotate("t").unwrap().archive.unwrap());
        }
        archives.sort();
        archives.dedup();
        assert_eq!(archives.len(), 5);
    }

    #[test]
    fn rotate_all_covers_every_topic() {
        let (_dir, logs) = manager();
        logs.append("a", "1").unwrap();
        logs.append("b", "2").unwrap();
        logs.append("c", "3").unwrap();
        logs.truncate("c").unwrap();

        let report = logs.rotate_all().unwrap();
        assert_eq!(report.rotated.len(), 3);
        assert_eq!(report.archived(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(logs.list(true).unwrap().len(), 5);
    }

    #[test]
    fn rotation_under_concurrent_appends_loses_nothing() {
        let (_dir, logs) = manager();
        logs.append("busy", "start").unwrap();
        let logs = Arc::new(logs);

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let logs = Arc::clone(&logs);
                thread::spawn(move || {
                    for i in 0..100 {
                        logs.append("busy", &format!("w{w}-{i}")).unwrap();
                    }
                })
            })
            .collect();

        let rotator = {
            let logs = Arc::clone(&logs);
            thread::spawn(move || {
                for _ in 0..10 {
                    logs.rotate("busy").unwrap();
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        rotator.join().unwrap();

        let mut text = String::new();
        for entry in logs.entries().unwrap() {
            if entry.kind == LogKind::Archive {
                text.push_str(&logs.decompress(&entry.name).unwrap());
            }
        }
        text.push_str(&logs.read_live("busy").unwrap());

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 401);
        assert!(lines.iter().all(|l| *l == "start" || l.starts_with('w')));
    }
}
