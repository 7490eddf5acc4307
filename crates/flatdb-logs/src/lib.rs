//! Append-only topic logs with on-demand rotation.
//!
//! Each topic is a plain text file of newline-delimited entries. Rotation is
//! explicit: [`LogManager::compress`] snapshots a topic into an immutable
//! gzip+base64 archive and [`LogManager::truncate`] empties the live file.
//! [`LogManager::rotate`] does both atomically with respect to appends, and
//! [`spawn_rotation`] runs that for every topic on a timer.
//!
//! # Modules
//!
//! - [`error`] -- Error types for log operations
//! - [`archive`] -- Archive codec
//! - [`manager`] -- [`LogManager`] and listing types
//! - [`rotation`] -- Periodic background rotation
//! - [`config`] -- [`LogConfig`]

pub mod archive;
pub mod config;
pub mod error;
pub mod manager;
pub mod rotation;

pub use archive::ARCHIVE_EXTENSION;
pub use config::LogConfig;
pub use error::{LogError, LogResult};
pub use manager::{LogEntry, LogKind, LogManager, Rotation, RotationReport, LOG_EXTENSION};
pub use rotation::{spawn_rotation, RotationHandle};
