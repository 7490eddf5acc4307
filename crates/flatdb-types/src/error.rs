use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::names::NameKind;

/// Coarse classification shared by every flatdb error.
///
/// Callers (request handlers, the CLI) decide their response from the kind
/// alone; the concrete error carries the detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The record or archive already exists.
    Conflict,
    /// The record, topic, or archive is absent or unreadable.
    NotFound,
    /// Open, read, write, close, readdir, or unlink failed for another reason.
    Io,
    /// The deflate/inflate or base64 step failed.
    Compression,
    /// A name or payload was rejected before any I/O happened.
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Conflict => "conflict",
            Self::NotFound => "not found",
            Self::Io => "io",
            Self::Compression => "compression",
            Self::InvalidInput => "invalid input",
        };
        f.write_str(s)
    }
}

/// A name that cannot be used as a single path component.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind} name {name:?}: {reason}")]
pub struct NameError {
    pub kind: NameKind,
    pub name: String,
    pub reason: String,
}
