use std::io;

use flatdb_types::{ErrorKind, NameError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to append to topic {topic}: {source}")]
    Append {
        topic: String,
        #[source]
        source: io::Error,
    },

    /// The topic or archive file does not exist.
    #[error("log file not found: {name}")]
    NotFound { name: String },

    #[error("archive already exists: {archive}")]
    AlreadyExists { archive: String },

    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write archive {archive}: {source}")]
    Write {
        archive: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to truncate topic {topic}: {source}")]
    Truncate {
        topic: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to list logs directory: {0}")]
    List(#[source] io::Error),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    /// Archive text is not valid base64, or the inflated bytes are not UTF-8.
    #[error("archive decode failed: {0}")]
    Decode(String),

    #[error(transparent)]
    InvalidName(#[from] NameError),
}

impl LogError {
    /// Coarse classification for callers deciding a response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::Conflict,
            Self::Append { .. }
            | Self::Read { .. }
            | Self::Write { .. }
            | Self::Truncate { .. }
            | Self::List(_) => ErrorKind::Io,
            Self::CompressionFailed(_) | Self::DecompressionFailed(_) | Self::Decode(_) => {
                ErrorKind::Compression
            }
            Self::InvalidName(_) => ErrorKind::InvalidInput,
        }
    }
}

pub type LogResult<T> = Result<T, LogError>;
