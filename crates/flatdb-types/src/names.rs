//! Validation of caller-supplied names.
//!
//! Collections, record keys, log topics and archive ids all end up as a
//! single path component on disk, so they share one rule set:
//! - Must be non-empty
//! - Must not contain `/`, `\`, NUL, or control characters
//! - Must not start with `.` (this also rules out `.` and `..`)
//!
//! Everything else is accepted verbatim. Keys are compared by exact string
//! equality; no case folding or trimming is applied.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NameError;

/// Characters that are forbidden anywhere in a name.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\0'];

/// What a validated name is used for. Only affects error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameKind {
    Collection,
    Key,
    Topic,
    Archive,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Collection => "collection",
            Self::Key => "key",
            Self::Topic => "topic",
            Self::Archive => "archive",
        };
        f.write_str(s)
    }
}

/// Validate a name, returning `Ok(())` if it is a safe single path component.
///
/// # Examples
///
/// ```
/// use flatdb_types::{validate_name, NameKind};
///
/// assert!(validate_name(NameKind::Key, "5551234567").is_ok());
/// assert!(validate_name(NameKind::Collection, "users").is_ok());
/// assert!(validate_name(NameKind::Key, "").is_err());
/// assert!(validate_name(NameKind::Key, "../etc/passwd").is_err());
/// ```
pub fn validate_name(kind: NameKind, name: &str) -> Result<(), NameError> {
    let reject = |reason: String| NameError {
        kind,
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(reject("must not be empty".into()));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(reject(format!("contains forbidden character: {ch:?}")));
        }
    }

    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(reject(format!("contains control character: {ch:?}")));
    }

    // Hidden files are reserved for in-flight temp files.
    if name.starts_with('.') {
        return Err(reject("must not start with '.'".into()));
    }

    Ok(())
}
