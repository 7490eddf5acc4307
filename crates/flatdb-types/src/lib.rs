//! Foundation types for flatdb.
//!
//! Both the document store and the log manager address files by
//! caller-supplied names and guard them with per-name locks. This crate holds
//! the pieces they share.
//!
//! # Key Types
//!
//! - [`ErrorKind`] -- Coarse error taxonomy callers map to their own responses
//! - [`NameError`] -- Rejected collection, key, topic, or archive name
//! - [`KeyedLocks`] -- Reader/writer lock table keyed by string

pub mod error;
pub mod locks;
pub mod names;

pub use error::{ErrorKind, NameError};
pub use locks::KeyedLocks;
pub use names::{validate_name, NameKind};
