use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`LogManager`](crate::LogManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory holding `<topic>.log` and `<archive>.gz.b64` files.
    pub logs_dir: PathBuf,
    /// `fsync` after every append.
    pub sync_appends: bool,
    /// Seconds between background rotations. `0` disables them.
    pub rotation_interval_secs: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from(".logs"),
            sync_appends: false,
            rotation_interval_secs: 24 * 60 * 60,
        }
    }
}

impl LogConfig {
    /// Default configuration rooted at `logs_dir`.
    pub fn with_logs_dir(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            ..Self::default()
        }
    }

    /// Background rotation period, if enabled.
    pub fn rotation_interval(&self) -> Option<Duration> {
        (self.rotation_interval_secs > 0).then(|| Duration::from_secs(self.rotation_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LogConfig::default();
        assert_eq!(c.logs_dir, PathBuf::from(".logs"));
        assert!(!c.sync_appends);
        assert_eq!(c.rotation_interval(), Some(Duration::from_secs(86_400)));
    }

    #[test]
    fn zero_interval_disables_rotation() {
        let c: LogConfig = serde_json::from_str(r#"{"rotation_interval_secs": 0}"#).unwrap();
        assert_eq!(c.rotation_interval(), None);
        assert_eq!(c.logs_dir, PathBuf::from(".logs"));
    }
}
