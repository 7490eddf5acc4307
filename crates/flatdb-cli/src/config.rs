use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use flatdb_logs::LogConfig;
use flatdb_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming the `[env.<name>]` table to apply.
pub const ENV_VAR: &str = "FLATDB_ENV";

/// Config file read when `--config` is not given and it exists.
pub const DEFAULT_CONFIG_FILE: &str = "flatdb.toml";

/// Top-level configuration file.
///
/// ```toml
/// [store]
/// data_dir = ".data"
///
/// [logs]
/// logs_dir = ".logs"
///
/// [env.production]
/// data_dir = "/var/lib/flatdb/data"
/// logs_dir = "/var/log/flatdb"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatdbConfig {
    pub store: StoreConfig,
    pub logs: LogConfig,
    pub env: BTreeMap<String, EnvOverride>,
}

/// Per-environment overrides on top of `[store]` and `[logs]`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvOverride {
    pub data_dir: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    pub strict_reads: Option<bool>,
}

impl FlatdbConfig {
    /// Load from `path`, or from `flatdb.toml` if present, or use defaults,
    /// then apply the overrides for `env_name`.
    pub fn load(path: Option<&Path>, env_name: Option<&str>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        Ok(config.for_env(env_name))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply the `[env.<name>]` table. An unknown environment changes nothing.
    pub fn for_env(mut self, env_name: Option<&str>) -> Self {
        let Some(name) = env_name.map(str::to_lowercase) else {
            return self;
        };
        match self.env.get(&name).cloned() {
            Some(overrides) => {
                if let Some(dir) = overrides.data_dir {
                    self.store.data_dir = dir;
                }
                if let Some(dir) = overrides.logs_dir {
                    self.logs.logs_dir = dir;
                }
                if let Some(strict) = overrides.strict_reads {
                    self.store.strict_reads = strict;
                }
            }
            None => tracing::warn!(env = %name, "unknown environment; using base config"),
        }
        self
    }

    /// Apply command-line directory overrides.
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, logs_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.store.data_dir = dir;
        }
        if let Some(dir) = logs_dir {
            self.logs.logs_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[store]
data_dir = "/srv/data"
sync_writes = false

[logs]
logs_dir = "/srv/logs"
rotation_interval_secs = 3600

[env.production]
data_dir = "/var/lib/flatdb"
strict_reads = true
"#;

    #[test]
    fn empty_file_is_default() {
        let c = FlatdbConfig::parse("").unwrap();
        assert_eq!(c, FlatdbConfig::default());
    }

    #[test]
    fn parse_sections() {
        let c = FlatdbConfig::parse(SAMPLE).unwrap();
        assert_eq!(c.store.data_dir, PathBuf::from("/srv/data"));
        assert!(!c.store.sync_writes);
        assert_eq!(c.logs.logs_dir, PathBuf::from("/srv/logs"));
        assert_eq!(c.logs.rotation_interval_secs, 3600);
        assert!(c.env.contains_key("production"));
    }

    #[test]
    fn env_overrides_apply() {
        let c = FlatdbConfig::parse(SAMPLE)
            .unwrap()
            .for_env(Some("PRODUCTION"));
        assert_eq!(c.store.data_dir, PathBuf::from("/var/lib/flatdb"));
        assert!(c.store.strict_reads);
        assert_eq!(c.logs.logs_dir, PathBuf::from("/srv/logs"));
    }

    #[test]
    fn unknown_env_keeps_base() {
        let base = FlatdbConfig::parse(SAMPLE).unwrap();
        assert_eq!(base.clone().for_env(Some("staging")), base);
        assert_eq!(base.clone().for_env(None), base);
    }

    #[test]
    fn flags_win_over_file() {
        let c = FlatdbConfig::parse(SAMPLE)
            .unwrap()
            .with_overrides(Some("/tmp/d".into()), None);
        assert_eq!(c.store.data_dir, PathBuf::from("/tmp/d"));
        assert_eq!(c.logs.logs_dir, PathBuf::from("/srv/logs"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flatdb.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let c = FlatdbConfig::load(Some(&path), None).unwrap();
        assert_eq!(c.store.data_dir, PathBuf::from("/srv/data"));

        assert!(FlatdbConfig::load(Some(&dir.path().join("missing.toml")), None).is_err());
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(FlatdbConfig::parse("[store\n").is_err());
        assert!(FlatdbConfig::parse("[store]\nsync_writes = \"yes\"").is_err());
    }
}
