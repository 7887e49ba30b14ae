use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::info;

use crate::error::{ProcessorError, Result};

/// Processor configuration.
///
/// Resolved in three layers: an optional TOML file, then `MEDIACAT_*`
/// environment variables, then command-line flags applied by the binary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // Inputs
    pub scope_file: PathBuf,
    pub domain_dir: PathBuf,
    pub social_dir: PathBuf,

    // Outputs
    pub output_dir: PathBuf,
    /// Recovery snapshots land here on failure and after each aggregation stage.
    pub saved_dir: PathBuf,
    /// Shard spill chunks.
    pub spill_dir: PathBuf,

    // Execution
    /// Worker count for sharded aggregation. `None` runs sequentially.
    pub shards: Option<usize>,
    /// Per-shard ceiling, in bytes, on the in-memory referral map before it
    /// is spilled to disk. Only meaningful with `shards`.
    pub memory_ceiling: Option<u64>,
    /// Records between periodic in-shard deduplication passes.
    pub dedup_interval: usize,
    /// Records between sequential-mode checkpoints. 0 disables them.
    pub checkpoint_interval: usize,
    /// Seed the run from the snapshots in `saved_dir`.
    pub resume: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scope_file: PathBuf::from("./input_scope_final.csv"),
            domain_dir: PathBuf::from("./DomainOutput"),
            social_dir: PathBuf::from("./TwitterOutput"),
            output_dir: PathBuf::from("./Output"),
            saved_dir: PathBuf::from("./Saved"),
            spill_dir: PathBuf::from("./Saved/spill"),
            shards: None,
            memory_ceiling: None,
            dedup_interval: 1000,
            checkpoint_interval: 0,
            resume: false,
        }
    }
}

/// How the aggregation stage is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Sharded {
        shards: usize,
        memory_ceiling: Option<u64>,
    },
}

impl Config {
    /// Load a TOML config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ProcessorError::io(path, e))?;
        toml::from_str(&content).map_err(|e| {
            ProcessorError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Apply `MEDIACAT_*` environment overrides on top of the current values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| env::var(key).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("MEDIACAT_SCOPE_FILE") {
            self.scope_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDIACAT_DOMAIN_DIR") {
            self.domain_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDIACAT_SOCIAL_DIR") {
            self.social_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDIACAT_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDIACAT_SAVED_DIR") {
            self.saved_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDIACAT_SPILL_DIR") {
            self.spill_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDIACAT_SHARDS") {
            self.shards = Some(parse_var("MEDIACAT_SHARDS", &v)?);
        }
        if let Some(v) = lookup("MEDIACAT_MEMORY_CEILING") {
            self.memory_ceiling = Some(parse_var("MEDIACAT_MEMORY_CEILING", &v)?);
        }
        if let Some(v) = lookup("MEDIACAT_DEDUP_INTERVAL") {
            self.dedup_interval = parse_var("MEDIACAT_DEDUP_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("MEDIACAT_CHECKPOINT_INTERVAL") {
            self.checkpoint_interval = parse_var("MEDIACAT_CHECKPOINT_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("MEDIACAT_RESUME") {
            self.resume = parse_var("MEDIACAT_RESUME", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.shards == Some(0) {
            return Err(ProcessorError::Config(
                "shard count must be at least 1".to_string(),
            ));
        }
        if self.memory_ceiling == Some(0) {
            return Err(ProcessorError::Config(
                "memory ceiling must be greater than zero".to_string(),
            ));
        }
        if self.dedup_interval == 0 {
            return Err(ProcessorError::Config(
                "dedup interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        match self.shards {
            Some(shards) => ExecutionMode::Sharded {
                shards,
                memory_ceiling: self.memory_ceiling,
            },
            None => ExecutionMode::Sequential,
        }
    }

    /// Log the effective settings at startup.
    pub fn log_summary(&self) {
        info!(
            scope_file = %self.scope_file.display(),
            domain_dir = %self.domain_dir.display(),
            social_dir = %self.social_dir.display(),
            output_dir = %self.output_dir.display(),
            saved_dir = %self.saved_dir.display(),
            mode = ?self.execution_mode(),
            resume = self.resume,
            "Effective configuration"
        );
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ProcessorError::Config(format!("{key}={value:?} is invalid: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_run_sequentially() {
        let config = Config::default();
        assert_eq!(config.execution_mode(), ExecutionMode::Sequential);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_only_listed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediacat.toml");
        std::fs::write(&path, "shards = 4\nmemory_ceiling = 1048576\nresume = true\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.execution_mode(),
            ExecutionMode::Sharded {
                shards: 4,
                memory_ceiling: Some(1_048_576)
            }
        );
        assert!(config.resume);
        assert_eq!(config.saved_dir, PathBuf::from("./Saved"));
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediacat.toml");
        std::fs::write(&path, "shard_count = 4\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ProcessorError::Config(_))));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("MEDIACAT_SHARDS", "3"),
            ("MEDIACAT_OUTPUT_DIR", "/tmp/out"),
            ("MEDIACAT_RESUME", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.shards, Some(3));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.resume);
    }

    #[test]
    fn malformed_env_value_is_a_config_error() {
        let mut config = Config::default();
        let err = config
            .apply_vars(|k| (k == "MEDIACAT_SHARDS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("MEDIACAT_SHARDS"));
    }

    #[test]
    fn zero_shards_rejected() {
        let config = Config {
            shards: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
