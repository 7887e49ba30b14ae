use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for processor operations.
pub type Result<T> = std::result::Result<T, ProcessorError>;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid match pattern for {source_id}: {source}")]
    Pattern {
        source_id: String,
        #[source]
        source: regex::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Referral sink error: {0}")]
    Sink(String),

    #[error("{} shard worker(s) failed: {}", .0.len(), describe_failures(.0))]
    ShardsFailed(Vec<ShardFailure>),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// One shard worker that did not finish its assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardFailure {
    pub shard: usize,
    pub reason: String,
}

fn describe_failures(failures: &[ShardFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("shard {}: {}", f.shard, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProcessorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
