//! Flat JSON snapshots: recovery state and final outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use mediacat_common::{ProcessorError, RecordTable, Result};

use crate::aggregate::Origin;
use crate::referrals::ReferralMap;

/// Serialize `value` as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ProcessorError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| ProcessorError::json(path, e))?;
    fs::write(path, json).map_err(|e| ProcessorError::io(path, e))?;
    debug!(path = %path.display(), "Wrote snapshot");
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| ProcessorError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| ProcessorError::json(path, e))
}

/// Recovery snapshots: one record table and one referral map per origin.
/// A later run loads them to resume without revisiting completed records.
#[derive(Debug, Clone)]
pub struct RecoveryStore {
    dir: PathBuf,
}

impl RecoveryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn records_path(&self, origin: Origin) -> PathBuf {
        self.dir.join(format!("{origin}_records.json"))
    }

    fn referrals_path(&self, origin: Origin) -> PathBuf {
        self.dir.join(format!("{origin}_referrals.json"))
    }

    pub fn save(&self, origin: Origin, table: &RecordTable, referrals: &ReferralMap) -> Result<()> {
        write_json(&self.records_path(origin), table)?;
        write_json(&self.referrals_path(origin), referrals)?;
        info!(
            %origin,
            records = table.len(),
            pending = table.pending(),
            targets = referrals.len(),
            dir = %self.dir.display(),
            "Saved recovery snapshot"
        );
        Ok(())
    }

    /// Load the snapshot for `origin`. `None` when no snapshot was written.
    pub fn load(&self, origin: Origin) -> Result<Option<(RecordTable, ReferralMap)>> {
        let records_path = self.records_path(origin);
        let referrals_path = self.referrals_path(origin);
        if !records_path.exists() || !referrals_path.exists() {
            return Ok(None);
        }
        let table: RecordTable = read_json(&records_path)?;
        let referrals: ReferralMap = read_json(&referrals_path)?;
        info!(
            %origin,
            records = table.len(),
            pending = table.pending(),
            targets = referrals.len(),
            "Loaded recovery snapshot"
        );
        Ok(Some((table, referrals)))
    }
}
