//! Sharded aggregation.
//!
//! Pending records are dealt round-robin across workers. Each worker runs the
//! same per-record loop as the sequential aggregator against a shared
//! read-only view of the table and produces its own partial referral map,
//! spilling capped-size chunks to disk when a memory ceiling is set. The
//! coordinator waits for every worker, merges the partials sequentially and
//! only then flips the `completed` flags of the records whose shard finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use mediacat_common::{ProcessorError, RecordTable, Result, ShardFailure};

use crate::aggregate::{visit_record, AggregateStats, Origin, ReferralSink};
use crate::matcher::AliasMatcher;
use crate::referrals::{merge_referrals, ReferralMap};
use crate::snapshot::{read_json, write_json, RecoveryStore};

/// Deal `keys` round-robin into `shards` buckets.
pub fn partition(keys: &[String], shards: usize) -> Vec<Vec<String>> {
    let shards = shards.max(1);
    let mut buckets = vec![Vec::with_capacity(keys.len() / shards + 1); shards];
    for (i, key) in keys.iter().enumerate() {
        buckets[i % shards].push(key.clone());
    }
    buckets
}

/// How a sharded pass is laid out.
#[derive(Debug, Clone)]
pub struct ShardPlan {
    pub shards: usize,
    /// Approximate byte ceiling for one worker's in-memory map.
    pub memory_ceiling: Option<u64>,
    /// Records between in-shard dedup passes.
    pub dedup_interval: usize,
    pub spill_dir: PathBuf,
}

/// A worker's referrals: whatever is still in memory plus flushed chunks.
#[derive(Debug, Default)]
pub struct ShardReferrals {
    pub in_memory: ReferralMap,
    pub chunks: Vec<PathBuf>,
}

impl ShardReferrals {
    /// Read the chunks back and fold them, in flush order, ahead of the
    /// in-memory remainder.
    pub fn load(self) -> Result<ReferralMap> {
        let mut combined = ReferralMap::new();
        for chunk in &self.chunks {
            let part: ReferralMap = read_json(chunk)?;
            combined.extend(part);
        }
        combined.extend(self.in_memory);
        Ok(combined)
    }
}

/// Sink that dedups periodically and spills to disk past the ceiling.
pub struct SpillingSink {
    shard: usize,
    origin: Origin,
    spill_dir: PathBuf,
    ceiling: Option<u64>,
    dedup_interval: usize,
    map: ReferralMap,
    approx_bytes: u64,
    since_dedup: usize,
    chunks: Vec<PathBuf>,
}

impl SpillingSink {
    pub fn new(shard: usize, origin: Origin, plan: &ShardPlan) -> Self {
        Self {
            shard,
            origin,
            spill_dir: plan.spill_dir.clone(),
            ceiling: plan.memory_ceiling,
            dedup_interval: plan.dedup_interval.max(1),
            map: ReferralMap::new(),
            approx_bytes: 0,
            since_dedup: 0,
            chunks: Vec::new(),
        }
    }

    fn chunk_path(&self) -> PathBuf {
        self.spill_dir.join(format!(
            "{}-shard-{}-chunk-{}.json",
            self.origin,
            self.shard,
            self.chunks.len()
        ))
    }

    /// Write the in-memory map as a self-contained chunk and clear it.
    fn flush(&mut self) -> Result<()> {
        if self.map.is_empty() {
            return Ok(());
        }
        self.map.dedup();
        let path = self.chunk_path();
        write_json(&path, &self.map)?;
        debug!(
            shard = self.shard,
            targets = self.map.len(),
            path = %path.display(),
            "Spilled referral chunk"
        );
        self.chunks.push(path);
        self.map.clear();
        self.approx_bytes = 0;
        Ok(())
    }

    pub fn finish(mut self) -> ShardReferrals {
        self.map.dedup();
        ShardReferrals {
            in_memory: self.map,
            chunks: self.chunks,
        }
    }
}

impl ReferralSink for SpillingSink {
    fn record(&mut self, target: &str, citing_id: &str) -> Result<()> {
        self.map.record(target, citing_id);
        self.approx_bytes += (target.len() + citing_id.len()) as u64;
        Ok(())
    }

    fn record_done(&mut self) -> Result<()> {
        self.since_dedup += 1;
        if self.since_dedup >= self.dedup_interval {
            self.map.dedup();
            self.since_dedup = 0;
        }
        if let Some(ceiling) = self.ceiling {
            if self.approx_bytes >= ceiling {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn in_memory(&self) -> &ReferralMap {
        &self.map
    }
}

/// What a worker hands back to the coordinator.
#[derive(Debug)]
pub struct ShardOutput {
    pub shard: usize,
    pub referrals: ShardReferrals,
    /// URLs of the records this worker finished.
    pub completed: Vec<String>,
    pub referral_count: usize,
    pub error: Option<ProcessorError>,
}

/// Aggregate one shard. Never mutates the table; the caller marks
/// `completed` records once the partial map has been merged.
pub fn aggregate_shard(
    shard: usize,
    origin: Origin,
    keys: &[String],
    table: &RecordTable,
    matcher: &AliasMatcher,
    plan: &ShardPlan,
) -> ShardOutput {
    let mut sink = SpillingSink::new(shard, origin, plan);
    let mut completed = Vec::with_capacity(keys.len());
    let mut referral_count = 0;
    let mut error = None;

    for key in keys {
        let Some(record) = table.get(key) else {
            warn!(shard, key = key.as_str(), "Shard key missing from table");
            continue;
        };
        match visit_record(record, matcher, &mut sink) {
            Ok(n) => {
                referral_count += n;
                completed.push(key.clone());
            }
            Err(e) => {
                error = Some(e);
                break;
            }
        }
    }

    // The record being visited when a spill failed has already put its
    // referrals in memory; keep them and leave the record pending so a resumed
    // run visits it again.
    ShardOutput {
        shard,
        referrals: sink.finish(),
        completed,
        referral_count,
        error,
    }
}

/// Coordinator for sharded aggregation.
pub struct ShardedAggregator {
    plan: ShardPlan,
    matcher: Arc<AliasMatcher>,
    recovery: RecoveryStore,
}

impl ShardedAggregator {
    pub fn new(plan: ShardPlan, matcher: Arc<AliasMatcher>, recovery: RecoveryStore) -> Self {
        Self {
            plan,
            matcher,
            recovery,
        }
    }

    /// Aggregate every pending record of `table` across the planned shards,
    /// merging the result after `seed`.
    ///
    /// If any worker fails, the shards that did finish are still merged and
    /// marked completed, a recovery snapshot is written, and the error lists
    /// every failed shard.
    pub async fn run(
        &self,
        origin: Origin,
        table: &mut RecordTable,
        seed: ReferralMap,
    ) -> Result<(ReferralMap, AggregateStats)> {
        let started = Instant::now();
        let pending: Vec<String> = table
            .iter()
            .filter(|r| !r.completed)
            .map(|r| r.url.clone())
            .collect();
        let mut stats = AggregateStats {
            skipped: table.len() - pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            info!(%origin, skipped = stats.skipped, "Nothing pending, skipping sharded aggregation");
            return Ok((seed, stats));
        }

        let assignments = partition(&pending, self.plan.shards);
        info!(
            %origin,
            shards = assignments.len(),
            pending = pending.len(),
            memory_ceiling = ?self.plan.memory_ceiling,
            "Starting sharded aggregation"
        );

        let shared = Arc::new(table.clone());
        let handles: Vec<_> = assignments
            .into_iter()
            .enumerate()
            .map(|(shard, keys)| {
                let table = Arc::clone(&shared);
                let matcher = Arc::clone(&self.matcher);
                let plan = self.plan.clone();
                tokio::task::spawn_blocking(move || {
                    aggregate_shard(shard, origin, &keys, &table, &matcher, &plan)
                })
            })
            .collect();

        let results = join_all(handles).await;

        let mut partials = vec![seed];
        let mut failures = Vec::new();
        let mut spilled = Vec::new();
        for (shard, joined) in results.into_iter().enumerate() {
            let output = match joined {
                Ok(output) => output,
                Err(e) => {
                    warn!(%origin, shard, error = %e, "Shard worker did not return");
                    failures.push(ShardFailure {
                        shard,
                        reason: format!("worker aborted: {e}"),
                    });
                    continue;
                }
            };

            spilled.extend(output.referrals.chunks.iter().cloned());
            match output.referrals.load() {
                Ok(partial) => {
                    table.mark_completed(&output.completed);
                    stats.visited += output.completed.len();
                    stats.referrals += output.referral_count;
                    partials.push(partial);
                }
                Err(e) => {
                    warn!(%origin, shard, error = %e, "Failed to read shard chunks");
                    failures.push(ShardFailure {
                        shard,
                        reason: format!("unreadable spill chunk: {e}"),
                    });
                    continue;
                }
            }

            if let Some(e) = output.error {
                warn!(%origin, shard, error = %e, "Shard worker failed");
                failures.push(ShardFailure {
                    shard,
                    reason: e.to_string(),
                });
            }
        }

        let merged = merge_referrals(partials);
        remove_chunks(&spilled);

        if !failures.is_empty() {
            if let Err(e) = self.recovery.save(origin, table, &merged) {
                warn!(%origin, error = %e, "Failed to write recovery snapshot");
            }
            return Err(ProcessorError::ShardsFailed(failures));
        }

        info!(
            %origin,
            visited = stats.visited,
            targets = merged.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Finished sharded aggregation"
        );
        Ok((merged, stats))
    }
}

fn remove_chunks(paths: &[PathBuf]) {
    for path in paths {
        remove_chunk(path);
    }
}

fn remove_chunk(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "Could not remove spill chunk");
    }
}
