//! Referral aggregation: turn records into a cited-target → citing-ids map.
//!
//! Each pending record contributes its id to the list of every link it
//! carries and every in-scope source its text mentions, then is marked
//! completed. Lists are not deduplicated here; resolution does that.

use std::fmt;
use std::time::Instant;

use tracing::{debug, error, info, trace, warn};

use mediacat_common::{ProcessorError, Record, RecordTable, Result};

use crate::matcher::AliasMatcher;
use crate::referrals::ReferralMap;
use crate::snapshot::RecoveryStore;

const PROGRESS_EVERY: usize = 1000;

/// Which crawler a record table and its referral map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Domain,
    Social,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Domain => "domain",
            Origin::Social => "social",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for referrals as they are discovered.
pub trait ReferralSink {
    fn record(&mut self, target: &str, citing_id: &str) -> Result<()>;

    /// Called once a record has been fully visited.
    fn record_done(&mut self) -> Result<()> {
        Ok(())
    }

    /// The referrals still held in memory.
    fn in_memory(&self) -> &ReferralMap;
}

impl ReferralSink for ReferralMap {
    fn record(&mut self, target: &str, citing_id: &str) -> Result<()> {
        ReferralMap::record(self, target, citing_id);
        Ok(())
    }

    fn in_memory(&self) -> &ReferralMap {
        self
    }
}

/// Feed one record's links and mentions into `sink`. Returns the number of
/// referrals written.
pub fn visit_record<S: ReferralSink + ?Sized>(
    record: &Record,
    matcher: &AliasMatcher,
    sink: &mut S,
) -> Result<usize> {
    let mut written = 0;
    for link in &record.found_links {
        sink.record(link, &record.id)?;
        written += 1;
    }

    let mentions = matcher.find_mentions(&record.body, &record.domain);
    for source in &mentions.sources {
        sink.record(source, &record.id)?;
        written += 1;
    }
    if !mentions.unrecognized_handles.is_empty() {
        trace!(
            id = record.id.as_str(),
            handles = ?mentions.unrecognized_handles,
            "Unrecognized handles"
        );
    }

    sink.record_done()?;
    Ok(written)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AggregateStats {
    pub visited: usize,
    pub skipped: usize,
    pub referrals: usize,
}

/// Sequential aggregation over one record table.
pub struct Aggregator<'a> {
    matcher: &'a AliasMatcher,
    recovery: &'a RecoveryStore,
    checkpoint_interval: usize,
}

impl<'a> Aggregator<'a> {
    pub fn new(matcher: &'a AliasMatcher, recovery: &'a RecoveryStore) -> Self {
        Self {
            matcher,
            recovery,
            checkpoint_interval: 0,
        }
    }

    /// Snapshot table and referrals every `interval` visited records. 0 disables.
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Aggregate every pending record of `table`, appending to `seed`.
    pub fn run(
        &self,
        origin: Origin,
        table: &mut RecordTable,
        seed: ReferralMap,
    ) -> Result<(ReferralMap, AggregateStats)> {
        let mut referrals = seed;
        let stats = self.run_into(origin, table, &mut referrals)?;
        Ok((referrals, stats))
    }

    /// Aggregate into an arbitrary sink. On failure the partially mutated
    /// table and the sink's in-memory referrals are written to the recovery
    /// store before the error is returned.
    pub fn run_into<S: ReferralSink + ?Sized>(
        &self,
        origin: Origin,
        table: &mut RecordTable,
        sink: &mut S,
    ) -> Result<AggregateStats> {
        match self.aggregate(origin, table, sink) {
            Ok(stats) => Ok(stats),
            Err(e) => {
                warn!(%origin, error = %e, "Aggregation failed, writing recovery snapshot");
                if let Err(save_err) = self.recovery.save(origin, table, sink.in_memory()) {
                    error!(%origin, error = %save_err, "Failed to write recovery snapshot");
                }
                Err(e)
            }
        }
    }

    fn aggregate<S: ReferralSink + ?Sized>(
        &self,
        origin: Origin,
        table: &mut RecordTable,
        sink: &mut S,
    ) -> Result<AggregateStats> {
        let started = Instant::now();
        let total = table.len();
        let pending: Vec<String> = table
            .iter()
            .filter(|r| !r.completed)
            .map(|r| r.url.clone())
            .collect();

        let mut stats = AggregateStats {
            skipped: total - pending.len(),
            ..Default::default()
        };
        info!(%origin, total, pending = pending.len(), "Aggregating referrals");

        for url in &pending {
            let record = table.get(url).ok_or_else(|| {
                ProcessorError::Sink(format!("record {url} vanished during aggregation"))
            })?;
            stats.referrals += visit_record(record, self.matcher, sink)?;

            if let Some(record) = table.get_mut(url) {
                record.completed = true;
            }
            stats.visited += 1;

            if stats.visited % PROGRESS_EVERY == 0 {
                debug!(%origin, processed = stats.visited, total, "Aggregation progress");
            }
            if self.checkpoint_interval > 0 && stats.visited % self.checkpoint_interval == 0 {
                self.recovery.save(origin, table, sink.in_memory())?;
            }
        }

        info!(
            %origin,
            visited = stats.visited,
            skipped = stats.skipped,
            referrals = stats.referrals,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Finished aggregating referrals"
        );
        Ok(stats)
    }
}
