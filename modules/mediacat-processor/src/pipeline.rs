//! End-to-end run: load, aggregate per origin, resolve, classify, write.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use mediacat_common::{Config, ExecutionMode, PairingTable, RecordTable, Result};

use crate::aggregate::{AggregateStats, Aggregator, Origin};
use crate::classify::{ClassifiedOutput, Classifier};
use crate::loader::{load_domain_dir, load_scope, load_social_dir};
use crate::matcher::AliasMatcher;
use crate::referrals::ReferralMap;
use crate::resolve::resolve;
use crate::scope::ScopeIndex;
use crate::shard::{ShardPlan, ShardedAggregator};
use crate::snapshot::{write_json, RecoveryStore};
use crate::static_nodes::generate_static_nodes;
use crate::stats::ProcessorStats;

pub const OUTPUT_FILE: &str = "output.json";
pub const INTEREST_FILE: &str = "interest_output.json";

/// The three normalized input tables.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub scope: ScopeIndex,
    pub domain: RecordTable,
    pub social: RecordTable,
}

/// Referral maps carried over from an interrupted run.
#[derive(Debug, Clone, Default)]
pub struct Seeds {
    pub domain: ReferralMap,
    pub social: ReferralMap,
}

/// Resolve every record of `domain` (static nodes included) and `social`
/// against both referral maps and classify the result.
pub fn classify_all(
    scope: &ScopeIndex,
    domain: &RecordTable,
    social: &RecordTable,
    domain_refs: &ReferralMap,
    social_refs: &ReferralMap,
    domain_pairs: &PairingTable,
    social_pairs: &PairingTable,
) -> ClassifiedOutput {
    let mut classifier = Classifier::new(scope, domain_pairs, social_pairs);
    for record in domain.iter().chain(social.iter()) {
        let referrals = resolve(record, domain_refs, social_refs);
        classifier.classify(record, referrals);
    }
    classifier.finish()
}

pub struct Processor {
    config: Config,
    recovery: RecoveryStore,
}

impl Processor {
    pub fn new(config: Config) -> Self {
        let recovery = RecoveryStore::new(config.saved_dir.clone());
        Self { config, recovery }
    }

    pub fn recovery(&self) -> &RecoveryStore {
        &self.recovery
    }

    /// Load the scope sheet and both crawler outputs.
    pub fn load_inputs(&self, stats: &mut ProcessorStats) -> Result<Inputs> {
        let started = Instant::now();
        let scope = load_scope(&self.config.scope_file)?;
        stats.time("load scope", started.elapsed());

        let started = Instant::now();
        let social = load_social_dir(&self.config.social_dir)?;
        stats.time("load social", started.elapsed());

        let started = Instant::now();
        let domain = load_domain_dir(&self.config.domain_dir)?;
        stats.time("load domain", started.elapsed());

        Ok(Inputs {
            scope,
            domain,
            social,
        })
    }

    /// Replace freshly loaded tables with the saved ones (keeping their
    /// `completed` flags), add any records the saved tables lack, and return
    /// the saved referral maps as seeds.
    pub fn resume_from_saved(&self, inputs: &mut Inputs) -> Result<Seeds> {
        let mut seeds = Seeds::default();
        for origin in [Origin::Domain, Origin::Social] {
            let Some((mut saved, refs)) = self.recovery.load(origin)? else {
                warn!(%origin, dir = %self.recovery.dir().display(), "No recovery snapshot, starting fresh");
                continue;
            };
            let fresh = match origin {
                Origin::Domain => &mut inputs.domain,
                Origin::Social => &mut inputs.social,
            };
            saved.absorb_missing(std::mem::take(fresh));
            *fresh = saved;
            match origin {
                Origin::Domain => seeds.domain = refs,
                Origin::Social => seeds.social = refs,
            }
        }
        Ok(seeds)
    }

    async fn aggregate(
        &self,
        origin: Origin,
        table: &mut RecordTable,
        seed: ReferralMap,
        matcher: &Arc<AliasMatcher>,
    ) -> Result<(ReferralMap, AggregateStats)> {
        let (refs, stats) = match self.config.execution_mode() {
            ExecutionMode::Sequential => Aggregator::new(matcher, &self.recovery)
                .with_checkpoint_interval(self.config.checkpoint_interval)
                .run(origin, table, seed)?,
            ExecutionMode::Sharded {
                shards,
                memory_ceiling,
            } => {
                let plan = ShardPlan {
                    shards,
                    memory_ceiling,
                    dedup_interval: self.config.dedup_interval,
                    spill_dir: self.config.spill_dir.clone(),
                };
                ShardedAggregator::new(plan, Arc::clone(matcher), self.recovery.clone())
                    .run(origin, table, seed)
                    .await?
            }
        };
        self.recovery.save(origin, table, &refs)?;
        Ok((refs, stats))
    }

    /// Aggregate both origins, add static nodes, resolve and classify.
    pub async fn process(
        &self,
        inputs: Inputs,
        seeds: Seeds,
        stats: &mut ProcessorStats,
    ) -> Result<ClassifiedOutput> {
        let Inputs {
            scope,
            mut domain,
            mut social,
        } = inputs;
        stats.scope_sources = scope.len();
        stats.domain_records = domain.len();
        stats.social_records = social.len();

        let domain_pairs = domain.pairings();
        let social_pairs = social.pairings();
        let matcher = Arc::new(AliasMatcher::new(&scope)?);

        let started = Instant::now();
        let (domain_refs, domain_stats) = self
            .aggregate(Origin::Domain, &mut domain, seeds.domain, &matcher)
            .await?;
        stats.time("aggregate domain", started.elapsed());
        stats.domain_visited = domain_stats.visited;
        stats.domain_skipped = domain_stats.skipped;
        stats.domain_targets = domain_refs.len();

        let started = Instant::now();
        let (social_refs, social_stats) = self
            .aggregate(Origin::Social, &mut social, seeds.social, &matcher)
            .await?;
        stats.time("aggregate social", started.elapsed());
        stats.social_visited = social_stats.visited;
        stats.social_skipped = social_stats.skipped;
        stats.social_targets = social_refs.len();

        let nodes = generate_static_nodes(&scope);
        stats.static_nodes = nodes.len();
        domain.absorb_missing(nodes);

        let started = Instant::now();
        let output = classify_all(
            &scope,
            &domain,
            &social,
            &domain_refs,
            &social_refs,
            &domain_pairs,
            &social_pairs,
        );
        stats.time("resolve and classify", started.elapsed());
        stats.scoped_entries = output.scoped.len();
        stats.interest_entries = output.interest.len();
        stats.suppressed_static = output.suppressed_static;
        info!(
            scoped = output.scoped.len(),
            interest = output.interest.len(),
            "Classified records"
        );
        Ok(output)
    }

    pub fn write_outputs(&self, output: &ClassifiedOutput) -> Result<()> {
        write_json(&self.config.output_dir.join(OUTPUT_FILE), &output.scoped)?;
        write_json(&self.config.output_dir.join(INTEREST_FILE), &output.interest)?;
        info!(dir = %self.config.output_dir.display(), "Wrote output files");
        Ok(())
    }

    /// Full run from the configured inputs to the output files.
    pub async fn run(&self) -> Result<ProcessorStats> {
        let run_started = Instant::now();
        let mut stats = ProcessorStats {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let mut inputs = self.load_inputs(&mut stats)?;
        let seeds = if self.config.resume {
            self.resume_from_saved(&mut inputs)?
        } else {
            Seeds::default()
        };

        let output = self.process(inputs, seeds, &mut stats).await?;

        let started = Instant::now();
        self.write_outputs(&output)?;
        stats.time("write outputs", started.elapsed());
        stats.time("total", run_started.elapsed());
        Ok(stats)
    }
}
