pub mod aggregate;
pub mod classify;
pub mod loader;
pub mod matcher;
pub mod pipeline;
pub mod referrals;
pub mod resolve;
pub mod scope;
pub mod shard;
pub mod snapshot;
pub mod static_nodes;
pub mod stats;

pub use aggregate::{Aggregator, Origin, ReferralSink};
pub use classify::{ClassifiedOutput, Classifier, InterestRanking};
pub use matcher::{AliasMatcher, Mentions};
pub use pipeline::{Inputs, Processor, Seeds};
pub use referrals::{dedup_preserving_order, merge_referrals, ReferralMap};
pub use resolve::resolve;
pub use scope::{ScopeIndex, ScopeRow};
pub use shard::{partition, ShardPlan, ShardedAggregator};
pub use snapshot::RecoveryStore;
pub use static_nodes::generate_static_nodes;
pub use stats::ProcessorStats;
