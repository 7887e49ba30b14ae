use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mediacat_common::Config;
use mediacat_processor::Processor;

#[derive(Parser)]
#[command(
    name = "mediacat-processor",
    about = "Link crawler output to the scope and rank out-of-scope citations"
)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, env = "MEDIACAT_CONFIG")]
    config: Option<PathBuf>,

    /// Scope sheet (CSV)
    #[arg(long)]
    scope: Option<PathBuf>,

    /// Directory of domain crawler JSON files
    #[arg(long)]
    domain_dir: Option<PathBuf>,

    /// Directory of social crawler CSV exports
    #[arg(long)]
    social_dir: Option<PathBuf>,

    /// Where output.json and interest_output.json are written
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Recovery snapshot directory
    #[arg(long)]
    saved_dir: Option<PathBuf>,

    /// Aggregate with this many shard workers instead of sequentially
    #[arg(long)]
    shards: Option<usize>,

    /// Per-shard in-memory referral ceiling in bytes before spilling to disk
    #[arg(long)]
    memory_ceiling: Option<u64>,

    /// Resume from the recovery snapshots of an interrupted run
    #[arg(long)]
    resume: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::default(),
        };
        config.apply_env()?;

        if let Some(v) = self.scope {
            config.scope_file = v;
        }
        if let Some(v) = self.domain_dir {
            config.domain_dir = v;
        }
        if let Some(v) = self.social_dir {
            config.social_dir = v;
        }
        if let Some(v) = self.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = self.saved_dir {
            config.spill_dir = v.join("spill");
            config.saved_dir = v;
        }
        if self.shards.is_some() {
            config.shards = self.shards;
        }
        if self.memory_ceiling.is_some() {
            config.memory_ceiling = self.memory_ceiling;
        }
        if self.resume {
            config.resume = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("mediacat=info".parse()?))
        .init();

    info!("MediaCAT post-processor starting...");

    let config = Cli::parse().into_config()?;
    config.log_summary();

    let stats = Processor::new(config)
        .run()
        .await
        .context("Post-processing failed; recovery snapshots were left in the saved directory")?;
    info!("Run complete. {stats}");

    Ok(())
}
