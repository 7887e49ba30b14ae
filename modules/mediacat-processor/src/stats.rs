use std::time::Duration;

use chrono::{DateTime, Utc};

/// Stats from a processor run.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    pub started_at: Option<DateTime<Utc>>,
    pub scope_sources: usize,
    pub domain_records: usize,
    pub social_records: usize,
    pub static_nodes: usize,
    pub domain_visited: usize,
    pub domain_skipped: usize,
    pub social_visited: usize,
    pub social_skipped: usize,
    pub domain_targets: usize,
    pub social_targets: usize,
    pub scoped_entries: usize,
    pub interest_entries: usize,
    pub suppressed_static: usize,
    pub timings: Vec<(&'static str, Duration)>,
}

impl ProcessorStats {
    pub fn time(&mut self, stage: &'static str, elapsed: Duration) {
        self.timings.push((stage, elapsed));
    }
}

impl std::fmt::Display for ProcessorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Post-Processor Run Complete ===")?;
        if let Some(started_at) = self.started_at {
            writeln!(f, "Started:            {}", started_at.to_rfc3339())?;
        }
        writeln!(f, "Scope sources:      {}", self.scope_sources)?;
        writeln!(f, "Domain articles:    {}", self.domain_records)?;
        writeln!(f, "Social posts:       {}", self.social_records)?;
        writeln!(f, "Static nodes:       {}", self.static_nodes)?;
        writeln!(f, "\nAggregation:")?;
        writeln!(
            f,
            "  Domain: {} visited, {} resumed, {} targets",
            self.domain_visited, self.domain_skipped, self.domain_targets
        )?;
        writeln!(
            f,
            "  Social: {} visited, {} resumed, {} targets",
            self.social_visited, self.social_skipped, self.social_targets
        )?;
        writeln!(f, "\nOutput:")?;
        writeln!(f, "  In scope:         {}", self.scoped_entries)?;
        writeln!(f, "  Interest:         {}", self.interest_entries)?;
        writeln!(f, "  Empty static:     {}", self.suppressed_static)?;
        if !self.timings.is_empty() {
            writeln!(f, "\nTimings:")?;
            for (stage, elapsed) in &self.timings {
                writeln!(f, "  {stage:<20}{:.3}s", elapsed.as_secs_f64())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_timings() {
        let mut stats = ProcessorStats {
            scoped_entries: 3,
            ..Default::default()
        };
        stats.time("load scope", Duration::from_millis(1500));
        let text = stats.to_string();
        assert!(text.contains("In scope:         3"));
        assert!(text.contains("load scope"));
        assert!(text.contains("1.500s"));
    }
}
