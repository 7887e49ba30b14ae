//! Output classification: scoped entries versus the interest ranking.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use mediacat_common::{DomainCount, InterestEntry, PairingTable, Record, ScopedEntry};

use crate::scope::ScopeIndex;

/// Number of citing domains kept on an interest entry.
pub const TOP_REFERRALS: usize = 5;

/// Interest entries, serialized as an id-keyed object in descending hit order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InterestRanking {
    entries: Vec<InterestEntry>,
}

impl InterestRanking {
    pub fn entries(&self) -> &[InterestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&InterestEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}

impl Serialize for InterestRanking {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.id, entry)?;
        }
        map.end()
    }
}

/// Everything the classifier produced for a run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClassifiedOutput {
    pub scoped: BTreeMap<String, ScopedEntry>,
    pub interest: InterestRanking,
    pub suppressed_static: usize,
}

/// Routes resolved records into the scoped output or the interest ranking.
pub struct Classifier<'a> {
    scope: &'a ScopeIndex,
    domain_pairs: &'a PairingTable,
    social_pairs: &'a PairingTable,
    output: ClassifiedOutput,
}

impl<'a> Classifier<'a> {
    pub fn new(
        scope: &'a ScopeIndex,
        domain_pairs: &'a PairingTable,
        social_pairs: &'a PairingTable,
    ) -> Self {
        Self {
            scope,
            domain_pairs,
            social_pairs,
            output: ClassifiedOutput::default(),
        }
    }

    /// Write `record` into exactly one output, or drop it when it is a static
    /// node nobody cites.
    pub fn classify(&mut self, record: &Record, referrals: Vec<String>) {
        match self.scope.get(&record.domain) {
            Some(entry) => {
                if record.kind.is_static() && referrals.is_empty() {
                    self.output.suppressed_static += 1;
                    return;
                }
                self.output.scoped.insert(
                    record.id.clone(),
                    ScopedEntry {
                        id: record.id.clone(),
                        url: record.url.clone(),
                        referral_count: referrals.len(),
                        referring_record_ids: referrals,
                        kind: record.kind,
                        publisher: entry.publisher.clone(),
                        tags: entry.tags.clone(),
                        name: entry.name.clone(),
                        language: record.language.clone(),
                        authors: record.authors.clone(),
                        date: record.date.clone(),
                        body: record.body.clone(),
                    },
                );
            }
            None => {
                let top_referrals = self.top_citing_domains(&referrals);
                self.output.interest.entries.push(InterestEntry {
                    id: record.id.clone(),
                    hit_count: referrals.len(),
                    url: record.url.clone(),
                    source: record.domain.clone(),
                    referring_record_ids: referrals,
                    authors: record.authors.clone(),
                    body: record.body.clone(),
                    kind: record.kind,
                    date: record.date.clone(),
                    top_referrals,
                });
            }
        }
    }

    /// Citing ids → owning domains, counted, highest first, capped at
    /// [`TOP_REFERRALS`]. Ties are broken by domain name.
    fn top_citing_domains(&self, referrals: &[String]) -> Vec<DomainCount> {
        let mut cited: HashMap<&str, usize> = HashMap::new();
        for id in referrals {
            let pairing = self
                .domain_pairs
                .get(id)
                .or_else(|| self.social_pairs.get(id));
            match pairing {
                Some(p) => *cited.entry(p.domain.as_str()).or_insert(0) += 1,
                None => debug!(id = id.as_str(), "Citing id has no pairing, left out of ranking"),
            }
        }

        let mut ranked: Vec<DomainCount> = cited
            .into_iter()
            .map(|(domain, count)| DomainCount {
                domain: domain.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.domain.cmp(&b.domain)));
        ranked.truncate(TOP_REFERRALS);
        ranked
    }

    /// Sort the interest ranking by hit count, highest first, and hand back
    /// the outputs.
    pub fn finish(mut self) -> ClassifiedOutput {
        self.output
            .interest
            .entries
            .sort_by_key(|e| Reverse(e.hit_count));
        self.output
    }
}
