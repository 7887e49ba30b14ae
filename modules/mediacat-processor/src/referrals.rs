//! Referral maps: cited target → ids of the records that cited it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Keep the first occurrence of every id, preserving relative order.
pub fn dedup_preserving_order(ids: &mut Vec<String>) {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.retain(|id| seen.insert(id.clone()));
}

/// Cited target (URL, source identifier or handle) → citing record ids in
/// discovery order. Lists may contain repeats until [`ReferralMap::dedup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralMap {
    targets: HashMap<String, Vec<String>>,
}

impl ReferralMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, target: &str, citing_id: &str) {
        match self.targets.get_mut(target) {
            Some(ids) => ids.push(citing_id.to_string()),
            None => {
                self.targets
                    .insert(target.to_string(), vec![citing_id.to_string()]);
            }
        }
    }

    pub fn get(&self, target: &str) -> Option<&[String]> {
        self.targets.get(target).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Total number of citing ids across every target.
    pub fn citation_count(&self) -> usize {
        self.targets.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.targets.iter()
    }

    /// Order-preserving dedup of every list.
    pub fn dedup(&mut self) {
        for ids in self.targets.values_mut() {
            dedup_preserving_order(ids);
        }
    }

    /// Append every list of `other` after this map's list for the same target.
    /// Does not deduplicate.
    pub fn extend(&mut self, other: ReferralMap) {
        for (target, ids) in other.targets {
            self.targets.entry(target).or_default().extend(ids);
        }
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }

    pub fn into_inner(self) -> HashMap<String, Vec<String>> {
        self.targets
    }
}

impl FromIterator<(String, Vec<String>)> for ReferralMap {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        let mut map = ReferralMap::new();
        for (target, ids) in iter {
            map.targets.entry(target).or_default().extend(ids);
        }
        map
    }
}

/// Union partial maps: concatenate per-target lists in the order the partials
/// are given, then dedup keeping first occurrences.
pub fn merge_referrals(partials: impl IntoIterator<Item = ReferralMap>) -> ReferralMap {
    let mut merged = ReferralMap::new();
    for partial in partials {
        merged.extend(partial);
    }
    merged.dedup();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &[&str])]) -> ReferralMap {
        entries
            .iter()
            .map(|(k, ids)| (k.to_string(), ids.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn dedup_keeps_first_occurrences_in_order() {
        let mut ids: Vec<String> = ["c", "a", "c", "b", "a"].iter().map(|s| s.to_string()).collect();
        dedup_preserving_order(&mut ids);
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn record_appends_in_discovery_order() {
        let mut refs = ReferralMap::new();
        refs.record("a.com", "1");
        refs.record("a.com", "2");
        refs.record("a.com", "1");
        assert_eq!(refs.get("a.com").unwrap(), ["1", "2", "1"]);
        assert_eq!(refs.citation_count(), 3);
    }

    #[test]
    fn merging_two_shards_dedups_shared_ids() {
        let merged = merge_referrals(vec![
            map(&[("a.com", &["id1"])]),
            map(&[("a.com", &["id1", "id2"])]),
        ]);
        assert_eq!(merged.get("a.com").unwrap(), ["id1", "id2"]);
    }

    #[test]
    fn merge_keeps_targets_unique_to_one_shard() {
        let merged = merge_referrals(vec![
            map(&[("a.com", &["1"])]),
            map(&[("b.com/x", &["2"])]),
            ReferralMap::new(),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("b.com/x").unwrap(), ["2"]);
    }

    #[test]
    fn serializes_as_plain_object() {
        let refs = map(&[("a.com", &["1", "2"])]);
        let json = serde_json::to_value(&refs).unwrap();
        assert_eq!(json, serde_json::json!({"a.com": ["1", "2"]}));
        let back: ReferralMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, refs);
    }
}
