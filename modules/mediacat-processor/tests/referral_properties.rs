use std::collections::BTreeSet;

use mediacat_processor::{dedup_preserving_order, merge_referrals, partition, ReferralMap};
use proptest::prelude::*;

fn referral_map() -> impl Strategy<Value = ReferralMap> {
    prop::collection::vec(("[a-d]", prop::collection::vec("[a-f][0-9]", 0..6)), 0..6)
        .prop_map(|entries| entries.into_iter().collect())
}

fn as_sets(map: &ReferralMap) -> Vec<(String, BTreeSet<String>)> {
    let mut sets: Vec<_> = map
        .iter()
        .map(|(target, ids)| (target.clone(), ids.iter().cloned().collect()))
        .collect();
    sets.sort();
    sets
}

proptest! {
    #[test]
    fn dedup_keeps_first_occurrences_in_order(ids in prop::collection::vec("[a-e]", 0..30)) {
        let mut deduped = ids.clone();
        dedup_preserving_order(&mut deduped);

        let unique: BTreeSet<_> = deduped.iter().collect();
        prop_assert_eq!(unique.len(), deduped.len());

        let mut expected = Vec::new();
        for id in &ids {
            if !expected.contains(id) {
                expected.push(id.clone());
            }
        }
        prop_assert_eq!(deduped, expected);
    }

    #[test]
    fn merge_is_order_independent_as_sets(a in referral_map(), b in referral_map(), c in referral_map()) {
        let forward = merge_referrals([a.clone(), b.clone(), c.clone()]);
        let backward = merge_referrals([c, b, a]);
        prop_assert_eq!(as_sets(&forward), as_sets(&backward));
    }

    #[test]
    fn merge_leaves_no_repeats(a in referral_map(), b in referral_map()) {
        let merged = merge_referrals([a.clone(), b.clone()]);
        for (_, ids) in merged.iter() {
            let unique: BTreeSet<_> = ids.iter().collect();
            prop_assert_eq!(unique.len(), ids.len());
        }
        prop_assert!(merged.citation_count() <= a.citation_count() + b.citation_count());
    }

    #[test]
    fn partition_covers_every_key_once(
        keys in prop::collection::btree_set("[a-z]{1,4}", 0..40),
        shards in 1usize..8,
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let buckets = partition(&keys, shards);
        prop_assert_eq!(buckets.len(), shards);

        let sizes: Vec<usize> = buckets.iter().map(Vec::len).collect();
        let (min, max) = (sizes.iter().min().copied(), sizes.iter().max().copied());
        prop_assert!(max.unwrap_or(0) - min.unwrap_or(0) <= 1);

        let mut flattened: Vec<String> = buckets.into_iter().flatten().collect();
        flattened.sort();
        prop_assert_eq!(flattened, keys);
    }
}
