use mediacat_common::Record;

use crate::referrals::{dedup_preserving_order, ReferralMap};

/// Every record that cites `record`, in first-seen order, without repeats and
/// without the record itself.
///
/// Citations are looked up under the record's URL and then its owning domain,
/// first in the domain-origin map and then in the social-origin map. Only the
/// record's own id is stripped: an article that links its own domain still
/// counts as a referrer of that domain's static node and of its sibling
/// articles.
pub fn resolve(record: &Record, domain_refs: &ReferralMap, social_refs: &ReferralMap) -> Vec<String> {
    let mut keys = vec![record.url.as_str()];
    if record.domain != record.url {
        keys.push(record.domain.as_str());
    }

    let mut citing: Vec<String> = Vec::new();
    for refs in [domain_refs, social_refs] {
        for key in &keys {
            if let Some(ids) = refs.get(key) {
                citing.extend(ids.iter().cloned());
            }
        }
    }

    dedup_preserving_order(&mut citing);
    citing.retain(|id| id != &record.id);
    citing
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacat_common::RecordKind;

    fn refs(entries: &[(&str, &[&str])]) -> ReferralMap {
        entries
            .iter()
            .map(|(k, ids)| (k.to_string(), ids.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn combines_both_origins_in_order() {
        let record = Record::new("y", "a.com/1", "a.com", RecordKind::Article);
        let domain = refs(&[("a.com/1", &["d1", "d2"]), ("a.com", &["d3", "d1"])]);
        let social = refs(&[("a.com/1", &["s1", "d2"])]);
        assert_eq!(resolve(&record, &domain, &social), vec!["d1", "d2", "d3", "s1"]);
    }

    #[test]
    fn never_includes_itself() {
        let record = Record::new("y", "a.com/1", "a.com", RecordKind::Article);
        let domain = refs(&[("a.com/1", &["y", "x", "y"])]);
        assert_eq!(resolve(&record, &domain, &ReferralMap::new()), vec!["x"]);
    }

    #[test]
    fn same_domain_article_counts_for_domain_node() {
        let node = Record::new("node", "a.com", "a.com", RecordKind::Domain);
        // Article "a1" on a.com links to its own homepage.
        let domain = refs(&[("a.com", &["a1"])]);
        assert_eq!(resolve(&node, &domain, &ReferralMap::new()), vec!["a1"]);
    }

    #[test]
    fn uncited_record_resolves_empty() {
        let record = Record::new("q", "z.org/q", "z.org", RecordKind::Article);
        assert!(resolve(&record, &ReferralMap::new(), &ReferralMap::new()).is_empty());
    }
}
