//! Synthetic scope nodes that anchor the graph even without crawler output.

use uuid::Uuid;

use mediacat_common::{Record, RecordKind, RecordTable, SourceKind};

use crate::scope::ScopeIndex;

/// Deterministic node id: UUIDv5 in the DNS namespace over the node key.
pub fn static_node_id(key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, key.as_bytes()).to_string()
}

fn static_node(key: &str, source: &str, kind: RecordKind) -> Record {
    let mut record = Record::new(static_node_id(key), key, source, kind);
    record.completed = true;
    record
}

/// One node per source, one per handle, and one per non-empty alias group.
pub fn generate_static_nodes(scope: &ScopeIndex) -> RecordTable {
    let mut nodes = RecordTable::new();
    for entry in scope.iter() {
        let kind = match entry.kind {
            SourceKind::NewsDomain => RecordKind::Domain,
            SourceKind::HandleOnly => RecordKind::Handle,
        };
        nodes.insert(static_node(&entry.id, &entry.id, kind));

        for handle in &entry.handles {
            nodes.insert(static_node(handle, &entry.id, RecordKind::Handle));
        }

        if let Some(group) = entry.alias_group_key() {
            nodes.insert(static_node(&group, &entry.id, RecordKind::AliasGroup));
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacat_common::ScopeEntry;

    fn scope() -> ScopeIndex {
        let mut acme = ScopeEntry::new("a.com", SourceKind::NewsDomain);
        acme.aliases = vec!["Acme".to_string()];
        acme.handles = vec!["@acme".to_string(), "@acmenews".to_string()];
        let pundit = ScopeEntry::new("@pundit", SourceKind::HandleOnly);
        ScopeIndex::new(vec![acme, pundit])
    }

    #[test]
    fn one_node_per_source_handle_and_alias_group() {
        let nodes = generate_static_nodes(&scope());
        assert_eq!(nodes.len(), 5);

        assert_eq!(nodes.get("a.com").unwrap().kind, RecordKind::Domain);
        assert_eq!(nodes.get("@pundit").unwrap().kind, RecordKind::Handle);
        let handle = nodes.get("@acmenews").unwrap();
        assert_eq!(handle.kind, RecordKind::Handle);
        assert_eq!(handle.domain, "a.com");
        let group = nodes.get("[Acme]").unwrap();
        assert_eq!(group.kind, RecordKind::AliasGroup);
        assert_eq!(group.domain, "a.com");
        assert!(nodes.iter().all(|n| n.completed));
    }

    #[test]
    fn ids_are_stable_across_runs() {
        let first = generate_static_nodes(&scope());
        let second = generate_static_nodes(&scope());
        assert_eq!(first, second);
        assert_eq!(
            first.get("a.com").unwrap().id,
            Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"a.com").to_string()
        );
        assert_ne!(first.get("a.com").unwrap().id, first.get("@acme").unwrap().id);
    }
}
