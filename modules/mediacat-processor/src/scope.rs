//! Scope index: the curated registry of sources the run cares about.

use std::collections::BTreeMap;

use mediacat_common::{ScopeEntry, SourceKind};

/// One row of the scope sheet, with pipe-delimited lists still unsplit.
#[derive(Debug, Clone, Default)]
pub struct ScopeRow {
    pub source: String,
    pub name: String,
    pub rss: String,
    pub source_type: String,
    pub publisher: String,
    pub tags: String,
    pub aliases: String,
    pub handles: String,
}

/// Split a pipe-delimited scope cell. Blank cells (including the single
/// space the sheet uses for "none") yield an empty list.
pub fn split_pipe_list(cell: &str) -> Vec<String> {
    if cell.trim().is_empty() {
        return Vec::new();
    }
    cell.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl From<ScopeRow> for ScopeEntry {
    fn from(row: ScopeRow) -> Self {
        ScopeEntry {
            kind: SourceKind::from_scope_type(&row.source_type),
            tags: split_pipe_list(&row.tags),
            aliases: split_pipe_list(&row.aliases),
            handles: split_pipe_list(&row.handles),
            id: row.source.trim().to_string(),
            name: row.name,
            rss: row.rss,
            publisher: row.publisher,
        }
    }
}

/// Source identifier → scope entry. Built once per run, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ScopeIndex {
    entries: BTreeMap<String, ScopeEntry>,
}

impl ScopeIndex {
    pub fn new(entries: impl IntoIterator<Item = ScopeEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn from_rows(rows: impl IntoIterator<Item = ScopeRow>) -> Self {
        Self::new(
            rows.into_iter()
                .map(ScopeEntry::from)
                .filter(|e| !e.id.is_empty()),
        )
    }

    pub fn get(&self, source: &str) -> Option<&ScopeEntry> {
        self.entries.get(source)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScopeEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_are_empty_lists() {
        assert!(split_pipe_list("").is_empty());
        assert!(split_pipe_list(" ").is_empty());
        assert_eq!(split_pipe_list("Acme|Acme Corp"), vec!["Acme", "Acme Corp"]);
        assert_eq!(split_pipe_list("news| |local"), vec!["news", "local"]);
    }

    #[test]
    fn rows_become_entries() {
        let index = ScopeIndex::from_rows(vec![
            ScopeRow {
                source: "a.com".into(),
                name: "Acme News".into(),
                source_type: "News Source".into(),
                publisher: "Acme Media".into(),
                tags: "national|english".into(),
                aliases: "Acme".into(),
                handles: "@acme|@acmenews".into(),
                ..Default::default()
            },
            ScopeRow {
                source: "@pundit".into(),
                source_type: "Twitter Handle".into(),
                aliases: " ".into(),
                ..Default::default()
            },
            ScopeRow::default(),
        ]);

        assert_eq!(index.len(), 2);
        let acme = index.get("a.com").unwrap();
        assert_eq!(acme.kind, SourceKind::NewsDomain);
        assert_eq!(acme.tags, vec!["national", "english"]);
        assert_eq!(acme.handles, vec!["@acme", "@acmenews"]);

        let pundit = index.get("@pundit").unwrap();
        assert_eq!(pundit.kind, SourceKind::HandleOnly);
        assert!(pundit.aliases.is_empty());
    }
}
