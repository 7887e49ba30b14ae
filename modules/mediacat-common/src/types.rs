use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

// --- Scope ---

/// How a scope entry is crawled: a news domain or a handle-only account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    NewsDomain,
    HandleOnly,
}

impl SourceKind {
    /// The scope sheet's `Type` column uses `News Source` for domains; anything
    /// else is treated as a handle-only account.
    pub fn from_scope_type(value: &str) -> Self {
        if value.trim() == "News Source" {
            SourceKind::NewsDomain
        } else {
            SourceKind::HandleOnly
        }
    }
}

/// A curated source: a domain string or an `@handle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeEntry {
    /// Canonical source identifier, the scope key.
    pub id: String,
    pub name: String,
    pub rss: String,
    pub kind: SourceKind,
    pub publisher: String,
    pub tags: Vec<String>,
    pub aliases: Vec<String>,
    pub handles: Vec<String>,
}

impl ScopeEntry {
    pub fn new(id: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            rss: String::new(),
            kind,
            publisher: String::new(),
            tags: Vec::new(),
            aliases: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Key of the synthetic node standing in for the whole alias group.
    /// `None` when the entry has no aliases.
    pub fn alias_group_key(&self) -> Option<String> {
        if self.aliases.is_empty() {
            None
        } else {
            Some(format!("[{}]", self.aliases.join("|")))
        }
    }
}

// --- Records ---

/// What produced a record: crawler output or a synthetic scope node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Article,
    SocialPost,
    Domain,
    Handle,
    AliasGroup,
}

impl RecordKind {
    /// Synthetic nodes exist to anchor the graph and never come from a crawler.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            RecordKind::Domain | RecordKind::Handle | RecordKind::AliasGroup
        )
    }
}

/// Fields only social-post exports carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialMeta {
    pub location: String,
    pub tags: String,
    pub publisher: String,
    pub mentions: Vec<String>,
    pub hashtags: Vec<String>,
}

/// An article, a social post, or a synthetic scope node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub url: String,
    /// Owning domain or `@handle`; compared against scope keys.
    pub domain: String,
    pub kind: RecordKind,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub found_links: Vec<String>,
    /// Set once aggregation has visited the record. Resumed runs skip these.
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social: Option<SocialMeta>,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        domain: impl Into<String>,
        kind: RecordKind,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            domain: domain.into(),
            kind,
            body: String::new(),
            authors: String::new(),
            date: String::new(),
            language: String::new(),
            found_links: Vec::new(),
            completed: false,
            social: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.found_links = links.into_iter().map(Into::into).collect();
        self
    }
}

/// Reverse lookup entry: record id → where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub url: String,
    pub domain: String,
}

pub type PairingTable = HashMap<String, Pairing>;

/// Records keyed by canonical URL. Ordered so every pass visits records in
/// the same sequence and discovery order is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordTable {
    records: BTreeMap<String, Record>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert keyed by the record's URL, replacing any previous record there.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        self.records.insert(record.url.clone(), record)
    }

    pub fn get(&self, url: &str) -> Option<&Record> {
        self.records.get(url)
    }

    pub fn get_mut(&mut self, url: &str) -> Option<&mut Record> {
        self.records.get_mut(url)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.values_mut()
    }

    pub fn pending(&self) -> usize {
        self.records.values().filter(|r| !r.completed).count()
    }

    /// Mark the records at `urls` as visited. Unknown URLs are ignored.
    pub fn mark_completed<'a>(&mut self, urls: impl IntoIterator<Item = &'a String>) {
        for url in urls {
            if let Some(record) = self.records.get_mut(url) {
                record.completed = true;
            }
        }
    }

    /// Build the id → {url, domain} pairing table.
    pub fn pairings(&self) -> PairingTable {
        self.records
            .values()
            .map(|r| {
                (
                    r.id.clone(),
                    Pairing {
                        url: r.url.clone(),
                        domain: r.domain.clone(),
                    },
                )
            })
            .collect()
    }

    /// Add every record from `other` whose URL is not already present.
    /// Existing records win on collision.
    pub fn absorb_missing(&mut self, other: RecordTable) {
        for (url, record) in other.records {
            self.records.entry(url).or_insert(record);
        }
    }
}

impl FromIterator<Record> for RecordTable {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut table = RecordTable::new();
        for record in iter {
            table.insert(record);
        }
        table
    }
}

// --- Outputs ---

/// An in-scope record enriched with its scope entry's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedEntry {
    pub id: String,
    /// URL for crawled records, the source key, handle or alias group for static nodes.
    pub url: String,
    pub referring_record_ids: Vec<String>,
    pub referral_count: usize,
    pub kind: RecordKind,
    pub publisher: String,
    pub tags: Vec<String>,
    pub name: String,
    pub language: String,
    pub authors: String,
    pub date: String,
    pub body: String,
}

/// One row of an interest entry's citing-domain ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: usize,
}

/// An out-of-scope record surfaced because scoped sources cite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestEntry {
    pub id: String,
    pub hit_count: usize,
    pub url: String,
    pub source: String,
    pub referring_record_ids: Vec<String>,
    pub authors: String,
    pub body: String,
    pub kind: RecordKind,
    pub date: String,
    /// At most five citing domains, highest count first.
    pub top_referrals: Vec<DomainCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_type_maps_to_kind() {
        assert_eq!(SourceKind::from_scope_type("News Source"), SourceKind::NewsDomain);
        assert_eq!(SourceKind::from_scope_type(" News Source "), SourceKind::NewsDomain);
        assert_eq!(SourceKind::from_scope_type("Twitter Handle"), SourceKind::HandleOnly);
        assert_eq!(SourceKind::from_scope_type(""), SourceKind::HandleOnly);
    }

    #[test]
    fn alias_group_key_is_stable() {
        let mut entry = ScopeEntry::new("a.com", SourceKind::NewsDomain);
        assert_eq!(entry.alias_group_key(), None);
        entry.aliases = vec!["Acme".to_string(), "Acme Corp".to_string()];
        assert_eq!(entry.alias_group_key().as_deref(), Some("[Acme|Acme Corp]"));
    }

    #[test]
    fn absorb_missing_keeps_existing_records() {
        let mut real = RecordTable::new();
        real.insert(Record::new("real", "a.com", "a.com", RecordKind::Article));

        let mut synthetic = RecordTable::new();
        synthetic.insert(Record::new("static", "a.com", "a.com", RecordKind::Domain));
        synthetic.insert(Record::new("handle", "@acme", "a.com", RecordKind::Handle));

        real.absorb_missing(synthetic);
        assert_eq!(real.len(), 2);
        assert_eq!(real.get("a.com").map(|r| r.id.as_str()), Some("real"));
        assert_eq!(real.get("@acme").map(|r| r.kind), Some(RecordKind::Handle));
    }

    #[test]
    fn pairings_index_by_id() {
        let table: RecordTable = vec![
            Record::new("1", "a.com/1", "a.com", RecordKind::Article),
            Record::new("2", "b.com/2", "b.com", RecordKind::Article),
        ]
        .into_iter()
        .collect();
        let pairs = table.pairings();
        assert_eq!(pairs["2"].domain, "b.com");
        assert_eq!(pairs["1"].url, "a.com/1");
    }

    #[test]
    fn mark_completed_skips_unknown_urls() {
        let mut table: RecordTable = vec![Record::new("1", "a.com/1", "a.com", RecordKind::Article)]
            .into_iter()
            .collect();
        table.mark_completed(&["a.com/1".to_string(), "missing".to_string()]);
        assert_eq!(table.pending(), 0);
    }

    #[test]
    fn static_kinds() {
        assert!(RecordKind::Domain.is_static());
        assert!(RecordKind::AliasGroup.is_static());
        assert!(!RecordKind::Article.is_static());
        assert!(!RecordKind::SocialPost.is_static());
    }
}
