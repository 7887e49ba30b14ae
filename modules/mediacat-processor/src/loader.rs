//! Readers for the three crawler inputs: the scope sheet, the domain
//! crawler's per-article JSON files and the social crawler's CSV exports.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use mediacat_common::{ProcessorError, Record, RecordKind, RecordTable, Result, SocialMeta};

use crate::scope::{ScopeIndex, ScopeRow};

#[derive(Debug, Deserialize)]
struct ScopeCsvRow {
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "RSS feed URLs (where available)", default)]
    rss: String,
    #[serde(rename = "Type", default)]
    source_type: String,
    #[serde(rename = "Associated Publisher", default)]
    publisher: String,
    #[serde(rename = "Tags", default)]
    tags: String,
    #[serde(rename = "Text Aliases", default)]
    aliases: String,
    #[serde(rename = "Associated Twitter Handle", default)]
    handles: String,
}

impl From<ScopeCsvRow> for ScopeRow {
    fn from(row: ScopeCsvRow) -> Self {
        ScopeRow {
            source: row.source,
            name: row.name,
            rss: row.rss,
            source_type: row.source_type,
            publisher: row.publisher,
            tags: row.tags,
            aliases: row.aliases,
            handles: row.handles,
        }
    }
}

pub fn load_scope(path: &Path) -> Result<ScopeIndex> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ProcessorError::csv(path, e))?;
    let rows = reader
        .deserialize::<ScopeCsvRow>()
        .map(|row| row.map(ScopeRow::from).map_err(|e| ProcessorError::csv(path, e)))
        .collect::<Result<Vec<_>>>()?;
    let scope = ScopeIndex::from_rows(rows);
    info!(path = %path.display(), sources = scope.len(), "Loaded scope");
    Ok(scope)
}

/// `*.<extension>` files of `dir`, sorted by name.
fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ProcessorError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ProcessorError::io(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Deserialize)]
struct FoundUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct DomainArticle {
    url: String,
    domain: String,
    #[serde(default)]
    found_urls: Vec<FoundUrl>,
    #[serde(default)]
    author_metadata: serde_json::Value,
    #[serde(default)]
    date: serde_json::Value,
    #[serde(default)]
    article_text: String,
}

/// Crawler metadata fields are free-form; strings pass through, anything else
/// keeps its JSON rendering.
fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn parse_article(path: &Path, content: &str) -> Result<Record> {
    let article: DomainArticle =
        serde_json::from_str(content).map_err(|e| ProcessorError::json(path, e))?;
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mut record = Record::new(id, article.url, article.domain, RecordKind::Article)
        .with_body(article.article_text)
        .with_links(article.found_urls.into_iter().map(|f| f.url));
    record.authors = value_text(article.author_metadata);
    record.date = value_text(article.date);
    Ok(record)
}

/// Load every `*.json` article from the domain crawler's output directory.
/// The record id is the file stem. Unparseable files are skipped with a warning.
pub fn load_domain_dir(dir: &Path) -> Result<RecordTable> {
    let mut table = RecordTable::new();
    let mut skipped = 0usize;
    for path in files_with_extension(dir, "json")? {
        let content = fs::read_to_string(&path).map_err(|e| ProcessorError::io(&path, e))?;
        match parse_article(&path, &content) {
            Ok(record) => {
                if let Some(previous) = table.insert(record) {
                    warn!(url = previous.url.as_str(), replaced = previous.id.as_str(), "Duplicate article URL");
                }
            }
            Err(e) => {
                warn!(error = %e, "Skipping malformed article");
                skipped += 1;
            }
        }
    }
    info!(dir = %dir.display(), articles = table.len(), skipped, "Loaded domain articles");
    Ok(table)
}

/// Parse a Python-style list literal such as `['a', "b"]`.
/// Returns `None` for anything that is not a well-formed list of strings.
pub fn parse_list_literal(raw: &str) -> Option<Vec<String>> {
    let inner = raw.trim().strip_prefix('[')?.strip_suffix(']')?;
    let mut items = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return None;
        }

        let mut item = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => item.push(chars.next()?),
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => item.push(c),
            }
        }
        if !closed {
            return None;
        }
        items.push(item);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            None => break,
            Some(',') => continue,
            Some(_) => return None,
        }
    }
    Some(items)
}

#[derive(Debug, Deserialize)]
struct SocialCsvRow {
    #[serde(rename = "Hit Record Unique ID")]
    id: String,
    #[serde(rename = "URL to article/Tweet")]
    url: String,
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Location", default)]
    location: String,
    #[serde(rename = "Passed through tags", default)]
    tags: String,
    #[serde(rename = "Associated Publisher", default)]
    publisher: String,
    #[serde(rename = "Authors", default)]
    authors: String,
    #[serde(rename = "Plain Text of Article or Tweet", default)]
    text: String,
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "Language", default)]
    language: String,
    #[serde(rename = "Mentions", default)]
    mentions: String,
    #[serde(rename = "Hashtags", default)]
    hashtags: String,
    #[serde(rename = "Found URL", default)]
    found_urls: String,
}

impl SocialCsvRow {
    /// `None` when a list column is blank or not a list literal.
    fn into_record(self) -> Option<Record> {
        let links = parse_list_literal(&self.found_urls)?;
        let hashtags = parse_list_literal(&self.hashtags)?;
        let mentions = parse_list_literal(&self.mentions)?;

        let mut record = Record::new(self.id, self.url, self.source, RecordKind::SocialPost)
            .with_body(self.text)
            .with_links(links);
        record.authors = self.authors;
        record.date = self.date;
        record.language = self.language;
        record.social = Some(SocialMeta {
            location: self.location,
            tags: self.tags,
            publisher: self.publisher,
            mentions,
            hashtags,
        });
        Some(record)
    }
}

/// Load every `*.csv` export from the social crawler's output directory.
/// Rows with missing or malformed list columns are skipped with a warning.
pub fn load_social_dir(dir: &Path) -> Result<RecordTable> {
    let mut table = RecordTable::new();
    let mut skipped = 0usize;
    for path in files_with_extension(dir, "csv")? {
        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| ProcessorError::csv(&path, e))?;
        for row in reader.deserialize::<SocialCsvRow>() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable social row");
                    skipped += 1;
                    continue;
                }
            };
            let (url, id) = (row.url.clone(), row.id.clone());
            match row.into_record() {
                Some(record) => {
                    table.insert(record);
                }
                None => {
                    warn!(url = url.as_str(), id = id.as_str(), "Line format not properly formed, skipping");
                    skipped += 1;
                }
            }
        }
    }
    info!(dir = %dir.display(), posts = table.len(), skipped, "Loaded social posts");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediacat_common::SourceKind;

    #[test]
    fn list_literals() {
        assert_eq!(parse_list_literal("[]"), Some(vec![]));
        assert_eq!(
            parse_list_literal("['https://a.com/1', \"b.com\"]"),
            Some(vec!["https://a.com/1".to_string(), "b.com".to_string()])
        );
        assert_eq!(
            parse_list_literal(r"['it\'s']"),
            Some(vec!["it's".to_string()])
        );
        assert_eq!(parse_list_literal(""), None);
        assert_eq!(parse_list_literal("nan"), None);
        assert_eq!(parse_list_literal("['unterminated]"), None);
        assert_eq!(parse_list_literal("[1, 2]"), None);
    }

    #[test]
    fn scope_sheet_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scope.csv");
        std::fs::write(
            &path,
            "Source,Name,RSS feed URLs (where available),Type,Associated Publisher,Tags,Text Aliases,Associated Twitter Handle\n\
             a.com,Acme News,,News Source,Acme Media,national|english,Acme|Acme Daily,@acme\n\
             @pundit,Pundit,,Twitter Handle,, , , \n",
        )
        .unwrap();

        let scope = load_scope(&path).unwrap();
        assert_eq!(scope.len(), 2);
        let acme = scope.get("a.com").unwrap();
        assert_eq!(acme.aliases, vec!["Acme", "Acme Daily"]);
        assert_eq!(acme.handles, vec!["@acme"]);
        assert_eq!(scope.get("@pundit").unwrap().kind, SourceKind::HandleOnly);
    }

    #[test]
    fn domain_articles_use_file_stem_as_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("abc123.json"),
            r#"{"url": "b.com/x", "domain": "b.com", "found_urls": [{"url": "a.com/1"}],
                "author_metadata": ["Jo"], "date": "2021-03-15", "article_text": "Acme did it",
                "title": "ignored"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an article").unwrap();

        let table = load_domain_dir(dir.path()).unwrap();
        assert_eq!(table.len(), 1);
        let record = table.get("b.com/x").unwrap();
        assert_eq!(record.id, "abc123");
        assert_eq!(record.found_links, vec!["a.com/1"]);
        assert_eq!(record.authors, "[\"Jo\"]");
        assert_eq!(record.kind, RecordKind::Article);
        assert!(!record.completed);
        assert!(record.language.is_empty());
    }

    #[test]
    fn malformed_social_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("acme.csv"),
            "Hit Record Unique ID,URL to article/Tweet,Source,Location,Passed through tags,Associated Publisher,Authors,Plain Text of Article or Tweet,Date,Mentions,Hashtags,Found URL\n\
             1,https://twitter.com/acme/1,@acme,,news,,Acme,hello @pundit,2021-03-01,['pundit'],[],['https://z.org/o']\n\
             2,https://twitter.com/acme/2,@acme,,news,,Acme,no lists,2021-03-02,,,\n\
             3,https://twitter.com/acme/3,@acme,,news,,Acme,bad,2021-03-03,[],[],not-a-list\n",
        )
        .unwrap();

        let table = load_social_dir(dir.path()).unwrap();
        assert_eq!(table.len(), 1);
        let post = table.get("https://twitter.com/acme/1").unwrap();
        assert_eq!(post.id, "1");
        assert_eq!(post.domain, "@acme");
        assert_eq!(post.kind, RecordKind::SocialPost);
        assert_eq!(post.found_links, vec!["https://z.org/o"]);
        assert_eq!(post.social.as_ref().unwrap().mentions, vec!["pundit"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_domain_dir(&dir.path().join("absent")),
            Err(ProcessorError::Io { .. })
        ));
    }
}
