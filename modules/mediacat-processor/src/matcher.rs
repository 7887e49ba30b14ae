//! Alias matcher: finds in-scope sources mentioned in free text.
//!
//! Every scope entry is tested three ways, case-insensitively, with each match
//! bounded by non-word characters or the ends of the text:
//!
//! 1. the bare source identifier,
//! 2. any of its text aliases, unless the character before the match is `@`,
//! 3. each of its handles on its own.
//!
//! Hits on (1) and (2) report the source identifier; hits on (3) report the
//! handle itself. Names are matched literally. Patterns are compiled once when
//! the matcher is built.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use mediacat_common::{ProcessorError, Result, ScopeEntry};

use crate::scope::ScopeIndex;

/// `@` + letters + letters/digits/`-`/`_`, not glued to a preceding word,
/// dotted name or hyphenated token.
static HANDLE_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-zA-Z0-9\-_.])(@[A-Za-z]+[A-Za-z0-9\-_]+)").expect("valid regex")
});

/// What a body of text mentions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mentions {
    /// Source identifiers and scoped handles that were mentioned.
    pub sources: BTreeSet<String>,
    /// Handle-shaped tokens that are neither matched nor scope keys.
    pub unrecognized_handles: BTreeSet<String>,
}

struct EntryPatterns {
    source_id: String,
    name: Regex,
    aliases: Option<Regex>,
    handles: Vec<(String, Regex)>,
}

/// Compiled alias/handle patterns for a whole scope.
pub struct AliasMatcher {
    entries: Vec<EntryPatterns>,
    scope_keys: BTreeSet<String>,
}

fn bounded(source_id: &str, alternation: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?i)(?:\W|^)(?:{alternation})(?:\W|$)")).map_err(|source| {
        ProcessorError::Pattern {
            source_id: source_id.to_string(),
            source,
        }
    })
}

fn alternation<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|")
}

/// Alias alternation that refuses a match preceded by `@`, so a handle never
/// counts as a text alias. At the very start of the text there is no preceding
/// character, so aliases that themselves begin with `@` are excluded there.
fn alias_pattern(source_id: &str, aliases: &[String]) -> Result<Regex> {
    let all = alternation(aliases);
    let not_at = alternation(aliases.iter().filter(|a| !a.starts_with('@')));
    let lead = if not_at.is_empty() {
        format!(r"[^\w@](?:{all})")
    } else {
        format!(r"[^\w@](?:{all})|^(?:{not_at})")
    };
    Regex::new(&format!(r"(?i)(?:{lead})(?:\W|$)")).map_err(|source| ProcessorError::Pattern {
        source_id: source_id.to_string(),
        source,
    })
}

impl EntryPatterns {
    fn compile(entry: &ScopeEntry) -> Result<Self> {
        let name = bounded(&entry.id, &regex::escape(&entry.id))?;
        let aliases = if entry.aliases.is_empty() {
            None
        } else {
            Some(alias_pattern(&entry.id, &entry.aliases)?)
        };
        let handles = entry
            .handles
            .iter()
            .map(|h| Ok((h.clone(), bounded(&entry.id, &regex::escape(h))?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source_id: entry.id.clone(),
            name,
            aliases,
            handles,
        })
    }
}

impl AliasMatcher {
    pub fn new(scope: &ScopeIndex) -> Result<Self> {
        let entries = scope
            .iter()
            .map(EntryPatterns::compile)
            .collect::<Result<Vec<_>>>()?;
        let scope_keys = scope.iter().map(|e| e.id.clone()).collect();
        Ok(Self {
            entries,
            scope_keys,
        })
    }

    /// Find every in-scope source mentioned in `body`, ignoring the record's
    /// own source so self-citation never counts.
    pub fn find_mentions(&self, body: &str, own_source: &str) -> Mentions {
        let mut mentions = Mentions::default();
        if body.is_empty() {
            return mentions;
        }

        for entry in &self.entries {
            if entry.source_id == own_source {
                continue;
            }
            if entry.name.is_match(body) {
                mentions.sources.insert(entry.source_id.clone());
            }
            if let Some(aliases) = &entry.aliases {
                if aliases.is_match(body) {
                    mentions.sources.insert(entry.source_id.clone());
                }
            }
            for (handle, pattern) in &entry.handles {
                if pattern.is_match(body) {
                    mentions.sources.insert(handle.clone());
                }
            }
        }

        mentions.unrecognized_handles = HANDLE_TOKEN_RE
            .captures_iter(body)
            .map(|cap| cap[1].to_string())
            .filter(|token| !mentions.sources.contains(token) && !self.scope_keys.contains(token))
            .collect();

        mentions
    }
}
