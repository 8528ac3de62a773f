//! Multi-edition merge: one surviving fragment per Logical Key.
//!
//! Precedence is the explicit configured edition order, not processing
//! sequence, so reordering source collections cannot change which edition
//! wins.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use grimoire_core::types::{Fragment, LogicalKey, Meta};

use crate::records::{slug, RuleRecord};

/// One record collection tagged with the edition it came from.
#[derive(Debug, Clone)]
pub struct SourceCollection {
    pub edition: String,
    pub records: Vec<Value>,
}

/// A hand-authored fragment from the override file. Appended after the
/// automatic set, never deduplicated against it.
#[derive(Debug, Clone, Deserialize)]
pub struct OverrideFragment {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub metadata: Meta,
}

struct Candidate {
    precedence: usize,
    fragment: Fragment,
}

pub struct Normalizer {
    edition_order: Vec<String>,
}

impl Normalizer {
    /// `edition_order` lists editions from oldest to newest; later entries
    /// win Logical Key collisions.
    pub fn new(edition_order: Vec<String>) -> Self {
        Self { edition_order }
    }

    /// Editions absent from the configured order rank below all listed
    /// ones.
    fn precedence(&self, edition: &str) -> usize {
        self.edition_order.iter().position(|e| e == edition).map(|i| i + 1).unwrap_or(0)
    }

    /// Merge record collections into fragments, at most one per Logical
    /// Key. Malformed records are logged and skipped; nameless records are
    /// skipped silently. Output order is the first-appearance order of
    /// surviving keys.
    pub fn merge(&self, collections: &[SourceCollection]) -> Vec<Fragment> {
        let mut order: Vec<LogicalKey> = Vec::new();
        let mut by_key: HashMap<LogicalKey, Candidate> = HashMap::new();
        for collection in collections {
            let precedence = self.precedence(&collection.edition);
            if precedence == 0 && !self.edition_order.is_empty() {
                tracing::warn!(
                    edition = %collection.edition,
                    "edition not in configured order; it will lose every collision"
                );
            }
            for value in &collection.records {
                let record = match RuleRecord::from_value(value) {
                    Ok(Some(record)) => record,
                    Ok(None) => {
                        tracing::debug!("skipping record without a name");
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(edition = %collection.edition, "skipping malformed record: {e}");
                        continue;
                    }
                };
                let key = record.logical_key();
                let fragment = fragment_from_record(&record, &collection.edition);
                match by_key.get(&key) {
                    // ties within the same edition: last processed wins
                    Some(existing) if existing.precedence > precedence => {}
                    Some(_) => {
                        by_key.insert(key, Candidate { precedence, fragment });
                    }
                    None => {
                        order.push(key.clone());
                        by_key.insert(key, Candidate { precedence, fragment });
                    }
                }
            }
        }
        order
            .into_iter()
            .filter_map(|key| by_key.remove(&key))
            .map(|candidate| candidate.fragment)
            .collect()
    }
}

fn fragment_from_record(record: &RuleRecord, edition: &str) -> Fragment {
    let mut metadata = Meta::new();
    metadata.insert("category".to_string(), record.category().to_string());
    metadata.insert("name".to_string(), record.name().to_string());
    metadata.insert("edition".to_string(), edition.to_string());
    Fragment {
        id: format!("{}:{}", record.category(), slug(record.name())),
        content: record.render(),
        metadata,
        ordinal: 0,
    }
}

/// Convert override entries into fragments, generating ids where the file
/// does not provide one.
pub fn override_fragments(entries: Vec<OverrideFragment>) -> Vec<Fragment> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| Fragment {
            id: entry.id.unwrap_or_else(|| format!("override:{i}")),
            content: entry.content,
            metadata: entry.metadata,
            ordinal: 0,
        })
        .collect()
}
