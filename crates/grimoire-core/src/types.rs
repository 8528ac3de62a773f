//! Domain types shared by the ingestion pipeline and both retrieval backends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type FragmentId = String;
pub type Meta = BTreeMap<String, String>;

/// The atomic retrievable unit: a chunk of rule text plus provenance.
///
/// - `id`: stable fragment identifier, unique within one indexed corpus
/// - `content`: the (possibly header-prefixed) text that is embedded/indexed
/// - `metadata`: provenance such as source, section, edition, record name
/// - `ordinal`: insertion position in the final fragment sequence; the
///   universal tie-breaker for equal scores. Assigned by the store on
///   insert/load, never serialized.
///
/// Fragments are immutable once created. A newer edition replaces an older
/// fragment before indexing; nothing mutates an indexed fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: FragmentId,
    pub content: String,
    #[serde(default)]
    pub metadata: Meta,
    #[serde(skip)]
    pub ordinal: usize,
}

/// Identity used to detect duplicate/superseding records across editions.
/// The name is canonicalized (trimmed, lower-cased) so "Fireball" and
/// " fireball " collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalKey {
    pub category: String,
    pub name: String,
}

impl LogicalKey {
    pub fn new(category: &str, name: &str) -> Self {
        Self {
            category: category.trim().to_lowercase(),
            name: name.trim().to_lowercase(),
        }
    }
}

/// Indicates which backend produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Sparse,
}

/// The minimal surface returned by both backends.
///
/// `id` matches `Fragment::id`. `score` is backend-specific but higher is
/// always better. `ordinal` carries the fragment's insertion position so
/// callers can order equal scores deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: FragmentId,
    pub score: f32,
    pub ordinal: usize,
    pub source: SourceKind,
}

/// A fully resolved retrieval result handed to the answer synthesizer.
#[derive(Debug, Clone)]
pub struct RankedFragment {
    pub fragment: Fragment,
    pub score: f32,
}

/// One turn of a conversation, as consumed by the chat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, text: text.into() }
    }
}
