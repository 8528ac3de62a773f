//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars into one typed [`AppConfig`] that
//! is constructed once at startup and passed into component constructors.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
}

/// One structured record collection, tagged with the edition it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSource {
    pub edition: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Flat serialized fragment list; the interchange file between the
    /// ingest binary and the serving binaries.
    pub fragments_path: String,
    pub lancedb_dir: String,
    pub table: String,
    /// Directory of plain-text rulebook files, chunked during ingest.
    pub books_dir: String,
    /// Structured record collections, processed in the order of
    /// `edition_order` for supersession.
    pub records: Vec<RecordSource>,
    /// Hand-authored fragments appended after the automatic set.
    pub overrides_path: Option<String>,
    /// Explicit edition precedence: later entries win Logical Key
    /// collisions. Editions not listed rank below all listed ones.
    pub edition_order: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            fragments_path: "data/fragments.json".to_string(),
            lancedb_dir: "data/lancedb".to_string(),
            table: "rulebook".to_string(),
            books_dir: "data/books".to_string(),
            records: Vec::new(),
            overrides_path: None,
            edition_order: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum fresh characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Chunks shorter than this after trimming are dropped as noise.
    pub min_fragment_len: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, min_fragment_len: 50 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub dense_k: usize,
    pub sparse_k: usize,
    pub dense_weight: f32,
    pub sparse_weight: f32,
    /// Number of alternative phrasings requested from the chat model.
    /// Zero disables query expansion.
    pub rewrite_count: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { dense_k: 20, sparse_k: 20, dense_weight: 0.6, sparse_weight: 0.4, rewrite_count: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_dir: String,
    pub dimension: usize,
    pub max_len: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_dir: "models/paraphrase-multilingual-minilm".to_string(),
            dimension: 384,
            max_len: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Name of the environment variable holding the API key. The key
    /// itself never lives in config files.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { model: "gemini-2.5-flash".to_string(), api_key_env: "GOOGLE_API_KEY".to_string() }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment =
            Figment::from(Serialized::defaults(Self::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_"));

        let config: Self = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;
        config.validate()?;
        tracing::debug!(env = %env_name, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.chunking.min_fragment_len == 0 {
            return Err(Error::InvalidConfig("min_fragment_len must be at least 1".to_string()));
        }
        if self.retrieval.dense_weight < 0.0 || self.retrieval.sparse_weight < 0.0 {
            return Err(Error::InvalidConfig("ensemble weights must be non-negative".to_string()));
        }
        if self.retrieval.dense_weight == 0.0 && self.retrieval.sparse_weight == 0.0 {
            return Err(Error::InvalidConfig("at least one ensemble weight must be positive".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be positive".to_string()));
        }
        Ok(())
    }

    pub fn fragments_path(&self) -> PathBuf {
        expand_path(&self.data.fragments_path)
    }

    pub fn lancedb_dir(&self) -> PathBuf {
        expand_path(&self.data.lancedb_dir)
    }

    pub fn books_dir(&self) -> PathBuf {
        expand_path(&self.data.books_dir)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after
/// expansion. If `p` is absolute, it's returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.retrieval.dense_k, 20);
        assert!((config.retrieval.dense_weight - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let mut config = AppConfig::default();
        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_weights_are_rejected() {
        let mut config = AppConfig::default();
        config.retrieval.dense_weight = 0.0;
        config.retrieval.sparse_weight = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_with_base_keeps_absolute_paths() {
        let base = Path::new("/srv/grimoire");
        assert_eq!(resolve_with_base(base, "/tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(resolve_with_base(base, "data/x"), PathBuf::from("/srv/grimoire/data/x"));
    }
}
