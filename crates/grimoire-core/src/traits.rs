use crate::types::{Fragment, SearchHit, Turn};

/// Text-to-vector collaborator. Must be configured identically at build
/// time and query time; the core cannot detect a mismatch.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Lexical (sparse) backend over the fragment set.
pub trait TextIndex: Send + Sync {
    fn index(&self, fragments: &[Fragment]) -> anyhow::Result<()>;
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<SearchHit>>;
}

/// Vector (dense) backend. Async because the persisted index is.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    async fn add(&self, fragments: &[Fragment], embeddings: &[Vec<f32>]) -> anyhow::Result<()>;
    async fn search(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<SearchHit>>;
}

/// Answer-synthesis collaborator: text in, text out. May fail; callers
/// treat a failure as affecting that call only.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str, history: &[Turn]) -> anyhow::Result<String>;
}

/// Conversation history keyed by session identifier.
pub trait SessionStore: Send + Sync {
    fn history(&self, session_id: &str) -> Vec<Turn>;
    fn append(&self, session_id: &str, turn: Turn);
}
