//! Embedding collaborator: a local sentence-embedding model plus a
//! deterministic hashing stand-in for tests and offline runs.

mod device;
mod hashing;
mod model;
mod pool;

pub use hashing::HashingEmbedder;
pub use model::CandleTextEmbedder;

use grimoire_core::config::EmbeddingConfig;
use grimoire_core::traits::Embedder;

/// Select the embedder for this process. `APP_USE_FAKE_EMBEDDINGS=1`
/// switches to the hashing embedder so tests and air-gapped machines never
/// load model weights. Build time and query time must agree on this choice.
pub fn embedder_from_config(cfg: &EmbeddingConfig) -> anyhow::Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::info!(dim = cfg.dimension, "using hashing embedder");
        return Ok(Box::new(HashingEmbedder::new(cfg.dimension)));
    }
    Ok(Box::new(CandleTextEmbedder::new(cfg)?))
}
