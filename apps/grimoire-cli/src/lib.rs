//! Shared wiring for the grimoire binaries.

use anyhow::{Context, Result};

use grimoire_core::config::AppConfig;
use grimoire_core::traits::TextIndex;
use grimoire_embed::embedder_from_config;
use grimoire_engine::RetrievalEngine;
use grimoire_ingest::FragmentStore;
use grimoire_text::SparseTextIndex;
use grimoire_vector::LanceDenseIndex;

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();
}

pub struct ServingContext {
    pub store: FragmentStore,
    pub engine: RetrievalEngine,
    pub dense_rows: usize,
}

/// Load the fragment store, reopen the persisted dense index, and rebuild
/// the sparse index in memory. A missing store or empty dense index is a
/// fatal startup error; a failed sparse build degrades to dense-only.
pub async fn build_serving_context(config: &AppConfig, enable_sparse: bool) -> Result<ServingContext> {
    let fragments_path = config.fragments_path();
    let store = FragmentStore::load(&fragments_path)
        .with_context(|| "run grimoire-ingest first to build the fragment store")?;
    let embedder = embedder_from_config(&config.embedding)?;
    let dense = LanceDenseIndex::open(
        &config.lancedb_dir(),
        &config.data.table,
        config.embedding.dimension,
    )
    .await?;
    let dense_rows = dense.count().await?;
    anyhow::ensure!(
        dense_rows > 0,
        "dense index at {} is empty; run grimoire-ingest first",
        config.lancedb_dir().display()
    );

    let sparse: Option<Box<dyn TextIndex>> = if enable_sparse {
        match SparseTextIndex::build(store.fragments()) {
            Ok(index) => Some(Box::new(index)),
            Err(e) => {
                tracing::warn!("sparse index build failed; serving dense-only: {e}");
                None
            }
        }
    } else {
        None
    };

    let engine = RetrievalEngine::new(embedder, Box::new(dense), sparse, config.retrieval.clone());
    Ok(ServingContext { store, engine, dense_rows })
}
