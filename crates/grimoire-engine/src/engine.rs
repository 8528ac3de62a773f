use anyhow::Result;
use std::cmp::Ordering;
use std::collections::HashMap;

use grimoire_core::config::RetrievalConfig;
use grimoire_core::traits::{Embedder, TextIndex, VectorIndex};
use grimoire_core::types::FragmentId;

use crate::ensemble::{fuse, RankedHit};

/// Hybrid search over a dense and an optional sparse backend. Without a
/// sparse backend the engine is a pass-through for dense search; that is a
/// configuration fallback, not an error.
pub struct RetrievalEngine {
    embedder: Box<dyn Embedder>,
    dense: Box<dyn VectorIndex>,
    sparse: Option<Box<dyn TextIndex>>,
    cfg: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        embedder: Box<dyn Embedder>,
        dense: Box<dyn VectorIndex>,
        sparse: Option<Box<dyn TextIndex>>,
        cfg: RetrievalConfig,
    ) -> Self {
        Self { embedder, dense, sparse, cfg }
    }

    /// Hybrid search for one query string.
    pub async fn search(&self, query: &str) -> Result<Vec<RankedHit>> {
        let query_vec = self
            .embedder
            .embed_batch(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))?;
        let dense_hits = self.dense.search(&query_vec, self.cfg.dense_k).await?;

        let Some(sparse) = &self.sparse else {
            return Ok(pass_through(dense_hits));
        };
        let sparse_hits = match sparse.search(query, self.cfg.sparse_k) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("sparse backend failed; degrading to dense-only: {e}");
                return Ok(pass_through(dense_hits));
            }
        };
        Ok(fuse(&dense_hits, &sparse_hits, self.cfg.dense_weight, self.cfg.sparse_weight))
    }

    /// Union the hybrid results of the original question and its rewrites,
    /// deduplicated by fragment id, keeping the highest combined score seen
    /// for any fragment. Equal scores keep first-seen order.
    pub async fn retrieve(&self, question: &str, rewrites: &[String]) -> Result<Vec<RankedHit>> {
        let mut order: Vec<FragmentId> = Vec::new();
        let mut best: HashMap<FragmentId, f32> = HashMap::new();
        for query in std::iter::once(question).chain(rewrites.iter().map(String::as_str)) {
            for hit in self.search(query).await? {
                match best.get_mut(&hit.id) {
                    Some(score) => {
                        if hit.score > *score {
                            *score = hit.score;
                        }
                    }
                    None => {
                        order.push(hit.id.clone());
                        best.insert(hit.id, hit.score);
                    }
                }
            }
        }
        let mut union: Vec<RankedHit> = order
            .into_iter()
            .map(|id| {
                let score = best.get(&id).copied().unwrap_or_default();
                RankedHit { id, score }
            })
            .collect();
        union.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        Ok(union)
    }
}

/// Dense-only output: the dense backend's own ranking, untouched.
fn pass_through(dense_hits: Vec<grimoire_core::types::SearchHit>) -> Vec<RankedHit> {
    dense_hits.into_iter().map(|h| RankedHit { id: h.id, score: h.score }).collect()
}
