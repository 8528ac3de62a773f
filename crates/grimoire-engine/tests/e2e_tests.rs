//! End-to-end retrieval over the real backends: a LanceDB dense index in a
//! temp dir, the in-RAM tantivy sparse index, and a transparent
//! keyword-overlap embedder so rankings are easy to reason about.

use std::sync::Arc;

use async_trait::async_trait;

use grimoire_core::config::RetrievalConfig;
use grimoire_core::traits::{ChatModel, Embedder, SessionStore, VectorIndex};
use grimoire_core::types::{Fragment, Meta, Turn};
use grimoire_engine::{InMemorySessionStore, QueryExpander, RetrievalEngine, RulesOracle};
use grimoire_ingest::normalize::{Normalizer, SourceCollection};
use grimoire_ingest::FragmentStore;
use grimoire_text::SparseTextIndex;
use grimoire_vector::LanceDenseIndex;

/// Embeds text as an L2-normalized bag-of-keywords indicator vector over a
/// fixed vocabulary. Cosine similarity is then exactly scaled token
/// overlap.
struct KeywordEmbedder {
    vocab: Vec<&'static str>,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            vocab: vec![
                "fire", "damage", "spell", "fireball", "deals", "8d6", "8d8", "ice", "storm",
                "cold", "level", "evocation",
            ],
        }
    }
}

impl Embedder for KeywordEmbedder {
    fn dim(&self) -> usize {
        self.vocab.len()
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0f32; self.vocab.len()];
                let lowered = text.to_lowercase();
                for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty())
                {
                    if let Some(i) = self.vocab.iter().position(|w| *w == token) {
                        v[i] += 1.0;
                    }
                }
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
                for x in &mut v {
                    *x /= norm;
                }
                v
            })
            .collect())
    }
}

fn two_spell_store() -> FragmentStore {
    let mut store = FragmentStore::new();
    let mut fireball_meta = Meta::new();
    fireball_meta.insert("name".to_string(), "Fireball".to_string());
    store.push(Fragment {
        id: "spells:fireball".to_string(),
        content: "Fireball deals 8d6 fire damage".to_string(),
        metadata: fireball_meta,
        ordinal: 0,
    });
    let mut ice_meta = Meta::new();
    ice_meta.insert("name".to_string(), "Ice Storm".to_string());
    store.push(Fragment {
        id: "spells:ice-storm".to_string(),
        content: "Ice Storm deals cold damage".to_string(),
        metadata: ice_meta,
        ordinal: 0,
    });
    store
}

async fn build_dense(
    dir: &std::path::Path,
    store: &FragmentStore,
    embedder: &dyn Embedder,
) -> anyhow::Result<LanceDenseIndex> {
    let index = LanceDenseIndex::open(dir, "rulebook", embedder.dim()).await?;
    let texts: Vec<String> = store.fragments().iter().map(|f| f.content.clone()).collect();
    let embeddings = embedder.embed_batch(&texts)?;
    index.add(store.fragments(), &embeddings).await?;
    Ok(index)
}

#[tokio::test]
async fn dense_only_ranks_fireball_first_for_fire_damage() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = two_spell_store();
    let embedder = KeywordEmbedder::new();
    let dense = build_dense(tmp.path(), &store, &embedder).await?;

    let cfg = RetrievalConfig {
        dense_k: 1,
        sparse_k: 0,
        dense_weight: 1.0,
        sparse_weight: 0.0,
        rewrite_count: 0,
    };
    let engine = RetrievalEngine::new(Box::new(KeywordEmbedder::new()), Box::new(dense), None, cfg);

    let results = engine.search("fire damage spell").await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "spells:fireball");
    Ok(())
}

#[tokio::test]
async fn hybrid_search_over_real_backends() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = two_spell_store();
    let embedder = KeywordEmbedder::new();
    let dense = build_dense(tmp.path(), &store, &embedder).await?;
    let sparse = SparseTextIndex::build(store.fragments())?;

    let cfg = RetrievalConfig {
        dense_k: 5,
        sparse_k: 5,
        dense_weight: 0.6,
        sparse_weight: 0.4,
        rewrite_count: 0,
    };
    let engine = RetrievalEngine::new(
        Box::new(KeywordEmbedder::new()),
        Box::new(dense),
        Some(Box::new(sparse)),
        cfg,
    );

    let results = engine.search("fire damage").await?;
    assert!(!results.is_empty());
    assert_eq!(results[0].id, "spells:fireball", "both backends agree on fireball");

    // determinism over the full stack
    let first: Vec<String> = results.into_iter().map(|h| h.id).collect();
    for _ in 0..5 {
        let again: Vec<String> =
            engine.search("fire damage").await?.into_iter().map(|h| h.id).collect();
        assert_eq!(first, again);
    }
    Ok(())
}

#[tokio::test]
async fn superseded_edition_never_reaches_the_indexes() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let normalizer = Normalizer::new(vec!["2014".to_string(), "2024".to_string()]);
    let fragments = normalizer.merge(&[
        SourceCollection {
            edition: "2014".to_string(),
            records: vec![serde_json::json!({
                "category": "spells", "name": "Fireball", "level": 3, "desc": "deals 8d6 fire damage"
            })],
        },
        SourceCollection {
            edition: "2024".to_string(),
            records: vec![serde_json::json!({
                "category": "spells", "name": "Fireball", "level": 3, "desc": "deals 8d8 fire damage"
            })],
        },
    ]);
    let mut store = FragmentStore::new();
    store.extend(fragments);
    assert_eq!(store.len(), 1);

    let embedder = KeywordEmbedder::new();
    let dense = build_dense(tmp.path(), &store, &embedder).await?;
    assert_eq!(dense.count().await?, 1);

    let cfg = RetrievalConfig {
        dense_k: 5,
        sparse_k: 5,
        dense_weight: 0.6,
        sparse_weight: 0.4,
        rewrite_count: 0,
    };
    let sparse = SparseTextIndex::build(store.fragments())?;
    let engine = RetrievalEngine::new(
        Box::new(KeywordEmbedder::new()),
        Box::new(dense),
        Some(Box::new(sparse)),
        cfg,
    );
    let results = engine.search("fireball fire damage").await?;
    assert_eq!(results.len(), 1);
    let fragment = store.get(&results[0].id).expect("indexed fragment resolves");
    assert!(fragment.content.contains("8d8"), "only the 2024 text was indexed");
    assert!(!fragment.content.contains("8d6"));
    Ok(())
}

struct ScriptedChat {
    reply: String,
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, _prompt: &str, _history: &[Turn]) -> anyhow::Result<String> {
        Ok(self.reply.clone())
    }
}

#[tokio::test]
async fn oracle_answers_over_the_full_stack() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = two_spell_store();
    let embedder = KeywordEmbedder::new();
    let dense = build_dense(tmp.path(), &store, &embedder).await?;
    let sparse = SparseTextIndex::build(store.fragments())?;

    let cfg = RetrievalConfig {
        dense_k: 5,
        sparse_k: 5,
        dense_weight: 0.6,
        sparse_weight: 0.4,
        rewrite_count: 2,
    };
    let engine = RetrievalEngine::new(
        Box::new(KeywordEmbedder::new()),
        Box::new(dense),
        Some(Box::new(sparse)),
        cfg,
    );
    let rewriter = Arc::new(ScriptedChat { reply: "Which spells deal fire damage?".to_string() });
    let answerer = Arc::new(ScriptedChat { reply: "Fireball deals 8d6 fire damage.".to_string() });
    let sessions = Arc::new(InMemorySessionStore::new());
    let oracle = RulesOracle::new(
        engine,
        QueryExpander::new(rewriter, 2),
        answerer,
        sessions.clone() as Arc<dyn SessionStore>,
        store,
    );

    let retrieved = oracle.retrieve("fire damage spell").await?;
    assert!(retrieved.iter().any(|r| r.fragment.id == "spells:fireball"));

    let answer = oracle.ask("how much damage does fireball deal?", "table-1").await?;
    assert_eq!(answer, "Fireball deals 8d6 fire damage.");
    assert_eq!(sessions.history("table-1").len(), 2);
    Ok(())
}
