use grimoire_core::config::EmbeddingConfig;
use grimoire_core::traits::Embedder;
use grimoire_embed::{embedder_from_config, HashingEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[test]
fn hashing_embedder_shapes_and_determinism() {
    let embedder = HashingEmbedder::new(384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384);
    assert_eq!(embedder.dim(), 384);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn shared_tokens_mean_higher_similarity() {
    let embedder = HashingEmbedder::new(384);
    let embs = embedder
        .embed_batch(&[
            "fire damage from a fireball".to_string(),
            "the spell deals fire damage".to_string(),
            "grappling and shoving in melee".to_string(),
        ])
        .expect("embed_batch");
    let same_topic = cosine(&embs[0], &embs[1]);
    let off_topic = cosine(&embs[0], &embs[2]);
    assert!(
        same_topic > off_topic,
        "token overlap should dominate: {same_topic} vs {off_topic}"
    );
}

#[test]
fn tokenization_ignores_case_and_punctuation() {
    let embedder = HashingEmbedder::new(128);
    let embs = embedder
        .embed_batch(&["Fireball, deals damage!".to_string(), "fireball deals damage".to_string()])
        .expect("embed_batch");
    let sim = cosine(&embs[0], &embs[1]);
    assert!((sim - 1.0).abs() < 1e-5);
}

#[test]
fn factory_honors_fake_embeddings_env() {
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");
    let cfg = EmbeddingConfig::default();
    let embedder = embedder_from_config(&cfg).expect("embedder");
    assert_eq!(embedder.dim(), cfg.dimension);
    let embs = embedder.embed_batch(&["opportunity attack".to_string()]).expect("embed");
    assert_eq!(embs[0].len(), cfg.dimension);
}
