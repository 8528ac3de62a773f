use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use grimoire_core::config::{expand_path, AppConfig};
use grimoire_core::traits::VectorIndex;
use grimoire_embed::embedder_from_config;
use grimoire_ingest::normalize::{override_fragments, OverrideFragment};
use grimoire_ingest::{BookChunker, FragmentStore, Normalizer, SourceCollection};
use grimoire_vector::LanceDenseIndex;

const EMBED_BATCH_SIZE: usize = 256;

fn main() -> Result<()> {
    grimoire_cli::init_tracing();
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(&config))
}

async fn run(config: &AppConfig) -> Result<()> {
    println!("🔮 Building the grimoire from configured sources");
    let mut store = FragmentStore::new();

    // structured records, merged under explicit edition precedence
    if !config.data.records.is_empty() {
        let mut collections = Vec::new();
        for source in &config.data.records {
            let path = expand_path(&source.path);
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read record collection {}", path.display()))?;
            let records: Vec<serde_json::Value> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of records", path.display()))?;
            println!("📂 {}: {} records from {}", source.edition, records.len(), path.display());
            collections.push(SourceCollection { edition: source.edition.clone(), records });
        }
        let normalizer = Normalizer::new(config.data.edition_order.clone());
        store.extend(normalizer.merge(&collections));
        println!("✅ {} fragments after edition merge", store.len());
    }

    // plain-text rulebooks
    let books_dir = config.books_dir();
    if books_dir.exists() {
        let chunker = BookChunker::new(&config.chunking);
        let before = store.len();
        store.extend(chunker.load_dir(&books_dir)?);
        println!("📖 {} fragments from books under {}", store.len() - before, books_dir.display());
    }

    // manual overrides, appended unconditionally
    if let Some(path) = &config.data.overrides_path {
        let path = expand_path(path);
        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let entries: Vec<OverrideFragment> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of overrides", path.display()))?;
            let count = entries.len();
            store.extend(override_fragments(entries));
            println!("✍️  {count} override fragments appended");
        }
    }

    anyhow::ensure!(!store.is_empty(), "no fragments produced; check [data] sources in config.toml");

    let fragments_path = config.fragments_path();
    store.save(&fragments_path)?;
    println!("💾 {} fragments written to {}", store.len(), fragments_path.display());

    // dense index, embedded and written in bounded batches
    let embedder = embedder_from_config(&config.embedding)?;
    let dense = LanceDenseIndex::open(
        &config.lancedb_dir(),
        &config.data.table,
        config.embedding.dimension,
    )
    .await?;
    let pb = ProgressBar::new(store.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} fragments ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    for batch in store.fragments().chunks(EMBED_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|f| f.content.clone()).collect();
        let embeddings = embedder.embed_batch(&texts)?;
        dense.add(batch, &embeddings).await?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("dense index built");
    println!(
        "📊 Indexed {} fragments into LanceDB table '{}' at {}",
        store.len(),
        config.data.table,
        config.lancedb_dir().display()
    );
    println!("The sparse index is rebuilt from the fragment store at serve time.");
    Ok(())
}
