use std::env;

use anyhow::Result;

use grimoire_cli::{build_serving_context, init_tracing};
use grimoire_core::config::AppConfig;

fn parse_args() -> (bool, String) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    let dense_only = if let Some(pos) = args.iter().position(|a| a == "--dense-only") {
        args.remove(pos);
        true
    } else {
        false
    };
    if args.is_empty() {
        eprintln!("Usage: grimoire-search [--dense-only] \"<query>\"");
        std::process::exit(1);
    }
    (dense_only, args.join(" "))
}

fn main() -> Result<()> {
    init_tracing();
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let (dense_only, query) = parse_args();
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(&config, dense_only, &query))
}

async fn run(config: &AppConfig, dense_only: bool, query: &str) -> Result<()> {
    let ctx = build_serving_context(config, !dense_only).await?;
    let results = ctx.engine.search(query).await?;
    if results.is_empty() {
        println!("No fragments matched '{query}'.");
        return Ok(());
    }
    println!("🔍 {} results for '{query}':\n", results.len());
    for (i, hit) in results.iter().enumerate() {
        let Some(fragment) = ctx.store.get(&hit.id) else {
            continue;
        };
        let name = fragment
            .metadata
            .get("name")
            .or_else(|| fragment.metadata.get("section"))
            .map(String::as_str)
            .unwrap_or(&hit.id);
        println!("{:2}. [{:.4}] {} ({})", i + 1, hit.score, name, hit.id);
        println!("    {}", snippet(&fragment.content, 160));
    }
    Ok(())
}

fn snippet(content: &str, max_chars: usize) -> String {
    let one_line: String = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if one_line.chars().count() <= max_chars {
        return one_line;
    }
    let cut: String = one_line.chars().take(max_chars).collect();
    format!("{cut}…")
}
