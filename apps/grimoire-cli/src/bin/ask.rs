use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;

use grimoire_cli::{build_serving_context, init_tracing};
use grimoire_core::config::AppConfig;
use grimoire_core::traits::{ChatModel, SessionStore};
use grimoire_engine::{InMemorySessionStore, QueryExpander, RulesOracle};
use grimoire_llm::GeminiClient;

const SESSION_ID: &str = "console";

fn main() -> Result<()> {
    init_tracing();
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    // missing credentials are fatal before we serve a single query
    let chat = GeminiClient::from_config(&config.llm).map_err(|e| {
        eprintln!("Error: {e}");
        e
    })?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(&config, chat))
}

async fn run(config: &AppConfig, chat: GeminiClient) -> Result<()> {
    let ctx = build_serving_context(config, true).await?;
    let fragment_count = ctx.store.len();
    let dense_rows = ctx.dense_rows;
    let model_name = chat.model().to_string();

    let chat: Arc<dyn ChatModel> = Arc::new(chat);
    let sessions = Arc::new(InMemorySessionStore::new()) as Arc<dyn SessionStore>;
    let oracle = RulesOracle::new(
        ctx.engine,
        QueryExpander::new(chat.clone(), config.retrieval.rewrite_count),
        chat,
        sessions,
        ctx.store,
    );

    println!("🧙 Grimoire rules oracle");
    println!("========================");
    println!("✅ {fragment_count} fragments loaded, {dense_rows} dense rows, model {model_name}");
    println!();
    show_help();

    loop {
        print!("ask> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/help" | "/h" => show_help(),
            "/stats" => {
                println!("📊 fragments: {fragment_count}, dense rows: {dense_rows}, model: {model_name}");
            }
            "/quit" | "/q" | "/exit" => break,
            question => {
                println!("   (consulting the grimoire...)");
                // one failed query never takes down the loop
                match oracle.ask(question, SESSION_ID).await {
                    Ok(answer) => println!("\n📜 {answer}\n"),
                    Err(e) => println!("❌ {e:#}"),
                }
            }
        }
    }
    println!("Farewell, adventurer.");
    Ok(())
}

fn show_help() {
    println!("🎯 Commands:");
    println!("  /help     - Show this help message");
    println!("  /stats    - Show corpus statistics");
    println!("  /quit     - Exit");
    println!("  <question> - Ask about the rules");
    println!();
}
