//! `kotodama chat` — Interactive or single-message chat with the persona.
//!
//! Runs the same bot pipeline as the webhook server, reset keyword included,
//! with stdin/stdout in place of LINE.

use std::path::Path;
use std::sync::Arc;

use kotodama_agent::ChatBot;
use kotodama_config::AppConfig;
use kotodama_core::message::SessionKey;
use kotodama_memory::InMemorySessionStore;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    // Fail early with setup instructions when no key is set
    if config.require_api_key().is_err() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY=sk-...      (for OpenAI direct)");
        eprintln!("    KOTODAMA_API_KEY=...       (any OpenAI-compatible endpoint)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = kotodama_providers::build_from_config(&config)?;
    let store = Arc::new(InMemorySessionStore::new());
    let bot = ChatBot::from_config(&config, provider, store)?;
    let key = SessionKey::new(&config.session.key);

    if let Some(msg) = message {
        // Single message mode
        let reply = bot.handle(&key, &msg).await;
        println!("{}", reply.text);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Kotodama — Interactive Mode");
    println!();
    println!("  Model:     {}", config.model.name);
    println!("  Session:   {key}");
    println!("  Type '{}' to clear the conversation.", bot.reset_keyword());
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    use std::io::Write;
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input == "exit" || input == "quit" {
            break;
        }
        if !input.is_empty() {
            eprint!("  ...");
            let reply = bot.handle(&key, input).await;
            eprint!("\r     \r");
            println!();
            for line in reply.text.lines() {
                println!("  Bot > {line}");
            }
            println!();
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
