//! `kotodama check` — Report which required settings are present.

use std::path::Path;

use kotodama_channels::line::{LineChannel, LineConfig};
use kotodama_config::env;
use kotodama_core::Channel;

pub async fn run(config_path: Option<&Path>, probe: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Kotodama — configuration check");
    println!("==============================\n");

    let config = super::load_config(config_path)?;
    println!("  ✅ Config loaded and valid");

    let required = [
        (env::CHANNEL_ACCESS_TOKEN, config.line.channel_access_token.is_some()),
        (env::CHANNEL_SECRET, config.line.channel_secret.is_some()),
        (env::OPENAI_API_KEY, config.provider.api_key.is_some()),
    ];

    let mut missing = 0;
    for (name, present) in required {
        if present {
            println!("  ✅ {name}");
        } else {
            println!("  ❌ {name} is not set");
            missing += 1;
        }
    }

    println!();
    println!("  Endpoint:  {}", config.provider.base_url);
    println!("  Model:     {} (temperature {})", config.model.name, config.model.temperature);
    match &config.persona.file {
        Some(file) => println!("  Persona:   {}", file.display()),
        None => println!("  Persona:   built-in"),
    }
    match config.history.window_turns {
        0 => println!("  History:   unbounded"),
        n => println!("  History:   last {n} turns"),
    }

    if probe {
        println!();
        match kotodama_providers::build_from_config(&config) {
            Ok(provider) => match provider.health_check().await {
                Ok(true) => {
                    println!("  ✅ LLM endpoint reachable");
                    if let Ok(models) = provider.list_models().await {
                        if models.iter().any(|m| m == &config.model.name) {
                            println!("  ✅ Model {} available", config.model.name);
                        } else if !models.is_empty() {
                            println!("  ⚠️  Model {} not listed by the endpoint", config.model.name);
                        }
                    }
                }
                Ok(false) => {
                    println!("  ❌ LLM endpoint rejected the request (check the API key)");
                    missing += 1;
                }
                Err(e) => {
                    println!("  ❌ LLM endpoint unreachable: {e}");
                    missing += 1;
                }
            },
            Err(e) => println!("  ⏭️  Skipping probe: {e}"),
        }

        match LineConfig::try_from(&config.line).and_then(LineChannel::new) {
            Ok(channel) => match channel.health_check().await {
                Ok(true) => println!("  ✅ LINE access token accepted"),
                Ok(false) => {
                    println!("  ❌ LINE rejected the channel access token");
                    missing += 1;
                }
                Err(e) => {
                    println!("  ❌ LINE API unreachable: {e}");
                    missing += 1;
                }
            },
            Err(e) => println!("  ⏭️  Skipping LINE probe: {e}"),
        }
    }

    println!();
    if missing == 0 {
        println!("  All checks passed.");
        Ok(())
    } else {
        Err(format!("{missing} check(s) failed").into())
    }
}
