//! `kotodama serve` — Start the LINE webhook server.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    // Refuse to start without every secret
    config.require_secrets()?;

    println!("Kotodama");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model.name);
    println!("   Webhook:   POST /callback");

    kotodama_gateway::start(config).await?;

    Ok(())
}
