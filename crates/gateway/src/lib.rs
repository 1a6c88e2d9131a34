//! HTTP gateway for Kotodama.
//!
//! Exposes the LINE webhook endpoint and a health check:
//!
//! - `GET /` — liveness probe, answers `It Works!`
//! - `POST /callback` — signed LINE webhook deliveries
//!
//! Built on Axum for high performance async HTTP.

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use kotodama_agent::ChatBot;
use kotodama_channels::line::{LineChannel, LineConfig, SIGNATURE_HEADER};
use kotodama_config::AppConfig;
use kotodama_core::channel::Channel;
use kotodama_core::error::{ChannelError, Error};
use kotodama_core::message::SessionKey;
use kotodama_memory::InMemorySessionStore;

/// Text served by the health route.
pub const HEALTH_TEXT: &str = "It Works!";

/// Shared application state for the gateway.
pub struct GatewayState {
    pub bot: Arc<ChatBot>,
    pub channel: Arc<dyn Channel>,
    pub session_key: SessionKey,
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, body_limit: usize) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/callback", post(callback_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Build provider, session store, bot and channel from configuration.
///
/// Every required secret must be present.
pub fn build_state(config: &AppConfig) -> kotodama_core::Result<GatewayState> {
    config.require_secrets().map_err(|e| Error::Config {
        message: e.to_string(),
    })?;

    let provider = kotodama_providers::build_from_config(config)?;
    let store = Arc::new(InMemorySessionStore::new());
    let bot = ChatBot::from_config(config, provider, store)?;
    let channel = LineChannel::new(LineConfig::try_from(&config.line)?)?;

    Ok(GatewayState {
        bot: Arc::new(bot),
        channel: Arc::new(channel),
        session_key: SessionKey::new(&config.session.key),
    })
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(build_state(&config)?);

    info!(
        model = %config.model.name,
        session = %state.session_key,
        window_turns = config.history.window_turns,
        "Bot ready"
    );

    let app = build_router(state, config.gateway.body_limit_bytes);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

async fn health_handler() -> &'static str {
    HEALTH_TEXT
}

async fn callback_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, StatusCode> {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Webhook rejected: missing signature header");
        return Err(StatusCode::BAD_REQUEST);
    };

    debug!(body = %String::from_utf8_lossy(&body), "Webhook body");

    let events = state
        .channel
        .receive(&body, signature)
        .map_err(|e| match e {
            ChannelError::SignatureInvalid { .. } | ChannelError::InvalidPayload(_) => {
                warn!(error = %e, "Webhook rejected");
                StatusCode::BAD_REQUEST
            }
            other => {
                error!(error = %other, "Webhook could not be processed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    info!(events = events.len(), "Webhook received");

    for event in events {
        let reply = state.bot.handle(&state.session_key, &event.text).await;
        debug!(kind = ?reply.kind, user = ?event.user_id, "Replying");

        if let Err(e) = state.channel.reply(&event.reply_token, &reply.text).await {
            warn!(error = %e, "Reply delivery failed");
        }
    }

    Ok("OK")
}
