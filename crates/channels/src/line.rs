//! LINE Messaging API channel adapter.
//!
//! Inbound: LINE POSTs a JSON body of events to the webhook endpoint and signs
//! it with `X-Line-Signature: base64(HMAC-SHA256(channel_secret, body))`.
//! Outbound: each text event is answered through the reply endpoint using the
//! single-use reply token carried by the event.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use kotodama_core::channel::{Channel, ChannelId, InboundEvent};
use kotodama_core::error::ChannelError;
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Name of the header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// LINE rejects text messages longer than this many characters.
pub const MAX_TEXT_CHARS: usize = 5000;

/// LINE channel configuration.
#[derive(Clone)]
pub struct LineConfig {
    /// Channel secret used to verify webhook signatures
    pub channel_secret: String,
    /// Long-lived channel access token used for replies
    pub channel_access_token: String,
    /// Messaging API base URL
    pub api_base: String,
    /// Timeout for each outbound API call
    pub timeout: Duration,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_secret: String::new(),
            channel_access_token: String::new(),
            api_base: "https://api.line.me".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConfig")
            .field("channel_secret", &"[REDACTED]")
            .field("channel_access_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TryFrom<&kotodama_config::LineConfig> for LineConfig {
    type Error = ChannelError;

    fn try_from(config: &kotodama_config::LineConfig) -> Result<Self, Self::Error> {
        let channel_secret = config
            .channel_secret
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ChannelError::NotConfigured("LINE channel secret is not set".into()))?;
        let channel_access_token = config
            .channel_access_token
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ChannelError::NotConfigured("LINE channel access token is not set".into())
            })?;

        Ok(Self {
            channel_secret,
            channel_access_token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

/// LINE channel adapter.
pub struct LineChannel {
    config: LineConfig,
    channel_id: ChannelId,
    client: reqwest::Client,
}

impl LineChannel {
    pub fn new(config: LineConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChannelError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            config,
            channel_id: ChannelId("line".into()),
            client,
        })
    }

    /// Compute the base64 signature LINE would send for `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        sign_body(&self.config.channel_secret, body)
    }
}

/// base64(HMAC-SHA256(secret, body)).
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Cut `text` to at most [`MAX_TEXT_CHARS`] characters on a char boundary.
pub fn truncate_for_reply(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Channel for LineChannel {
    fn name(&self) -> &str {
        "line"
    }

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    fn verify_signature(&self, body: &[u8], signature: &str) -> Result<(), ChannelError> {
        let invalid = || ChannelError::SignatureInvalid {
            channel: "line".into(),
        };

        if self.config.channel_secret.is_empty() {
            return Err(ChannelError::NotConfigured(
                "LINE channel secret is not set".into(),
            ));
        }

        let provided = BASE64.decode(signature.trim()).map_err(|_| invalid())?;

        let mut mac = HmacSha256::new_from_slice(self.config.channel_secret.as_bytes())
            .map_err(|_| invalid())?;
        mac.update(body);

        // Constant-time comparison via `verify_slice`
        mac.verify_slice(&provided).map_err(|_| invalid())
    }

    fn parse_events(&self, body: &[u8]) -> Result<Vec<InboundEvent>, ChannelError> {
        let payload: WebhookPayload = serde_json::from_slice(body)
            .map_err(|e| ChannelError::InvalidPayload(e.to_string()))?;

        let total = payload.events.len();
        let events: Vec<InboundEvent> = payload
            .events
            .into_iter()
            .filter_map(|event| {
                if event.kind != "message" {
                    return None;
                }
                let message = event.message?;
                if message.kind != "text" {
                    return None;
                }
                Some(InboundEvent {
                    channel_id: self.channel_id.clone(),
                    reply_token: event.reply_token?,
                    text: message.text?,
                    user_id: event.source.and_then(|s| s.user_id),
                })
            })
            .collect();

        debug!(total, text_events = events.len(), "Parsed LINE webhook");
        Ok(events)
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), ChannelError> {
        let url = format!("{}/v2/bot/message/reply", self.config.api_base);
        let text = truncate_for_reply(text);
        let body = serde_json::json!({
            "replyToken": reply_token,
            "messages": [{ "type": "text", "text": text }],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.channel_access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: "line".into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %detail, "LINE reply rejected");
            return Err(ChannelError::DeliveryFailed {
                channel: "line".into(),
                reason: format!("HTTP {}: {detail}", status.as_u16()),
            });
        }

        info!(chars = text.chars().count(), "LINE reply delivered");
        Ok(())
    }

    /// Ask the bot-info endpoint whether the access token is accepted.
    async fn health_check(&self) -> Result<bool, ChannelError> {
        if self.config.channel_secret.is_empty() || self.config.channel_access_token.is_empty() {
            return Ok(false);
        }

        let url = format!("{}/v2/bot/info", self.config.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.channel_access_token)
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: "line".into(),
                reason: e.to_string(),
            })?;

        Ok(response.status().is_success())
    }
}

// --- LINE webhook payload (internal) ---

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    reply_token: Option<String>,
    source: Option<EventSource>,
    message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSource {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
    };
    use std::sync::{Arc, Mutex};

    const SECRET: &str = "test-channel-secret";

    fn channel_at(api_base: &str) -> LineChannel {
        LineChannel::new(LineConfig {
            channel_secret: SECRET.into(),
            channel_access_token: "test-token".into(),
            api_base: api_base.into(),
            ..LineConfig::default()
        })
        .unwrap()
    }

    fn channel() -> LineChannel {
        channel_at("http://127.0.0.1:9")
    }

    const TEXT_EVENT: &str = r#"{
        "destination": "Uxxxxxxxx",
        "events": [{
            "type": "message",
            "replyToken": "reply-1",
            "source": {"type": "user", "userId": "U123"},
            "timestamp": 1700000000000,
            "mode": "active",
            "message": {"id": "1", "type": "text", "text": "こんにちは"}
        }]
    }"#;

    #[test]
    fn valid_signature_accepted() {
        let ch = channel();
        let sig = sign_body(SECRET, TEXT_EVENT.as_bytes());
        assert!(ch.verify_signature(TEXT_EVENT.as_bytes(), &sig).is_ok());
    }

    #[test]
    fn tampered_body_rejected() {
        let ch = channel();
        let sig = sign_body(SECRET, TEXT_EVENT.as_bytes());
        let tampered = TEXT_EVENT.replace("こんにちは", "さようなら");
        assert!(matches!(
            ch.verify_signature(tampered.as_bytes(), &sig),
            Err(ChannelError::SignatureInvalid { .. })
        ));
    }

    #[test]
    fn wrong_secret_rejected() {
        let ch = channel();
        let sig = sign_body("other-secret", TEXT_EVENT.as_bytes());
        assert!(ch.verify_signature(TEXT_EVENT.as_bytes(), &sig).is_err());
    }

    #[test]
    fn garbage_signature_rejected() {
        let ch = channel();
        assert!(ch.verify_signature(b"{}", "not base64!!").is_err());
        assert!(ch.verify_signature(b"{}", "").is_err());
    }

    #[test]
    fn unconfigured_secret_never_verifies() {
        let ch = LineChannel::new(LineConfig::default()).unwrap();
        let sig = sign_body("", b"{}");
        assert!(matches!(
            ch.verify_signature(b"{}", &sig),
            Err(ChannelError::NotConfigured(_))
        ));
    }

    #[test]
    fn parses_text_message() {
        let events = channel().parse_events(TEXT_EVENT.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reply_token, "reply-1");
        assert_eq!(events[0].text, "こんにちは");
        assert_eq!(events[0].user_id.as_deref(), Some("U123"));
        assert_eq!(events[0].channel_id, ChannelId("line".into()));
    }

    #[test]
    fn skips_non_text_events() {
        let body = r#"{"events": [
            {"type": "follow", "replyToken": "r0", "source": {"userId": "U1"}},
            {"type": "message", "replyToken": "r1", "message": {"type": "sticker", "packageId": "1", "stickerId": "2"}},
            {"type": "message", "replyToken": "r2", "message": {"type": "text", "text": "hi"}},
            {"type": "unsend", "source": {"userId": "U1"}}
        ]}"#;
        let events = channel().parse_events(body.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reply_token, "r2");
        assert!(events[0].user_id.is_none());
    }

    #[test]
    fn verification_ping_has_no_events() {
        let events = channel()
            .parse_events(br#"{"destination": "U0", "events": []}"#)
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn malformed_json_is_invalid_payload() {
        assert!(matches!(
            channel().parse_events(b"{not json"),
            Err(ChannelError::InvalidPayload(_))
        ));
    }

    #[test]
    fn receive_verifies_before_parsing() {
        let ch = channel();
        assert!(ch.receive(TEXT_EVENT.as_bytes(), "AAAA").is_err());
        let sig = ch.sign(TEXT_EVENT.as_bytes());
        assert_eq!(ch.receive(TEXT_EVENT.as_bytes(), &sig).unwrap().len(), 1);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let short = "藍子";
        assert_eq!(truncate_for_reply(short), short);

        let long = "あ".repeat(MAX_TEXT_CHARS + 10);
        let cut = truncate_for_reply(&long);
        assert_eq!(cut.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn from_app_config_requires_both_secrets() {
        let mut app = kotodama_config::LineConfig::default();
        app.channel_secret = Some("s".into());
        assert!(LineConfig::try_from(&app).is_err());

        app.channel_access_token = Some("t".into());
        app.timeout_secs = 3;
        let config = LineConfig::try_from(&app).unwrap();
        assert_eq!(config.api_base, "https://api.line.me");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(!format!("{config:?}").contains("\"t\""));
    }

    type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    async fn reply_server(status: axum::http::StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/v2/bot/message/reply",
                post(
                    move |State(captured): State<Captured>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        captured.lock().unwrap().push((auth, body));
                        (status, "{}")
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    #[tokio::test]
    async fn reply_posts_text_message() {
        let (base, captured) = reply_server(axum::http::StatusCode::OK).await;
        let ch = channel_at(&base);

        ch.reply("reply-1", "ふふっ").await.unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let (auth, body) = &captured[0];
        assert_eq!(auth.as_deref(), Some("Bearer test-token"));
        assert_eq!(body["replyToken"], "reply-1");
        assert_eq!(body["messages"][0]["type"], "text");
        assert_eq!(body["messages"][0]["text"], "ふふっ");
    }

    #[tokio::test]
    async fn reply_truncates_long_text() {
        let (base, captured) = reply_server(axum::http::StatusCode::OK).await;
        let ch = channel_at(&base);

        ch.reply("r", &"x".repeat(6000)).await.unwrap();

        let captured = captured.lock().unwrap();
        let text = captured[0].1["messages"][0]["text"].as_str().unwrap();
        assert_eq!(text.len(), MAX_TEXT_CHARS);
    }

    #[tokio::test]
    async fn rejected_reply_is_delivery_failure() {
        let (base, _) = reply_server(axum::http::StatusCode::BAD_REQUEST).await;
        let ch = channel_at(&base);

        match ch.reply("expired-token", "hi").await {
            Err(ChannelError::DeliveryFailed { channel, reason }) => {
                assert_eq!(channel, "line");
                assert!(reason.contains("400"));
            }
            other => panic!("expected DeliveryFailed, got {other:?}"),
        }
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn hung_reply_endpoint_times_out() {
        let base = serve(Router::new().route(
            "/v2/bot/message/reply",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "{}"
            }),
        ))
        .await;
        let ch = LineChannel::new(LineConfig {
            channel_secret: SECRET.into(),
            channel_access_token: "test-token".into(),
            api_base: base,
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        let started = std::time::Instant::now();
        let result = ch.reply("r", "hi").await;
        assert!(matches!(result, Err(ChannelError::DeliveryFailed { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn health_checks_access_token() {
        let base = serve(Router::new().route(
            "/v2/bot/info",
            get(|headers: HeaderMap| async move {
                let auth = headers.get("authorization").and_then(|v| v.to_str().ok());
                if auth == Some("Bearer test-token") {
                    (StatusCode::OK, r#"{"userId": "Ubot"}"#)
                } else {
                    (StatusCode::UNAUTHORIZED, "{}")
                }
            }),
        ))
        .await;

        assert!(channel_at(&base).health_check().await.unwrap());

        let revoked = LineChannel::new(LineConfig {
            channel_secret: SECRET.into(),
            channel_access_token: "revoked".into(),
            api_base: base,
            ..LineConfig::default()
        })
        .unwrap();
        assert!(!revoked.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn health_is_false_without_credentials() {
        let ch = LineChannel::new(LineConfig::default()).unwrap();
        assert!(!ch.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn health_reports_unreachable_api() {
        assert!(matches!(
            channel().health_check().await,
            Err(ChannelError::DeliveryFailed { .. })
        ));
    }
}
