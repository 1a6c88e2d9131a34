//! Configuration loading, validation, and management for Kotodama.
//!
//! Loads configuration from `~/.kotodama/config.toml` (or an explicit path)
//! with environment variable overrides. The LINE channel credentials and the
//! LLM API key are required: [`AppConfig::require_secrets`] reports the first
//! one that is missing so the process refuses to start instead of failing on
//! the first webhook delivery.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable names read at startup.
pub mod env {
    pub const CHANNEL_ACCESS_TOKEN: &str = "CHANNEL_ACCESS_TOKEN";
    pub const CHANNEL_SECRET: &str = "CHANNEL_SECRET";
    pub const LINE_API_BASE: &str = "LINE_API_BASE";
    pub const API_KEY: &str = "KOTODAMA_API_KEY";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const BASE_URL: &str = "KOTODAMA_BASE_URL";
    pub const MODEL: &str = "KOTODAMA_MODEL";
    pub const PERSONA_FILE: &str = "KOTODAMA_PERSONA_FILE";
    pub const PORT: &str = "PORT";
}

/// The root configuration structure.
///
/// Maps directly to `~/.kotodama/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LINE Messaging API channel settings
    #[serde(default)]
    pub line: LineConfig,

    /// LLM endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Model parameters, fixed for the process lifetime
    #[serde(default)]
    pub model: ModelConfig,

    /// Retry policy for the completion call
    #[serde(default)]
    pub retry: RetryConfig,

    /// History truncation policy
    #[serde(default)]
    pub history: HistoryConfig,

    /// Session keying
    #[serde(default)]
    pub session: SessionConfig,

    /// Reset command
    #[serde(default)]
    pub reset: ResetConfig,

    /// Persona prompt source
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Reply sent when the completion call fails
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Reply sent when a completion fails and no other text is configured.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "ごめんなさい、うまくお返事できませんでした。もう一度話しかけてください。";

fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            line: LineConfig::default(),
            provider: ProviderConfig::default(),
            model: ModelConfig::default(),
            retry: RetryConfig::default(),
            history: HistoryConfig::default(),
            session: SessionConfig::default(),
            reset: ResetConfig::default(),
            persona: PersonaConfig::default(),
            fallback_reply: default_fallback_reply(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_secret: Option<String>,

    #[serde(default = "default_line_api_base")]
    pub api_base: String,

    /// Timeout for a single reply delivery
    #[serde(default = "default_line_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_line_api_base() -> String {
    "https://api.line.me".into()
}
fn default_line_timeout_secs() -> u64 {
    10
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            channel_secret: None,
            api_base: default_line_api_base(),
            timeout_secs: default_line_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for LineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineConfig")
            .field("channel_access_token", &redact(&self.channel_access_token))
            .field("channel_secret", &redact(&self.channel_secret))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-attempt timeout for the completion call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.4
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles after each further failure
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    2
}
fn default_initial_backoff_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Most recent stored turns forwarded to the model. 0 = unbounded.
    #[serde(default = "default_window_turns")]
    pub window_turns: usize,
}

fn default_window_turns() -> usize {
    6
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_turns: default_window_turns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_key")]
    pub key: String,
}

fn default_session_key() -> String {
    "default".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key: default_session_key(),
        }
    }
}

/// How much history the reset command clears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    /// Only the requesting session
    #[default]
    Session,
    /// Every stored session
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetConfig {
    #[serde(default = "default_reset_keyword")]
    pub keyword: String,

    #[serde(default = "default_reset_confirmation")]
    pub confirmation: String,

    #[serde(default)]
    pub scope: ResetScope,
}

fn default_reset_keyword() -> String {
    "リセット".into()
}
fn default_reset_confirmation() -> String {
    "会話をリセットしました。".into()
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            keyword: default_reset_keyword(),
            confirmation: default_reset_confirmation(),
            scope: ResetScope::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Persona prompt file; the bundled persona is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum accepted webhook body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.kotodama/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&Self::config_dir().join("config.toml"), |name| {
            std::env::var(name).ok()
        })
    }

    /// Load configuration from a specific file path, then apply environment
    /// overrides.
    pub fn load_path(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Load from `path` and apply overrides from `lookup`.
    ///
    /// `lookup` stands in for the process environment so the precedence
    /// rules can be exercised without touching global state.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from(path)?;
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, without env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Environment variables take precedence over the file.
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(env::CHANNEL_ACCESS_TOKEN) {
            self.line.channel_access_token = Some(token);
        }
        if let Some(secret) = non_empty(env::CHANNEL_SECRET) {
            self.line.channel_secret = Some(secret);
        }
        if let Some(base) = non_empty(env::LINE_API_BASE) {
            self.line.api_base = base;
        }
        if let Some(key) = non_empty(env::API_KEY).or_else(|| non_empty(env::OPENAI_API_KEY)) {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = non_empty(env::BASE_URL) {
            self.provider.base_url = url;
        }
        if let Some(model) = non_empty(env::MODEL) {
            self.model.name = model;
        }
        if let Some(file) = non_empty(env::PERSONA_FILE) {
            self.persona.file = Some(PathBuf::from(file));
        }
        if let Some(port) = non_empty(env::PORT) {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("{} must be a port number, got {port:?}", env::PORT))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".kotodama")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.temperature < 0.0 || self.model.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "provider.timeout_secs must be > 0".into(),
            ));
        }

        if self.line.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "line.timeout_secs must be > 0".into(),
            ));
        }

        if self.reset.keyword.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "reset.keyword must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check that every secret the webhook server needs is present.
    pub fn require_secrets(&self) -> Result<(), ConfigError> {
        if self.line.channel_access_token.is_none() {
            return Err(ConfigError::Missing {
                name: env::CHANNEL_ACCESS_TOKEN,
            });
        }
        if self.line.channel_secret.is_none() {
            return Err(ConfigError::Missing {
                name: env::CHANNEL_SECRET,
            });
        }
        self.require_api_key()
    }

    /// Check that the LLM API key is present.
    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        if self.provider.api_key.is_none() {
            return Err(ConfigError::Missing {
                name: env::OPENAI_API_KEY,
            });
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Required setting {name} is not set")]
    Missing { name: &'static str },
}
