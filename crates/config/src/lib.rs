//! Process configuration, read from environment variables once at startup.
//! Everything has a workable default so a bare `ticklist-server` starts.

use std::fs;

use rand::{Rng, distributions::Alphanumeric};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8080;

const HOST_ENV: &str = "HOST";
const BACKEND_PORT_ENV: &str = "BACKEND_PORT";
const PORT_ENV: &str = "PORT";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const TOKEN_SECRET_ENV: &str = "TICKLIST_TOKEN_SECRET";
const AI_API_KEY_ENV: &str = "TICKLIST_AI_API_KEY";
const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const AI_BASE_URL_ENV: &str = "TICKLIST_AI_BASE_URL";
const AI_MODEL_ENV: &str = "TICKLIST_AI_MODEL";

const TOKEN_SECRET_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Signing key for bearer tokens. Stable across restarts so issued
    /// tokens stay valid for their full lifetime.
    pub token_secret: String,
    pub insights: InsightsConfig,
}

/// Raw AI settings. Defaults for the optional fields live with the
/// insights client, not here.
#[derive(Debug, Clone, Default)]
pub struct InsightsConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_nonempty(HOST_ENV).unwrap_or_else(|| "127.0.0.1".to_string()),
            port: read_port(),
            database_url: read_database_url(),
            token_secret: load_token_secret()?,
            insights: InsightsConfig::from_env(),
        })
    }
}

impl InsightsConfig {
    fn from_env() -> Self {
        Self {
            api_key: env_nonempty(AI_API_KEY_ENV)
                .or_else(|| env_nonempty(ANTHROPIC_API_KEY_ENV)),
            base_url: env_nonempty(AI_BASE_URL_ENV),
            model: env_nonempty(AI_MODEL_ENV),
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_port() -> u16 {
    let Some(raw) = env_nonempty(BACKEND_PORT_ENV).or_else(|| env_nonempty(PORT_ENV)) else {
        return DEFAULT_PORT;
    };

    match raw.parse::<u16>() {
        Ok(port) => port,
        Err(err) => {
            tracing::warn!(value = raw, error = %err, "Invalid port; using default");
            DEFAULT_PORT
        }
    }
}

fn read_database_url() -> String {
    if let Some(url) = env_nonempty(DATABASE_URL_ENV) {
        return url;
    }

    format!(
        "sqlite://{}?mode=rwc",
        utils::assets::db_path().to_string_lossy()
    )
}

/// The env var wins; otherwise the secret persisted in the asset directory
/// is used, generating one on first run.
fn load_token_secret() -> Result<String, ConfigError> {
    if let Some(secret) = env_nonempty(TOKEN_SECRET_ENV) {
        return Ok(secret);
    }

    let path = utils::assets::token_secret_path();
    if path.exists() {
        let secret = fs::read_to_string(&path)?.trim().to_string();
        if secret.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Token secret file {} is empty",
                path.display()
            )));
        }
        return Ok(secret);
    }

    let secret = generate_token_secret();
    fs::write(&path, &secret)?;
    tracing::info!("Generated token secret at {}", path.display());
    Ok(secret)
}

fn generate_token_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_SECRET_LEN)
        .map(char::from)
        .collect()
}
