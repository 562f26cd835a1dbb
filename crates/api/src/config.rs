//! Application configuration loaded from environment variables.

use gateway::ServiceCredentials;
use thiserror::Error;

/// Configuration failures that prevent startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is absent or empty.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Server configuration.
///
/// Required environment variables (startup fails without them):
/// - `PLATFORM_BOT_TOKEN` — service credential for bot-authorized calls
/// - `PLATFORM_CLIENT_ID` — OAuth client identifier
/// - `PLATFORM_CLIENT_SECRET` — OAuth client secret
///
/// Optional:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `PUBLIC_BASE_URL` — externally reachable base for the OAuth
///   redirect (default: `http://localhost:<port>`)
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = required("PLATFORM_BOT_TOKEN")?;
        let client_id = required("PLATFORM_CLIENT_ID")?;
        let client_secret = required("PLATFORM_CLIENT_SECRET")?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        Ok(Self {
            bot_token,
            client_id,
            client_secret,
            host,
            port,
            public_base_url,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the OAuth redirect URI registered with the platform.
    pub fn redirect_uri(&self) -> String {
        format!("{}/callback", self.public_base_url.trim_end_matches('/'))
    }

    /// Builds the credential bundle the gateway needs.
    pub fn credentials(&self) -> ServiceCredentials {
        ServiceCredentials {
            bot_token: self.bot_token.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri(),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}
