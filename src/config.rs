//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string, or `memory` for the in-memory store
/// - `SESSION_SECRET` (required): HMAC key for session tokens
/// - `TWO_FACTOR_ENCRYPTION_KEY` (required): key material for encrypting TOTP secrets at rest
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `APP_URL` (optional): public base URL used for OAuth redirects
/// - `CRON_SECRET` (optional): bearer secret guarding the campaign dispatch endpoint
/// - `RESEND_API_KEY` (optional): transactional email API key; without it mail is only logged
/// - `SQUARE_*`, `GOOGLE_*`, `MICROSOFT_*` (optional): OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_app_url")]
    pub app_url: String,

    pub session_secret: String,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: i64,

    #[serde(default)]
    pub cookie_secure: bool,

    pub two_factor_encryption_key: String,

    /// Falls back to `session_secret` when unset.
    pub oauth_state_secret: Option<String>,

    pub cron_secret: Option<String>,

    pub resend_api_key: Option<String>,

    #[serde(default = "default_mail_from")]
    pub mail_from_address: String,

    pub square_client_id: Option<String>,
    pub square_client_secret: Option<String>,

    #[serde(default = "default_square_environment")]
    pub square_environment: String,

    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,

    pub microsoft_client_id: Option<String>,
    pub microsoft_client_secret: Option<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

/// One week.
fn default_session_ttl() -> i64 {
    60 * 24 * 7
}

fn default_mail_from() -> String {
    "campaigns@localhost".to_string()
}

fn default_square_environment() -> String {
    "sandbox".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or cannot be parsed.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    pub fn oauth_state_secret(&self) -> &str {
        self.oauth_state_secret
            .as_deref()
            .unwrap_or(&self.session_secret)
    }

    /// Absolute callback URL for an OAuth provider, e.g. `/api/integrations/square/oauth/callback`.
    pub fn callback_url(&self, path: &str) -> String {
        format!("{}{}", self.app_url.trim_end_matches('/'), path)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == "memory"
    }

    /// Configuration used by the test suite.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "memory".into(),
            server_port: 0,
            app_url: "http://app.test".into(),
            session_secret: "test-session-secret".into(),
            session_ttl_minutes: 60,
            cookie_secure: false,
            two_factor_encryption_key: "test-2fa-key".into(),
            oauth_state_secret: None,
            cron_secret: Some("cron-secret".into()),
            resend_api_key: None,
            mail_from_address: "campaigns@shopdesk.test".into(),
            square_client_id: None,
            square_client_secret: None,
            square_environment: "sandbox".into(),
            google_client_id: None,
            google_client_secret: None,
            microsoft_client_id: None,
            microsoft_client_secret: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_secret_falls_back_to_session_secret() {
        let mut config = Config::for_tests();
        assert_eq!(config.oauth_state_secret(), "test-session-secret");
        config.oauth_state_secret = Some("dedicated".into());
        assert_eq!(config.oauth_state_secret(), "dedicated");
    }

    #[test]
    fn callback_url_joins_without_double_slash() {
        let mut config = Config::for_tests();
        config.app_url = "https://dash.example.com/".into();
        assert_eq!(
            config.callback_url("/api/integrations/square/oauth/callback"),
            "https://dash.example.com/api/integrations/square/oauth/callback"
        );
    }
}
