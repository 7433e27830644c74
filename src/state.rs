//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::providers::{
    Providers, http_client,
    mailer::{LogMailer, Mailer, ResendMailer},
};
use crate::services::{
    crypto::SecretBox,
    rate_limit::{AttemptLimiter, InMemoryLimiter},
    session::SessionKeys,
};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub sessions: SessionKeys,
    /// Encrypts TOTP secrets at rest.
    pub secrets: SecretBox,
    pub limiter: Arc<dyn AttemptLimiter>,
    pub mailer: Arc<dyn Mailer>,
    pub providers: Providers,
}

impl AppState {
    /// Wire up production collaborators from `config`.
    pub fn init(config: Config, store: Arc<dyn Store>) -> Result<Self, AppError> {
        let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
            Some(key) => Arc::new(ResendMailer::new(http_client()?, key.clone())),
            None => {
                tracing::warn!("RESEND_API_KEY not set, campaign email will only be logged");
                Arc::new(LogMailer)
            }
        };
        let providers = Providers::from_config(&config)?;
        Self::from_parts(config, store, mailer, providers)
    }

    pub fn from_parts(
        config: Config,
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        providers: Providers,
    ) -> Result<Self, AppError> {
        Ok(Self {
            sessions: SessionKeys::new(&config.session_secret, config.session_ttl_minutes),
            secrets: SecretBox::new(&config.two_factor_encryption_key)?,
            limiter: Arc::new(InMemoryLimiter::default()),
            store,
            mailer,
            providers,
            config: Arc::new(config),
        })
    }

    /// In-memory state with no providers and a log-only mailer.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::store::memory::MemoryStore;

        Self::from_parts(
            Config::for_tests(),
            Arc::new(MemoryStore::new()),
            Arc::new(LogMailer),
            Providers::default(),
        )
        .expect("test state")
    }
}
