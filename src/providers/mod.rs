//! Third-party HTTP providers.
//!
//! Each provider sits behind a trait so services can be tested with fakes:
//!
//! - [`OAuthProvider`]: authorization-code flow for Square, Gmail and Outlook
//! - [`CustomerSource`]: customer listing from the point-of-sale provider
//! - [`mailer::Mailer`]: outgoing campaign email
//!
//! All HTTP calls share one `reqwest::Client` with a 10 second timeout.

pub mod google;
pub mod mailer;
pub mod microsoft;
pub mod square;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    customer::PosCustomer,
    integration::{AccountInfo, Integration, Platform, TokenGrant},
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub fn http_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| AppError::Internal(format!("HTTP client error: {}", e)))
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn platform(&self) -> Platform;

    /// Consent page URL the user is sent to.
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, AppError>;

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, AppError>;

    /// Identity of the connected account (merchant, mailbox).
    async fn fetch_account(&self, grant: &TokenGrant) -> Result<AccountInfo, AppError>;

    /// Best effort: callers log a failure and carry on.
    async fn revoke(&self, integration: &Integration) -> Result<(), AppError>;
}

#[async_trait]
pub trait CustomerSource: Send + Sync {
    /// Every customer visible to `access_token`, following pagination.
    async fn list_customers(&self, access_token: &str) -> Result<Vec<PosCustomer>, AppError>;
}

/// OAuth providers keyed by platform, plus the customer source.
///
/// A platform whose client credentials are not configured is absent.
#[derive(Clone, Default)]
pub struct Providers {
    oauth: HashMap<Platform, Arc<dyn OAuthProvider>>,
    customers: Option<Arc<dyn CustomerSource>>,
}

impl Providers {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let client = http_client()?;
        let mut providers = Self::default();

        if let (Some(id), Some(secret)) = (&config.square_client_id, &config.square_client_secret) {
            let square = Arc::new(square::SquareClient::new(
                client.clone(),
                id.clone(),
                secret.clone(),
                &config.square_environment,
            ));
            providers = providers.with_oauth(square.clone()).with_customer_source(square);
        }
        if let (Some(id), Some(secret)) = (&config.google_client_id, &config.google_client_secret) {
            providers = providers.with_oauth(Arc::new(google::GoogleClient::new(
                client.clone(),
                id.clone(),
                secret.clone(),
            )));
        }
        if let (Some(id), Some(secret)) =
            (&config.microsoft_client_id, &config.microsoft_client_secret)
        {
            providers = providers.with_oauth(Arc::new(microsoft::MicrosoftClient::new(
                client,
                id.clone(),
                secret.clone(),
            )));
        }

        tracing::info!(
            platforms = ?providers.oauth.keys().map(|p| p.slug()).collect::<Vec<_>>(),
            "integration providers configured"
        );
        Ok(providers)
    }

    pub fn with_oauth(mut self, provider: Arc<dyn OAuthProvider>) -> Self {
        self.oauth.insert(provider.platform(), provider);
        self
    }

    pub fn with_customer_source(mut self, source: Arc<dyn CustomerSource>) -> Self {
        self.customers = Some(source);
        self
    }

    pub fn oauth(&self, platform: Platform) -> Result<Arc<dyn OAuthProvider>, AppError> {
        self.oauth
            .get(&platform)
            .cloned()
            .ok_or_else(|| AppError::invalid(format!("{} integration not configured", platform.slug())))
    }

    pub fn customer_source(&self) -> Result<Arc<dyn CustomerSource>, AppError> {
        self.customers
            .clone()
            .ok_or_else(|| AppError::invalid("square integration not configured"))
    }
}

/// Token response shape shared by Google and Microsoft.
#[derive(Debug, Deserialize)]
struct StandardTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl From<StandardTokenResponse> for TokenGrant {
    fn from(response: StandardTokenResponse) -> Self {
        TokenGrant {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: response
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
            account_hint: None,
        }
    }
}

/// Turn a non-2xx provider response into an `Upstream` error, keeping the
/// body for the logs.
async fn ensure_success(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Upstream(format!("{} returned {}: {}", what, status, body)))
}

fn upstream(what: &str) -> impl FnOnce(reqwest::Error) -> AppError + '_ {
    move |e| AppError::Upstream(format!("{} failed: {}", what, e))
}
