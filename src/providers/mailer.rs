//! Outgoing email.

use async_trait::async_trait;
use serde::Serialize;

use super::{ensure_success, upstream};
use crate::error::AppError;

const RESEND_URL: &str = "https://api.resend.com/emails";

/// One message to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingEmail {
    /// `Display Name <address>`
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError>;
}

/// Delivers through the Resend HTTP API.
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        let response = self
            .http
            .post(RESEND_URL)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(upstream("resend"))?;
        ensure_success(response, "resend").await?;
        Ok(())
    }
}

/// Used when no API key is configured: logs instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        tracing::info!(to = %email.to, subject = %email.subject, "email not sent (no mail provider configured)");
        Ok(())
    }
}
