//! OAuth integration records.
//!
//! One row per (user, platform). The POS provider (Square) and the email
//! inbox providers (Gmail, Outlook) share the same typed table.
//!
//! # Security
//!
//! Tokens are never serialized to clients; `IntegrationStatus` is the only
//! outward view of a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "integration_platform")]
pub enum Platform {
    Square,
    Gmail,
    Outlook,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Square, Platform::Gmail, Platform::Outlook];

    /// Lower-case name used in URLs and redirect query parameters.
    pub fn slug(self) -> &'static str {
        match self {
            Platform::Square => "square",
            Platform::Gmail => "gmail",
            Platform::Outlook => "outlook",
        }
    }

    /// Parse the `{platform}` segment of the email integration routes.
    pub fn email_from_slug(slug: &str) -> Result<Self, AppError> {
        match slug {
            "gmail" => Ok(Platform::Gmail),
            "outlook" => Ok(Platform::Outlook),
            _ => Err(AppError::NotFound("Unknown email provider")),
        }
    }

    /// Path the provider redirects back to after consent.
    pub fn callback_path(self) -> String {
        match self {
            Platform::Square => "/api/integrations/square/oauth/callback".to_string(),
            other => format!("/api/integrations/email/{}/callback", other.slug()),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Integration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: Platform,

    /// Provider-side identity: Square merchant id, or the mailbox address.
    pub account_id: Option<String>,
    pub account_name: Option<String>,

    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,

    /// False after a soft disconnect; tokens are blanked at the same time.
    pub connected: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tokens returned by a provider's authorization-code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Some providers (Square) name the account in the token response.
    pub account_hint: Option<String>,
}

/// Account identity fetched after the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    pub account_id: String,
    pub account_name: Option<String>,
}

/// Everything the store needs to upsert a connection.
#[derive(Debug, Clone)]
pub struct IntegrationUpsert {
    pub user_id: Uuid,
    pub platform: Platform,
    pub account: AccountInfo,
    pub grant: TokenGrant,
}

/// Client-facing connection status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatus {
    pub platform: Platform,
    pub connected: bool,
    pub account_name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IntegrationStatus {
    pub fn disconnected(platform: Platform) -> Self {
        Self {
            platform,
            connected: false,
            account_name: None,
            expires_at: None,
            updated_at: None,
        }
    }
}

impl From<&Integration> for IntegrationStatus {
    fn from(integration: &Integration) -> Self {
        Self {
            platform: integration.platform,
            connected: integration.connected,
            account_name: integration
                .account_name
                .clone()
                .or_else(|| integration.account_id.clone()),
            expires_at: integration.expires_at,
            updated_at: Some(integration.updated_at),
        }
    }
}

/// `POST .../disconnect`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DisconnectRequest {
    #[serde(default)]
    pub hard_delete: bool,
}

/// `POST .../oauth` returns the consent URL instead of redirecting.
#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub url: String,
}

/// Query string a provider appends to the callback URL.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_slugs() {
        assert_eq!(Platform::email_from_slug("gmail").unwrap(), Platform::Gmail);
        assert_eq!(Platform::email_from_slug("outlook").unwrap(), Platform::Outlook);
        assert!(Platform::email_from_slug("square").is_err());
    }

    #[test]
    fn callback_paths() {
        assert_eq!(
            Platform::Square.callback_path(),
            "/api/integrations/square/oauth/callback"
        );
        assert_eq!(
            Platform::Gmail.callback_path(),
            "/api/integrations/email/gmail/callback"
        );
    }
}
