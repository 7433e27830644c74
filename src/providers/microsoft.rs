//! Microsoft identity platform OAuth for the Outlook sending inbox.

use async_trait::async_trait;
use serde::Deserialize;

use super::{OAuthProvider, StandardTokenResponse, ensure_success, upstream};
use crate::error::AppError;
use crate::models::integration::{AccountInfo, Integration, Platform, TokenGrant};

const AUTHORIZE_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
const TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const ME_URL: &str = "https://graph.microsoft.com/v1.0/me";
const SCOPES: &str = "offline_access openid email User.Read Mail.Send";

pub struct MicrosoftClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl MicrosoftClient {
    pub fn new(http: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            client_id,
            client_secret,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    mail: Option<String>,
    user_principal_name: Option<String>,
    display_name: Option<String>,
}

#[async_trait]
impl OAuthProvider for MicrosoftClient {
    fn platform(&self) -> Platform {
        Platform::Outlook
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, AppError> {
        let url = url::Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("response_mode", "query"),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| AppError::Internal(format!("bad authorize url: {}", e)))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
                ("scope", SCOPES),
            ])
            .send()
            .await
            .map_err(upstream("microsoft token exchange"))?;

        let token: StandardTokenResponse = ensure_success(response, "microsoft token exchange")
            .await?
            .json()
            .await
            .map_err(upstream("microsoft token exchange"))?;
        Ok(token.into())
    }

    async fn fetch_account(&self, grant: &TokenGrant) -> Result<AccountInfo, AppError> {
        let response = self
            .http
            .get(ME_URL)
            .bearer_auth(&grant.access_token)
            .send()
            .await
            .map_err(upstream("microsoft graph profile"))?;

        let user: GraphUser = ensure_success(response, "microsoft graph profile")
            .await?
            .json()
            .await
            .map_err(upstream("microsoft graph profile"))?;

        let address = user
            .mail
            .or(user.user_principal_name)
            .ok_or_else(|| AppError::Upstream("microsoft profile has no address".into()))?;
        Ok(AccountInfo {
            account_name: Some(user.display_name.unwrap_or_else(|| address.clone())),
            account_id: address,
        })
    }

    /// The identity platform has no token revocation endpoint; dropping the
    /// stored tokens is all that can be done from here.
    async fn revoke(&self, _integration: &Integration) -> Result<(), AppError> {
        tracing::debug!("outlook tokens cannot be revoked remotely");
        Ok(())
    }
}
