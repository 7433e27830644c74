//! Google OAuth for the Gmail sending inbox.

use async_trait::async_trait;
use serde::Deserialize;

use super::{OAuthProvider, StandardTokenResponse, ensure_success, upstream};
use crate::error::AppError;
use crate::models::integration::{AccountInfo, Integration, Platform, TokenGrant};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
const SCOPES: &str = "openid email profile https://www.googleapis.com/auth/gmail.send";

pub struct GoogleClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
}

impl GoogleClient {
    pub fn new(http: reqwest::Client, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            client_id,
            client_secret,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
    name: Option<String>,
}

#[async_trait]
impl OAuthProvider for GoogleClient {
    fn platform(&self) -> Platform {
        Platform::Gmail
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, AppError> {
        // offline + consent so Google returns a refresh token on every connect
        let url = url::Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("access_type", "offline"),
                ("prompt", "consent"),
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
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(upstream("google token exchange"))?;

        let token: StandardTokenResponse = ensure_success(response, "google token exchange")
            .await?
            .json()
            .await
            .map_err(upstream("google token exchange"))?;
        Ok(token.into())
    }

    async fn fetch_account(&self, grant: &TokenGrant) -> Result<AccountInfo, AppError> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(&grant.access_token)
            .send()
            .await
            .map_err(upstream("google userinfo"))?;

        let info: UserInfo = ensure_success(response, "google userinfo")
            .await?
            .json()
            .await
            .map_err(upstream("google userinfo"))?;

        Ok(AccountInfo {
            account_name: Some(info.name.unwrap_or_else(|| info.email.clone())),
            account_id: info.email,
        })
    }

    async fn revoke(&self, integration: &Integration) -> Result<(), AppError> {
        // Revoking the refresh token also kills its access tokens.
        let Some(token) = integration
            .refresh_token
            .as_deref()
            .or(integration.access_token.as_deref())
        else {
            return Ok(());
        };
        let response = self
            .http
            .post(REVOKE_URL)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(upstream("google revoke"))?;
        ensure_success(response, "google revoke").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_requests_offline_access() {
        let client = GoogleClient::new(reqwest::Client::new(), "g-id".into(), "g-secret".into());
        let url = client
            .authorize_url("signed.state", "http://app.test/api/integrations/email/gmail/callback")
            .unwrap();
        let parsed = url::Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

        assert_eq!(params["client_id"], "g-id");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["state"], "signed.state");
        assert!(params["scope"].contains("gmail.send"));
    }
}
