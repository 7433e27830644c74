//! Square: OAuth for the point-of-sale connection and the Customers API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{CustomerSource, OAuthProvider, ensure_success, upstream};
use crate::error::AppError;
use crate::models::{
    customer::PosCustomer,
    integration::{AccountInfo, Integration, Platform, TokenGrant},
};

const SQUARE_VERSION: &str = "2024-10-17";
const SCOPES: &str = "MERCHANT_PROFILE_READ CUSTOMERS_READ";
const PAGE_LIMIT: &str = "100";

pub struct SquareClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    base_url: String,
}

impl SquareClient {
    /// `environment` is `production` or anything else for the sandbox.
    pub fn new(
        http: reqwest::Client,
        client_id: String,
        client_secret: String,
        environment: &str,
    ) -> Self {
        let base_url = match environment {
            "production" => "https://connect.squareup.com",
            _ => "https://connect.squareupsandbox.com",
        };
        Self {
            http,
            client_id,
            client_secret,
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SquareTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    merchant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MerchantEnvelope {
    merchant: Merchant,
}

#[derive(Debug, Deserialize)]
struct Merchant {
    id: String,
    business_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CustomerPage {
    #[serde(default)]
    customers: Vec<SquareCustomer>,
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SquareCustomer {
    id: String,
    given_name: Option<String>,
    family_name: Option<String>,
    email_address: Option<String>,
    phone_number: Option<String>,
    address: Option<SquareAddress>,
}

#[derive(Debug, Deserialize)]
struct SquareAddress {
    address_line_1: Option<String>,
    address_line_2: Option<String>,
    locality: Option<String>,
    administrative_district_level_1: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
}

impl SquareAddress {
    /// Single-line rendering of whichever parts are present.
    fn one_line(&self) -> Option<String> {
        let parts: Vec<&str> = [
            &self.address_line_1,
            &self.address_line_2,
            &self.locality,
            &self.administrative_district_level_1,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl From<SquareCustomer> for PosCustomer {
    fn from(c: SquareCustomer) -> Self {
        PosCustomer {
            address: c.address.as_ref().and_then(SquareAddress::one_line),
            external_id: c.id,
            first_name: c.given_name,
            last_name: c.family_name,
            email: c.email_address,
            phone: c.phone_number,
        }
    }
}

#[async_trait]
impl OAuthProvider for SquareClient {
    fn platform(&self) -> Platform {
        Platform::Square
    }

    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, AppError> {
        let url = url::Url::parse_with_params(
            &format!("{}/oauth2/authorize", self.base_url),
            &[
                ("client_id", self.client_id.as_str()),
                ("scope", SCOPES),
                ("session", "false"),
                ("state", state),
                ("redirect_uri", redirect_uri),
            ],
        )
        .map_err(|e| AppError::Internal(format!("bad authorize url: {}", e)))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenGrant, AppError> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.base_url))
            .header("Square-Version", SQUARE_VERSION)
            .json(&json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
                "grant_type": "authorization_code",
                "redirect_uri": redirect_uri,
            }))
            .send()
            .await
            .map_err(upstream("square token exchange"))?;

        let token: SquareTokenResponse = ensure_success(response, "square token exchange")
            .await?
            .json()
            .await
            .map_err(upstream("square token exchange"))?;

        Ok(TokenGrant {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_at,
            account_hint: token.merchant_id,
        })
    }

    async fn fetch_account(&self, grant: &TokenGrant) -> Result<AccountInfo, AppError> {
        let merchant_id = grant.account_hint.as_deref().unwrap_or("me");
        let response = self
            .http
            .get(format!("{}/v2/merchants/{}", self.base_url, merchant_id))
            .bearer_auth(&grant.access_token)
            .header("Square-Version", SQUARE_VERSION)
            .send()
            .await
            .map_err(upstream("square merchant lookup"))?;

        let envelope: MerchantEnvelope = ensure_success(response, "square merchant lookup")
            .await?
            .json()
            .await
            .map_err(upstream("square merchant lookup"))?;

        Ok(AccountInfo {
            account_id: envelope.merchant.id,
            account_name: envelope.merchant.business_name,
        })
    }

    async fn revoke(&self, integration: &Integration) -> Result<(), AppError> {
        let Some(access_token) = &integration.access_token else {
            return Ok(());
        };
        let response = self
            .http
            .post(format!("{}/oauth2/revoke", self.base_url))
            .header("Authorization", format!("Client {}", self.client_secret))
            .header("Square-Version", SQUARE_VERSION)
            .json(&json!({
                "client_id": self.client_id,
                "access_token": access_token,
            }))
            .send()
            .await
            .map_err(upstream("square revoke"))?;
        ensure_success(response, "square revoke").await?;
        Ok(())
    }
}

#[async_trait]
impl CustomerSource for SquareClient {
    async fn list_customers(&self, access_token: &str) -> Result<Vec<PosCustomer>, AppError> {
        let mut customers = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/v2/customers", self.base_url))
                .bearer_auth(access_token)
                .header("Square-Version", SQUARE_VERSION)
                .query(&[("limit", PAGE_LIMIT)]);
            if let Some(cursor) = &cursor {
                request = request.query(&[("cursor", cursor.as_str())]);
            }

            let response = request.send().await.map_err(upstream("square customers"))?;
            let page: CustomerPage = ensure_success(response, "square customers")
                .await?
                .json()
                .await
                .map_err(upstream("square customers"))?;

            customers.extend(page.customers.into_iter().map(PosCustomer::from));
            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(count = customers.len(), "fetched square customers");
        Ok(customers)
    }
}
