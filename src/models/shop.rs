//! Shop (tenant) model.
//!
//! A shop is the scoping boundary for customers, campaigns and automations.
//! A user may own several shops; the one they are working on is selected
//! with the `activeShopId` cookie.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Represents a shop record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: Uuid,

    /// Owner. Every tenant-scoped query is filtered through this.
    pub user_id: Uuid,

    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a shop (onboarding) or replacing its contact fields.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Corner Bakery",
///   "email": "hello@cornerbakery.test",
///   "phone": "+1 555 0100",
///   "address": "1 Main St"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShopRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl ShopRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid("Shop name is required"));
        }
        Ok(())
    }
}

/// `POST /api/shop/active`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetActiveShopRequest {
    pub shop_id: Uuid,
}

/// `GET /api/shop/active`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveShopResponse {
    pub active_shop_id: Option<Uuid>,
}
