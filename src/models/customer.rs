//! CRM customer model.
//!
//! Customers are imported from the point-of-sale provider and upserted on
//! `(shop_id, square_customer_id)`; they are not created through plain CRUD.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Tag given to customers on first import.
pub const DEFAULT_CUSTOMER_TYPE: &str = "new";

/// Audience id matching every customer of a shop.
pub const AUDIENCE_ALL: &str = "all";

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub square_customer_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub total_spent_cents: i64,
    pub order_count: i32,
    pub customer_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// "First Last", whichever parts exist.
    pub fn display_name(&self) -> Option<String> {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        (!name.is_empty()).then_some(name)
    }

    /// Whether this customer belongs to the campaign audience `audience_id`.
    pub fn in_audience(&self, audience_id: &str) -> bool {
        audience_id == AUDIENCE_ALL || self.customer_type == audience_id
    }
}

/// A customer as reported by the POS provider, before it is stored.
#[derive(Debug, Clone, Default)]
pub struct PosCustomer {
    pub external_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// `POST /api/customers/import`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub success: bool,
    pub imported: usize,
}
