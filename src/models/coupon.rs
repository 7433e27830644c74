//! Coupon data models and API request/response types.
//!
//! This module defines:
//! - `Coupon`: Database entity representing a discount code
//! - `CreateCouponRequest` / `UpdateCouponRequest`: request bodies
//! - `NewCoupon`: validated fields ready for the store
//!
//! # Invariants
//!
//! - `code_name` is globally unique across all users
//! - `discount` is a percentage in the half-open range (0, 100]

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Represents a coupon record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,

    /// Owner of the coupon. Only the owner may update or delete it.
    pub user_id: Uuid,

    /// Code customers type at checkout, e.g. `SUMMER2025`
    pub code_name: String,

    /// Percentage off, 0 < discount <= 100
    pub discount: f64,

    pub description: Option<String>,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated coupon fields, used for both inserts and full updates.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoupon {
    pub code_name: String,
    pub discount: f64,
    pub description: Option<String>,
    pub valid_until: DateTime<Utc>,
}

/// Request body for creating a coupon.
///
/// # JSON Example
///
/// ```json
/// {
///   "codeName": "SUMMER2025",
///   "discount": 15,
///   "validUntil": "2025-09-01T00:00:00"
/// }
/// ```
///
/// # Validation
///
/// - `codeName`: required, trimmed, non-empty
/// - `discount`: required, 0 < discount <= 100
/// - `validUntil`: required; RFC 3339, or a naive date/datetime read as UTC
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCouponRequest {
    #[serde(default)]
    pub code_name: Option<String>,
    #[serde(default)]
    pub discount: Option<f64>,
    #[serde(default)]
    pub valid_until: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateCouponRequest {
    pub fn validate(&self) -> Result<NewCoupon, AppError> {
        let (Some(code_name), Some(discount), Some(valid_until)) =
            (&self.code_name, self.discount, &self.valid_until)
        else {
            return Err(AppError::invalid(
                "codeName, discount and validUntil are required",
            ));
        };

        Ok(NewCoupon {
            code_name: validate_code_name(code_name)?,
            discount: validate_discount(discount)?,
            description: normalize_description(self.description.as_deref()),
            valid_until: parse_valid_until(valid_until)?,
        })
    }
}

/// Request body for `PATCH /api/coupons/{id}`. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCouponRequest {
    pub code_name: Option<String>,
    pub discount: Option<f64>,
    pub valid_until: Option<String>,
    pub description: Option<String>,
}

impl UpdateCouponRequest {
    /// Merge the request onto the stored coupon, validating every changed field.
    pub fn apply(&self, coupon: &Coupon) -> Result<NewCoupon, AppError> {
        Ok(NewCoupon {
            code_name: match &self.code_name {
                Some(code) => validate_code_name(code)?,
                None => coupon.code_name.clone(),
            },
            discount: match self.discount {
                Some(discount) => validate_discount(discount)?,
                None => coupon.discount,
            },
            description: match &self.description {
                Some(description) => normalize_description(Some(description)),
                None => coupon.description.clone(),
            },
            valid_until: match &self.valid_until {
                Some(raw) => parse_valid_until(raw)?,
                None => coupon.valid_until,
            },
        })
    }
}

fn validate_code_name(code: &str) -> Result<String, AppError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::invalid("codeName is required"));
    }
    if code.len() > 64 {
        return Err(AppError::invalid("codeName must be at most 64 characters"));
    }
    Ok(code.to_string())
}

fn validate_discount(discount: f64) -> Result<f64, AppError> {
    if !discount.is_finite() || discount <= 0.0 || discount > 100.0 {
        return Err(AppError::invalid(
            "Discount must be greater than 0 and at most 100",
        ));
    }
    Ok(discount)
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
}

/// Parse a coupon expiry.
///
/// Accepts RFC 3339 (`2025-09-01T00:00:00Z`), a naive datetime
/// (`2025-09-01T00:00:00`) or a bare date (`2025-09-01`); naive values are UTC.
pub fn parse_valid_until(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    Err(AppError::invalid("validUntil must be a valid date"))
}

/// Success body of the coupon endpoints: `{"success": true, ...payload}`.
#[derive(Debug, Serialize)]
pub struct CouponEnvelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> CouponEnvelope<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            payload,
        }
    }
}

/// Payload of a successful single-coupon action.
#[derive(Debug, Serialize)]
pub struct CouponPayload {
    pub coupon: Coupon,
}

/// Payload of `GET /api/coupons`.
#[derive(Debug, Serialize)]
pub struct CouponListPayload {
    pub coupons: Vec<Coupon>,
}
