//! Coupon HTTP handlers.
//!
//! Unlike the rest of the API, coupon endpoints answer with an envelope:
//!
//! ```json
//! { "success": true, "coupon": { ... } }
//! { "success": false, "error": "Coupon code already exists" }
//! ```
//!
//! The HTTP status still follows the usual error mapping.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::coupon::{
        CouponEnvelope, CouponListPayload, CouponPayload, CreateCouponRequest, UpdateCouponRequest,
    },
    services::coupon_service,
    state::AppState,
};

/// `AppError` rendered as `{success: false, error}`.
#[derive(Debug)]
pub struct CouponError(AppError);

impl From<AppError> for CouponError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for CouponError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::invalid(rejection.body_text()))
    }
}

impl IntoResponse for CouponError {
    fn into_response(self) -> Response {
        let (status, _, message) = self.0.parts();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "coupon request failed");
        }
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Create a coupon.
///
/// # Endpoint
///
/// `POST /api/coupons`
///
/// # Request Body
///
/// ```json
/// {
///   "codeName": "SUMMER2025",
///   "discount": 15,
///   "validUntil": "2025-09-01T00:00:00"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: `{ "success": true, "coupon": { ... } }`
/// - **Error (400)**: missing field, discount outside (0, 100], bad date
/// - **Error (409)**: the code is taken, by anyone
pub async fn create_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateCouponRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CouponEnvelope<CouponPayload>>), CouponError> {
    let Json(request) = payload?;
    let coupon = coupon_service::create_coupon(state.store.as_ref(), auth.user.id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(CouponEnvelope::ok(CouponPayload { coupon })),
    ))
}

/// `GET /api/coupons`: the caller's coupons, newest first.
pub async fn list_coupons(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<CouponEnvelope<CouponListPayload>>, CouponError> {
    let coupons = coupon_service::list_coupons(state.store.as_ref(), auth.user.id).await?;
    Ok(Json(CouponEnvelope::ok(CouponListPayload { coupons })))
}

/// Update a coupon.
///
/// # Endpoint
///
/// `PATCH /api/coupons/{id}`
///
/// # Errors
///
/// - 403 when the coupon belongs to someone else; nothing is changed
/// - 404 when it does not exist
pub async fn update_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(coupon_id): Path<Uuid>,
    payload: Result<Json<UpdateCouponRequest>, JsonRejection>,
) -> Result<Json<CouponEnvelope<CouponPayload>>, CouponError> {
    let Json(request) = payload?;
    let coupon =
        coupon_service::update_coupon(state.store.as_ref(), auth.user.id, coupon_id, request)
            .await?;
    Ok(Json(CouponEnvelope::ok(CouponPayload { coupon })))
}

/// `DELETE /api/coupons/{id}`; same ownership rules as update.
pub async fn delete_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(coupon_id): Path<Uuid>,
) -> Result<Json<Value>, CouponError> {
    coupon_service::delete_coupon(state.store.as_ref(), auth.user.id, coupon_id).await?;
    Ok(Json(json!({ "success": true })))
}
