//! Automation HTTP handlers, scoped to the active shop.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::active_shop::ActiveShop,
    models::automation::{Automation, CreateAutomationRequest, UpdateAutomationRequest},
    services::automation_service,
    state::AppState,
};

/// `GET /api/automations`
pub async fn list_automations(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
) -> Result<Json<Vec<Automation>>, AppError> {
    Ok(Json(automation_service::list_automations(state.store.as_ref(), &shop).await?))
}

/// Create an automation.
///
/// # Endpoint
///
/// `POST /api/automations`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Win back",
///   "triggerType": "CustomerInactive",
///   "timingDays": 30,
///   "actionType": "SendCoupon",
///   "couponId": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
///
/// # Errors
///
/// - 400 for missing action fields or `timingDays` outside 0..=365
/// - 403 when `couponId` is someone else's coupon
pub async fn create_automation(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
    Json(request): Json<CreateAutomationRequest>,
) -> Result<(StatusCode, Json<Automation>), AppError> {
    let automation =
        automation_service::create_automation(state.store.as_ref(), &shop, request).await?;
    Ok((StatusCode::CREATED, Json(automation)))
}

pub async fn get_automation(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
    Path(automation_id): Path<Uuid>,
) -> Result<Json<Automation>, AppError> {
    Ok(Json(
        automation_service::get_automation(state.store.as_ref(), &shop, automation_id).await?,
    ))
}

pub async fn update_automation(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
    Path(automation_id): Path<Uuid>,
    Json(request): Json<UpdateAutomationRequest>,
) -> Result<Json<Automation>, AppError> {
    let automation = automation_service::update_automation(
        state.store.as_ref(),
        &shop,
        automation_id,
        request,
    )
    .await?;
    Ok(Json(automation))
}

pub async fn delete_automation(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
    Path(automation_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    automation_service::delete_automation(state.store.as_ref(), &shop, automation_id).await?;
    Ok(Json(json!({ "success": true })))
}
