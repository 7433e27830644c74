//! Campaign HTTP handlers.
//!
//! This module implements:
//! - GET/POST /api/campaigns - List or create campaigns of the active shop
//! - GET/PATCH/DELETE /api/campaigns/{id} - Single campaign
//! - POST /api/campaigns/{id}/send - Send immediately
//! - GET/POST /api/campaigns/send-schedule - Scheduler entry point (cron secret)

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::active_shop::ActiveShop,
    models::campaign::{
        Campaign, CampaignDetails, CreateCampaignRequest, DispatchSummary, UpdateCampaignRequest,
    },
    services::campaign_service::{self, Dispatcher},
    state::AppState,
};

fn dispatcher(state: &AppState) -> Dispatcher<'_> {
    Dispatcher {
        store: state.store.as_ref(),
        mailer: state.mailer.as_ref(),
        from_address: &state.config.mail_from_address,
    }
}

/// `GET /api/campaigns`, newest first.
pub async fn list_campaigns(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
) -> Result<Json<Vec<Campaign>>, AppError> {
    Ok(Json(campaign_service::list_campaigns(state.store.as_ref(), &shop).await?))
}

/// Create a campaign.
///
/// # Endpoint
///
/// `POST /api/campaigns`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Summer sale",
///   "subject": "15% off everything",
///   "body": "<p>Come by this weekend!</p>",
///   "audienceId": "all",
///   "status": "Scheduled",
///   "scheduledFor": "2025-07-01T09:00:00Z"
/// }
/// ```
///
/// Recipients are fixed at creation: every customer of the active shop in
/// the audience that has an email address.
pub async fn create_campaign(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Campaign>), AppError> {
    let campaign = campaign_service::create_campaign(state.store.as_ref(), &shop, request).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// `GET /api/campaigns/{id}` with its recipients.
pub async fn get_campaign(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignDetails>, AppError> {
    Ok(Json(
        campaign_service::get_campaign(state.store.as_ref(), &shop, campaign_id).await?,
    ))
}

/// Edit a campaign or move its status.
///
/// # Endpoint
///
/// `PATCH /api/campaigns/{id}`
///
/// # Errors
///
/// - 400 for a transition the lifecycle does not allow
/// - 409 when the status changed since it was read (e.g. the scheduler claimed it)
pub async fn update_campaign(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
    Path(campaign_id): Path<Uuid>,
    Json(request): Json<UpdateCampaignRequest>,
) -> Result<Json<Campaign>, AppError> {
    let campaign =
        campaign_service::update_campaign(state.store.as_ref(), &shop, campaign_id, request)
            .await?;
    Ok(Json(campaign))
}

/// `DELETE /api/campaigns/{id}`; 409 while it is being sent.
pub async fn delete_campaign(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    campaign_service::delete_campaign(state.store.as_ref(), &shop, campaign_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/campaigns/{id}/send`: deliver now instead of waiting for the scheduler.
pub async fn send_campaign(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<Campaign>, AppError> {
    let campaign = campaign_service::send_now(&dispatcher(&state), &shop, campaign_id).await?;
    Ok(Json(campaign))
}

/// Dispatch every due campaign.
///
/// # Endpoint
///
/// `GET` or `POST /api/campaigns/send-schedule`
///
/// # Authentication
///
/// `Authorization: Bearer <CRON_SECRET>` when `CRON_SECRET` is configured.
///
/// # Response
///
/// ```json
/// { "success": true, "processed": 3 }
/// ```
///
/// `processed` counts the campaigns this invocation claimed.
pub async fn dispatch_scheduled(
    State(state): State<AppState>,
) -> Result<Json<DispatchSummary>, AppError> {
    Ok(Json(dispatcher(&state).run_due(Utc::now()).await?))
}
