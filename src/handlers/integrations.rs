//! Integration HTTP handlers: OAuth initiation, callbacks, disconnect and status.
//!
//! Square routes live under `/api/integrations/square/...`; the inbox
//! providers share `/api/integrations/email/{platform}/...` with
//! `platform` one of `gmail` or `outlook`.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::{Value, json};

use crate::{
    error::AppError,
    middleware::auth::AuthContext,
    models::integration::{AuthorizeResponse, CallbackQuery, DisconnectRequest, Platform},
    services::integration_service,
    state::AppState,
};

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

/// `GET /api/integrations`: status of every platform. Tokens are never included.
pub async fn list_integrations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Value>, AppError> {
    let integrations = integration_service::list_status(state.store.as_ref(), auth.user.id).await?;
    Ok(Json(json!({ "integrations": integrations })))
}

/// `GET /api/integrations/square/oauth`: 302 to Square's consent page.
pub async fn square_authorize_redirect(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, AppError> {
    let url = integration_service::authorize_url(&state, auth.user.id, Platform::Square)?;
    Ok(found(url))
}

/// `POST /api/integrations/square/oauth`: the consent URL as `{url}`.
pub async fn square_authorize_url(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<AuthorizeResponse>, AppError> {
    let url = integration_service::authorize_url(&state, auth.user.id, Platform::Square)?;
    Ok(Json(AuthorizeResponse { url }))
}

/// Square OAuth callback.
///
/// # Endpoint
///
/// `GET /api/integrations/square/oauth/callback?code=...&state=...`
///
/// # Response
///
/// Always a 302 to the dashboard:
///
/// - `{APP_URL}/dashboard/integrations?square=connected`
/// - `{APP_URL}/dashboard/integrations?square=error&reason=invalid_state`
pub async fn square_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    found(integration_service::complete_authorization(&state, Platform::Square, query, Utc::now()).await)
}

/// `POST /api/integrations/square/disconnect` with optional `{hardDelete}`.
pub async fn square_disconnect(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Option<Json<DisconnectRequest>>,
) -> Result<Json<Value>, AppError> {
    disconnect(&state, &auth, Platform::Square, body).await
}

/// `GET /api/integrations/email/{platform}/oauth`: 302 to the consent page.
pub async fn email_authorize_redirect(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(platform): Path<String>,
) -> Result<Response, AppError> {
    let platform = Platform::email_from_slug(&platform)?;
    let url = integration_service::authorize_url(&state, auth.user.id, platform)?;
    Ok(found(url))
}

/// `POST /api/integrations/email/{platform}/oauth`: the consent URL as `{url}`.
pub async fn email_authorize_url(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(platform): Path<String>,
) -> Result<Json<AuthorizeResponse>, AppError> {
    let platform = Platform::email_from_slug(&platform)?;
    let url = integration_service::authorize_url(&state, auth.user.id, platform)?;
    Ok(Json(AuthorizeResponse { url }))
}

/// `GET /api/integrations/email/{platform}/callback`; same redirects as Square.
pub async fn email_callback(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let platform = Platform::email_from_slug(&platform)?;
    Ok(found(
        integration_service::complete_authorization(&state, platform, query, Utc::now()).await,
    ))
}

/// `POST /api/integrations/email/{platform}/disconnect` with optional `{hardDelete}`.
pub async fn email_disconnect(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(platform): Path<String>,
    body: Option<Json<DisconnectRequest>>,
) -> Result<Json<Value>, AppError> {
    let platform = Platform::email_from_slug(&platform)?;
    disconnect(&state, &auth, platform, body).await
}

async fn disconnect(
    state: &AppState,
    auth: &AuthContext,
    platform: Platform,
    body: Option<Json<DisconnectRequest>>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = body.unwrap_or_default();
    integration_service::disconnect(
        state.store.as_ref(),
        &state.providers,
        auth.user.id,
        platform,
        request.hard_delete,
    )
    .await?;
    Ok(Json(json!({ "success": true })))
}
