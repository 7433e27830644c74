//! Shop HTTP handlers and the active-shop cookie.
//!
//! This module implements:
//! - GET/POST /api/shop/active - Read or change the active shop
//! - GET/POST /api/shops - List or create shops
//! - GET/PATCH/DELETE /api/shops/{id} - Single shop

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    cookies::{ACTIVE_SHOP_COOKIE, ACTIVE_SHOP_MAX_AGE, ActiveShopCookie, clear_cookie, set_cookie},
    error::AppError,
    middleware::auth::AuthContext,
    models::shop::{ActiveShopResponse, SetActiveShopRequest, Shop, ShopRequest},
    services::shop_service::{self, ActiveShopChange},
    state::AppState,
};

/// `Set-Cookie` header for an active-shop change, if any.
fn active_shop_header(
    change: ActiveShopChange,
    secure: bool,
) -> AppendHeaders<Option<(axum::http::HeaderName, String)>> {
    let cookie = match change {
        ActiveShopChange::Keep => None,
        ActiveShopChange::Set(id) => Some(set_cookie(
            ACTIVE_SHOP_COOKIE,
            &id.to_string(),
            ACTIVE_SHOP_MAX_AGE,
            secure,
        )),
        ActiveShopChange::Clear => Some(clear_cookie(ACTIVE_SHOP_COOKIE, secure)),
    };
    AppendHeaders(cookie.map(|c| (SET_COOKIE, c)))
}

/// Currently selected shop.
///
/// # Endpoint
///
/// `GET /api/shop/active`
///
/// # Response
///
/// ```json
/// { "activeShopId": "550e8400-e29b-41d4-a716-446655440000" }
/// ```
///
/// `null` when the cookie is missing, malformed, or names a shop the caller
/// does not own.
pub async fn get_active_shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ActiveShopCookie(cookie): ActiveShopCookie,
) -> Result<Json<ActiveShopResponse>, AppError> {
    let active_shop_id =
        shop_service::active_shop_id(state.store.as_ref(), auth.user.id, cookie).await?;
    Ok(Json(ActiveShopResponse { active_shop_id }))
}

/// Select the active shop.
///
/// # Endpoint
///
/// `POST /api/shop/active`
///
/// # Request Body
///
/// ```json
/// { "shopId": "550e8400-e29b-41d4-a716-446655440000" }
/// ```
///
/// # Response
///
/// - **Success (200)**: `{ "success": true }` and the `activeShopId` cookie
/// - **Error (403)**: the shop does not exist or is not yours; cookie unchanged
pub async fn set_active_shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SetActiveShopRequest>,
) -> Result<impl IntoResponse, AppError> {
    let shop_id =
        shop_service::select_active_shop(state.store.as_ref(), auth.user.id, request.shop_id)
            .await?;
    Ok((
        active_shop_header(ActiveShopChange::Set(shop_id), state.config.cookie_secure),
        Json(json!({ "success": true })),
    ))
}

/// `GET /api/shops`, oldest first.
pub async fn list_shops(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Shop>>, AppError> {
    Ok(Json(shop_service::list_shops(state.store.as_ref(), auth.user.id).await?))
}

/// Create a shop (onboarding).
///
/// # Endpoint
///
/// `POST /api/shops`
///
/// # Response (201 Created)
///
/// The new shop. When the caller had no valid active shop, the response
/// also sets `activeShopId` to it.
pub async fn create_shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ActiveShopCookie(cookie): ActiveShopCookie,
    Json(request): Json<ShopRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (shop, change) =
        shop_service::create_shop(state.store.as_ref(), auth.user.id, request, cookie).await?;
    Ok((
        StatusCode::CREATED,
        active_shop_header(change, state.config.cookie_secure),
        Json(shop),
    ))
}

/// `GET /api/shops/{id}`; 404 when not yours.
pub async fn get_shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Shop>, AppError> {
    Ok(Json(shop_service::get_shop(state.store.as_ref(), auth.user.id, shop_id).await?))
}

/// `PATCH /api/shops/{id}`: replace name and contact details.
pub async fn update_shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(shop_id): Path<Uuid>,
    Json(request): Json<ShopRequest>,
) -> Result<Json<Shop>, AppError> {
    let shop =
        shop_service::update_shop(state.store.as_ref(), auth.user.id, shop_id, request).await?;
    Ok(Json(shop))
}

/// Delete a shop and everything scoped to it.
///
/// # Endpoint
///
/// `DELETE /api/shops/{id}`
///
/// # Cookie
///
/// When the deleted shop was active, `activeShopId` moves to the caller's
/// oldest remaining shop, or is cleared when none is left.
pub async fn delete_shop(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ActiveShopCookie(cookie): ActiveShopCookie,
    Path(shop_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let change =
        shop_service::delete_shop(state.store.as_ref(), auth.user.id, shop_id, cookie).await?;
    Ok((
        active_shop_header(change, state.config.cookie_secure),
        Json(json!({ "success": true })),
    ))
}
