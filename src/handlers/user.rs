//! Signed-in user's own account: profile, password, two-factor, deletion.

use axum::{
    Extension, Json,
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
};
use serde_json::{Value, json};

use crate::{
    cookies::{ACTIVE_SHOP_COOKIE, SESSION_COOKIE, clear_cookie},
    error::AppError,
    middleware::auth::AuthContext,
    models::user::{
        ChangePasswordRequest, ConfirmTwoFactorRequest, DisableTwoFactorRequest, ProfileUpdate,
        TwoFactorEnrollment, UserResponse,
    },
    services::{account_service, two_factor_service},
    state::AppState,
};

/// `GET /api/user/me`
pub async fn me(Extension(auth): Extension<AuthContext>) -> Json<UserResponse> {
    Json(UserResponse::from(&auth.user))
}

/// Update name and notification preferences.
///
/// # Endpoint
///
/// `PATCH /api/user/profile`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Ada Lovelace",
///   "notifyCampaignResults": true,
///   "notifyWeeklySummary": false
/// }
/// ```
///
/// Omitted fields are left as they are; an empty `name` clears it.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>, AppError> {
    let user = account_service::update_profile(state.store.as_ref(), auth.user.id, update).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// `POST /api/user/password`
///
/// 401 when `currentPassword` is wrong, 400 when `newPassword` is weak.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    account_service::change_password(state.store.as_ref(), &auth.user, request).await?;
    Ok(Json(json!({ "success": true })))
}

/// Delete the account and everything it owns.
///
/// # Endpoint
///
/// `DELETE /api/user`
///
/// Clears both the `session` and `activeShopId` cookies.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    account_service::delete_account(state.store.as_ref(), auth.user.id).await?;
    let secure = state.config.cookie_secure;
    Ok((
        AppendHeaders([
            (SET_COOKIE, clear_cookie(SESSION_COOKIE, secure)),
            (SET_COOKIE, clear_cookie(ACTIVE_SHOP_COOKIE, secure)),
        ]),
        Json(json!({ "success": true })),
    ))
}

/// Start two-factor enrollment.
///
/// # Endpoint
///
/// `POST /api/user/2fa/enable`
///
/// # Response
///
/// ```json
/// {
///   "secret": "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP",
///   "qrCodeUrl": "otpauth://totp/shopdesk%3Aada%40example.com?secret=...",
///   "backupCodes": ["3F2A-9C01", "..."]
/// }
/// ```
///
/// Nothing is stored until `POST /api/user/2fa/verify` succeeds.
pub async fn enable_two_factor(
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<TwoFactorEnrollment>, AppError> {
    Ok(Json(two_factor_service::begin_enrollment(&auth.user)?))
}

/// `POST /api/user/2fa/verify`: confirm enrollment with a current code.
pub async fn verify_two_factor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<ConfirmTwoFactorRequest>,
) -> Result<Json<Value>, AppError> {
    two_factor_service::confirm_enrollment(&state, &auth.user, request).await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/user/2fa/disable` with `{password}` or `{backupCode}`.
pub async fn disable_two_factor(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<DisableTwoFactorRequest>,
) -> Result<Json<Value>, AppError> {
    two_factor_service::disable(&state, &auth.user, request).await?;
    Ok(Json(json!({ "success": true })))
}
