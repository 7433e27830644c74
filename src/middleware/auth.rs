//! Session authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the session token from `Authorization: Bearer` or the `session` cookie
//! 2. Verify its signature, expiry and kind
//! 3. Load the user it names
//! 4. Inject `AuthContext` into the request, or reject with 401

use crate::{
    cookies::{SESSION_COOKIE, read_cookie},
    error::AppError,
    models::user::User,
    services::{crypto::constant_time_eq, session::TokenKind},
    state::AppState,
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
}

/// Session authentication middleware.
///
/// The bearer header wins over the cookie when both are present. A token for
/// a user that no longer exists is treated like an invalid one.
///
/// # Returns
///
/// - `Ok(Response)` from the next handler when authenticated
/// - `Err(AppError::Unauthorized)` otherwise (HTTP 401)
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .map(String::from)
        .or_else(|| read_cookie(request.headers(), SESSION_COOKIE))
        .ok_or(AppError::Unauthorized("Authentication required"))?;

    let claims = state.sessions.verify(&token, TokenKind::Session)?;

    let user = state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or(AppError::Unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthContext { user });

    Ok(next.run(request).await)
}

/// Guards the scheduler endpoint with `Authorization: Bearer <CRON_SECRET>`.
///
/// When no secret is configured the endpoint is open, which is only meant
/// for local development.
pub async fn cron_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(secret) = &state.config.cron_secret {
        let presented = bearer_token(request.headers()).unwrap_or_default();
        if !constant_time_eq(presented.as_bytes(), secret.as_bytes()) {
            tracing::warn!("rejected scheduler call with a bad cron secret");
            return Err(AppError::Unauthorized("Invalid cron secret"));
        }
    }
    Ok(next.run(request).await)
}
