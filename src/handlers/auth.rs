//! Sign-up and sign-in HTTP handlers.
//!
//! This module implements the public authentication endpoints:
//! - POST /api/auth/register - Create an account
//! - POST /api/auth/login - Password sign-in (first factor)
//! - POST /api/auth/verify-2fa-login - Second factor
//! - POST /api/auth/logout - Clear the session cookie

use std::time::Instant;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde_json::json;

use crate::{
    cookies::{SESSION_COOKIE, clear_cookie, set_cookie},
    error::AppError,
    models::user::{
        LoginRequest, RegisterRequest, SessionResponse, TwoFactorChallenge, TwoFactorLoginRequest,
        User, UserResponse,
    },
    services::{
        account_service::{self, LoginOutcome},
        two_factor_service,
    },
    state::AppState,
};

/// `{token, user}` body plus the `session` cookie.
fn signed_in(state: &AppState, token: String, user: &User) -> Response {
    let cookie = set_cookie(
        SESSION_COOKIE,
        &token,
        state.sessions.session_ttl_seconds(),
        state.config.cookie_secure,
    );
    (
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(SessionResponse {
            token,
            user: user.into(),
        }),
    )
        .into_response()
}

/// Register a new account.
///
/// # Endpoint
///
/// `POST /api/auth/register`
///
/// # Request Body
///
/// ```json
/// {
///   "email": "ada@example.com",
///   "password": "correct-horse-1",
///   "name": "Ada"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: `{ "user": { ... } }`
/// - **Error (400)**: malformed email or weak password
/// - **Error (409)**: email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = account_service::register(state.store.as_ref(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": UserResponse::from(&user) })),
    ))
}

/// Password sign-in.
///
/// # Endpoint
///
/// `POST /api/auth/login`
///
/// # Response
///
/// Without two-factor: `{token, user}` and a `session` cookie.
///
/// With two-factor enabled, no session is issued yet:
///
/// ```json
/// {
///   "requiresTwoFactor": true,
///   "pendingToken": "eyJ0eXAiOiJKV1Qi..."
/// }
/// ```
///
/// Unknown email and wrong password both return 401 "Invalid credentials".
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    match account_service::login(&state, request).await? {
        LoginOutcome::Session { token, user } => Ok(signed_in(&state, token, &user)),
        LoginOutcome::TwoFactorRequired { pending_token } => Ok(Json(TwoFactorChallenge {
            requires_two_factor: true,
            pending_token,
        })
        .into_response()),
    }
}

/// Complete a sign-in with a TOTP or backup code.
///
/// # Endpoint
///
/// `POST /api/auth/verify-2fa-login`
///
/// # Rate Limiting
///
/// Five attempts per email per five minutes; the sixth returns 429.
pub async fn verify_two_factor_login(
    State(state): State<AppState>,
    Json(request): Json<TwoFactorLoginRequest>,
) -> Result<Response, AppError> {
    let (token, user) = two_factor_service::verify_login(&state, request, Instant::now()).await?;
    Ok(signed_in(&state, token, &user))
}

/// `POST /api/auth/logout`
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_cookie(SESSION_COOKIE, state.config.cookie_secure))]),
        Json(json!({ "success": true })),
    )
}
