//! Account lifecycle: registration, password sign-in, profile and deletion.
//!
//! The second-factor half of sign-in lives in `two_factor_service`.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{
    ChangePasswordRequest, LoginRequest, NewUser, ProfileUpdate, RegisterRequest, User,
};
use crate::services::password;
use crate::state::AppState;
use crate::store::Store;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

const MAX_NAME_LEN: usize = 120;

/// Result of a successful password check.
#[derive(Debug)]
pub enum LoginOutcome {
    /// No second factor: the caller is signed in.
    Session { token: String, user: User },
    /// Second factor required; `pending_token` bridges to `verify-2fa-login`.
    TwoFactorRequired { pending_token: String },
}

/// Trimmed, lower-cased email, or 400.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::invalid("A valid email address is required"));
    }
    Ok(email)
}

fn normalize_name(name: Option<&str>) -> Result<Option<String>, AppError> {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    if name.is_some_and(|n| n.chars().count() > MAX_NAME_LEN) {
        return Err(AppError::invalid("name must be at most 120 characters"));
    }
    Ok(name.map(String::from))
}

/// Create an account.
///
/// # Errors
///
/// - 400 for a malformed email or a weak password
/// - 409 when the email is already registered
pub async fn register(store: &dyn Store, request: RegisterRequest) -> Result<User, AppError> {
    let email = normalize_email(&request.email)?;
    password::check_strength(&request.password)?;
    let name = normalize_name(request.name.as_deref())?;

    let password_hash = password::hash_password_blocking(request.password).await?;
    let user = store
        .create_user(NewUser {
            email,
            name,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Check email and password.
///
/// Unknown email and wrong password produce the same 401 so the endpoint
/// cannot be used to probe which addresses have accounts.
pub async fn login(state: &AppState, request: LoginRequest) -> Result<LoginOutcome, AppError> {
    const INVALID: AppError = AppError::Unauthorized("Invalid credentials");

    let Ok(email) = normalize_email(&request.email) else {
        return Err(INVALID);
    };
    let Some(user) = state.store.find_user_by_email(&email).await? else {
        return Err(INVALID);
    };
    if !password::verify_password_blocking(request.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "password sign-in rejected");
        return Err(INVALID);
    }

    if user.two_factor_enabled {
        let pending_token = state.sessions.sign_pending(user.id)?;
        tracing::info!(user_id = %user.id, "password verified, awaiting second factor");
        return Ok(LoginOutcome::TwoFactorRequired { pending_token });
    }

    let token = state.sessions.sign_session(user.id)?;
    tracing::info!(user_id = %user.id, "user signed in");
    Ok(LoginOutcome::Session { token, user })
}

pub async fn update_profile(
    store: &dyn Store,
    user_id: Uuid,
    mut update: ProfileUpdate,
) -> Result<User, AppError> {
    if let Some(name) = update.name.take() {
        // Blank clears the name, which the store reads from `Some("")`.
        update.name = Some(normalize_name(Some(&name))?.unwrap_or_default());
    }
    store.update_profile(user_id, &update).await
}

/// Replace the password after re-checking the current one.
pub async fn change_password(
    store: &dyn Store,
    user: &User,
    request: ChangePasswordRequest,
) -> Result<(), AppError> {
    if !password::verify_password_blocking(request.current_password, user.password_hash.clone())
        .await?
    {
        return Err(AppError::Unauthorized("Current password is incorrect"));
    }
    password::check_strength(&request.new_password)?;

    let hash = password::hash_password_blocking(request.new_password).await?;
    store.update_password(user.id, &hash).await?;
    tracing::info!(user_id = %user.id, "password changed");
    Ok(())
}

/// Delete the account and, by cascade, everything it owns.
pub async fn delete_account(store: &dyn Store, user_id: Uuid) -> Result<(), AppError> {
    if !store.delete_user(user_id).await? {
        return Err(AppError::NotFound("User not found"));
    }
    tracing::info!(user_id = %user_id, "account deleted");
    Ok(())
}
