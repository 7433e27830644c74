//! Two-factor authentication: enrollment, removal and the second login step.
//!
//! # Login state machine
//!
//! ```text
//! PasswordVerified ──pending token──▶ AwaitingCode ──ok──▶ Authenticated
//!                                          │
//!                                          └─ 5 misses / 5 min ─▶ 429
//! ```
//!
//! TOTP secrets are stored encrypted; backup codes are stored as SHA-256
//! digests and removed atomically when used.

use std::time::Instant;

use chrono::Utc;

use crate::error::AppError;
use crate::models::user::{
    ConfirmTwoFactorRequest, DisableTwoFactorRequest, TwoFactorEnrollment, TwoFactorLoginRequest,
    TwoFactorSettings, User,
};
use crate::services::{crypto::sha256_hex, password, session::TokenKind, totp};
use crate::state::AppState;

pub const BACKUP_CODE_COUNT: usize = 10;

const INVALID: AppError = AppError::Unauthorized("Invalid credentials");

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// `XXXX-XXXX`, upper-case hex.
fn generate_backup_code() -> String {
    let bytes: [u8; 4] = rand::random();
    let hex = hex::encode_upper(bytes);
    format!("{}-{}", &hex[..4], &hex[4..])
}

fn normalize_backup_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn is_backup_code_shape(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 9
        && bytes[4] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || b.is_ascii_hexdigit())
}

fn hash_backup_code(code: &str) -> String {
    sha256_hex(&normalize_backup_code(code))
}

/// Generate a secret, its provisioning URI and a fresh set of backup codes.
pub fn begin_enrollment(user: &User) -> Result<TwoFactorEnrollment, AppError> {
    if user.two_factor_enabled {
        return Err(AppError::invalid("Two-factor authentication is already enabled"));
    }
    let secret = totp::generate_secret();
    Ok(TwoFactorEnrollment {
        qr_code_url: totp::provisioning_uri(&secret, &user.email),
        secret,
        backup_codes: (0..BACKUP_CODE_COUNT).map(|_| generate_backup_code()).collect(),
    })
}

/// Persist the enrollment once `code` proves the authenticator is set up.
pub async fn confirm_enrollment(
    state: &AppState,
    user: &User,
    request: ConfirmTwoFactorRequest,
) -> Result<(), AppError> {
    if user.two_factor_enabled {
        return Err(AppError::invalid("Two-factor authentication is already enabled"));
    }

    let codes: Vec<String> = request
        .backup_codes
        .iter()
        .map(|c| normalize_backup_code(c))
        .collect();
    if codes.is_empty()
        || codes.len() > BACKUP_CODE_COUNT
        || !codes.iter().all(|c| is_backup_code_shape(c))
    {
        return Err(AppError::invalid("backupCodes must be the codes issued at enrollment"));
    }

    if !totp::verify(&request.secret, &request.code, unix_now()) {
        return Err(AppError::invalid("Invalid verification code"));
    }

    let settings = TwoFactorSettings {
        encrypted_secret: state.secrets.encrypt(request.secret.trim())?,
        backup_code_hashes: codes.iter().map(|c| sha256_hex(c)).collect(),
    };
    state.store.set_two_factor(user.id, Some(settings)).await?;

    tracing::info!(user_id = %user.id, "two-factor enabled");
    Ok(())
}

/// Turn two-factor off after re-proving with the password or a backup code.
pub async fn disable(
    state: &AppState,
    user: &User,
    request: DisableTwoFactorRequest,
) -> Result<(), AppError> {
    if !user.two_factor_enabled {
        return Err(AppError::invalid("Two-factor authentication is not enabled"));
    }

    let proven = match (request.password, request.backup_code) {
        (Some(password), _) => {
            password::verify_password_blocking(password, user.password_hash.clone()).await?
        }
        (None, Some(code)) => {
            state
                .store
                .consume_backup_code(user.id, &hash_backup_code(&code))
                .await?
        }
        (None, None) => false,
    };
    if !proven {
        return Err(INVALID);
    }

    state.store.set_two_factor(user.id, None).await?;
    tracing::info!(user_id = %user.id, "two-factor disabled");
    Ok(())
}

/// Second step of sign-in. Returns a session token and the user.
///
/// Attempts are counted per lower-cased email before anything is checked,
/// so failures of any kind use up the budget; a success resets it.
pub async fn verify_login(
    state: &AppState,
    request: TwoFactorLoginRequest,
    now: Instant,
) -> Result<(String, User), AppError> {
    let key = request.email.trim().to_lowercase();
    if !state.limiter.try_acquire(&key, now) {
        tracing::warn!(email = %key, "two-factor attempts exhausted");
        return Err(AppError::RateLimited);
    }

    let claims = state
        .sessions
        .verify(&request.pending_token, TokenKind::TwoFactorPending)
        .map_err(|_| INVALID)?;
    let user = state.store.find_user(claims.sub).await?.ok_or(INVALID)?;
    if user.email != key || !user.two_factor_enabled {
        return Err(INVALID);
    }

    let accepted = if request.is_backup_code {
        state
            .store
            .consume_backup_code(user.id, &hash_backup_code(&request.code))
            .await?
    } else {
        let Some(encrypted) = &user.two_factor_secret else {
            return Err(INVALID);
        };
        let secret = state.secrets.decrypt(encrypted)?;
        totp::verify(&secret, &request.code, unix_now())
    };

    if !accepted {
        tracing::info!(user_id = %user.id, backup = request.is_backup_code, "second factor rejected");
        return Err(INVALID);
    }

    state.limiter.reset(&key);
    let token = state.sessions.sign_session(user.id)?;
    tracing::info!(user_id = %user.id, backup = request.is_backup_code, "second factor accepted");
    Ok((token, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::RegisterRequest;
    use crate::services::account_service;

    async fn enrolled_user(state: &AppState) -> (User, TwoFactorEnrollment) {
        let user = account_service::register(
            state.store.as_ref(),
            RegisterRequest {
                email: "ada@example.com".into(),
                password: "secret123".into(),
                name: None,
            },
        )
        .await
        .unwrap();
        let enrollment = begin_enrollment(&user).unwrap();
        let code = totp::code_at(&enrollment.secret, unix_now()).unwrap();
        confirm_enrollment(
            state,
            &user,
            ConfirmTwoFactorRequest {
                code,
                secret: enrollment.secret.clone(),
                backup_codes: enrollment.backup_codes.clone(),
            },
        )
        .await
        .unwrap();
        let user = state.store.find_user(user.id).await.unwrap().unwrap();
        (user, enrollment)
    }

    fn login_request(state: &AppState, user: &User, code: &str, backup: bool) -> TwoFactorLoginRequest {
        TwoFactorLoginRequest {
            email: user.email.to_uppercase(),
            code: code.into(),
            is_backup_code: backup,
            pending_token: state.sessions.sign_pending(user.id).unwrap(),
        }
    }

    #[test]
    fn backup_codes_have_the_documented_shape() {
        for _ in 0..20 {
            let code = generate_backup_code();
            assert!(is_backup_code_shape(&code), "{}", code);
            assert_eq!(code, code.to_uppercase());
        }
    }

    #[tokio::test]
    async fn enrollment_stores_only_encrypted_and_hashed_material() {
        let state = AppState::fake();
        let (user, enrollment) = enrolled_user(&state).await;

        assert!(user.two_factor_enabled);
        let stored_secret = user.two_factor_secret.clone().unwrap();
        assert_ne!(stored_secret, enrollment.secret);
        assert_eq!(state.secrets.decrypt(&stored_secret).unwrap(), enrollment.secret);
        assert_eq!(user.backup_codes.len(), BACKUP_CODE_COUNT);
        assert!(!user.backup_codes.contains(&enrollment.backup_codes[0]));
    }

    #[tokio::test]
    async fn enrollment_rejects_wrong_code() {
        let state = AppState::fake();
        let user = account_service::register(
            state.store.as_ref(),
            RegisterRequest {
                email: "ada@example.com".into(),
                password: "secret123".into(),
                name: None,
            },
        )
        .await
        .unwrap();
        let enrollment = begin_enrollment(&user).unwrap();
        let err = confirm_enrollment(
            &state,
            &user,
            ConfirmTwoFactorRequest {
                code: "000000x".into(),
                secret: enrollment.secret,
                backup_codes: enrollment.backup_codes,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert!(!state.store.find_user(user.id).await.unwrap().unwrap().two_factor_enabled);
    }

    #[tokio::test]
    async fn totp_login_succeeds() {
        let state = AppState::fake();
        let (user, enrollment) = enrolled_user(&state).await;
        let code = totp::code_at(&enrollment.secret, unix_now()).unwrap();

        let (token, signed_in) = verify_login(&state, login_request(&state, &user, &code, false), Instant::now())
            .await
            .unwrap();
        assert_eq!(signed_in.id, user.id);
        assert!(state.sessions.verify(&token, TokenKind::Session).is_ok());
    }

    #[tokio::test]
    async fn backup_code_is_single_use() {
        let state = AppState::fake();
        let (user, enrollment) = enrolled_user(&state).await;
        let code = enrollment.backup_codes[3].to_lowercase();

        verify_login(&state, login_request(&state, &user, &code, true), Instant::now())
            .await
            .unwrap();
        let err = verify_login(&state, login_request(&state, &user, &code, true), Instant::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let remaining = state.store.find_user(user.id).await.unwrap().unwrap().backup_codes;
        assert_eq!(remaining.len(), BACKUP_CODE_COUNT - 1);
    }

    #[tokio::test]
    async fn sixth_failure_is_rate_limited_and_success_resets() {
        let state = AppState::fake();
        let (user, enrollment) = enrolled_user(&state).await;
        let now = Instant::now();

        for _ in 0..5 {
            let err = verify_login(&state, login_request(&state, &user, "ZZZZ-ZZZZ", true), now)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(_)));
        }
        let err = verify_login(&state, login_request(&state, &user, &enrollment.backup_codes[0], true), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RateLimited));

        // A fresh limiter window: succeed once, then the counter starts over.
        state.limiter.reset(&user.email);
        verify_login(&state, login_request(&state, &user, &enrollment.backup_codes[0], true), now)
            .await
            .unwrap();
        for _ in 0..5 {
            let _ = verify_login(&state, login_request(&state, &user, "ZZZZ-ZZZZ", true), now).await;
        }
        let err = verify_login(&state, login_request(&state, &user, "ZZZZ-ZZZZ", true), now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RateLimited));
    }

    #[tokio::test]
    async fn pending_token_must_match_email() {
        let state = AppState::fake();
        let (user, enrollment) = enrolled_user(&state).await;
        let mut request = login_request(&state, &user, &enrollment.backup_codes[0], true);
        request.email = "mallory@example.com".into();

        let err = verify_login(&state, request, Instant::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        // The code was not consumed.
        let remaining = state.store.find_user(user.id).await.unwrap().unwrap().backup_codes;
        assert_eq!(remaining.len(), BACKUP_CODE_COUNT);
    }

    #[tokio::test]
    async fn disable_with_backup_code_consumes_it() {
        let state = AppState::fake();
        let (user, enrollment) = enrolled_user(&state).await;

        let err = disable(&state, &user, DisableTwoFactorRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        disable(
            &state,
            &user,
            DisableTwoFactorRequest {
                password: None,
                backup_code: Some(enrollment.backup_codes[1].clone()),
            },
        )
        .await
        .unwrap();
        let user = state.store.find_user(user.id).await.unwrap().unwrap();
        assert!(!user.two_factor_enabled);
        assert!(user.two_factor_secret.is_none());
        assert!(user.backup_codes.is_empty());
    }
}
