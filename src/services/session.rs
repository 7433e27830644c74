//! Signed session tokens.
//!
//! A session is a HS256 JWT carried either as `Authorization: Bearer <jwt>`
//! or in the `session` cookie. The same keys also mint the short-lived
//! token that bridges a password check and the second-factor step.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

const ISSUER: &str = "shopdesk";
const AUDIENCE: &str = "shopdesk-api";

/// Lifetime of a [`TokenKind::TwoFactorPending`] token.
pub const PENDING_TTL_MINUTES: i64 = 5;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Authenticates API calls.
    Session,
    /// Password verified, second factor still outstanding.
    TwoFactorPending,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session_ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, session_ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl: Duration::minutes(session_ttl_minutes),
        }
    }

    /// Session lifetime, also used as the cookie `Max-Age`.
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl.num_seconds()
    }

    fn sign(&self, user_id: Uuid, kind: TokenKind) -> Result<String, AppError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Session => self.session_ttl,
            TokenKind::TwoFactorPending => Duration::minutes(PENDING_TTL_MINUTES),
        };
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))?;
        tracing::debug!(user_id = %user_id, kind = ?kind, "token signed");
        Ok(token)
    }

    pub fn sign_session(&self, user_id: Uuid) -> Result<String, AppError> {
        self.sign(user_id, TokenKind::Session)
    }

    pub fn sign_pending(&self, user_id: Uuid) -> Result<String, AppError> {
        self.sign(user_id, TokenKind::TwoFactorPending)
    }

    /// Decode `token` and require it to be of `kind`.
    ///
    /// Every failure collapses into the same `Unauthorized` so callers cannot
    /// tell an expired token from a forged one.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.set_audience(&[AUDIENCE]);
        validation.set_issuer(&[ISSUER]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AppError::Unauthorized("Invalid or expired session")
            })?
            .claims;

        if claims.kind != kind {
            return Err(AppError::Unauthorized("Invalid or expired session"));
        }
        Ok(claims)
    }
}
