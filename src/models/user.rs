//! User account model and account-level request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    User,
    Admin,
}

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. Deleting a user cascades to their shops,
/// coupons and integrations.
///
/// # Secrets
///
/// - `password_hash` is an argon2 PHC string
/// - `two_factor_secret` is AES-256-GCM ciphertext (base64, nonce-prefixed)
/// - `backup_codes` holds SHA-256 digests, never the codes themselves
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    pub backup_codes: Vec<String>,
    pub notify_campaign_results: bool,
    pub notify_weekly_summary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
}

/// Persisted second-factor material, produced once enrollment is proven.
#[derive(Debug, Clone)]
pub struct TwoFactorSettings {
    pub encrypted_secret: String,
    pub backup_code_hashes: Vec<String>,
}

/// Public view of a user. Never carries hashes or secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub two_factor_enabled: bool,
    pub notify_campaign_results: bool,
    pub notify_weekly_summary: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            two_factor_enabled: user.two_factor_enabled,
            notify_campaign_results: user.notify_campaign_results,
            notify_weekly_summary: user.notify_weekly_summary,
            created_at: user.created_at,
        }
    }
}

/// `POST /api/auth/register`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /api/auth/login`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful sign-in: a session token plus the user it belongs to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Password accepted but a second factor is still required.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorChallenge {
    pub requires_two_factor: bool,
    pub pending_token: String,
}

/// `PATCH /api/user/profile`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub notify_campaign_results: Option<bool>,
    pub notify_weekly_summary: Option<bool>,
}

/// `POST /api/auth/verify-2fa-login`
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "ada@example.com",
///   "code": "287082",
///   "isBackupCode": false,
///   "pendingToken": "eyJ0eXAiOiJKV1Qi..."
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TwoFactorLoginRequest {
    pub email: String,
    pub code: String,
    #[serde(default)]
    pub is_backup_code: bool,
    pub pending_token: String,
}

/// Enrollment material returned by `POST /api/user/2fa/enable`.
///
/// Nothing is stored until the client proves it can generate codes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorEnrollment {
    pub secret: String,
    pub qr_code_url: String,
    pub backup_codes: Vec<String>,
}

/// `POST /api/user/2fa/verify`: the enrollment material echoed back with a code.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfirmTwoFactorRequest {
    pub code: String,
    pub secret: String,
    pub backup_codes: Vec<String>,
}

/// `POST /api/user/2fa/disable`: either factor re-proves the caller.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DisableTwoFactorRequest {
    pub password: Option<String>,
    pub backup_code: Option<String>,
}

/// `POST /api/user/password`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}
