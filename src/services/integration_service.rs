//! OAuth connections to Square, Gmail and Outlook.
//!
//! # State parameter
//!
//! The `state` sent through the provider is
//! `base64url(JSON{userId, platform, nonce, issuedAt}) "." hex(HMAC-SHA256)`.
//! The callback is unauthenticated (the provider redirects the browser), so
//! the signed state is what ties the code back to a user. It is rejected
//! when the signature does not verify, when it was issued for another
//! platform, or when it is older than [`STATE_TTL_SECONDS`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::integration::{
    CallbackQuery, Integration, IntegrationStatus, IntegrationUpsert, Platform,
};
use crate::providers::{OAuthProvider, Providers};
use crate::services::crypto;
use crate::state::AppState;
use crate::store::Store;

/// Ten minutes.
pub const STATE_TTL_SECONDS: i64 = 600;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatePayload {
    user_id: Uuid,
    platform: Platform,
    nonce: String,
    issued_at: i64,
}

/// Why a callback `state` was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("malformed state")]
    Malformed,
    #[error("state signature mismatch")]
    BadSignature,
    #[error("state issued for another platform")]
    WrongPlatform,
    #[error("state expired")]
    Expired,
}

impl StateError {
    /// Short code put in the dashboard redirect.
    pub fn reason(&self) -> &'static str {
        match self {
            StateError::Malformed | StateError::BadSignature => "invalid_state",
            StateError::WrongPlatform => "platform_mismatch",
            StateError::Expired => "state_expired",
        }
    }
}

pub fn sign_state(secret: &str, user_id: Uuid, platform: Platform, now: DateTime<Utc>) -> Result<String, AppError> {
    let payload = StatePayload {
        user_id,
        platform,
        nonce: hex::encode(rand::random::<[u8; 16]>()),
        issued_at: now.timestamp(),
    };
    let json = serde_json::to_vec(&payload)
        .map_err(|e| AppError::Internal(format!("state encoding failed: {}", e)))?;
    let encoded = URL_SAFE_NO_PAD.encode(json);
    let signature = crypto::sign(secret, &encoded);
    Ok(format!("{}.{}", encoded, signature))
}

/// Check a callback `state` and return the user it was issued to.
pub fn verify_state(
    secret: &str,
    state: &str,
    platform: Platform,
    now: DateTime<Utc>,
) -> Result<Uuid, StateError> {
    let (encoded, signature) = state.split_once('.').ok_or(StateError::Malformed)?;
    if !crypto::verify_signature(secret, encoded, signature) {
        return Err(StateError::BadSignature);
    }

    let json = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| StateError::Malformed)?;
    let payload: StatePayload = serde_json::from_slice(&json).map_err(|_| StateError::Malformed)?;

    if payload.platform != platform {
        return Err(StateError::WrongPlatform);
    }
    let age = now.timestamp() - payload.issued_at;
    if !(0..=STATE_TTL_SECONDS).contains(&age) {
        return Err(StateError::Expired);
    }
    Ok(payload.user_id)
}

/// Consent URL for `platform`, carrying a freshly signed state.
pub fn authorize_url(state: &AppState, user_id: Uuid, platform: Platform) -> Result<String, AppError> {
    let provider = state.providers.oauth(platform)?;
    let signed = sign_state(state.config.oauth_state_secret(), user_id, platform, Utc::now())?;
    let redirect_uri = state.config.callback_url(&platform.callback_path());
    tracing::info!(user_id = %user_id, platform = platform.slug(), "oauth flow started");
    provider.authorize_url(&signed, &redirect_uri)
}

/// Dashboard URL the browser lands on after a callback.
pub fn dashboard_redirect(app_url: &str, platform: Platform, outcome: Result<(), &str>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    match outcome {
        Ok(()) => query.append_pair(platform.slug(), "connected"),
        Err(reason) => query
            .append_pair(platform.slug(), "error")
            .append_pair("reason", reason),
    };
    format!(
        "{}/dashboard/integrations?{}",
        app_url.trim_end_matches('/'),
        query.finish()
    )
}

/// Handle the provider callback and return where to redirect the browser.
///
/// Never fails: every problem ends up as `?<platform>=error&reason=...`.
pub async fn complete_authorization(
    state: &AppState,
    platform: Platform,
    query: CallbackQuery,
    now: DateTime<Utc>,
) -> String {
    let outcome = connect(state, platform, query, now).await;
    if let Err(reason) = &outcome {
        tracing::warn!(platform = platform.slug(), reason = %reason, "oauth callback failed");
    }
    dashboard_redirect(&state.config.app_url, platform, outcome.as_ref().map(|_| ()).map_err(String::as_str))
}

async fn connect(
    state: &AppState,
    platform: Platform,
    query: CallbackQuery,
    now: DateTime<Utc>,
) -> Result<Integration, String> {
    if let Some(error) = query.error {
        return Err(error);
    }
    let signed = query.state.ok_or("missing_state")?;
    let user_id = verify_state(state.config.oauth_state_secret(), &signed, platform, now)
        .map_err(|e| e.reason().to_string())?;
    let code = query.code.filter(|c| !c.is_empty()).ok_or("missing_code")?;

    let provider = state
        .providers
        .oauth(platform)
        .map_err(|_| "not_configured".to_string())?;
    let redirect_uri = state.config.callback_url(&platform.callback_path());

    let integration = link_account(state.store.as_ref(), provider.as_ref(), user_id, &code, &redirect_uri)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user_id, platform = platform.slug(), error = %e, "oauth exchange failed");
            "exchange_failed".to_string()
        })?;

    tracing::info!(user_id = %user_id, platform = platform.slug(), "integration connected");
    Ok(integration)
}

async fn link_account(
    store: &dyn Store,
    provider: &dyn OAuthProvider,
    user_id: Uuid,
    code: &str,
    redirect_uri: &str,
) -> Result<Integration, AppError> {
    let grant = provider.exchange_code(code, redirect_uri).await?;
    let account = provider.fetch_account(&grant).await?;
    store
        .upsert_integration(&IntegrationUpsert {
            user_id,
            platform: provider.platform(),
            account,
            grant,
        })
        .await
}

/// Revoke at the provider (best effort), then blank or delete the record.
pub async fn disconnect(
    store: &dyn Store,
    providers: &Providers,
    user_id: Uuid,
    platform: Platform,
    hard_delete: bool,
) -> Result<(), AppError> {
    let integration = store
        .find_integration(user_id, platform)
        .await?
        .ok_or(AppError::NotFound("Integration not found"))?;

    if integration.access_token.is_some() {
        match providers.oauth(platform) {
            Ok(provider) => {
                if let Err(e) = provider.revoke(&integration).await {
                    tracing::warn!(user_id = %user_id, platform = platform.slug(), error = %e, "token revoke failed, disconnecting anyway");
                }
            }
            Err(_) => {
                tracing::warn!(platform = platform.slug(), "provider not configured, skipping revoke");
            }
        }
    }

    let removed = if hard_delete {
        store.delete_integration(user_id, platform).await?
    } else {
        store.disconnect_integration(user_id, platform).await?
    };
    if !removed {
        return Err(AppError::NotFound("Integration not found"));
    }

    tracing::info!(user_id = %user_id, platform = platform.slug(), hard_delete, "integration disconnected");
    Ok(())
}

/// One entry per platform, connected or not.
pub async fn list_status(store: &dyn Store, user_id: Uuid) -> Result<Vec<IntegrationStatus>, AppError> {
    let integrations = store.list_integrations(user_id).await?;
    Ok(Platform::ALL
        .iter()
        .map(|platform| {
            integrations
                .iter()
                .find(|i| i.platform == *platform)
                .map(IntegrationStatus::from)
                .unwrap_or_else(|| IntegrationStatus::disconnected(*platform))
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::integration::{AccountInfo, TokenGrant};
    use crate::store::memory::MemoryStore;
    use crate::store::IntegrationStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider double: fixed tokens, optional failing revoke.
    pub(crate) struct FakeOAuth {
        pub platform: Platform,
        pub fail_revoke: bool,
        pub revokes: AtomicUsize,
    }

    impl FakeOAuth {
        pub(crate) fn new(platform: Platform) -> Self {
            Self {
                platform,
                fail_revoke: false,
                revokes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OAuthProvider for FakeOAuth {
        fn platform(&self) -> Platform {
            self.platform
        }

        fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, AppError> {
            Ok(format!("https://provider.test/authorize?state={}&redirect_uri={}", state, redirect_uri))
        }

        async fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<TokenGrant, AppError> {
            if code == "bad" {
                return Err(AppError::Upstream("invalid_grant".into()));
            }
            Ok(TokenGrant {
                access_token: format!("token-{}", code),
                refresh_token: Some("refresh".into()),
                expires_at: None,
                account_hint: None,
            })
        }

        async fn fetch_account(&self, _grant: &TokenGrant) -> Result<AccountInfo, AppError> {
            Ok(AccountInfo {
                account_id: "acct-1".into(),
                account_name: Some("Corner Bakery".into()),
            })
        }

        async fn revoke(&self, _integration: &Integration) -> Result<(), AppError> {
            self.revokes.fetch_add(1, Ordering::SeqCst);
            if self.fail_revoke {
                return Err(AppError::Upstream("revoke endpoint down".into()));
            }
            Ok(())
        }
    }

    const SECRET: &str = "state-secret";

    #[test]
    fn state_round_trips_for_the_issuing_platform() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let state = sign_state(SECRET, user, Platform::Gmail, now).unwrap();
        assert_eq!(verify_state(SECRET, &state, Platform::Gmail, now), Ok(user));
        assert_eq!(
            verify_state(SECRET, &state, Platform::Outlook, now),
            Err(StateError::WrongPlatform)
        );
    }

    #[test]
    fn tampered_state_is_rejected() {
        let now = Utc::now();
        let state = sign_state(SECRET, Uuid::new_v4(), Platform::Square, now).unwrap();
        let (payload, signature) = state.split_once('.').unwrap();

        let forged_payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&StatePayload {
                user_id: Uuid::new_v4(),
                platform: Platform::Square,
                nonce: "n".into(),
                issued_at: now.timestamp(),
            })
            .unwrap(),
        );
        let forged = format!("{}.{}", forged_payload, signature);
        assert_eq!(
            verify_state(SECRET, &forged, Platform::Square, now),
            Err(StateError::BadSignature)
        );
        assert_eq!(
            verify_state("other-secret", &state, Platform::Square, now),
            Err(StateError::BadSignature)
        );
        assert_eq!(
            verify_state(SECRET, payload, Platform::Square, now),
            Err(StateError::Malformed)
        );
    }

    #[test]
    fn state_expires_after_ten_minutes() {
        let issued = Utc::now();
        let state = sign_state(SECRET, Uuid::new_v4(), Platform::Square, issued).unwrap();
        assert!(verify_state(SECRET, &state, Platform::Square, issued + Duration::minutes(9)).is_ok());
        assert_eq!(
            verify_state(SECRET, &state, Platform::Square, issued + Duration::minutes(11)),
            Err(StateError::Expired)
        );
    }

    #[test]
    fn redirects_carry_outcome() {
        assert_eq!(
            dashboard_redirect("http://app.test/", Platform::Square, Ok(())),
            "http://app.test/dashboard/integrations?square=connected"
        );
        assert_eq!(
            dashboard_redirect("http://app.test", Platform::Gmail, Err("access denied")),
            "http://app.test/dashboard/integrations?gmail=error&reason=access+denied"
        );
    }

    fn state_with(provider: FakeOAuth) -> AppState {
        let mut state = AppState::fake();
        state.providers = Providers::default().with_oauth(Arc::new(provider));
        state
    }

    #[tokio::test]
    async fn callback_connects_and_reports_failures() {
        let state = state_with(FakeOAuth::new(Platform::Gmail));
        let user = Uuid::new_v4();
        let now = Utc::now();
        let signed = sign_state(state.config.oauth_state_secret(), user, Platform::Gmail, now).unwrap();

        let query = |code: &str, state: Option<String>| CallbackQuery {
            code: Some(code.into()),
            state,
            error: None,
        };

        let url = complete_authorization(&state, Platform::Gmail, query("bad", Some(signed.clone())), now).await;
        assert!(url.ends_with("gmail=error&reason=exchange_failed"), "{}", url);

        let url = complete_authorization(&state, Platform::Gmail, query("ok", None), now).await;
        assert!(url.ends_with("gmail=error&reason=missing_state"), "{}", url);

        let url = complete_authorization(&state, Platform::Gmail, query("ok", Some(signed)), now).await;
        assert!(url.ends_with("gmail=connected"), "{}", url);

        let stored = state.store.find_integration(user, Platform::Gmail).await.unwrap().unwrap();
        assert!(stored.connected);
        assert_eq!(stored.access_token.as_deref(), Some("token-ok"));
    }

    #[tokio::test]
    async fn provider_error_param_is_passed_through() {
        let state = state_with(FakeOAuth::new(Platform::Square));
        let url = complete_authorization(
            &state,
            Platform::Square,
            CallbackQuery {
                code: None,
                state: None,
                error: Some("access_denied".into()),
            },
            Utc::now(),
        )
        .await;
        assert!(url.ends_with("square=error&reason=access_denied"), "{}", url);
    }

    #[tokio::test]
    async fn disconnect_survives_a_failing_revoke() {
        let store = MemoryStore::new();
        let fake = Arc::new(FakeOAuth {
            fail_revoke: true,
            ..FakeOAuth::new(Platform::Square)
        });
        let providers = Providers::default().with_oauth(fake.clone());
        let user = Uuid::new_v4();
        link_account(&store, fake.as_ref(), user, "ok", "http://app.test/cb").await.unwrap();

        disconnect(&store, &providers, user, Platform::Square, false).await.unwrap();
        assert_eq!(fake.revokes.load(Ordering::SeqCst), 1);

        let stored = store.find_integration(user, Platform::Square).await.unwrap().unwrap();
        assert!(!stored.connected);
        assert!(stored.access_token.is_none());

        // Tokens are gone, so a second disconnect does not call the provider.
        disconnect(&store, &providers, user, Platform::Square, true).await.unwrap();
        assert_eq!(fake.revokes.load(Ordering::SeqCst), 1);
        assert!(store.find_integration(user, Platform::Square).await.unwrap().is_none());

        let err = disconnect(&store, &providers, user, Platform::Square, true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn status_lists_every_platform() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        link_account(&store, &FakeOAuth::new(Platform::Outlook), user, "ok", "cb").await.unwrap();

        let status = list_status(&store, user).await.unwrap();
        assert_eq!(status.len(), 3);
        assert!(!status[0].connected);
        assert!(status[2].connected);
        assert_eq!(status[2].account_name.as_deref(), Some("Corner Bakery"));
    }
}
