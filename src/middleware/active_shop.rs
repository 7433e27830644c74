//! Tenant resolution for shop-scoped endpoints.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    cookies::ActiveShopCookie, error::AppError, middleware::auth::AuthContext,
    models::shop::Shop, services::shop_service, state::AppState,
};

/// The shop a tenant-scoped request operates on.
///
/// Must run behind `auth_middleware`. Resolution order: the `activeShopId`
/// cookie when it names a shop the caller owns, else the caller's oldest
/// shop, else 404 "No active shop".
#[derive(Debug, Clone)]
pub struct ActiveShop(pub Shop);

impl FromRequestParts<AppState> for ActiveShop {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .extensions
            .get::<AuthContext>()
            .map(|auth| auth.user.id)
            .ok_or(AppError::Unauthorized("Authentication required"))?;
        let Ok(ActiveShopCookie(cookie)) = ActiveShopCookie::from_request_parts(parts, state).await;

        let shop = shop_service::resolve_active_shop(state.store.as_ref(), user_id, cookie).await?;
        Ok(Self(shop))
    }
}
