//! Customer HTTP handlers.

use axum::{Extension, Json, extract::State};

use crate::{
    error::AppError,
    middleware::{active_shop::ActiveShop, auth::AuthContext},
    models::customer::{Customer, ImportResponse},
    services::customer_service,
    state::AppState,
};

/// `GET /api/customers`: customers of the active shop, newest first.
pub async fn list_customers(
    State(state): State<AppState>,
    ActiveShop(shop): ActiveShop,
) -> Result<Json<Vec<Customer>>, AppError> {
    Ok(Json(customer_service::list_customers(state.store.as_ref(), &shop).await?))
}

/// Import customers from the connected Square account.
///
/// # Endpoint
///
/// `POST /api/customers/import`
///
/// # Response
///
/// ```json
/// { "success": true, "imported": 42 }
/// ```
///
/// 400 when Square is not connected (or not configured on this server).
pub async fn import_customers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ActiveShop(shop): ActiveShop,
) -> Result<Json<ImportResponse>, AppError> {
    let source = state.providers.customer_source()?;
    let imported = customer_service::import_customers(
        state.store.as_ref(),
        source.as_ref(),
        auth.user.id,
        &shop,
    )
    .await?;
    Ok(Json(ImportResponse {
        success: true,
        imported,
    }))
}
