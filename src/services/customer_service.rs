//! Customers of the active shop and the point-of-sale import.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{customer::Customer, integration::Platform, shop::Shop};
use crate::providers::CustomerSource;
use crate::store::Store;

pub async fn list_customers(store: &dyn Store, shop: &Shop) -> Result<Vec<Customer>, AppError> {
    store.list_customers(shop.id).await
}

/// Pull every customer from the caller's connected Square account into `shop`.
///
/// Returns the number of customers upserted. Re-importing refreshes contact
/// fields and never duplicates a customer.
///
/// # Errors
///
/// - 400 when Square is not connected for `user_id`
/// - 500 when the provider call fails
pub async fn import_customers(
    store: &dyn Store,
    source: &dyn CustomerSource,
    user_id: Uuid,
    shop: &Shop,
) -> Result<usize, AppError> {
    let access_token = store
        .find_integration(user_id, Platform::Square)
        .await?
        .filter(|i| i.connected)
        .and_then(|i| i.access_token)
        .ok_or_else(|| AppError::invalid("Square is not connected"))?;

    let customers = source.list_customers(&access_token).await?;

    let mut imported = 0;
    for customer in &customers {
        if customer.external_id.trim().is_empty() {
            tracing::warn!(shop_id = %shop.id, "skipping POS customer without an id");
            continue;
        }
        store.upsert_pos_customer(shop.id, customer).await?;
        imported += 1;
    }

    tracing::info!(shop_id = %shop.id, imported, "customers imported");
    Ok(imported)
}
