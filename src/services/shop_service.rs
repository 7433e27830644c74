//! Shops and the active-shop selection.
//!
//! The active shop is carried in the `activeShopId` cookie, which the client
//! can forge, so every read re-checks ownership against the store.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::shop::{Shop, ShopRequest};
use crate::store::Store;

/// What a shop mutation means for the caller's `activeShopId` cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveShopChange {
    Keep,
    Set(Uuid),
    Clear,
}

async fn owned_shop(store: &dyn Store, user_id: Uuid, shop_id: Uuid) -> Result<Option<Shop>, AppError> {
    Ok(store
        .find_shop(shop_id)
        .await?
        .filter(|shop| shop.user_id == user_id))
}

/// The cookie's shop id when it names a shop the caller owns.
pub async fn active_shop_id(
    store: &dyn Store,
    user_id: Uuid,
    cookie: Option<Uuid>,
) -> Result<Option<Uuid>, AppError> {
    let Some(shop_id) = cookie else {
        return Ok(None);
    };
    Ok(owned_shop(store, user_id, shop_id).await?.map(|shop| shop.id))
}

/// Shop that tenant-scoped endpoints operate on.
///
/// The cookie's shop when owned, else the caller's oldest shop.
pub async fn resolve_active_shop(
    store: &dyn Store,
    user_id: Uuid,
    cookie: Option<Uuid>,
) -> Result<Shop, AppError> {
    if let Some(shop_id) = cookie {
        if let Some(shop) = owned_shop(store, user_id, shop_id).await? {
            return Ok(shop);
        }
    }
    store
        .list_shops(user_id)
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NotFound("No active shop"))
}

/// Check that `shop_id` may become the caller's active shop.
///
/// Missing and foreign shops both give 403 so ids cannot be probed.
pub async fn select_active_shop(
    store: &dyn Store,
    user_id: Uuid,
    shop_id: Uuid,
) -> Result<Uuid, AppError> {
    match owned_shop(store, user_id, shop_id).await? {
        Some(shop) => Ok(shop.id),
        None => {
            tracing::warn!(user_id = %user_id, shop_id = %shop_id, "refused to activate a foreign shop");
            Err(AppError::Forbidden("You do not have access to this shop"))
        }
    }
}

pub async fn list_shops(store: &dyn Store, user_id: Uuid) -> Result<Vec<Shop>, AppError> {
    store.list_shops(user_id).await
}

pub async fn get_shop(store: &dyn Store, user_id: Uuid, shop_id: Uuid) -> Result<Shop, AppError> {
    owned_shop(store, user_id, shop_id)
        .await?
        .ok_or(AppError::NotFound("Shop not found"))
}

/// Create a shop. It becomes active when the caller has no valid active shop yet.
pub async fn create_shop(
    store: &dyn Store,
    user_id: Uuid,
    request: ShopRequest,
    cookie: Option<Uuid>,
) -> Result<(Shop, ActiveShopChange), AppError> {
    request.validate()?;
    let shop = store.create_shop(user_id, &request).await?;
    tracing::info!(user_id = %user_id, shop_id = %shop.id, "shop created");

    let change = match active_shop_id(store, user_id, cookie).await? {
        Some(_) => ActiveShopChange::Keep,
        None => ActiveShopChange::Set(shop.id),
    };
    Ok((shop, change))
}

pub async fn update_shop(
    store: &dyn Store,
    user_id: Uuid,
    shop_id: Uuid,
    request: ShopRequest,
) -> Result<Shop, AppError> {
    request.validate()?;
    get_shop(store, user_id, shop_id).await?;
    store.update_shop(shop_id, &request).await
}

/// Delete a shop with its customers, campaigns and automations.
///
/// When it was the active one, the selection moves to the oldest remaining
/// shop, or is cleared when none is left.
pub async fn delete_shop(
    store: &dyn Store,
    user_id: Uuid,
    shop_id: Uuid,
    cookie: Option<Uuid>,
) -> Result<ActiveShopChange, AppError> {
    get_shop(store, user_id, shop_id).await?;
    store.delete_shop(shop_id).await?;
    tracing::info!(user_id = %user_id, shop_id = %shop_id, "shop deleted");

    if cookie != Some(shop_id) {
        return Ok(ActiveShopChange::Keep);
    }
    let next = store.list_shops(user_id).await?.into_iter().next();
    Ok(match next {
        Some(shop) => ActiveShopChange::Set(shop.id),
        None => ActiveShopChange::Clear,
    })
}
