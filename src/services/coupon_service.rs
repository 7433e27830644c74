//! Coupon management.
//!
//! Coupons belong to a user, not a shop. Codes are unique across every
//! user, so a create can conflict with a coupon the caller cannot see.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::coupon::{Coupon, CreateCouponRequest, UpdateCouponRequest};
use crate::store::Store;

/// Load a coupon and require the caller to own it.
///
/// # Errors
///
/// - 404 when it does not exist
/// - 403 when it belongs to someone else
pub async fn owned_coupon(
    store: &dyn Store,
    user_id: Uuid,
    coupon_id: Uuid,
) -> Result<Coupon, AppError> {
    let coupon = store
        .find_coupon(coupon_id)
        .await?
        .ok_or(AppError::NotFound("Coupon not found"))?;
    if coupon.user_id != user_id {
        tracing::warn!(user_id = %user_id, coupon_id = %coupon_id, "coupon ownership mismatch");
        return Err(AppError::Forbidden("You do not own this coupon"));
    }
    Ok(coupon)
}

pub async fn create_coupon(
    store: &dyn Store,
    user_id: Uuid,
    request: CreateCouponRequest,
) -> Result<Coupon, AppError> {
    let new = request.validate()?;
    let coupon = store.create_coupon(user_id, &new).await?;
    tracing::info!(user_id = %user_id, coupon_id = %coupon.id, code = %coupon.code_name, "coupon created");
    Ok(coupon)
}

/// Newest first.
pub async fn list_coupons(store: &dyn Store, user_id: Uuid) -> Result<Vec<Coupon>, AppError> {
    store.list_coupons(user_id).await
}

pub async fn update_coupon(
    store: &dyn Store,
    user_id: Uuid,
    coupon_id: Uuid,
    request: UpdateCouponRequest,
) -> Result<Coupon, AppError> {
    let current = owned_coupon(store, user_id, coupon_id).await?;
    let merged = request.apply(&current)?;
    store.update_coupon(coupon_id, &merged).await
}

pub async fn delete_coupon(
    store: &dyn Store,
    user_id: Uuid,
    coupon_id: Uuid,
) -> Result<(), AppError> {
    owned_coupon(store, user_id, coupon_id).await?;
    if !store.delete_coupon(coupon_id).await? {
        return Err(AppError::NotFound("Coupon not found"));
    }
    tracing::info!(user_id = %user_id, coupon_id = %coupon_id, "coupon deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::CouponStore;

    fn summer(discount: f64) -> CreateCouponRequest {
        CreateCouponRequest {
            code_name: Some("SUMMER2025".into()),
            discount: Some(discount),
            valid_until: Some("2025-09-01T00:00:00".into()),
            description: None,
        }
    }

    #[tokio::test]
    async fn coupons_are_listed_per_owner() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let coupon = create_coupon(&store, a, summer(15.0)).await.unwrap();

        let listed = list_coupons(&store, a).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, coupon.id);
        assert!(list_coupons(&store, b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_code_from_another_user_conflicts() {
        let store = MemoryStore::new();
        create_coupon(&store, Uuid::new_v4(), summer(15.0)).await.unwrap();
        let err = create_coupon(&store, Uuid::new_v4(), summer(20.0)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(store.find_coupon_by_code("SUMMER2025").await.unwrap().unwrap().discount == 15.0);
    }

    #[tokio::test]
    async fn non_owner_cannot_update_or_delete() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let coupon = create_coupon(&store, owner, summer(15.0)).await.unwrap();
        let intruder = Uuid::new_v4();

        let update = UpdateCouponRequest {
            discount: Some(90.0),
            ..Default::default()
        };
        let err = update_coupon(&store, intruder, coupon.id, update).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = delete_coupon(&store, intruder, coupon.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let stored = store.find_coupon(coupon.id).await.unwrap().unwrap();
        assert_eq!(stored.discount, 15.0);
    }

    #[tokio::test]
    async fn owner_updates_and_deletes() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let coupon = create_coupon(&store, owner, summer(15.0)).await.unwrap();

        let updated = update_coupon(
            &store,
            owner,
            coupon.id,
            UpdateCouponRequest {
                discount: Some(20.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.discount, 20.0);
        assert_eq!(updated.code_name, "SUMMER2025");

        delete_coupon(&store, owner, coupon.id).await.unwrap();
        let err = delete_coupon(&store, owner, coupon.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
