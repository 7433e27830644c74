//! Automations scoped to the active shop.
//!
//! A `SendCoupon` automation may only point at a coupon the caller owns.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    automation::{
        ActionType, Automation, AutomationDefinition, CreateAutomationRequest,
        UpdateAutomationRequest,
    },
    shop::Shop,
};
use crate::services::coupon_service;
use crate::store::Store;

async fn owned_automation(store: &dyn Store, shop: &Shop, id: Uuid) -> Result<Automation, AppError> {
    store
        .find_automation(id)
        .await?
        .filter(|a| a.shop_id == shop.id)
        .ok_or(AppError::NotFound("Automation not found"))
}

async fn check_coupon(
    store: &dyn Store,
    shop: &Shop,
    definition: &AutomationDefinition,
) -> Result<(), AppError> {
    if definition.action_type != ActionType::SendCoupon {
        return Ok(());
    }
    if let Some(coupon_id) = definition.coupon_id {
        coupon_service::owned_coupon(store, shop.user_id, coupon_id).await?;
    }
    Ok(())
}

pub async fn list_automations(store: &dyn Store, shop: &Shop) -> Result<Vec<Automation>, AppError> {
    store.list_automations(shop.id).await
}

pub async fn get_automation(store: &dyn Store, shop: &Shop, id: Uuid) -> Result<Automation, AppError> {
    owned_automation(store, shop, id).await
}

pub async fn create_automation(
    store: &dyn Store,
    shop: &Shop,
    request: CreateAutomationRequest,
) -> Result<Automation, AppError> {
    let definition = request.into_definition()?;
    check_coupon(store, shop, &definition).await?;
    let automation = store.create_automation(shop.id, &definition).await?;
    tracing::info!(
        shop_id = %shop.id,
        automation_id = %automation.id,
        trigger = ?automation.trigger_type,
        action = ?automation.action_type,
        "automation created"
    );
    Ok(automation)
}

pub async fn update_automation(
    store: &dyn Store,
    shop: &Shop,
    id: Uuid,
    request: UpdateAutomationRequest,
) -> Result<Automation, AppError> {
    let current = owned_automation(store, shop, id).await?;
    let definition = request.apply(&current)?;
    check_coupon(store, shop, &definition).await?;
    store.update_automation(id, &definition).await
}

pub async fn delete_automation(store: &dyn Store, shop: &Shop, id: Uuid) -> Result<(), AppError> {
    owned_automation(store, shop, id).await?;
    store.delete_automation(id).await?;
    tracing::info!(shop_id = %shop.id, automation_id = %id, "automation deleted");
    Ok(())
}
