//! Persistence gateway.
//!
//! Handlers and services never touch SQL directly; they go through the
//! repository traits below. Two implementations exist:
//!
//! - [`postgres::PgStore`]: the production store, backed by sqlx
//! - [`memory::MemoryStore`]: process-local, selected with `DATABASE_URL=memory`
//!   and used by the test suite
//!
//! Every method is a single atomic operation from the caller's point of view.
//! Compare-and-swap style methods (`transition_campaign`,
//! `consume_backup_code`) report whether they won with a `bool`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    automation::{Automation, AutomationDefinition},
    campaign::{
        Campaign, CampaignContent, CampaignRecipient, CampaignStatus, NewCampaign,
        RecipientDelivery, RecipientStatus,
    },
    coupon::{Coupon, NewCoupon},
    customer::{Customer, PosCustomer},
    integration::{Integration, IntegrationUpsert, Platform},
    shop::{Shop, ShopRequest},
    user::{NewUser, ProfileUpdate, TwoFactorSettings, User},
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, new: NewUser) -> Result<User, AppError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, AppError>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError>;
    /// `Some` enables two-factor with the given material, `None` clears it.
    async fn set_two_factor(
        &self,
        id: Uuid,
        settings: Option<TwoFactorSettings>,
    ) -> Result<(), AppError>;
    /// Atomically remove `code_hash` from the user's backup codes.
    /// Returns false when it was not present.
    async fn consume_backup_code(&self, id: Uuid, code_hash: &str) -> Result<bool, AppError>;
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ShopStore: Send + Sync {
    async fn create_shop(&self, user_id: Uuid, shop: &ShopRequest) -> Result<Shop, AppError>;
    /// Oldest first.
    async fn list_shops(&self, user_id: Uuid) -> Result<Vec<Shop>, AppError>;
    async fn find_shop(&self, id: Uuid) -> Result<Option<Shop>, AppError>;
    async fn update_shop(&self, id: Uuid, shop: &ShopRequest) -> Result<Shop, AppError>;
    async fn delete_shop(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Newest first.
    async fn list_customers(&self, shop_id: Uuid) -> Result<Vec<Customer>, AppError>;
    /// Insert or refresh the customer keyed on `(shop_id, external_id)`.
    /// Locally maintained aggregates and the type tag survive a refresh.
    async fn upsert_pos_customer(
        &self,
        shop_id: Uuid,
        customer: &PosCustomer,
    ) -> Result<Customer, AppError>;
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Insert the campaign and one `Pending` recipient per customer id, atomically.
    async fn create_campaign(
        &self,
        shop_id: Uuid,
        campaign: &NewCampaign,
        customer_ids: &[Uuid],
    ) -> Result<Campaign, AppError>;
    /// Newest first.
    async fn list_campaigns(&self, shop_id: Uuid) -> Result<Vec<Campaign>, AppError>;
    async fn find_campaign(&self, id: Uuid) -> Result<Option<Campaign>, AppError>;
    /// Write `content` and move the status from `expected` to `to` in one
    /// conditional update. `None`, with nothing written, when the stored
    /// status is no longer `expected`. Entering `Sent` stamps `sent_at`.
    async fn edit_campaign(
        &self,
        id: Uuid,
        expected: CampaignStatus,
        content: &CampaignContent,
        to: CampaignStatus,
    ) -> Result<Option<Campaign>, AppError>;
    /// Compare-and-swap on the status column. Setting `Sent` stamps `sent_at`.
    async fn transition_campaign(
        &self,
        id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, AppError>;
    /// `Scheduled` campaigns with `scheduled_for <= now`, oldest due first.
    async fn due_campaigns(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, AppError>;
    async fn delete_campaign(&self, id: Uuid) -> Result<bool, AppError>;
    async fn list_recipients(&self, campaign_id: Uuid) -> Result<Vec<CampaignRecipient>, AppError>;
    async fn recipient_deliveries(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<RecipientDelivery>, AppError>;
    async fn set_recipient_status(
        &self,
        recipient_id: Uuid,
        status: RecipientStatus,
        error: Option<String>,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Fails with `Conflict` when `code_name` is taken by anyone.
    async fn create_coupon(&self, user_id: Uuid, coupon: &NewCoupon) -> Result<Coupon, AppError>;
    /// Newest first.
    async fn list_coupons(&self, user_id: Uuid) -> Result<Vec<Coupon>, AppError>;
    async fn find_coupon(&self, id: Uuid) -> Result<Option<Coupon>, AppError>;
    async fn find_coupon_by_code(&self, code_name: &str) -> Result<Option<Coupon>, AppError>;
    /// Fails with `Conflict` when the new `code_name` is taken by another coupon.
    async fn update_coupon(&self, id: Uuid, coupon: &NewCoupon) -> Result<Coupon, AppError>;
    async fn delete_coupon(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait AutomationStore: Send + Sync {
    async fn create_automation(
        &self,
        shop_id: Uuid,
        automation: &AutomationDefinition,
    ) -> Result<Automation, AppError>;
    /// Newest first.
    async fn list_automations(&self, shop_id: Uuid) -> Result<Vec<Automation>, AppError>;
    async fn find_automation(&self, id: Uuid) -> Result<Option<Automation>, AppError>;
    async fn update_automation(
        &self,
        id: Uuid,
        automation: &AutomationDefinition,
    ) -> Result<Automation, AppError>;
    async fn delete_automation(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait IntegrationStore: Send + Sync {
    /// Insert or replace the connection for `(user_id, platform)`; always `connected = true`.
    async fn upsert_integration(&self, upsert: &IntegrationUpsert) -> Result<Integration, AppError>;
    async fn find_integration(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> Result<Option<Integration>, AppError>;
    async fn list_integrations(&self, user_id: Uuid) -> Result<Vec<Integration>, AppError>;
    /// Blank the tokens and flip `connected` off. False when no record exists.
    async fn disconnect_integration(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> Result<bool, AppError>;
    async fn delete_integration(&self, user_id: Uuid, platform: Platform)
    -> Result<bool, AppError>;
}

/// The full persistence gateway.
#[async_trait]
pub trait Store:
    UserStore
    + ShopStore
    + CustomerStore
    + CampaignStore
    + CouponStore
    + AutomationStore
    + IntegrationStore
{
    /// Cheap connectivity check for `/health`.
    async fn ping(&self) -> Result<(), AppError>;
}
