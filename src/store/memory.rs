//! In-process store.
//!
//! All tables live behind one async mutex, so every trait method is atomic
//! with respect to every other, the same guarantee a single SQL statement
//! gives in [`super::postgres::PgStore`]. Rows are kept in insertion order,
//! which stands in for `ORDER BY created_at`.
//!
//! Uniqueness and cascade rules mirror the migration.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AutomationStore, CampaignStore, CouponStore, CustomerStore, IntegrationStore, ShopStore,
    Store, UserStore,
};
use crate::error::AppError;
use crate::models::{
    automation::{Automation, AutomationDefinition},
    campaign::{
        Campaign, CampaignContent, CampaignRecipient, CampaignStatus, NewCampaign,
        RecipientDelivery, RecipientStatus,
    },
    coupon::{Coupon, NewCoupon},
    customer::{Customer, DEFAULT_CUSTOMER_TYPE, PosCustomer},
    integration::{Integration, IntegrationUpsert, Platform},
    shop::{Shop, ShopRequest},
    user::{NewUser, ProfileUpdate, Role, TwoFactorSettings, User},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    shops: Vec<Shop>,
    customers: Vec<Customer>,
    campaigns: Vec<Campaign>,
    recipients: Vec<CampaignRecipient>,
    coupons: Vec<Coupon>,
    automations: Vec<Automation>,
    integrations: Vec<Integration>,
}

impl Tables {
    fn remove_shop_rows(&mut self, shop_ids: &[Uuid]) {
        let campaign_ids: Vec<Uuid> = self
            .campaigns
            .iter()
            .filter(|c| shop_ids.contains(&c.shop_id))
            .map(|c| c.id)
            .collect();
        self.recipients.retain(|r| !campaign_ids.contains(&r.campaign_id));
        self.campaigns.retain(|c| !shop_ids.contains(&c.shop_id));
        self.customers.retain(|c| !shop_ids.contains(&c.shop_id));
        self.automations.retain(|a| !shop_ids.contains(&a.shop_id));
        self.shops.retain(|s| !shop_ids.contains(&s.id));
    }

    fn coupon_code_taken(&self, code_name: &str, except: Option<Uuid>) -> bool {
        self.coupons
            .iter()
            .any(|c| c.code_name == code_name && Some(c.id) != except)
    }
}

/// Store that keeps everything in memory. Data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            role: Role::User,
            two_factor_enabled: false,
            two_factor_secret: None,
            backup_codes: Vec::new(),
            notify_campaign_results: true,
            notify_weekly_summary: false,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, AppError> {
        let mut t = self.tables.lock().await;
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("User not found"))?;
        if update.name.is_some() {
            user.name = blank_to_none(&update.name);
        }
        if let Some(flag) = update.notify_campaign_results {
            user.notify_campaign_results = flag;
        }
        if let Some(flag) = update.notify_weekly_summary {
            user.notify_weekly_summary = flag;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut t = self.tables.lock().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_two_factor(
        &self,
        id: Uuid,
        settings: Option<TwoFactorSettings>,
    ) -> Result<(), AppError> {
        let mut t = self.tables.lock().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.id == id) {
            match settings {
                Some(s) => {
                    user.two_factor_enabled = true;
                    user.two_factor_secret = Some(s.encrypted_secret);
                    user.backup_codes = s.backup_code_hashes;
                }
                None => {
                    user.two_factor_enabled = false;
                    user.two_factor_secret = None;
                    user.backup_codes.clear();
                }
            }
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn consume_backup_code(&self, id: Uuid, code_hash: &str) -> Result<bool, AppError> {
        let mut t = self.tables.lock().await;
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        let Some(pos) = user.backup_codes.iter().position(|c| c == code_hash) else {
            return Ok(false);
        };
        user.backup_codes.remove(pos);
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.tables.lock().await;
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        if t.users.len() == before {
            return Ok(false);
        }
        let shop_ids: Vec<Uuid> = t
            .shops
            .iter()
            .filter(|s| s.user_id == id)
            .map(|s| s.id)
            .collect();
        t.remove_shop_rows(&shop_ids);
        let coupon_ids: Vec<Uuid> = t
            .coupons
            .iter()
            .filter(|c| c.user_id == id)
            .map(|c| c.id)
            .collect();
        t.coupons.retain(|c| c.user_id != id);
        for automation in t.automations.iter_mut() {
            if automation.coupon_id.is_some_and(|c| coupon_ids.contains(&c)) {
                automation.coupon_id = None;
            }
        }
        t.integrations.retain(|i| i.user_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn create_shop(&self, user_id: Uuid, shop: &ShopRequest) -> Result<Shop, AppError> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let shop = Shop {
            id: Uuid::new_v4(),
            user_id,
            name: shop.name.trim().to_string(),
            email: shop.email.clone(),
            phone: shop.phone.clone(),
            address: shop.address.clone(),
            created_at: now,
            updated_at: now,
        };
        t.shops.push(shop.clone());
        Ok(shop)
    }

    async fn list_shops(&self, user_id: Uuid) -> Result<Vec<Shop>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.shops.iter().filter(|s| s.user_id == user_id).cloned().collect())
    }

    async fn find_shop(&self, id: Uuid) -> Result<Option<Shop>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.shops.iter().find(|s| s.id == id).cloned())
    }

    async fn update_shop(&self, id: Uuid, request: &ShopRequest) -> Result<Shop, AppError> {
        let mut t = self.tables.lock().await;
        let shop = t
            .shops
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::NotFound("Shop not found"))?;
        shop.name = request.name.trim().to_string();
        shop.email = request.email.clone();
        shop.phone = request.phone.clone();
        shop.address = request.address.clone();
        shop.updated_at = Utc::now();
        Ok(shop.clone())
    }

    async fn delete_shop(&self, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.tables.lock().await;
        let existed = t.shops.iter().any(|s| s.id == id);
        t.remove_shop_rows(&[id]);
        Ok(existed)
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn list_customers(&self, shop_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.customers
            .iter()
            .rev()
            .filter(|c| c.shop_id == shop_id)
            .cloned()
            .collect())
    }

    async fn upsert_pos_customer(
        &self,
        shop_id: Uuid,
        pos: &PosCustomer,
    ) -> Result<Customer, AppError> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        if let Some(existing) = t.customers.iter_mut().find(|c| {
            c.shop_id == shop_id && c.square_customer_id.as_deref() == Some(pos.external_id.as_str())
        }) {
            existing.first_name = pos.first_name.clone();
            existing.last_name = pos.last_name.clone();
            existing.email = pos.email.clone();
            existing.phone = pos.phone.clone();
            existing.address = pos.address.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let customer = Customer {
            id: Uuid::new_v4(),
            shop_id,
            square_customer_id: Some(pos.external_id.clone()),
            first_name: pos.first_name.clone(),
            last_name: pos.last_name.clone(),
            email: pos.email.clone(),
            phone: pos.phone.clone(),
            address: pos.address.clone(),
            total_spent_cents: 0,
            order_count: 0,
            customer_type: DEFAULT_CUSTOMER_TYPE.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.customers.push(customer.clone());
        Ok(customer)
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn create_campaign(
        &self,
        shop_id: Uuid,
        new: &NewCampaign,
        customer_ids: &[Uuid],
    ) -> Result<Campaign, AppError> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            shop_id,
            name: new.name.clone(),
            audience_id: new.audience_id.clone(),
            subject: new.subject.clone(),
            body: new.body.clone(),
            status: new.status,
            scheduled_for: new.scheduled_for,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        t.campaigns.push(campaign.clone());

        let mut seen = Vec::with_capacity(customer_ids.len());
        for &customer_id in customer_ids {
            if seen.contains(&customer_id) {
                continue;
            }
            seen.push(customer_id);
            t.recipients.push(CampaignRecipient {
                id: Uuid::new_v4(),
                campaign_id: campaign.id,
                customer_id,
                status: RecipientStatus::Pending,
                sent_at: None,
                error: None,
            });
        }
        Ok(campaign)
    }

    async fn list_campaigns(&self, shop_id: Uuid) -> Result<Vec<Campaign>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.campaigns
            .iter()
            .rev()
            .filter(|c| c.shop_id == shop_id)
            .cloned()
            .collect())
    }

    async fn find_campaign(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn edit_campaign(
        &self,
        id: Uuid,
        expected: CampaignStatus,
        content: &CampaignContent,
        to: CampaignStatus,
    ) -> Result<Option<Campaign>, AppError> {
        let mut t = self.tables.lock().await;
        let Some(campaign) = t
            .campaigns
            .iter_mut()
            .find(|c| c.id == id && c.status == expected)
        else {
            return Ok(None);
        };
        let now = Utc::now();
        campaign.name = content.name.clone();
        campaign.subject = content.subject.clone();
        campaign.body = content.body.clone();
        campaign.scheduled_for = content.scheduled_for;
        if to == CampaignStatus::Sent && expected != CampaignStatus::Sent {
            campaign.sent_at = Some(now);
        }
        campaign.status = to;
        campaign.updated_at = now;
        Ok(Some(campaign.clone()))
    }

    async fn transition_campaign(
        &self,
        id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, AppError> {
        let mut t = self.tables.lock().await;
        let Some(campaign) = t.campaigns.iter_mut().find(|c| c.id == id && c.status == from)
        else {
            return Ok(false);
        };
        let now = Utc::now();
        campaign.status = to;
        if to == CampaignStatus::Sent {
            campaign.sent_at = Some(now);
        }
        campaign.updated_at = now;
        Ok(true)
    }

    async fn due_campaigns(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, AppError> {
        let t = self.tables.lock().await;
        let mut due: Vec<Campaign> = t
            .campaigns
            .iter()
            .filter(|c| {
                c.status == CampaignStatus::Scheduled && c.scheduled_for.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|c| c.scheduled_for);
        Ok(due)
    }

    async fn delete_campaign(&self, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.tables.lock().await;
        let before = t.campaigns.len();
        t.campaigns.retain(|c| c.id != id);
        t.recipients.retain(|r| r.campaign_id != id);
        Ok(t.campaigns.len() != before)
    }

    async fn list_recipients(&self, campaign_id: Uuid) -> Result<Vec<CampaignRecipient>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.recipients
            .iter()
            .filter(|r| r.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn recipient_deliveries(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<RecipientDelivery>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.recipients
            .iter()
            .filter(|r| r.campaign_id == campaign_id)
            .filter_map(|r| {
                let customer = t.customers.iter().find(|c| c.id == r.customer_id)?;
                Some(RecipientDelivery {
                    recipient_id: r.id,
                    customer_id: r.customer_id,
                    email: customer.email.clone(),
                    first_name: customer.first_name.clone(),
                    last_name: customer.last_name.clone(),
                    status: r.status,
                })
            })
            .collect())
    }

    async fn set_recipient_status(
        &self,
        recipient_id: Uuid,
        status: RecipientStatus,
        error: Option<String>,
    ) -> Result<(), AppError> {
        let mut t = self.tables.lock().await;
        if let Some(recipient) = t.recipients.iter_mut().find(|r| r.id == recipient_id) {
            recipient.status = status;
            recipient.error = error;
            if status == RecipientStatus::Sent {
                recipient.sent_at = Some(Utc::now());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn create_coupon(&self, user_id: Uuid, new: &NewCoupon) -> Result<Coupon, AppError> {
        let mut t = self.tables.lock().await;
        if t.coupon_code_taken(&new.code_name, None) {
            return Err(AppError::Conflict(
                "A coupon with this code already exists".into(),
            ));
        }
        let now = Utc::now();
        let coupon = Coupon {
            id: Uuid::new_v4(),
            user_id,
            code_name: new.code_name.clone(),
            discount: new.discount,
            description: new.description.clone(),
            valid_until: new.valid_until,
            created_at: now,
            updated_at: now,
        };
        t.coupons.push(coupon.clone());
        Ok(coupon)
    }

    async fn list_coupons(&self, user_id: Uuid) -> Result<Vec<Coupon>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.coupons
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_coupon(&self, id: Uuid) -> Result<Option<Coupon>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.coupons.iter().find(|c| c.id == id).cloned())
    }

    async fn find_coupon_by_code(&self, code_name: &str) -> Result<Option<Coupon>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.coupons.iter().find(|c| c.code_name == code_name).cloned())
    }

    async fn update_coupon(&self, id: Uuid, new: &NewCoupon) -> Result<Coupon, AppError> {
        let mut t = self.tables.lock().await;
        if t.coupon_code_taken(&new.code_name, Some(id)) {
            return Err(AppError::Conflict(
                "A coupon with this code already exists".into(),
            ));
        }
        let coupon = t
            .coupons
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AppError::NotFound("Coupon not found"))?;
        coupon.code_name = new.code_name.clone();
        coupon.discount = new.discount;
        coupon.description = new.description.clone();
        coupon.valid_until = new.valid_until;
        coupon.updated_at = Utc::now();
        Ok(coupon.clone())
    }

    async fn delete_coupon(&self, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.tables.lock().await;
        let before = t.coupons.len();
        t.coupons.retain(|c| c.id != id);
        for automation in t.automations.iter_mut() {
            if automation.coupon_id == Some(id) {
                automation.coupon_id = None;
            }
        }
        Ok(t.coupons.len() != before)
    }
}

#[async_trait]
impl AutomationStore for MemoryStore {
    async fn create_automation(
        &self,
        shop_id: Uuid,
        def: &AutomationDefinition,
    ) -> Result<Automation, AppError> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let automation = Automation {
            id: Uuid::new_v4(),
            shop_id,
            name: def.name.clone(),
            trigger_type: def.trigger_type,
            timing_days: def.timing_days,
            action_type: def.action_type,
            email_subject: def.email_subject.clone(),
            email_body: def.email_body.clone(),
            coupon_id: def.coupon_id,
            status: def.status,
            created_at: now,
            updated_at: now,
        };
        t.automations.push(automation.clone());
        Ok(automation)
    }

    async fn list_automations(&self, shop_id: Uuid) -> Result<Vec<Automation>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.automations
            .iter()
            .rev()
            .filter(|a| a.shop_id == shop_id)
            .cloned()
            .collect())
    }

    async fn find_automation(&self, id: Uuid) -> Result<Option<Automation>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.automations.iter().find(|a| a.id == id).cloned())
    }

    async fn update_automation(
        &self,
        id: Uuid,
        def: &AutomationDefinition,
    ) -> Result<Automation, AppError> {
        let mut t = self.tables.lock().await;
        let automation = t
            .automations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppError::NotFound("Automation not found"))?;
        automation.name = def.name.clone();
        automation.trigger_type = def.trigger_type;
        automation.timing_days = def.timing_days;
        automation.action_type = def.action_type;
        automation.email_subject = def.email_subject.clone();
        automation.email_body = def.email_body.clone();
        automation.coupon_id = def.coupon_id;
        automation.status = def.status;
        automation.updated_at = Utc::now();
        Ok(automation.clone())
    }

    async fn delete_automation(&self, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.tables.lock().await;
        let before = t.automations.len();
        t.automations.retain(|a| a.id != id);
        Ok(t.automations.len() != before)
    }
}

#[async_trait]
impl IntegrationStore for MemoryStore {
    async fn upsert_integration(&self, upsert: &IntegrationUpsert) -> Result<Integration, AppError> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        if let Some(existing) = t
            .integrations
            .iter_mut()
            .find(|i| i.user_id == upsert.user_id && i.platform == upsert.platform)
        {
            existing.account_id = Some(upsert.account.account_id.clone());
            existing.account_name = upsert.account.account_name.clone();
            existing.access_token = Some(upsert.grant.access_token.clone());
            existing.refresh_token = upsert.grant.refresh_token.clone();
            existing.expires_at = upsert.grant.expires_at;
            existing.connected = true;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let integration = Integration {
            id: Uuid::new_v4(),
            user_id: upsert.user_id,
            platform: upsert.platform,
            account_id: Some(upsert.account.account_id.clone()),
            account_name: upsert.account.account_name.clone(),
            access_token: Some(upsert.grant.access_token.clone()),
            refresh_token: upsert.grant.refresh_token.clone(),
            expires_at: upsert.grant.expires_at,
            connected: true,
            created_at: now,
            updated_at: now,
        };
        t.integrations.push(integration.clone());
        Ok(integration)
    }

    async fn find_integration(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> Result<Option<Integration>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.integrations
            .iter()
            .find(|i| i.user_id == user_id && i.platform == platform)
            .cloned())
    }

    async fn list_integrations(&self, user_id: Uuid) -> Result<Vec<Integration>, AppError> {
        let t = self.tables.lock().await;
        Ok(t.integrations
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn disconnect_integration(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> Result<bool, AppError> {
        let mut t = self.tables.lock().await;
        let Some(integration) = t
            .integrations
            .iter_mut()
            .find(|i| i.user_id == user_id && i.platform == platform)
        else {
            return Ok(false);
        };
        integration.access_token = None;
        integration.refresh_token = None;
        integration.expires_at = None;
        integration.connected = false;
        integration.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_integration(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> Result<bool, AppError> {
        let mut t = self.tables.lock().await;
        let before = t.integrations.len();
        t.integrations
            .retain(|i| !(i.user_id == user_id && i.platform == platform));
        Ok(t.integrations.len() != before)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: None,
            password_hash: "hash".into(),
        }
    }

    fn shop_request(name: &str) -> ShopRequest {
        ShopRequest {
            name: name.into(),
            email: None,
            phone: None,
            address: None,
        }
    }

    fn draft(name: &str) -> NewCampaign {
        NewCampaign {
            name: name.into(),
            audience_id: None,
            subject: "s".into(),
            body: "b".into(),
            status: CampaignStatus::Scheduled,
            scheduled_for: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@x.test")).await.unwrap();
        let err = store.create_user(new_user("a@x.test")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn backup_code_is_consumed_once() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.test")).await.unwrap();
        store
            .set_two_factor(
                user.id,
                Some(TwoFactorSettings {
                    encrypted_secret: "enc".into(),
                    backup_code_hashes: vec!["h1".into(), "h2".into()],
                }),
            )
            .await
            .unwrap();

        assert!(store.consume_backup_code(user.id, "h1").await.unwrap());
        assert!(!store.consume_backup_code(user.id, "h1").await.unwrap());
        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(user.backup_codes, vec!["h2".to_string()]);
    }

    #[tokio::test]
    async fn transition_is_compare_and_swap() {
        let store = MemoryStore::new();
        let campaign = store
            .create_campaign(Uuid::new_v4(), &draft("c"), &[])
            .await
            .unwrap();

        let first = store
            .transition_campaign(campaign.id, CampaignStatus::Scheduled, CampaignStatus::Sending)
            .await
            .unwrap();
        let second = store
            .transition_campaign(campaign.id, CampaignStatus::Scheduled, CampaignStatus::Sending)
            .await
            .unwrap();
        assert!(first);
        assert!(!second);

        store
            .transition_campaign(campaign.id, CampaignStatus::Sending, CampaignStatus::Sent)
            .await
            .unwrap();
        let stored = store.find_campaign(campaign.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Sent);
        assert!(stored.sent_at.is_some());
    }

    #[tokio::test]
    async fn pos_upsert_keeps_type_and_aggregates() {
        let store = MemoryStore::new();
        let shop = Uuid::new_v4();
        let pos = PosCustomer {
            external_id: "SQ-1".into(),
            first_name: Some("Ada".into()),
            ..Default::default()
        };
        let first = store.upsert_pos_customer(shop, &pos).await.unwrap();
        let renamed = PosCustomer {
            first_name: Some("Augusta".into()),
            ..pos
        };
        let second = store.upsert_pos_customer(shop, &renamed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.first_name.as_deref(), Some("Augusta"));
        assert_eq!(second.customer_type, DEFAULT_CUSTOMER_TYPE);
        assert_eq!(store.list_customers(shop).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_shop_cascades() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.test")).await.unwrap();
        let shop = store.create_shop(user.id, &shop_request("One")).await.unwrap();
        let customer = store
            .upsert_pos_customer(
                shop.id,
                &PosCustomer {
                    external_id: "SQ-1".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let campaign = store
            .create_campaign(shop.id, &draft("c"), &[customer.id])
            .await
            .unwrap();

        assert!(store.delete_shop(shop.id).await.unwrap());
        assert!(store.find_campaign(campaign.id).await.unwrap().is_none());
        assert!(store.list_recipients(campaign.id).await.unwrap().is_empty());
        assert!(store.list_customers(shop.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn coupon_codes_are_globally_unique() {
        let store = MemoryStore::new();
        let coupon = NewCoupon {
            code_name: "SUMMER2025".into(),
            discount: 15.0,
            description: None,
            valid_until: Utc::now(),
        };
        let first = store.create_coupon(Uuid::new_v4(), &coupon).await.unwrap();
        let err = store.create_coupon(Uuid::new_v4(), &coupon).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Re-saving a coupon under its own code is not a conflict.
        store.update_coupon(first.id, &coupon).await.unwrap();
    }
}
