//! PostgreSQL implementation of the persistence gateway.
//!
//! Queries are written by hand with `sqlx::query_as` and bound positionally.
//! Ownership filters are NOT applied here; the service layer loads a record
//! and compares its owner before mutating it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    AutomationStore, CampaignStore, CouponStore, CustomerStore, IntegrationStore, ShopStore,
    Store, UserStore,
};
use crate::db::DbPool;
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

const USER_COLUMNS: &str = "id, email, name, password_hash, role, two_factor_enabled, \
     two_factor_secret, backup_codes, notify_campaign_results, notify_weekly_summary, \
     created_at, updated_at";

const SHOP_COLUMNS: &str = "id, user_id, name, email, phone, address, created_at, updated_at";

const CUSTOMER_COLUMNS: &str = "id, shop_id, square_customer_id, first_name, last_name, email, \
     phone, address, total_spent_cents, order_count, customer_type, created_at, updated_at";

const CAMPAIGN_COLUMNS: &str = "id, shop_id, name, audience_id, subject, body, status, \
     scheduled_for, sent_at, created_at, updated_at";

const COUPON_COLUMNS: &str =
    "id, user_id, code_name, discount, description, valid_until, created_at, updated_at";

const AUTOMATION_COLUMNS: &str = "id, shop_id, name, trigger_type, timing_days, action_type, \
     email_subject, email_body, coupon_id, status, created_at, updated_at";

const INTEGRATION_COLUMNS: &str = "id, user_id, platform, account_id, account_name, \
     access_token, refresh_token, expires_at, connected, created_at, updated_at";

/// Store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Turn a unique-constraint violation into a `Conflict` with `message`.
fn conflict_on_unique(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Email already registered"))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> Result<User, AppError> {
        // A blank name clears it; an omitted one keeps it.
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = CASE WHEN $2::text IS NULL THEN name ELSE NULLIF(BTRIM($2), '') END,
                notify_campaign_results = COALESCE($3, notify_campaign_results),
                notify_weekly_summary = COALESCE($4, notify_weekly_summary),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.name)
        .bind(update.notify_campaign_results)
        .bind(update.notify_weekly_summary)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("User not found"))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_two_factor(
        &self,
        id: Uuid,
        settings: Option<TwoFactorSettings>,
    ) -> Result<(), AppError> {
        let (enabled, secret, codes) = match settings {
            Some(s) => (true, Some(s.encrypted_secret), s.backup_code_hashes),
            None => (false, None, Vec::new()),
        };
        sqlx::query(
            r#"
            UPDATE users
            SET two_factor_enabled = $2,
                two_factor_secret = $3,
                backup_codes = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(enabled)
        .bind(secret)
        .bind(&codes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_backup_code(&self, id: Uuid, code_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET backup_codes = array_remove(backup_codes, $2),
                updated_at = NOW()
            WHERE id = $1 AND $2 = ANY(backup_codes)
            "#,
        )
        .bind(id)
        .bind(code_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ShopStore for PgStore {
    async fn create_shop(&self, user_id: Uuid, shop: &ShopRequest) -> Result<Shop, AppError> {
        let shop = sqlx::query_as::<_, Shop>(&format!(
            r#"
            INSERT INTO shops (user_id, name, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SHOP_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(shop.name.trim())
        .bind(&shop.email)
        .bind(&shop.phone)
        .bind(&shop.address)
        .fetch_one(&self.pool)
        .await?;
        Ok(shop)
    }

    async fn list_shops(&self, user_id: Uuid) -> Result<Vec<Shop>, AppError> {
        let shops = sqlx::query_as::<_, Shop>(&format!(
            "SELECT {SHOP_COLUMNS} FROM shops WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shops)
    }

    async fn find_shop(&self, id: Uuid) -> Result<Option<Shop>, AppError> {
        let shop = sqlx::query_as::<_, Shop>(&format!(
            "SELECT {SHOP_COLUMNS} FROM shops WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(shop)
    }

    async fn update_shop(&self, id: Uuid, shop: &ShopRequest) -> Result<Shop, AppError> {
        sqlx::query_as::<_, Shop>(&format!(
            r#"
            UPDATE shops
            SET name = $2, email = $3, phone = $4, address = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {SHOP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(shop.name.trim())
        .bind(&shop.email)
        .bind(&shop.phone)
        .bind(&shop.address)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Shop not found"))
    }

    async fn delete_shop(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM shops WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn list_customers(&self, shop_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE shop_id = $1 ORDER BY created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    async fn upsert_pos_customer(
        &self,
        shop_id: Uuid,
        customer: &PosCustomer,
    ) -> Result<Customer, AppError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (shop_id, square_customer_id, first_name, last_name, email, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (shop_id, square_customer_id) DO UPDATE
            SET first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                updated_at = NOW()
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(shop_id)
        .bind(&customer.external_id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .fetch_one(&self.pool)
        .await?;
        Ok(customer)
    }
}

#[async_trait]
impl CampaignStore for PgStore {
    async fn create_campaign(
        &self,
        shop_id: Uuid,
        campaign: &NewCampaign,
        customer_ids: &[Uuid],
    ) -> Result<Campaign, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Campaign>(&format!(
            r#"
            INSERT INTO campaigns (shop_id, name, audience_id, subject, body, status, scheduled_for)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(shop_id)
        .bind(&campaign.name)
        .bind(&campaign.audience_id)
        .bind(&campaign.subject)
        .bind(&campaign.body)
        .bind(campaign.status)
        .bind(campaign.scheduled_for)
        .fetch_one(&mut *tx)
        .await?;

        if !customer_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO campaign_recipients (campaign_id, customer_id)
                SELECT $1, UNNEST($2::uuid[])
                ON CONFLICT (campaign_id, customer_id) DO NOTHING
                "#,
            )
            .bind(created.id)
            .bind(customer_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn list_campaigns(&self, shop_id: Uuid) -> Result<Vec<Campaign>, AppError> {
        let campaigns = sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE shop_id = $1 ORDER BY created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(campaigns)
    }

    async fn find_campaign(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        let campaign = sqlx::query_as::<_, Campaign>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(campaign)
    }

    async fn edit_campaign(
        &self,
        id: Uuid,
        expected: CampaignStatus,
        content: &CampaignContent,
        to: CampaignStatus,
    ) -> Result<Option<Campaign>, AppError> {
        let campaign = sqlx::query_as::<_, Campaign>(&format!(
            r#"
            UPDATE campaigns
            SET name = $3, subject = $4, body = $5, scheduled_for = $6, status = $7,
                sent_at = CASE WHEN $7 = 'Sent'::campaign_status AND status <> $7 THEN NOW() ELSE sent_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected)
        .bind(&content.name)
        .bind(&content.subject)
        .bind(&content.body)
        .bind(content.scheduled_for)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(campaign)
    }

    async fn transition_campaign(
        &self,
        id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<bool, AppError> {
        // The WHERE on the observed status makes this a compare-and-swap:
        // of two concurrent callers, exactly one sees rows_affected == 1.
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET status = $3,
                sent_at = CASE WHEN $3 = 'Sent'::campaign_status THEN NOW() ELSE sent_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn due_campaigns(&self, now: DateTime<Utc>) -> Result<Vec<Campaign>, AppError> {
        let campaigns = sqlx::query_as::<_, Campaign>(&format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS}
            FROM campaigns
            WHERE status = 'Scheduled' AND scheduled_for <= $1
            ORDER BY scheduled_for ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(campaigns)
    }

    async fn delete_campaign(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_recipients(&self, campaign_id: Uuid) -> Result<Vec<CampaignRecipient>, AppError> {
        let recipients = sqlx::query_as::<_, CampaignRecipient>(
            r#"
            SELECT id, campaign_id, customer_id, status, sent_at, error
            FROM campaign_recipients
            WHERE campaign_id = $1
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(recipients)
    }

    async fn recipient_deliveries(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<RecipientDelivery>, AppError> {
        let deliveries = sqlx::query_as::<_, RecipientDelivery>(
            r#"
            SELECT r.id AS recipient_id, r.customer_id, c.email, c.first_name, c.last_name, r.status
            FROM campaign_recipients r
            JOIN customers c ON c.id = r.customer_id
            WHERE r.campaign_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(deliveries)
    }

    async fn set_recipient_status(
        &self,
        recipient_id: Uuid,
        status: RecipientStatus,
        error: Option<String>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE campaign_recipients
            SET status = $2,
                error = $3,
                sent_at = CASE WHEN $2 = 'Sent'::recipient_status THEN NOW() ELSE sent_at END
            WHERE id = $1
            "#,
        )
        .bind(recipient_id)
        .bind(status)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CouponStore for PgStore {
    async fn create_coupon(&self, user_id: Uuid, coupon: &NewCoupon) -> Result<Coupon, AppError> {
        sqlx::query_as::<_, Coupon>(&format!(
            r#"
            INSERT INTO coupons (user_id, code_name, discount, description, valid_until)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COUPON_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&coupon.code_name)
        .bind(coupon.discount)
        .bind(&coupon.description)
        .bind(coupon.valid_until)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A coupon with this code already exists"))
    }

    async fn list_coupons(&self, user_id: Uuid) -> Result<Vec<Coupon>, AppError> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(coupons)
    }

    async fn find_coupon(&self, id: Uuid) -> Result<Option<Coupon>, AppError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(coupon)
    }

    async fn find_coupon_by_code(&self, code_name: &str) -> Result<Option<Coupon>, AppError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code_name = $1"
        ))
        .bind(code_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(coupon)
    }

    async fn update_coupon(&self, id: Uuid, coupon: &NewCoupon) -> Result<Coupon, AppError> {
        sqlx::query_as::<_, Coupon>(&format!(
            r#"
            UPDATE coupons
            SET code_name = $2, discount = $3, description = $4, valid_until = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {COUPON_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&coupon.code_name)
        .bind(coupon.discount)
        .bind(&coupon.description)
        .bind(coupon.valid_until)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A coupon with this code already exists"))?
        .ok_or(AppError::NotFound("Coupon not found"))
    }

    async fn delete_coupon(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AutomationStore for PgStore {
    async fn create_automation(
        &self,
        shop_id: Uuid,
        automation: &AutomationDefinition,
    ) -> Result<Automation, AppError> {
        let created = sqlx::query_as::<_, Automation>(&format!(
            r#"
            INSERT INTO automations (shop_id, name, trigger_type, timing_days, action_type,
                                     email_subject, email_body, coupon_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {AUTOMATION_COLUMNS}
            "#
        ))
        .bind(shop_id)
        .bind(&automation.name)
        .bind(automation.trigger_type)
        .bind(automation.timing_days)
        .bind(automation.action_type)
        .bind(&automation.email_subject)
        .bind(&automation.email_body)
        .bind(automation.coupon_id)
        .bind(automation.status)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_automations(&self, shop_id: Uuid) -> Result<Vec<Automation>, AppError> {
        let automations = sqlx::query_as::<_, Automation>(&format!(
            "SELECT {AUTOMATION_COLUMNS} FROM automations WHERE shop_id = $1 ORDER BY created_at DESC"
        ))
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(automations)
    }

    async fn find_automation(&self, id: Uuid) -> Result<Option<Automation>, AppError> {
        let automation = sqlx::query_as::<_, Automation>(&format!(
            "SELECT {AUTOMATION_COLUMNS} FROM automations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(automation)
    }

    async fn update_automation(
        &self,
        id: Uuid,
        automation: &AutomationDefinition,
    ) -> Result<Automation, AppError> {
        sqlx::query_as::<_, Automation>(&format!(
            r#"
            UPDATE automations
            SET name = $2, trigger_type = $3, timing_days = $4, action_type = $5,
                email_subject = $6, email_body = $7, coupon_id = $8, status = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {AUTOMATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&automation.name)
        .bind(automation.trigger_type)
        .bind(automation.timing_days)
        .bind(automation.action_type)
        .bind(&automation.email_subject)
        .bind(&automation.email_body)
        .bind(automation.coupon_id)
        .bind(automation.status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Automation not found"))
    }

    async fn delete_automation(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM automations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IntegrationStore for PgStore {
    async fn upsert_integration(&self, upsert: &IntegrationUpsert) -> Result<Integration, AppError> {
        let integration = sqlx::query_as::<_, Integration>(&format!(
            r#"
            INSERT INTO integrations (user_id, platform, account_id, account_name,
                                      access_token, refresh_token, expires_at, connected)
            VALUES ($1, $2, $3, $4, $5, $6, $7, true)
            ON CONFLICT (user_id, platform) DO UPDATE
            SET account_id = EXCLUDED.account_id,
                account_name = EXCLUDED.account_name,
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                connected = true,
                updated_at = NOW()
            RETURNING {INTEGRATION_COLUMNS}
            "#
        ))
        .bind(upsert.user_id)
        .bind(upsert.platform)
        .bind(&upsert.account.account_id)
        .bind(&upsert.account.account_name)
        .bind(&upsert.grant.access_token)
        .bind(&upsert.grant.refresh_token)
        .bind(upsert.grant.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(integration)
    }

    async fn find_integration(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> Result<Option<Integration>, AppError> {
        let integration = sqlx::query_as::<_, Integration>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE user_id = $1 AND platform = $2"
        ))
        .bind(user_id)
        .bind(platform)
        .fetch_optional(&self.pool)
        .await?;
        Ok(integration)
    }

    async fn list_integrations(&self, user_id: Uuid) -> Result<Vec<Integration>, AppError> {
        let integrations = sqlx::query_as::<_, Integration>(&format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(integrations)
    }

    async fn disconnect_integration(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE integrations
            SET access_token = NULL,
                refresh_token = NULL,
                expires_at = NULL,
                connected = false,
                updated_at = NOW()
            WHERE user_id = $1 AND platform = $2
            "#,
        )
        .bind(user_id)
        .bind(platform)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_integration(
        &self,
        user_id: Uuid,
        platform: Platform,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM integrations WHERE user_id = $1 AND platform = $2")
            .bind(user_id)
            .bind(platform)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
