//! Campaigns: CRUD scoped to the active shop, and the scheduled dispatcher.
//!
//! # Dispatch
//!
//! The scheduler endpoint runs [`Dispatcher::run_due`]. Each due campaign is
//! claimed with a `Scheduled → Sending` compare-and-swap before anything is
//! sent, so overlapping runs never deliver the same campaign twice. A
//! failure while processing one campaign marks it `Failed` and the loop
//! moves on.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    campaign::{
        Campaign, CampaignDetails, CampaignStatus, CreateCampaignRequest, DispatchSummary,
        RecipientDelivery, RecipientStatus, UpdateCampaignRequest,
    },
    shop::Shop,
};
use crate::providers::mailer::{Mailer, OutgoingEmail};
use crate::store::Store;

async fn owned_campaign(store: &dyn Store, shop: &Shop, id: Uuid) -> Result<Campaign, AppError> {
    store
        .find_campaign(id)
        .await?
        .filter(|c| c.shop_id == shop.id)
        .ok_or(AppError::NotFound("Campaign not found"))
}

/// Create a campaign and snapshot its audience into recipient rows.
///
/// Only customers with an email address become recipients.
pub async fn create_campaign(
    store: &dyn Store,
    shop: &Shop,
    request: CreateCampaignRequest,
) -> Result<Campaign, AppError> {
    let new = request.validate()?;

    let recipients: Vec<Uuid> = match &new.audience_id {
        Some(audience) => store
            .list_customers(shop.id)
            .await?
            .into_iter()
            .filter(|c| c.in_audience(audience))
            .filter(|c| c.email.as_deref().is_some_and(|e| !e.trim().is_empty()))
            .map(|c| c.id)
            .collect(),
        None => Vec::new(),
    };

    let campaign = store.create_campaign(shop.id, &new, &recipients).await?;
    tracing::info!(
        shop_id = %shop.id,
        campaign_id = %campaign.id,
        recipients = recipients.len(),
        status = ?campaign.status,
        "campaign created"
    );
    Ok(campaign)
}

pub async fn list_campaigns(store: &dyn Store, shop: &Shop) -> Result<Vec<Campaign>, AppError> {
    store.list_campaigns(shop.id).await
}

pub async fn get_campaign(
    store: &dyn Store,
    shop: &Shop,
    id: Uuid,
) -> Result<CampaignDetails, AppError> {
    let campaign = owned_campaign(store, shop, id).await?;
    let recipients = store.list_recipients(id).await?;
    Ok(CampaignDetails {
        campaign,
        recipients,
    })
}

/// Edit content and optionally move the status along the transition table.
///
/// Content and status are written together, conditioned on the status that
/// was read. A concurrent dispatcher claim turns into a 409 with nothing
/// written.
pub async fn update_campaign(
    store: &dyn Store,
    shop: &Shop,
    id: Uuid,
    request: UpdateCampaignRequest,
) -> Result<Campaign, AppError> {
    let current = owned_campaign(store, shop, id).await?;
    if current.status == CampaignStatus::Sending {
        return Err(AppError::Conflict("Campaign is being sent".into()));
    }
    let content = request.apply(&current)?;

    let target = request.status.filter(|to| *to != current.status);
    if let Some(to) = target {
        if to == CampaignStatus::Sending || !current.status.can_transition_to(to) {
            return Err(AppError::invalid(format!(
                "Cannot change status from {:?} to {:?}",
                current.status, to
            )));
        }
        if to == CampaignStatus::Scheduled && content.scheduled_for.is_none() {
            return Err(AppError::invalid("scheduledFor is required to schedule a campaign"));
        }
    }

    let to = target.unwrap_or(current.status);
    let updated = store
        .edit_campaign(id, current.status, &content, to)
        .await?
        .ok_or_else(changed_concurrently)?;
    if target.is_some() {
        tracing::info!(campaign_id = %id, from = ?current.status, to = ?to, "campaign status changed");
    }
    Ok(updated)
}

fn changed_concurrently() -> AppError {
    AppError::Conflict("Campaign status changed concurrently, reload and retry".into())
}

pub async fn delete_campaign(store: &dyn Store, shop: &Shop, id: Uuid) -> Result<(), AppError> {
    let campaign = owned_campaign(store, shop, id).await?;
    if campaign.status == CampaignStatus::Sending {
        return Err(AppError::Conflict("Campaign is being sent".into()));
    }
    store.delete_campaign(id).await?;
    tracing::info!(campaign_id = %id, "campaign deleted");
    Ok(())
}

/// Send now: schedule the campaign for the current instant and push it
/// through the same claim-and-send path as the scheduler.
pub async fn send_now(
    dispatcher: &Dispatcher<'_>,
    shop: &Shop,
    id: Uuid,
) -> Result<Campaign, AppError> {
    let store = dispatcher.store;
    let current = owned_campaign(store, shop, id).await?;
    if !matches!(
        current.status,
        CampaignStatus::Draft | CampaignStatus::Scheduled | CampaignStatus::Failed
    ) {
        return Err(AppError::invalid(format!(
            "A {:?} campaign cannot be sent",
            current.status
        )));
    }

    let now = Utc::now();
    let content = UpdateCampaignRequest {
        scheduled_for: Some(now),
        ..Default::default()
    }
    .apply(&current)?;
    let scheduled = store
        .edit_campaign(id, current.status, &content, CampaignStatus::Scheduled)
        .await?
        .ok_or_else(changed_concurrently)?;

    if !dispatcher.dispatch(&scheduled).await {
        return Err(AppError::Conflict("Campaign is already being sent".into()));
    }
    owned_campaign(store, shop, id).await
}

/// Envelope sender of a campaign email.
#[derive(Debug, Clone)]
pub struct Sender {
    /// Shown as the display name, normally the shop name.
    pub name: String,
    pub address: String,
    pub reply_to: Option<String>,
}

impl Sender {
    fn header(&self) -> String {
        format!("{} <{}>", self.name.replace(['<', '>', '"'], ""), self.address)
    }
}

/// Per-recipient delivery result of one send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    pub sent: usize,
    pub failed: usize,
}

/// Deliver `campaign` to `recipients` and settle its final status.
///
/// One email per recipient. The campaign ends `Sent` when at least one
/// delivery succeeded and `Failed` otherwise. Expects the campaign to be
/// claimed (`Sending`).
pub async fn send_campaign(
    store: &dyn Store,
    mailer: &dyn Mailer,
    campaign: &Campaign,
    recipients: &[RecipientDelivery],
    sender: &Sender,
) -> Result<SendReport, AppError> {
    let mut report = SendReport::default();

    for recipient in recipients {
        let Some(to) = recipient.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
            continue;
        };
        let email = OutgoingEmail {
            from: sender.header(),
            to: to.to_string(),
            subject: campaign.subject.clone(),
            html: campaign.body.clone(),
            reply_to: sender.reply_to.clone(),
        };

        match mailer.send(&email).await {
            Ok(()) => {
                store
                    .set_recipient_status(recipient.recipient_id, RecipientStatus::Sent, None)
                    .await?;
                report.sent += 1;
            }
            Err(e) => {
                tracing::warn!(
                    campaign_id = %campaign.id,
                    customer_id = %recipient.customer_id,
                    error = %e,
                    "campaign email failed"
                );
                store
                    .set_recipient_status(
                        recipient.recipient_id,
                        RecipientStatus::Failed,
                        Some(e.to_string()),
                    )
                    .await?;
                report.failed += 1;
            }
        }
    }

    let outcome = if report.sent > 0 {
        CampaignStatus::Sent
    } else {
        CampaignStatus::Failed
    };
    if !store
        .transition_campaign(campaign.id, CampaignStatus::Sending, outcome)
        .await?
    {
        tracing::warn!(campaign_id = %campaign.id, "campaign left Sending before it was settled");
    }

    tracing::info!(
        campaign_id = %campaign.id,
        sent = report.sent,
        failed = report.failed,
        status = ?outcome,
        "campaign delivered"
    );
    Ok(report)
}

/// Claims due campaigns and hands them to [`send_campaign`].
pub struct Dispatcher<'a> {
    pub store: &'a dyn Store,
    pub mailer: &'a dyn Mailer,
    /// Address campaigns are sent from; the shop name is the display name.
    pub from_address: &'a str,
}

impl Dispatcher<'_> {
    /// Process every `Scheduled` campaign due at `now`.
    ///
    /// `processed` counts the campaigns this run claimed; campaigns claimed
    /// by an overlapping run are skipped.
    pub async fn run_due(&self, now: DateTime<Utc>) -> Result<DispatchSummary, AppError> {
        let due = self.store.due_campaigns(now).await?;
        tracing::info!(due = due.len(), "campaign dispatch started");

        let mut processed = 0;
        for campaign in &due {
            if self.dispatch(campaign).await {
                processed += 1;
            }
        }

        tracing::info!(processed, "campaign dispatch finished");
        Ok(DispatchSummary {
            success: true,
            processed,
        })
    }

    /// Claim and deliver one campaign. Returns whether this call claimed it.
    ///
    /// Never fails: errors after the claim are logged and the campaign is
    /// marked `Failed`.
    pub async fn dispatch(&self, campaign: &Campaign) -> bool {
        match self
            .store
            .transition_campaign(campaign.id, CampaignStatus::Scheduled, CampaignStatus::Sending)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(campaign_id = %campaign.id, "campaign claimed by another run");
                return false;
            }
            Err(e) => {
                tracing::error!(campaign_id = %campaign.id, error = %e, "failed to claim campaign");
                return false;
            }
        }

        if let Err(e) = self.deliver(campaign).await {
            tracing::error!(campaign_id = %campaign.id, error = %e, "campaign dispatch failed");
            if let Err(e) = self
                .store
                .transition_campaign(campaign.id, CampaignStatus::Sending, CampaignStatus::Failed)
                .await
            {
                tracing::error!(campaign_id = %campaign.id, error = %e, "failed to mark campaign failed");
            }
        }
        true
    }

    async fn deliver(&self, campaign: &Campaign) -> Result<(), AppError> {
        let shop = self
            .store
            .find_shop(campaign.shop_id)
            .await?
            .ok_or(AppError::NotFound("Shop not found"))?;

        // Recipients already delivered by an earlier attempt are not resent.
        let recipients: Vec<RecipientDelivery> = self
            .store
            .recipient_deliveries(campaign.id)
            .await?
            .into_iter()
            .filter(|r| r.status != RecipientStatus::Sent)
            .filter(|r| r.email.as_deref().is_some_and(|e| !e.trim().is_empty()))
            .collect();

        if recipients.is_empty() {
            tracing::warn!(campaign_id = %campaign.id, "campaign has no recipients with an email");
            self.store
                .transition_campaign(campaign.id, CampaignStatus::Sending, CampaignStatus::Failed)
                .await?;
            return Ok(());
        }

        let sender = Sender {
            name: shop.name.clone(),
            address: self.from_address.to_string(),
            reply_to: shop.email.clone(),
        };
        send_campaign(self.store, self.mailer, campaign, &recipients, &sender).await?;
        Ok(())
    }
}
