//! Campaign and campaign recipient models.
//!
//! # Status lifecycle
//!
//! ```text
//! Draft ⇄ Scheduled ──claim──▶ Sending ──▶ Sent | Failed
//!             │                              ▲
//!             └──────── manual PATCH ────────┘
//! Failed ──▶ Draft | Scheduled
//! ```
//!
//! `Sending` is only ever entered by the dispatcher's atomic claim, so a
//! campaign reaches `Sent`/`Failed` only after having been `Scheduled`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "campaign_status")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
    Failed,
}

impl CampaignStatus {
    /// Whether moving from `self` to `to` is a legal transition.
    ///
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(self, to: CampaignStatus) -> bool {
        use CampaignStatus::*;
        self == to
            || matches!(
                (self, to),
                (Draft, Scheduled)
                    | (Scheduled, Draft)
                    | (Scheduled, Sending)
                    | (Scheduled, Sent)
                    | (Scheduled, Failed)
                    | (Sending, Sent)
                    | (Sending, Failed)
                    | (Failed, Draft)
                    | (Failed, Scheduled)
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recipient_status")]
pub enum RecipientStatus {
    Pending,
    Sent,
    Failed,
}

/// Represents a campaign record from the database.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,

    /// Audience the recipients were drawn from: `all` or a customer type tag.
    pub audience_id: Option<String>,

    pub subject: String,
    pub body: String,
    pub status: CampaignStatus,

    /// When the dispatcher should pick the campaign up. Required for `Scheduled`.
    pub scheduled_for: Option<DateTime<Utc>>,

    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join record between a campaign and a customer.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecipient {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub customer_id: Uuid,
    pub status: RecipientStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// A recipient joined with the customer fields needed to deliver to it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipientDelivery {
    pub recipient_id: Uuid,
    pub customer_id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: RecipientStatus,
}

/// Fields needed to insert a campaign.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub name: String,
    pub audience_id: Option<String>,
    pub subject: String,
    pub body: String,
    pub status: CampaignStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Editable content fields of a campaign.
#[derive(Debug, Clone)]
pub struct CampaignContent {
    pub name: String,
    pub subject: String,
    pub body: String,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Request body for creating a campaign.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Summer sale",
///   "subject": "15% off everything",
///   "body": "<p>Come by this weekend!</p>",
///   "audienceId": "all",
///   "status": "Scheduled",
///   "scheduledFor": "2025-07-01T09:00:00Z"
/// }
/// ```
///
/// # Validation
///
/// - `name`, `subject`, `body`: required, non-empty
/// - `status`: optional, `Draft` (default) or `Scheduled`
/// - `scheduledFor`: required when `status` is `Scheduled`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub audience_id: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<CampaignStatus>,
}

impl CreateCampaignRequest {
    pub fn validate(&self) -> Result<NewCampaign, AppError> {
        require_text("name", &self.name)?;
        require_text("subject", &self.subject)?;
        require_text("body", &self.body)?;

        let status = self.status.unwrap_or(CampaignStatus::Draft);
        match status {
            CampaignStatus::Draft => {}
            CampaignStatus::Scheduled if self.scheduled_for.is_some() => {}
            CampaignStatus::Scheduled => {
                return Err(AppError::invalid("scheduledFor is required to schedule a campaign"));
            }
            _ => {
                return Err(AppError::invalid("New campaigns must be Draft or Scheduled"));
            }
        }

        Ok(NewCampaign {
            name: self.name.trim().to_string(),
            audience_id: self
                .audience_id
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from),
            subject: self.subject.trim().to_string(),
            body: self.body.clone(),
            status,
            scheduled_for: self.scheduled_for,
        })
    }
}

/// Request body for `PATCH /api/campaigns/{id}`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub status: Option<CampaignStatus>,
}

impl UpdateCampaignRequest {
    /// Merge the request onto the current content, validating what changed.
    pub fn apply(&self, campaign: &Campaign) -> Result<CampaignContent, AppError> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        if let Some(subject) = &self.subject {
            require_text("subject", subject)?;
        }
        if let Some(body) = &self.body {
            require_text("body", body)?;
        }
        Ok(CampaignContent {
            name: self.name.as_deref().map(str::trim).unwrap_or(&campaign.name).to_string(),
            subject: self
                .subject
                .as_deref()
                .map(str::trim)
                .unwrap_or(&campaign.subject)
                .to_string(),
            body: self.body.clone().unwrap_or_else(|| campaign.body.clone()),
            scheduled_for: self.scheduled_for.or(campaign.scheduled_for),
        })
    }
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid(format!("{} is required", field)));
    }
    Ok(())
}

/// Campaign with its recipients, returned by `GET /api/campaigns/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDetails {
    #[serde(flatten)]
    pub campaign: Campaign,
    pub recipients: Vec<CampaignRecipient>,
}

/// Response of the cron dispatch endpoint.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DispatchSummary {
    pub success: bool,
    pub processed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use CampaignStatus::*;

    #[test]
    fn sent_and_failed_only_follow_scheduled_or_sending() {
        for from in [Draft, Scheduled, Sending, Sent, Failed] {
            let reachable = from.can_transition_to(Sent);
            assert_eq!(reachable, matches!(from, Scheduled | Sending | Sent), "{:?} -> Sent", from);
        }
        assert!(!Draft.can_transition_to(Failed));
        assert!(!Sent.can_transition_to(Draft));
    }

    #[test]
    fn same_status_is_a_no_op_transition() {
        assert!(Sent.can_transition_to(Sent));
        assert!(Draft.can_transition_to(Draft));
    }

    #[test]
    fn scheduling_requires_a_time() {
        let request = CreateCampaignRequest {
            name: "Summer".into(),
            subject: "Sale".into(),
            body: "Hi".into(),
            audience_id: Some("  ".into()),
            scheduled_for: None,
            status: Some(Scheduled),
        };
        assert!(matches!(request.validate(), Err(AppError::InvalidRequest(_))));

        let draft = CreateCampaignRequest { status: None, ..request };
        let new = draft.validate().unwrap();
        assert_eq!(new.status, Draft);
        assert_eq!(new.audience_id, None);
    }

    #[test]
    fn create_rejects_sent_status() {
        let request = CreateCampaignRequest {
            name: "Summer".into(),
            subject: "Sale".into(),
            body: "Hi".into(),
            audience_id: None,
            scheduled_for: Some(Utc::now()),
            status: Some(Sent),
        };
        assert!(request.validate().is_err());
    }
}
