//! Automation (trigger → action rule) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "automation_trigger")]
pub enum TriggerType {
    NewCustomer,
    AfterPurchase,
    CustomerInactive,
    Birthday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "automation_action")]
pub enum ActionType {
    SendEmail,
    SendCoupon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "automation_status")]
pub enum AutomationStatus {
    Active,
    Paused,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Automation {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub trigger_type: TriggerType,

    /// Days between the trigger firing and the action running.
    pub timing_days: i32,

    pub action_type: ActionType,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub status: AutomationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated automation definition, used for inserts and full replacements.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationDefinition {
    pub name: String,
    pub trigger_type: TriggerType,
    pub timing_days: i32,
    pub action_type: ActionType,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub status: AutomationStatus,
}

impl AutomationDefinition {
    /// Structural checks. Coupon ownership is checked by the service layer.
    pub fn validate(self) -> Result<Self, AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid("name is required"));
        }
        if !(0..=365).contains(&self.timing_days) {
            return Err(AppError::invalid("timingDays must be between 0 and 365"));
        }
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        match self.action_type {
            ActionType::SendEmail if blank(&self.email_subject) || blank(&self.email_body) => {
                return Err(AppError::invalid(
                    "SendEmail automations need emailSubject and emailBody",
                ));
            }
            ActionType::SendCoupon if self.coupon_id.is_none() => {
                return Err(AppError::invalid("SendCoupon automations need a couponId"));
            }
            _ => {}
        }
        Ok(Self {
            name: self.name.trim().to_string(),
            ..self
        })
    }
}

/// Request body for `POST /api/automations`.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Welcome",
///   "triggerType": "NewCustomer",
///   "timingDays": 0,
///   "actionType": "SendEmail",
///   "emailSubject": "Welcome!",
///   "emailBody": "Thanks for stopping by."
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateAutomationRequest {
    pub name: String,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub timing_days: i32,
    pub action_type: ActionType,
    #[serde(default)]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub email_body: Option<String>,
    #[serde(default)]
    pub coupon_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<AutomationStatus>,
}

impl CreateAutomationRequest {
    pub fn into_definition(self) -> Result<AutomationDefinition, AppError> {
        AutomationDefinition {
            name: self.name,
            trigger_type: self.trigger_type,
            timing_days: self.timing_days,
            action_type: self.action_type,
            email_subject: self.email_subject,
            email_body: self.email_body,
            coupon_id: self.coupon_id,
            status: self.status.unwrap_or(AutomationStatus::Active),
        }
        .validate()
    }
}

/// Request body for `PATCH /api/automations/{id}`. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateAutomationRequest {
    pub name: Option<String>,
    pub trigger_type: Option<TriggerType>,
    pub timing_days: Option<i32>,
    pub action_type: Option<ActionType>,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub status: Option<AutomationStatus>,
}

impl UpdateAutomationRequest {
    pub fn apply(self, current: &Automation) -> Result<AutomationDefinition, AppError> {
        AutomationDefinition {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            trigger_type: self.trigger_type.unwrap_or(current.trigger_type),
            timing_days: self.timing_days.unwrap_or(current.timing_days),
            action_type: self.action_type.unwrap_or(current.action_type),
            email_subject: self.email_subject.or_else(|| current.email_subject.clone()),
            email_body: self.email_body.or_else(|| current.email_body.clone()),
            coupon_id: self.coupon_id.or(current.coupon_id),
            status: self.status.unwrap_or(current.status),
        }
        .validate()
    }
}
