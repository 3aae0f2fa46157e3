//! Data models for the notifications domain.

use chrono::{DateTime, Utc};
use sea_orm::{sea_query::StringLen, DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Flat string-keyed bag of template variables.
///
/// Values may be strings, numbers or booleans; nested structures are not
/// supported by the placeholder substitution algorithm.
pub type TemplateData = serde_json::Map<String, serde_json::Value>;

/// Lifecycle status of a notification record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NotificationStatus {
    /// Queued, waiting for the background processor.
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Delivered (or accepted by the provider).
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Last attempt failed; retried while attempts remain.
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Administratively cancelled. Never produced by the dispatch flow.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Notification priority. Only a sort key for batch ordering, never a
/// scheduling guarantee. Persisted as its numeric rank so SQL ordering
/// matches the enum ordering.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    Default,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "i16", db_type = "SmallInteger")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum NotificationPriority {
    #[sea_orm(num_value = 0)]
    Low,
    #[default]
    #[sea_orm(num_value = 1)]
    Normal,
    #[sea_orm(num_value = 2)]
    High,
    #[sea_orm(num_value = 3)]
    Critical,
}

/// One persisted delivery attempt record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// Owning recipient (foreign reference, not owned by this domain).
    pub user_id: Uuid,
    /// Delivery channel ("Email", "SMS", "Push"; open set via the registry).
    pub notification_type: String,
    pub subject: String,
    pub content: String,
    /// Resolved address/number/device token actually targeted.
    pub recipient: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    /// Set only on successful delivery.
    pub sent_at: Option<DateTime<Utc>>,
    /// Set when the user marks the notification read.
    pub read_at: Option<DateTime<Utc>>,
    /// Send tries so far; incremented on every processing pass.
    pub attempts: i32,
    pub error_message: Option<String>,
    pub template_id: Option<String>,
    pub template_data: Option<TemplateData>,
    pub priority: NotificationPriority,
}

impl Notification {
    /// Build a pending record from a request and a resolved recipient.
    pub fn pending(request: &NotificationRequest, recipient: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: request.user_id,
            notification_type: request.notification_type.clone(),
            subject: request.subject.clone(),
            content: request.content.clone(),
            recipient,
            status: NotificationStatus::Pending,
            created_at: Utc::now(),
            sent_at: None,
            read_at: None,
            attempts: 0,
            error_message: None,
            template_id: request.template_id.clone(),
            template_data: request.template_data.clone(),
            priority: request.priority,
        }
    }
}

/// Per (user, channel, event) opt-out flag. Absence of a row means enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    /// Event scope, e.g. a template id or "General".
    pub event_type: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Named, typed, parameterized content template.
///
/// Content may contain `{{variableName}}` placeholders. The pair
/// (template_id, notification_type) is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub id: Uuid,
    pub template_id: String,
    pub name: String,
    pub notification_type: String,
    pub subject: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// DTO for creating a template.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplate {
    #[validate(length(min = 1, max = 100))]
    pub template_id: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub notification_type: String,
    #[serde(default)]
    pub subject: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// DTO for updating a template. Full replace of the mutable fields.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateTemplate {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub subject: String,
    #[validate(length(min = 1))]
    pub content: String,
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Inbound request to send or queue one notification. Not persisted as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRequest {
    pub user_id: Uuid,
    pub notification_type: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
    /// Optional explicit recipient, overriding profile-derived resolution.
    pub recipient: Option<String>,
    pub template_id: Option<String>,
    pub template_data: Option<TemplateData>,
    #[serde(default)]
    pub priority: NotificationPriority,
}

/// Resolved payload handed to a provider.
#[derive(Debug, Clone, Default)]
pub struct NotificationMessage {
    pub recipient: String,
    pub subject: String,
    pub content: String,
    /// Free-form enrichment (user name/email, priority, timestamps). Used
    /// for header/payload decoration, never for business logic.
    pub metadata: TemplateData,
}

/// Outcome of one provider send.
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub success: bool,
    /// Provider-specific id for tracking, when available.
    pub external_id: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl DeliveryResult {
    pub fn success(external_id: impl Into<String>) -> Self {
        Self {
            success: true,
            external_id: Some(external_id.into()),
            error_message: None,
            sent_at: Utc::now(),
        }
    }

    pub fn failure(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            external_id: None,
            error_message: Some(error_message.into()),
            sent_at: Utc::now(),
        }
    }
}

/// Per-user notification counters grouped by status.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct NotificationStats {
    pub total: u64,
    /// Sent notifications are treated as unread until marked read.
    pub unread: u64,
    pub pending: u64,
    pub failed: u64,
}

/// Query filters for listing a user's notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationFilter {
    pub status: Option<NotificationStatus>,
    pub notification_type: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl Default for NotificationFilter {
    fn default() -> Self {
        Self {
            status: None,
            notification_type: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

/// Contact fields of a recipient, as exposed by the user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(NotificationPriority::Low < NotificationPriority::Normal);
        assert!(NotificationPriority::High < NotificationPriority::Critical);
    }

    #[test]
    fn test_status_display_round_trip() {
        use std::str::FromStr;

        assert_eq!(NotificationStatus::Pending.to_string(), "pending");
        assert_eq!(
            NotificationStatus::from_str("Sent").unwrap(),
            NotificationStatus::Sent
        );
    }

    #[test]
    fn test_pending_record_from_request() {
        let request = NotificationRequest {
            user_id: Uuid::new_v4(),
            notification_type: "Email".to_string(),
            subject: "Hi".to_string(),
            content: "Body".to_string(),
            recipient: None,
            template_id: Some("welcome_user".to_string()),
            template_data: None,
            priority: NotificationPriority::High,
        };

        let record = Notification::pending(&request, "ana@example.com".to_string());
        assert_eq!(record.status, NotificationStatus::Pending);
        assert_eq!(record.attempts, 0);
        assert_eq!(record.recipient, "ana@example.com");
        assert_eq!(record.priority, NotificationPriority::High);
        assert!(record.sent_at.is_none());
        assert!(record.error_message.is_none());
    }

    #[test]
    fn test_delivery_result_constructors() {
        let ok = DeliveryResult::success("msg-1");
        assert!(ok.success);
        assert_eq!(ok.external_id.as_deref(), Some("msg-1"));
        assert!(ok.error_message.is_none());

        let err = DeliveryResult::failure("boom");
        assert!(!err.success);
        assert_eq!(err.error_message.as_deref(), Some("boom"));
        assert!(err.external_id.is_none());
    }
}
