//! Storage and collaborator contracts for the notifications domain.
//!
//! Implementations can use different backends: `postgres.rs` for Sea-ORM
//! and `memory.rs` for tests/local development.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::NotificationResult;
use crate::models::{
    Notification, NotificationFilter, NotificationPreference, NotificationStats,
    NotificationStatus, NotificationTemplate, UserProfile,
};

/// Repository for notification delivery-attempt records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist a new record.
    async fn create(&self, notification: Notification) -> NotificationResult<Notification>;

    /// Get a record by id.
    async fn get_by_id(&self, id: Uuid) -> NotificationResult<Option<Notification>>;

    /// List a user's notifications, newest first, with paging and filters.
    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: NotificationFilter,
    ) -> NotificationResult<Vec<Notification>>;

    /// Pending records ordered by priority then creation time, capped at
    /// `batch_size`.
    async fn pending_batch(&self, batch_size: u64) -> NotificationResult<Vec<Notification>>;

    /// Failed records still eligible for retry (attempts < max_attempts),
    /// same ordering as `pending_batch`.
    async fn failed_batch(&self, max_attempts: i32) -> NotificationResult<Vec<Notification>>;

    /// Single-row status transition. Unconditionally increments `attempts`,
    /// stamps `sent_at` when the new status is `Sent`, and overwrites
    /// `error_message` with the given value (clearing it on success).
    /// Returns false if the record does not exist.
    async fn update_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
        error_message: Option<String>,
    ) -> NotificationResult<bool>;

    /// Mark a notification read. Succeeds only if the record belongs to
    /// the given user.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> NotificationResult<bool>;

    /// Per-status counters for one user.
    async fn stats(&self, user_id: Uuid) -> NotificationResult<NotificationStats>;
}

/// Repository for per-user notification preferences.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Look up the preference row for (user, channel, event), if any.
    async fn get(
        &self,
        user_id: Uuid,
        notification_type: &str,
        event_type: &str,
    ) -> NotificationResult<Option<NotificationPreference>>;

    /// All preference rows for one user.
    async fn for_user(&self, user_id: Uuid) -> NotificationResult<Vec<NotificationPreference>>;

    /// Upsert a preference flag.
    async fn set(
        &self,
        user_id: Uuid,
        notification_type: &str,
        event_type: &str,
        is_enabled: bool,
    ) -> NotificationResult<NotificationPreference>;
}

/// Repository for notification content templates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Look up by (template_id, notification_type), active or not.
    async fn find(
        &self,
        template_id: &str,
        notification_type: &str,
    ) -> NotificationResult<Option<NotificationTemplate>>;

    /// All templates, ordered by type then name.
    async fn list_all(&self) -> NotificationResult<Vec<NotificationTemplate>>;

    /// All templates for one type, same ordering.
    async fn list_by_type(
        &self,
        notification_type: &str,
    ) -> NotificationResult<Vec<NotificationTemplate>>;

    /// Whether any template (of any type) uses this template_id.
    async fn exists(&self, template_id: &str) -> NotificationResult<bool>;

    async fn create(
        &self,
        template: NotificationTemplate,
    ) -> NotificationResult<NotificationTemplate>;

    async fn update(
        &self,
        template: NotificationTemplate,
    ) -> NotificationResult<NotificationTemplate>;

    /// Delete by row id. Returns false if the row does not exist.
    async fn delete(&self, id: Uuid) -> NotificationResult<bool>;
}

/// Read-only view of the user store. User accounts are owned by another
/// domain; the dispatch pipeline only resolves contact fields and the
/// admin fan-out list through this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> NotificationResult<Option<UserProfile>>;

    /// All users with the admin role.
    async fn list_admins(&self) -> NotificationResult<Vec<UserProfile>>;
}
