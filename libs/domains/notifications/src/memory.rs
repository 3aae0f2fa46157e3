//! In-memory repository implementations backed by `tokio::sync::RwLock`.
//!
//! Used by tests and local development runs that have no database. The
//! ordering and update semantics mirror the Sea-ORM implementations in
//! `postgres.rs`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::NotificationResult;
use crate::models::{
    Notification, NotificationFilter, NotificationPreference, NotificationStats,
    NotificationStatus, NotificationTemplate, UserProfile,
};
use crate::repository::{
    NotificationRepository, PreferenceRepository, TemplateRepository, UserDirectory,
};

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    records: RwLock<HashMap<Uuid, Notification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_priority_then_age(a: &Notification, b: &Notification) -> std::cmp::Ordering {
    a.priority
        .cmp(&b.priority)
        .then(a.created_at.cmp(&b.created_at))
}

fn sort_templates(templates: &mut [NotificationTemplate]) {
    templates.sort_by(|a, b| {
        a.notification_type
            .cmp(&b.notification_type)
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: Notification) -> NotificationResult<Notification> {
        let mut records = self.records.write().await;
        records.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn get_by_id(&self, id: Uuid) -> NotificationResult<Option<Notification>> {
        let records = self.records.read().await;
        Ok(records.get(&id).cloned())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: NotificationFilter,
    ) -> NotificationResult<Vec<Notification>> {
        let records = self.records.read().await;
        let mut matching: Vec<Notification> = records
            .values()
            .filter(|n| n.user_id == user_id)
            .filter(|n| filter.status.is_none_or(|status| n.status == status))
            .filter(|n| {
                filter
                    .notification_type
                    .as_deref()
                    .is_none_or(|t| n.notification_type == t)
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let page = filter.page.max(1);
        let skip = ((page - 1) * filter.page_size) as usize;
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(filter.page_size as usize)
            .collect())
    }

    async fn pending_batch(&self, batch_size: u64) -> NotificationResult<Vec<Notification>> {
        let records = self.records.read().await;
        let mut pending: Vec<Notification> = records
            .values()
            .filter(|n| n.status == NotificationStatus::Pending)
            .cloned()
            .collect();

        pending.sort_by(by_priority_then_age);
        pending.truncate(batch_size as usize);
        Ok(pending)
    }

    async fn failed_batch(&self, max_attempts: i32) -> NotificationResult<Vec<Notification>> {
        let records = self.records.read().await;
        let mut failed: Vec<Notification> = records
            .values()
            .filter(|n| n.status == NotificationStatus::Failed && n.attempts < max_attempts)
            .cloned()
            .collect();

        failed.sort_by(by_priority_then_age);
        Ok(failed)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
        error_message: Option<String>,
    ) -> NotificationResult<bool> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(false);
        };

        record.status = status;
        record.error_message = error_message;
        record.attempts += 1;
        if status == NotificationStatus::Sent {
            record.sent_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> NotificationResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) if record.user_id == user_id => {
                record.read_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn stats(&self, user_id: Uuid) -> NotificationResult<NotificationStats> {
        let records = self.records.read().await;
        let mut stats = NotificationStats::default();
        for record in records.values().filter(|n| n.user_id == user_id) {
            stats.total += 1;
            match record.status {
                NotificationStatus::Sent => stats.unread += 1,
                NotificationStatus::Pending => stats.pending += 1,
                NotificationStatus::Failed => stats.failed += 1,
                NotificationStatus::Cancelled => {}
            }
        }
        Ok(stats)
    }
}

#[derive(Default)]
pub struct InMemoryPreferenceRepository {
    records: RwLock<Vec<NotificationPreference>>,
}

impl InMemoryPreferenceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceRepository for InMemoryPreferenceRepository {
    async fn get(
        &self,
        user_id: Uuid,
        notification_type: &str,
        event_type: &str,
    ) -> NotificationResult<Option<NotificationPreference>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|p| {
                p.user_id == user_id
                    && p.notification_type == notification_type
                    && p.event_type == event_type
            })
            .cloned())
    }

    async fn for_user(&self, user_id: Uuid) -> NotificationResult<Vec<NotificationPreference>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set(
        &self,
        user_id: Uuid,
        notification_type: &str,
        event_type: &str,
        is_enabled: bool,
    ) -> NotificationResult<NotificationPreference> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter_mut().find(|p| {
            p.user_id == user_id
                && p.notification_type == notification_type
                && p.event_type == event_type
        }) {
            existing.is_enabled = is_enabled;
            existing.updated_at = Some(Utc::now());
            return Ok(existing.clone());
        }

        let preference = NotificationPreference {
            id: Uuid::now_v7(),
            user_id,
            notification_type: notification_type.to_string(),
            event_type: event_type.to_string(),
            is_enabled,
            created_at: Utc::now(),
            updated_at: None,
        };
        records.push(preference.clone());
        Ok(preference)
    }
}

#[derive(Default)]
pub struct InMemoryTemplateRepository {
    records: RwLock<HashMap<Uuid, NotificationTemplate>>,
}

impl InMemoryTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn find(
        &self,
        template_id: &str,
        notification_type: &str,
    ) -> NotificationResult<Option<NotificationTemplate>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .find(|t| t.template_id == template_id && t.notification_type == notification_type)
            .cloned())
    }

    async fn list_all(&self) -> NotificationResult<Vec<NotificationTemplate>> {
        let records = self.records.read().await;
        let mut matching: Vec<NotificationTemplate> = records.values().cloned().collect();
        sort_templates(&mut matching);
        Ok(matching)
    }

    async fn list_by_type(
        &self,
        notification_type: &str,
    ) -> NotificationResult<Vec<NotificationTemplate>> {
        let records = self.records.read().await;
        let mut matching: Vec<NotificationTemplate> = records
            .values()
            .filter(|t| t.notification_type == notification_type)
            .cloned()
            .collect();
        sort_templates(&mut matching);
        Ok(matching)
    }

    async fn exists(&self, template_id: &str) -> NotificationResult<bool> {
        let records = self.records.read().await;
        Ok(records.values().any(|t| t.template_id == template_id))
    }

    async fn create(
        &self,
        template: NotificationTemplate,
    ) -> NotificationResult<NotificationTemplate> {
        let mut records = self.records.write().await;
        records.insert(template.id, template.clone());
        Ok(template)
    }

    async fn update(
        &self,
        template: NotificationTemplate,
    ) -> NotificationResult<NotificationTemplate> {
        let mut records = self.records.write().await;
        records.insert(template.id, template.clone());
        Ok(template)
    }

    async fn delete(&self, id: Uuid) -> NotificationResult<bool> {
        let mut records = self.records.write().await;
        Ok(records.remove(&id).is_some())
    }
}

/// Static user directory for tests and local runs.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, UserProfile>>,
    admins: RwLock<Vec<Uuid>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: UserProfile) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn add_admin(&self, user: UserProfile) {
        self.admins.write().await.push(user.id);
        self.add_user(user).await;
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_by_id(&self, id: Uuid) -> NotificationResult<Option<UserProfile>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn list_admins(&self) -> NotificationResult<Vec<UserProfile>> {
        let users = self.users.read().await;
        let admins = self.admins.read().await;
        Ok(admins.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}
