//! Sea-ORM (Postgres) implementations of the domain repositories.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::{notification, preference, template};
use crate::error::NotificationResult;
use crate::models::{
    Notification, NotificationFilter, NotificationPreference, NotificationStats,
    NotificationStatus, NotificationTemplate,
};
use crate::repository::{NotificationRepository, PreferenceRepository, TemplateRepository};

pub struct PgNotificationRepository {
    db: DatabaseConnection,
}

impl PgNotificationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn count_by_status(
        &self,
        user_id: Uuid,
        status: NotificationStatus,
    ) -> NotificationResult<u64> {
        let count = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Status.eq(status))
            .count(&self.db)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, record: Notification) -> NotificationResult<Notification> {
        let active_model: notification::ActiveModel = record.into();
        let model = active_model.insert(&self.db).await?;

        tracing::debug!(notification_id = %model.id, "Created notification record");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> NotificationResult<Option<Notification>> {
        let model = notification::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        filter: NotificationFilter,
    ) -> NotificationResult<Vec<Notification>> {
        let mut query = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id));

        if let Some(status) = filter.status {
            query = query.filter(notification::Column::Status.eq(status));
        }

        if let Some(notification_type) = filter.notification_type {
            query = query.filter(notification::Column::NotificationType.eq(notification_type));
        }

        let page = filter.page.max(1);
        let models = query
            .order_by_desc(notification::Column::CreatedAt)
            .offset((page - 1) * filter.page_size)
            .limit(filter.page_size)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn pending_batch(&self, batch_size: u64) -> NotificationResult<Vec<Notification>> {
        let models = notification::Entity::find()
            .filter(notification::Column::Status.eq(NotificationStatus::Pending))
            .order_by_asc(notification::Column::Priority)
            .order_by_asc(notification::Column::CreatedAt)
            .limit(batch_size)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn failed_batch(&self, max_attempts: i32) -> NotificationResult<Vec<Notification>> {
        let models = notification::Entity::find()
            .filter(notification::Column::Status.eq(NotificationStatus::Failed))
            .filter(notification::Column::Attempts.lt(max_attempts))
            .order_by_asc(notification::Column::Priority)
            .order_by_asc(notification::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: NotificationStatus,
        error_message: Option<String>,
    ) -> NotificationResult<bool> {
        let Some(model) = notification::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(false);
        };

        let attempts = model.attempts + 1;
        let mut active_model = model.into_active_model();
        active_model.status = Set(status);
        active_model.error_message = Set(error_message);
        active_model.attempts = Set(attempts);
        if status == NotificationStatus::Sent {
            active_model.sent_at = Set(Some(Utc::now().into()));
        }
        active_model.update(&self.db).await?;

        Ok(true)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> NotificationResult<bool> {
        let Some(model) = notification::Entity::find()
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
        else {
            return Ok(false);
        };

        let mut active_model = model.into_active_model();
        active_model.read_at = Set(Some(Utc::now().into()));
        active_model.update(&self.db).await?;

        Ok(true)
    }

    async fn stats(&self, user_id: Uuid) -> NotificationResult<NotificationStats> {
        let total = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;

        Ok(NotificationStats {
            total,
            unread: self
                .count_by_status(user_id, NotificationStatus::Sent)
                .await?,
            pending: self
                .count_by_status(user_id, NotificationStatus::Pending)
                .await?,
            failed: self
                .count_by_status(user_id, NotificationStatus::Failed)
                .await?,
        })
    }
}

pub struct PgPreferenceRepository {
    db: DatabaseConnection,
}

impl PgPreferenceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_row(
        &self,
        user_id: Uuid,
        notification_type: &str,
        event_type: &str,
    ) -> NotificationResult<Option<preference::Model>> {
        let model = preference::Entity::find()
            .filter(preference::Column::UserId.eq(user_id))
            .filter(preference::Column::NotificationType.eq(notification_type))
            .filter(preference::Column::EventType.eq(event_type))
            .one(&self.db)
            .await?;
        Ok(model)
    }
}

#[async_trait]
impl PreferenceRepository for PgPreferenceRepository {
    async fn get(
        &self,
        user_id: Uuid,
        notification_type: &str,
        event_type: &str,
    ) -> NotificationResult<Option<NotificationPreference>> {
        let model = self
            .find_row(user_id, notification_type, event_type)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn for_user(&self, user_id: Uuid) -> NotificationResult<Vec<NotificationPreference>> {
        let models = preference::Entity::find()
            .filter(preference::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn set(
        &self,
        user_id: Uuid,
        notification_type: &str,
        event_type: &str,
        is_enabled: bool,
    ) -> NotificationResult<NotificationPreference> {
        match self
            .find_row(user_id, notification_type, event_type)
            .await?
        {
            Some(existing) => {
                let mut active_model = existing.into_active_model();
                active_model.is_enabled = Set(is_enabled);
                active_model.updated_at = Set(Some(Utc::now().into()));
                let model = active_model.update(&self.db).await?;
                Ok(model.into())
            }
            None => {
                let active_model = preference::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    user_id: Set(user_id),
                    notification_type: Set(notification_type.to_string()),
                    event_type: Set(event_type.to_string()),
                    is_enabled: Set(is_enabled),
                    created_at: Set(Utc::now().into()),
                    updated_at: Set(None),
                };
                let model = active_model.insert(&self.db).await?;
                Ok(model.into())
            }
        }
    }
}

pub struct PgTemplateRepository {
    db: DatabaseConnection,
}

impl PgTemplateRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TemplateRepository for PgTemplateRepository {
    async fn find(
        &self,
        template_id: &str,
        notification_type: &str,
    ) -> NotificationResult<Option<NotificationTemplate>> {
        let model = template::Entity::find()
            .filter(template::Column::TemplateId.eq(template_id))
            .filter(template::Column::NotificationType.eq(notification_type))
            .one(&self.db)
            .await?;

        Ok(model.map(Into::into))
    }

    async fn list_all(&self) -> NotificationResult<Vec<NotificationTemplate>> {
        let models = template::Entity::find()
            .order_by_asc(template::Column::NotificationType)
            .order_by_asc(template::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn list_by_type(
        &self,
        notification_type: &str,
    ) -> NotificationResult<Vec<NotificationTemplate>> {
        let models = template::Entity::find()
            .filter(template::Column::NotificationType.eq(notification_type))
            .order_by_asc(template::Column::NotificationType)
            .order_by_asc(template::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn exists(&self, template_id: &str) -> NotificationResult<bool> {
        let count = template::Entity::find()
            .filter(template::Column::TemplateId.eq(template_id))
            .count(&self.db)
            .await?;

        Ok(count > 0)
    }

    async fn create(
        &self,
        record: NotificationTemplate,
    ) -> NotificationResult<NotificationTemplate> {
        let active_model: template::ActiveModel = record.into();
        let model = active_model.insert(&self.db).await?;

        tracing::debug!(template_id = %model.template_id, "Created notification template");
        Ok(model.into())
    }

    async fn update(
        &self,
        record: NotificationTemplate,
    ) -> NotificationResult<NotificationTemplate> {
        let active_model: template::ActiveModel = record.into();
        let model = active_model.update(&self.db).await?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> NotificationResult<bool> {
        let result = template::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
