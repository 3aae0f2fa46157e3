use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use crate::models::{Notification, NotificationPriority, NotificationStatus};

/// Sea-ORM entity for the notifications table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub recipient: String,
    pub status: NotificationStatus,
    pub created_at: DateTimeWithTimeZone,
    pub sent_at: Option<DateTimeWithTimeZone>,
    pub read_at: Option<DateTimeWithTimeZone>,
    pub attempts: i32,
    pub error_message: Option<String>,
    pub template_id: Option<String>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub template_data: Option<Json>,
    pub priority: NotificationPriority,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Notification {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            notification_type: model.notification_type,
            subject: model.subject,
            content: model.content,
            recipient: model.recipient,
            status: model.status,
            created_at: model.created_at.into(),
            sent_at: model.sent_at.map(Into::into),
            read_at: model.read_at.map(Into::into),
            attempts: model.attempts,
            error_message: model.error_message,
            template_id: model.template_id,
            template_data: model.template_data.and_then(|json| match json {
                serde_json::Value::Object(map) => Some(map),
                _ => None,
            }),
            priority: model.priority,
        }
    }
}

impl From<Notification> for ActiveModel {
    fn from(notification: Notification) -> Self {
        ActiveModel {
            id: Set(notification.id),
            user_id: Set(notification.user_id),
            notification_type: Set(notification.notification_type),
            subject: Set(notification.subject),
            content: Set(notification.content),
            recipient: Set(notification.recipient),
            status: Set(notification.status),
            created_at: Set(notification.created_at.into()),
            sent_at: Set(notification.sent_at.map(Into::into)),
            read_at: Set(notification.read_at.map(Into::into)),
            attempts: Set(notification.attempts),
            error_message: Set(notification.error_message),
            template_id: Set(notification.template_id),
            template_data: Set(notification.template_data.map(serde_json::Value::Object)),
            priority: Set(notification.priority),
        }
    }
}
