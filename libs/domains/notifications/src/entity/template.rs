use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use crate::models::NotificationTemplate;

/// Sea-ORM entity for the notification_templates table.
///
/// (template_id, notification_type) is unique; enforced by a unique
/// index in the schema.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_templates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub template_id: String,
    pub name: String,
    pub notification_type: String,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for NotificationTemplate {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            template_id: model.template_id,
            name: model.name,
            notification_type: model.notification_type,
            subject: model.subject,
            content: model.content,
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.map(Into::into),
        }
    }
}

impl From<NotificationTemplate> for ActiveModel {
    fn from(template: NotificationTemplate) -> Self {
        ActiveModel {
            id: Set(template.id),
            template_id: Set(template.template_id),
            name: Set(template.name),
            notification_type: Set(template.notification_type),
            subject: Set(template.subject),
            content: Set(template.content),
            is_active: Set(template.is_active),
            created_at: Set(template.created_at.into()),
            updated_at: Set(template.updated_at.map(Into::into)),
        }
    }
}
