use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use crate::models::NotificationPreference;

/// Sea-ORM entity for the notification_preferences table.
///
/// One row per (user_id, notification_type, event_type); enforced by a
/// unique index in the schema.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_preferences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub event_type: String,
    pub is_enabled: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for NotificationPreference {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            notification_type: model.notification_type,
            event_type: model.event_type,
            is_enabled: model.is_enabled,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.map(Into::into),
        }
    }
}

impl From<NotificationPreference> for ActiveModel {
    fn from(preference: NotificationPreference) -> Self {
        ActiveModel {
            id: Set(preference.id),
            user_id: Set(preference.user_id),
            notification_type: Set(preference.notification_type),
            event_type: Set(preference.event_type),
            is_enabled: Set(preference.is_enabled),
            created_at: Set(preference.created_at.into()),
            updated_at: Set(preference.updated_at.map(Into::into)),
        }
    }
}
