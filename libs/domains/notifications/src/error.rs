//! Error types for the notifications domain.

use thiserror::Error;
use uuid::Uuid;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notifications domain.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Recipient user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    /// No delivery address could be resolved for the user/channel pair.
    #[error("No recipient found for user {user_id} and type {notification_type}")]
    NoRecipient {
        user_id: Uuid,
        notification_type: String,
    },

    /// The user opted out of this notification.
    #[error("Notification disabled by user preference: {0}")]
    NotificationDisabled(String),

    /// No registered provider handles the requested type.
    #[error("No provider found for notification type: {0}")]
    ProviderNotFound(String),

    /// Template lookup failed.
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),

    /// Template exists but is deactivated.
    #[error("Template '{0}' is inactive")]
    TemplateInactive(String),

    /// Template authoring validation failed.
    #[error("Invalid template: {0}")]
    TemplateInvalid(String),

    /// A template with the same (template_id, type) already exists.
    #[error("Template with ID '{template_id}' and type '{notification_type}' already exists")]
    TemplateExists {
        template_id: String,
        notification_type: String,
    },

    /// Delivery provider error.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Notification record not found.
    #[error("Notification not found: {0}")]
    NotFound(Uuid),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for NotificationError {
    fn from(err: sea_orm::DbErr) -> Self {
        NotificationError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Internal(format!("JSON serialization error: {}", err))
    }
}
