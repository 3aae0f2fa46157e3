//! Notification dispatch orchestration.
//!
//! `DispatchService::send` is the immediate path: resolve the user,
//! check preferences, render content, deliver through a provider, and
//! persist the outcome. `queue` is the deferred path: persist a pending
//! record for the background processor to pick up.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{NotificationError, NotificationResult};
use crate::models::{
    Notification, NotificationFilter, NotificationMessage, NotificationPreference,
    NotificationRequest, NotificationStats, NotificationStatus, TemplateData, UserProfile,
};
use crate::providers::ProviderRegistry;
use crate::repository::{NotificationRepository, PreferenceRepository, UserDirectory};
use crate::templates::TemplateService;

/// Event scope used for preference lookups when a request carries no
/// template id.
const GENERAL_EVENT: &str = "General";

pub struct DispatchService {
    notifications: Arc<dyn NotificationRepository>,
    preferences: Arc<dyn PreferenceRepository>,
    users: Arc<dyn UserDirectory>,
    templates: Arc<TemplateService>,
    providers: Arc<ProviderRegistry>,
}

impl DispatchService {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        preferences: Arc<dyn PreferenceRepository>,
        users: Arc<dyn UserDirectory>,
        templates: Arc<TemplateService>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            notifications,
            preferences,
            users,
            templates,
            providers,
        }
    }

    /// Send one notification immediately.
    ///
    /// Returns true only when the provider accepted the message. All
    /// abort conditions (unknown user, preference opt-out, no provider,
    /// no recipient) and internal errors are logged and reported as
    /// false; callers never see an error from this path.
    pub async fn send(&self, request: NotificationRequest) -> bool {
        match self.try_send(&request).await {
            Ok(sent) => sent,
            Err(e) => {
                error!(
                    user_id = %request.user_id,
                    notification_type = %request.notification_type,
                    error = %e,
                    "Notification send failed"
                );
                false
            }
        }
    }

    async fn try_send(&self, request: &NotificationRequest) -> NotificationResult<bool> {
        let Some(user) = self.users.get_by_id(request.user_id).await? else {
            warn!(user_id = %request.user_id, "User not found, dropping notification");
            return Ok(false);
        };

        let event_type = request.template_id.as_deref().unwrap_or(GENERAL_EVENT);
        if !self
            .is_enabled(request.user_id, &request.notification_type, event_type)
            .await?
        {
            info!(
                user_id = %request.user_id,
                notification_type = %request.notification_type,
                event_type,
                "Notification disabled by user preference"
            );
            return Ok(false);
        }

        let Some(provider) = self.providers.find(&request.notification_type) else {
            error!(
                notification_type = %request.notification_type,
                "No provider registered for notification type"
            );
            return Ok(false);
        };

        let (subject, content) = self.resolve_content(request).await;

        let recipient = match &request.recipient {
            Some(recipient) => recipient.clone(),
            None => default_recipient(&user, &request.notification_type),
        };
        if recipient.is_empty() {
            warn!(
                user_id = %request.user_id,
                notification_type = %request.notification_type,
                "No recipient resolvable for user"
            );
            return Ok(false);
        }

        let message = NotificationMessage {
            recipient: recipient.clone(),
            subject: subject.clone(),
            content: content.clone(),
            metadata: build_metadata(request, &user),
        };

        let result = provider.send(&message).await;

        let record = Notification {
            id: Uuid::now_v7(),
            user_id: request.user_id,
            notification_type: request.notification_type.clone(),
            subject,
            content,
            recipient: recipient.clone(),
            status: if result.success {
                NotificationStatus::Sent
            } else {
                NotificationStatus::Failed
            },
            created_at: Utc::now(),
            sent_at: result.success.then_some(result.sent_at),
            read_at: None,
            attempts: 1,
            error_message: result.error_message.clone(),
            template_id: request.template_id.clone(),
            template_data: request.template_data.clone(),
            priority: request.priority,
        };
        self.notifications.create(record).await?;

        if result.success {
            info!(
                user_id = %request.user_id,
                notification_type = %request.notification_type,
                recipient = %recipient,
                "Notification sent"
            );
        } else {
            warn!(
                user_id = %request.user_id,
                notification_type = %request.notification_type,
                error = result.error_message.as_deref().unwrap_or("unknown"),
                "Notification delivery failed"
            );
        }

        Ok(result.success)
    }

    /// Send many notifications concurrently. True only if every single
    /// one succeeded.
    pub async fn send_bulk(&self, requests: Vec<NotificationRequest>) -> bool {
        let sends = requests.into_iter().map(|request| self.send(request));
        join_all(sends).await.into_iter().all(|sent| sent)
    }

    /// Persist a pending record for deferred delivery by the background
    /// processor. Unlike `send`, precondition failures surface as
    /// errors: the caller asked for durable intake, so a dropped
    /// request must be loud.
    pub async fn queue(&self, request: NotificationRequest) -> NotificationResult<Notification> {
        let Some(user) = self.users.get_by_id(request.user_id).await? else {
            return Err(NotificationError::UserNotFound(request.user_id));
        };

        let recipient = match &request.recipient {
            Some(recipient) => recipient.clone(),
            None => default_recipient(&user, &request.notification_type),
        };
        if recipient.is_empty() {
            return Err(NotificationError::NoRecipient {
                user_id: request.user_id,
                notification_type: request.notification_type,
            });
        }

        let record = Notification::pending(&request, recipient);
        let created = self.notifications.create(record).await?;

        info!(
            notification_id = %created.id,
            user_id = %created.user_id,
            notification_type = %created.notification_type,
            "Notification queued"
        );
        Ok(created)
    }

    pub async fn user_notifications(
        &self,
        user_id: Uuid,
        filter: NotificationFilter,
    ) -> NotificationResult<Vec<Notification>> {
        self.notifications.list_for_user(user_id, filter).await
    }

    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> NotificationResult<bool> {
        self.notifications.mark_read(notification_id, user_id).await
    }

    pub async fn stats(&self, user_id: Uuid) -> NotificationResult<NotificationStats> {
        self.notifications.stats(user_id).await
    }

    pub async fn preferences(&self, user_id: Uuid) -> NotificationResult<Vec<NotificationPreference>> {
        self.preferences.for_user(user_id).await
    }

    pub async fn set_preference(
        &self,
        user_id: Uuid,
        notification_type: &str,
        event_type: &str,
        is_enabled: bool,
    ) -> NotificationResult<NotificationPreference> {
        self.preferences
            .set(user_id, notification_type, event_type, is_enabled)
            .await
    }

    /// Absence of a preference row means enabled.
    async fn is_enabled(
        &self,
        user_id: Uuid,
        notification_type: &str,
        event_type: &str,
    ) -> NotificationResult<bool> {
        let preference = self
            .preferences
            .get(user_id, notification_type, event_type)
            .await?;
        Ok(preference.map(|p| p.is_enabled).unwrap_or(true))
    }

    /// Resolve subject and content, rendering the template when the
    /// request names one. A render failure falls back to the request's
    /// literal content rather than aborting the send.
    async fn resolve_content(&self, request: &NotificationRequest) -> (String, String) {
        let mut subject = request.subject.clone();
        let mut content = request.content.clone();

        let (Some(template_id), Some(data)) = (&request.template_id, &request.template_data) else {
            return (subject, content);
        };

        match self.templates.render(template_id, data).await {
            Ok(rendered) => {
                content = rendered;
                if subject.is_empty() {
                    subject = self
                        .templates
                        .get(template_id, &request.notification_type)
                        .await
                        .ok()
                        .flatten()
                        .map(|t| t.subject)
                        .unwrap_or_default();
                }
            }
            Err(e) => {
                error!(template_id, error = %e, "Template render failed, using literal content");
            }
        }

        (subject, content)
    }
}

fn default_recipient(user: &UserProfile, notification_type: &str) -> String {
    match notification_type.to_ascii_lowercase().as_str() {
        "email" => user.email.clone(),
        "sms" => user.phone.clone().unwrap_or_default(),
        // Device tokens are not part of the user profile; pushes need an
        // explicit recipient.
        _ => String::new(),
    }
}

fn build_metadata(request: &NotificationRequest, user: &UserProfile) -> TemplateData {
    let mut metadata = TemplateData::new();
    metadata.insert("userId".to_string(), json!(request.user_id));
    metadata.insert("userName".to_string(), json!(user.name));
    metadata.insert("userEmail".to_string(), json!(user.email));
    metadata.insert(
        "priority".to_string(),
        json!(request.priority.to_string()),
    );
    metadata.insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryNotificationRepository, InMemoryPreferenceRepository, InMemoryTemplateRepository,
        InMemoryUserDirectory,
    };
    use crate::models::{CreateTemplate, NotificationPriority};
    use crate::providers::{EmailProvider, EmailProviderConfig, PushProvider, PushProviderConfig};

    struct Fixture {
        service: DispatchService,
        notifications: Arc<InMemoryNotificationRepository>,
        preferences: Arc<InMemoryPreferenceRepository>,
        users: Arc<InMemoryUserDirectory>,
        templates: Arc<TemplateService>,
    }

    /// Email provider without credentials simulates success; push
    /// provider without a gateway hard-fails. Both outcomes are
    /// deterministic, which is what these tests rely on.
    fn fixture() -> Fixture {
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let preferences = Arc::new(InMemoryPreferenceRepository::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let templates = Arc::new(TemplateService::new(Arc::new(
            InMemoryTemplateRepository::new(),
        )));

        let providers = Arc::new(
            ProviderRegistry::new()
                .register(Arc::new(EmailProvider::new(EmailProviderConfig {
                    host: "localhost".to_string(),
                    port: 587,
                    username: None,
                    password: None,
                    from_email: "noreply@localhost".to_string(),
                    from_name: "JokeHub".to_string(),
                })))
                .register(Arc::new(PushProvider::new(PushProviderConfig {
                    enabled: false,
                }))),
        );

        let service = DispatchService::new(
            notifications.clone(),
            preferences.clone(),
            users.clone(),
            templates.clone(),
            providers,
        );

        Fixture {
            service,
            notifications,
            preferences,
            users,
            templates,
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: Uuid::now_v7(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            phone: Some("+34600111222".to_string()),
        }
    }

    fn email_request(user_id: Uuid) -> NotificationRequest {
        NotificationRequest {
            user_id,
            notification_type: "Email".to_string(),
            subject: "Hello".to_string(),
            content: "Plain body".to_string(),
            recipient: None,
            template_id: None,
            template_data: None,
            priority: NotificationPriority::Normal,
        }
    }

    #[tokio::test]
    async fn send_delivers_and_persists_sent_record() {
        let f = fixture();
        let user = profile();
        f.users.add_user(user.clone()).await;

        assert!(f.service.send(email_request(user.id)).await);

        let records = f
            .service
            .user_notifications(user.id, NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.status, NotificationStatus::Sent);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.recipient, "ana@example.com");
        assert!(record.sent_at.is_some());
    }

    #[tokio::test]
    async fn send_persists_failed_record_on_provider_failure() {
        let f = fixture();
        let user = profile();
        f.users.add_user(user.clone()).await;

        let mut request = email_request(user.id);
        request.notification_type = "Push".to_string();
        request.recipient = Some("a".repeat(64));

        assert!(!f.service.send(request).await);

        let records = f
            .service
            .user_notifications(user.id, NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, NotificationStatus::Failed);
        assert_eq!(records[0].attempts, 1);
        assert!(records[0].error_message.is_some());
    }

    #[tokio::test]
    async fn send_aborts_silently_without_a_record() {
        let f = fixture();
        let user = profile();
        f.users.add_user(user.clone()).await;

        // Unknown user.
        assert!(!f.service.send(email_request(Uuid::now_v7())).await);

        // Preference opt-out.
        f.preferences
            .set(user.id, "Email", GENERAL_EVENT, false)
            .await
            .unwrap();
        assert!(!f.service.send(email_request(user.id)).await);

        // Unregistered channel.
        let mut request = email_request(user.id);
        request.notification_type = "Fax".to_string();
        assert!(!f.service.send(request).await);

        // No resolvable recipient (push without explicit recipient).
        let mut request = email_request(user.id);
        request.notification_type = "Push".to_string();
        assert!(!f.service.send(request).await);

        assert_eq!(
            f.notifications
                .stats(user.id)
                .await
                .unwrap()
                .total,
            0
        );
    }

    #[tokio::test]
    async fn send_renders_template_and_takes_template_subject() {
        let f = fixture();
        let user = profile();
        f.users.add_user(user.clone()).await;

        f.templates
            .create(CreateTemplate {
                template_id: "greeting".to_string(),
                name: "Greeting".to_string(),
                notification_type: "Email".to_string(),
                subject: "Template subject".to_string(),
                content: "Hi {{name}}, {{missing}} stays".to_string(),
                is_active: true,
            })
            .await
            .unwrap();

        let mut request = email_request(user.id);
        request.subject = String::new();
        request.template_id = Some("greeting".to_string());
        request.template_data = Some(
            [("name".to_string(), json!("Ana"))]
                .into_iter()
                .collect(),
        );

        assert!(f.service.send(request).await);

        let records = f
            .service
            .user_notifications(user.id, NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(records[0].subject, "Template subject");
        assert_eq!(records[0].content, "Hi Ana, {{missing}} stays");
    }

    #[tokio::test]
    async fn send_falls_back_to_literal_content_when_render_fails() {
        let f = fixture();
        let user = profile();
        f.users.add_user(user.clone()).await;

        let mut request = email_request(user.id);
        request.template_id = Some("no_such_template".to_string());
        request.template_data = Some(TemplateData::new());

        assert!(f.service.send(request).await);

        let records = f
            .service
            .user_notifications(user.id, NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(records[0].content, "Plain body");
    }

    #[tokio::test]
    async fn send_bulk_reports_partial_failure() {
        let f = fixture();
        let user = profile();
        f.users.add_user(user.clone()).await;

        let mut requests: Vec<NotificationRequest> =
            (0..4).map(|_| email_request(user.id)).collect();
        // One request targets an unknown user and must fail.
        requests.push(email_request(Uuid::now_v7()));

        assert!(!f.service.send_bulk(requests).await);
        assert_eq!(f.notifications.stats(user.id).await.unwrap().total, 4);

        let all_known: Vec<NotificationRequest> =
            (0..3).map(|_| email_request(user.id)).collect();
        assert!(f.service.send_bulk(all_known).await);
    }

    #[tokio::test]
    async fn queue_creates_pending_record_without_delivery() {
        let f = fixture();
        let user = profile();
        f.users.add_user(user.clone()).await;

        let queued = f.service.queue(email_request(user.id)).await.unwrap();
        assert_eq!(queued.status, NotificationStatus::Pending);
        assert_eq!(queued.attempts, 0);
        assert_eq!(queued.recipient, "ana@example.com");
        assert!(queued.sent_at.is_none());
    }

    #[tokio::test]
    async fn queue_errors_on_unknown_user_and_missing_recipient() {
        let f = fixture();
        let user = UserProfile {
            phone: None,
            ..profile()
        };
        f.users.add_user(user.clone()).await;

        let err = f.service.queue(email_request(Uuid::now_v7())).await.unwrap_err();
        assert!(matches!(err, NotificationError::UserNotFound(_)));

        let mut request = email_request(user.id);
        request.notification_type = "SMS".to_string();
        let err = f.service.queue(request).await.unwrap_err();
        assert!(matches!(err, NotificationError::NoRecipient { .. }));
    }

    #[tokio::test]
    async fn preference_round_trip_through_service() {
        let f = fixture();
        let user = profile();
        f.users.add_user(user.clone()).await;

        f.service
            .set_preference(user.id, "Email", "joke_created_author", false)
            .await
            .unwrap();

        let prefs = f.service.preferences(user.id).await.unwrap();
        assert_eq!(prefs.len(), 1);
        assert!(!prefs[0].is_enabled);

        // Only the (channel, event) pair is disabled; the general scope
        // still delivers.
        assert!(f.service.send(email_request(user.id)).await);
    }

    #[tokio::test]
    async fn send_maps_internal_errors_to_false() {
        use crate::error::NotificationError;
        use crate::repository::{
            MockNotificationRepository, MockPreferenceRepository, MockUserDirectory,
        };

        let mut users = MockUserDirectory::new();
        users.expect_get_by_id().returning(|_| {
            Err(NotificationError::DatabaseError("connection reset".to_string()))
        });

        let service = DispatchService::new(
            Arc::new(MockNotificationRepository::new()),
            Arc::new(MockPreferenceRepository::new()),
            Arc::new(users),
            Arc::new(TemplateService::new(Arc::new(
                InMemoryTemplateRepository::new(),
            ))),
            Arc::new(ProviderRegistry::new()),
        );

        assert!(!service.send(email_request(Uuid::now_v7())).await);
    }

    #[test]
    fn default_recipient_by_channel() {
        let user = profile();
        assert_eq!(default_recipient(&user, "EMAIL"), "ana@example.com");
        assert_eq!(default_recipient(&user, "sms"), "+34600111222");
        assert_eq!(default_recipient(&user, "Push"), "");

        let no_phone = UserProfile {
            phone: None,
            ..user
        };
        assert_eq!(default_recipient(&no_phone, "SMS"), "");
    }
}
