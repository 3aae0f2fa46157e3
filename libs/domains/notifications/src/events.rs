//! Bridge from domain events to notification dispatch.
//!
//! Fans a joke-created event out to the author and to every admin.
//! Notification delivery is strictly best-effort from the publisher's
//! point of view: the bridge logs failures and never lets them reach
//! the code that raised the event. Publishers hold an
//! `Option<Arc<EventBridge>>` and skip the call when unwired, so a
//! deployment without notifications needs no stub.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{NotificationPriority, NotificationRequest, TemplateData, UserProfile};
use crate::repository::UserDirectory;
use crate::service::DispatchService;

const AUTHOR_TEMPLATE: &str = "joke_created_author";
const ADMIN_TEMPLATE: &str = "joke_created_admin";

/// A joke was published.
#[derive(Debug, Clone, Deserialize)]
pub struct JokeCreated {
    pub joke_id: i64,
    pub author_id: Uuid,
    pub text: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

pub struct EventBridge {
    dispatch: Arc<DispatchService>,
    users: Arc<dyn UserDirectory>,
}

impl EventBridge {
    pub fn new(dispatch: Arc<DispatchService>, users: Arc<dyn UserDirectory>) -> Self {
        Self { dispatch, users }
    }

    /// Handle a joke-created event. Never fails: every error is logged
    /// and swallowed so event publishers stay decoupled from delivery.
    pub async fn handle_joke_created(&self, event: &JokeCreated) {
        let author = match self.users.get_by_id(event.author_id).await {
            Ok(Some(author)) => author,
            Ok(None) => {
                warn!(joke_id = event.joke_id, author_id = %event.author_id, "Author not found for joke");
                return;
            }
            Err(e) => {
                warn!(joke_id = event.joke_id, error = %e, "Author lookup failed for joke");
                return;
            }
        };

        info!(
            joke_id = event.joke_id,
            author = %author.name,
            "Processing notifications for new joke"
        );

        self.notify_author(event, &author).await;
        self.notify_admins(event, &author).await;
    }

    async fn notify_author(&self, event: &JokeCreated, author: &UserProfile) {
        let request = NotificationRequest {
            user_id: author.id,
            notification_type: "Email".to_string(),
            subject: "Your joke has been published".to_string(),
            content: format!(
                "Hi {}!\n\nYour joke has been published on the platform.\n\nJoke: \"{}\"\n\nThanks for sharing your humor with us!",
                author.name, event.text
            ),
            recipient: None,
            template_id: Some(AUTHOR_TEMPLATE.to_string()),
            template_data: Some(author_data(event, author)),
            priority: NotificationPriority::Normal,
        };

        if self.dispatch.send(request).await {
            debug!(joke_id = event.joke_id, "Author notification sent");
        } else {
            warn!(joke_id = event.joke_id, "Failed to send author notification");
        }
    }

    async fn notify_admins(&self, event: &JokeCreated, author: &UserProfile) {
        let admins = match self.users.list_admins().await {
            Ok(admins) => admins,
            Err(e) => {
                warn!(joke_id = event.joke_id, error = %e, "Admin lookup failed");
                return;
            }
        };

        if admins.is_empty() {
            info!(joke_id = event.joke_id, "No admin users to notify");
            return;
        }

        let admin_count = admins.len();
        let requests = admins
            .into_iter()
            .map(|admin| NotificationRequest {
                user_id: admin.id,
                notification_type: "Email".to_string(),
                subject: "New joke published on the platform".to_string(),
                content: format!(
                    "Hi {},\n\nA new joke has been published.\n\nAuthor: {}\nJoke: \"{}\"\nSource: {}\n\nYou can review activity from the admin panel.",
                    admin.name, author.name, event.text, event.source
                ),
                recipient: None,
                template_id: Some(ADMIN_TEMPLATE.to_string()),
                template_data: Some(admin_data(event, author, &admin)),
                priority: NotificationPriority::Low,
            })
            .collect();

        if self.dispatch.send_bulk(requests).await {
            debug!(
                joke_id = event.joke_id,
                admin_count,
                "Admin notifications sent"
            );
        } else {
            warn!(joke_id = event.joke_id, "Some admin notifications failed");
        }
    }
}

fn common_data(event: &JokeCreated, author: &UserProfile) -> TemplateData {
    let mut data = TemplateData::new();
    data.insert("authorName".to_string(), json!(author.name));
    data.insert("jokeText".to_string(), json!(event.text));
    data.insert("jokeId".to_string(), json!(event.joke_id));
    data.insert(
        "publishDate".to_string(),
        json!(event.created_at.format("%d/%m/%Y %H:%M").to_string()),
    );
    data.insert("source".to_string(), json!(event.source));
    data
}

fn author_data(event: &JokeCreated, author: &UserProfile) -> TemplateData {
    common_data(event, author)
}

fn admin_data(event: &JokeCreated, author: &UserProfile, admin: &UserProfile) -> TemplateData {
    let mut data = common_data(event, author);
    data.insert("adminName".to_string(), json!(admin.name));
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryNotificationRepository, InMemoryPreferenceRepository, InMemoryTemplateRepository,
        InMemoryUserDirectory,
    };
    use crate::models::NotificationFilter;
    use crate::providers::{EmailProvider, EmailProviderConfig, ProviderRegistry};
    use crate::repository::NotificationRepository;
    use crate::templates::TemplateService;

    struct Fixture {
        bridge: EventBridge,
        users: Arc<InMemoryUserDirectory>,
        notifications: Arc<InMemoryNotificationRepository>,
        templates: Arc<TemplateService>,
    }

    fn fixture() -> Fixture {
        let notifications = Arc::new(InMemoryNotificationRepository::new());
        let preferences = Arc::new(InMemoryPreferenceRepository::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let templates = Arc::new(TemplateService::new(Arc::new(
            InMemoryTemplateRepository::new(),
        )));
        let providers = Arc::new(ProviderRegistry::new().register(Arc::new(EmailProvider::new(
            EmailProviderConfig {
                host: "localhost".to_string(),
                port: 587,
                username: None,
                password: None,
                from_email: "noreply@localhost".to_string(),
                from_name: "JokeHub".to_string(),
            },
        ))));

        let dispatch = Arc::new(DispatchService::new(
            notifications.clone(),
            preferences,
            users.clone(),
            templates.clone(),
            providers,
        ));

        Fixture {
            bridge: EventBridge::new(dispatch, users.clone()),
            users,
            notifications,
            templates,
        }
    }

    fn user(name: &str) -> UserProfile {
        UserProfile {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
        }
    }

    fn event(author_id: Uuid) -> JokeCreated {
        JokeCreated {
            joke_id: 42,
            author_id,
            text: "A very funny joke".to_string(),
            source: "local".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn notifies_author_and_admins() {
        let f = fixture();
        f.templates.seed_defaults().await.unwrap();

        let author = user("Ana");
        let admin_one = user("Bea");
        let admin_two = user("Carla");
        f.users.add_user(author.clone()).await;
        f.users.add_admin(admin_one.clone()).await;
        f.users.add_admin(admin_two.clone()).await;

        f.bridge.handle_joke_created(&event(author.id)).await;

        let author_records = f
            .notifications
            .list_for_user(author.id, NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(author_records.len(), 1);
        assert!(author_records[0].content.contains("A very funny joke"));
        assert!(author_records[0].content.contains("Ana"));

        for admin in [&admin_one, &admin_two] {
            let records = f
                .notifications
                .list_for_user(admin.id, NotificationFilter::default())
                .await
                .unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].priority, NotificationPriority::Low);
            assert!(records[0].content.contains(&admin.name));
        }
    }

    #[tokio::test]
    async fn swallows_unknown_author() {
        let f = fixture();
        // No users registered at all; must not panic or error.
        f.bridge.handle_joke_created(&event(Uuid::now_v7())).await;
    }

    #[tokio::test]
    async fn works_without_admins() {
        let f = fixture();
        let author = user("Ana");
        f.users.add_user(author.clone()).await;

        f.bridge.handle_joke_created(&event(author.id)).await;

        let records = f
            .notifications
            .list_for_user(author.id, NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_literal_content_without_templates() {
        let f = fixture();
        let author = user("Ana");
        f.users.add_user(author.clone()).await;

        f.bridge.handle_joke_created(&event(author.id)).await;

        let records = f
            .notifications
            .list_for_user(author.id, NotificationFilter::default())
            .await
            .unwrap();
        // No templates seeded: the inline content is used as-is.
        assert!(records[0].content.starts_with("Hi Ana!"));
    }
}
