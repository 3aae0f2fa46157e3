//! Template storage and rendering.
//!
//! Templates use `{{variable}}` placeholders. Rendering substitutes
//! values from the request's template data; placeholders with no
//! matching value are left verbatim so missing data is visible in the
//! delivered content instead of silently disappearing.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::{Captures, Regex};
use tracing::{debug, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::{NotificationError, NotificationResult};
use crate::models::{CreateTemplate, NotificationTemplate, TemplateData, UpdateTemplate};
use crate::repository::TemplateRepository;

/// Channels a template may target, in render lookup order.
const TEMPLATE_TYPES: [&str; 3] = ["Email", "SMS", "Push"];

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder regex is valid"));

pub struct TemplateService {
    templates: Arc<dyn TemplateRepository>,
}

impl TemplateService {
    pub fn new(templates: Arc<dyn TemplateRepository>) -> Self {
        Self { templates }
    }

    /// Render a template's content with the given data.
    ///
    /// The template is looked up across channels in a fixed order
    /// (Email, then SMS, then Push); the first hit wins. Inactive
    /// templates are rejected.
    pub async fn render(
        &self,
        template_id: &str,
        data: &TemplateData,
    ) -> NotificationResult<String> {
        let mut template = None;
        for notification_type in TEMPLATE_TYPES {
            if let Some(found) = self.templates.find(template_id, notification_type).await? {
                template = Some(found);
                break;
            }
        }

        let Some(template) = template else {
            warn!(template_id, "Template not found");
            return Err(NotificationError::TemplateNotFound(template_id.to_string()));
        };

        if !template.is_active {
            warn!(template_id, "Template is inactive");
            return Err(NotificationError::TemplateInactive(template_id.to_string()));
        }

        debug!(template_id, "Template rendered");
        Ok(substitute(&template.content, data))
    }

    pub async fn get(
        &self,
        template_id: &str,
        notification_type: &str,
    ) -> NotificationResult<Option<NotificationTemplate>> {
        self.templates.find(template_id, notification_type).await
    }

    pub async fn list(
        &self,
        notification_type: Option<&str>,
    ) -> NotificationResult<Vec<NotificationTemplate>> {
        match notification_type {
            Some(notification_type) => self.templates.list_by_type(notification_type).await,
            None => self.templates.list_all().await,
        }
    }

    pub async fn create(&self, request: CreateTemplate) -> NotificationResult<NotificationTemplate> {
        validate_template(&request.notification_type, || request.validate())?;

        if self
            .templates
            .find(&request.template_id, &request.notification_type)
            .await?
            .is_some()
        {
            return Err(NotificationError::TemplateExists {
                template_id: request.template_id,
                notification_type: request.notification_type,
            });
        }

        let template = NotificationTemplate {
            id: Uuid::now_v7(),
            template_id: request.template_id,
            name: request.name,
            notification_type: request.notification_type,
            subject: request.subject,
            content: request.content,
            is_active: request.is_active,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.templates.create(template).await
    }

    /// Replace the mutable fields of an existing template. The
    /// (template_id, type) pair is the identity and cannot change.
    pub async fn update(
        &self,
        template_id: &str,
        notification_type: &str,
        request: UpdateTemplate,
    ) -> NotificationResult<NotificationTemplate> {
        validate_template(notification_type, || request.validate())?;

        let Some(mut existing) = self.templates.find(template_id, notification_type).await? else {
            return Err(NotificationError::TemplateNotFound(template_id.to_string()));
        };

        existing.name = request.name;
        existing.subject = request.subject;
        existing.content = request.content;
        existing.is_active = request.is_active;
        existing.updated_at = Some(Utc::now());

        self.templates.update(existing).await
    }

    /// Delete a template by its logical id, across all channels.
    /// Returns false if no template uses the id.
    pub async fn delete(&self, template_id: &str) -> NotificationResult<bool> {
        let all = self.templates.list_all().await?;
        let Some(template) = all.into_iter().find(|t| t.template_id == template_id) else {
            return Ok(false);
        };

        self.templates.delete(template.id).await
    }

    /// Insert the built-in templates if the store is empty. Safe to run
    /// on every startup.
    pub async fn seed_defaults(&self) -> NotificationResult<()> {
        if !self.templates.list_all().await?.is_empty() {
            return Ok(());
        }

        for template in default_templates() {
            self.templates.create(template).await?;
        }

        debug!("Seeded default notification templates");
        Ok(())
    }
}

fn validate_template<F>(notification_type: &str, validate: F) -> NotificationResult<()>
where
    F: FnOnce() -> Result<(), validator::ValidationErrors>,
{
    validate().map_err(|e| NotificationError::TemplateInvalid(e.to_string()))?;

    if !TEMPLATE_TYPES.contains(&notification_type) {
        return Err(NotificationError::TemplateInvalid(format!(
            "Template type must be one of: {}",
            TEMPLATE_TYPES.join(", ")
        )));
    }
    Ok(())
}

/// Substitute `{{variable}}` placeholders from `data`. Unknown
/// placeholders pass through unchanged.
fn substitute(content: &str, data: &TemplateData) -> String {
    if data.is_empty() {
        return content.to_string();
    }

    PLACEHOLDER
        .replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            match data.get(name) {
                Some(value) => render_value(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn default_templates() -> Vec<NotificationTemplate> {
    let template = |template_id: &str, name: &str, subject: &str, content: &str| {
        NotificationTemplate {
            id: Uuid::now_v7(),
            template_id: template_id.to_string(),
            name: name.to_string(),
            notification_type: "Email".to_string(),
            subject: subject.to_string(),
            content: content.to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    };

    vec![
        template(
            "joke_created_author",
            "Joke Published - Author",
            "Your joke has been published!",
            "Hi {{authorName}}!\n\n\
             Your joke has been published on the platform.\n\n\
             Your joke:\n\"{{jokeText}}\"\n\n\
             Published: {{publishDate}}\n\
             Source: {{source}}\n\
             Joke id: #{{jokeId}}\n\n\
             Thanks for sharing your humor with us!\n\n\
             ---\nThe JokeHub team",
        ),
        template(
            "joke_created_admin",
            "New Joke - Administrators",
            "New joke published on the platform",
            "Hi {{adminName}},\n\n\
             A new joke has been published on JokeHub.\n\n\
             Author: {{authorName}}\n\
             Joke: \"{{jokeText}}\"\n\
             Date: {{publishDate}}\n\
             Source: {{source}}\n\
             Id: #{{jokeId}}\n\n\
             You can review activity from the admin panel.\n\n\
             ---\nJokeHub notification system",
        ),
        template(
            "welcome_user",
            "User Welcome",
            "Welcome to JokeHub!",
            "Hi {{userName}}!\n\n\
             Welcome to JokeHub! You can now create and share your \
             favorite jokes and explore everyone else's.\n\n\
             Enjoy!\n\n\
             ---\nThe JokeHub team",
        ),
        template(
            "system_maintenance",
            "System Maintenance",
            "Scheduled maintenance - JokeHub",
            "Hi {{userName}},\n\n\
             We will be running scheduled maintenance on the platform.\n\n\
             Start: {{startTime}}\n\
             Estimated end: {{endTime}}\n\
             Impact: {{impactDescription}}\n\n\
             Some features may be unavailable during this window.\n\n\
             ---\nThe JokeHub team",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTemplateRepository;
    use serde_json::json;

    fn service() -> TemplateService {
        TemplateService::new(Arc::new(InMemoryTemplateRepository::new()))
    }

    fn data(entries: &[(&str, serde_json::Value)]) -> TemplateData {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn create_request(template_id: &str, notification_type: &str) -> CreateTemplate {
        CreateTemplate {
            template_id: template_id.to_string(),
            name: "Test Template".to_string(),
            notification_type: notification_type.to_string(),
            subject: "Subject".to_string(),
            content: "Hello {{name}}, joke #{{jokeId}} is live".to_string(),
            is_active: true,
        }
    }

    #[test]
    fn substitute_replaces_known_and_keeps_unknown() {
        let rendered = substitute(
            "Hi {{name}}, your joke #{{jokeId}} ({{missing}})",
            &data(&[("name", json!("Ana")), ("jokeId", json!(42))]),
        );
        assert_eq!(rendered, "Hi Ana, your joke #42 ({{missing}})");
    }

    #[test]
    fn substitute_with_empty_data_is_identity() {
        let content = "Hi {{name}}";
        assert_eq!(substitute(content, &TemplateData::new()), content);
    }

    #[tokio::test]
    async fn render_prefers_email_template() {
        let service = service();
        let mut email = create_request("greeting", "Email");
        email.content = "email body".to_string();
        let mut sms = create_request("greeting", "SMS");
        sms.content = "sms body".to_string();

        service.create(sms).await.unwrap();
        service.create(email).await.unwrap();

        let rendered = service.render("greeting", &TemplateData::new()).await.unwrap();
        assert_eq!(rendered, "email body");
    }

    #[tokio::test]
    async fn render_rejects_missing_and_inactive() {
        let service = service();

        let err = service.render("absent", &TemplateData::new()).await.unwrap_err();
        assert!(matches!(err, NotificationError::TemplateNotFound(_)));

        let mut inactive = create_request("dormant", "Email");
        inactive.is_active = false;
        service.create(inactive).await.unwrap();

        let err = service.render("dormant", &TemplateData::new()).await.unwrap_err();
        assert!(matches!(err, NotificationError::TemplateInactive(_)));
    }

    #[tokio::test]
    async fn create_rejects_duplicates_and_bad_types() {
        let service = service();
        service.create(create_request("dup", "Email")).await.unwrap();

        let err = service
            .create(create_request("dup", "Email"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::TemplateExists { .. }));

        // Same id on another channel is allowed.
        service.create(create_request("dup", "SMS")).await.unwrap();

        let err = service
            .create(create_request("bad", "Carrier Pigeon"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::TemplateInvalid(_)));
    }

    #[tokio::test]
    async fn update_replaces_mutable_fields() {
        let service = service();
        service.create(create_request("tpl", "Email")).await.unwrap();

        let updated = service
            .update(
                "tpl",
                "Email",
                UpdateTemplate {
                    name: "Renamed".to_string(),
                    subject: "New subject".to_string(),
                    content: "New {{content}}".to_string(),
                    is_active: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Renamed");
        assert!(!updated.is_active);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn delete_by_logical_id() {
        let service = service();
        service.create(create_request("gone", "Email")).await.unwrap();

        assert!(service.delete("gone").await.unwrap());
        assert!(!service.delete("gone").await.unwrap());
    }

    #[tokio::test]
    async fn seed_defaults_is_idempotent() {
        let service = service();
        service.seed_defaults().await.unwrap();
        let first = service.list(None).await.unwrap();
        assert_eq!(first.len(), 4);

        service.seed_defaults().await.unwrap();
        assert_eq!(service.list(None).await.unwrap().len(), 4);

        assert!(service
            .get("joke_created_author", "Email")
            .await
            .unwrap()
            .is_some());
    }
}
