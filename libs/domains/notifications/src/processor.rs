//! Background processor for queued notifications.
//!
//! Polls the store on a fixed interval, delivering pending records and
//! retrying failed ones that still have attempts left. Records are not
//! leased: delivery is at-least-once, and a crash between the provider
//! call and the status update can produce a duplicate send on the next
//! pass.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::NotificationResult;
use crate::models::{Notification, NotificationMessage, NotificationStatus, TemplateData};
use crate::providers::ProviderRegistry;
use crate::repository::{NotificationRepository, UserDirectory};
use crate::templates::TemplateService;

/// Processor tuning, read from `NOTIFY_*` environment variables.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Seconds between polling passes.
    pub poll_interval_secs: u64,
    /// Seconds to wait after a pass fails outright.
    pub error_backoff_secs: u64,
    /// Maximum pending records taken per pass.
    pub batch_size: u64,
    /// Failed records with this many attempts are abandoned.
    pub max_attempts: i32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: env_parse("NOTIFY_POLL_INTERVAL_SECS", 30),
            error_backoff_secs: 60,
            batch_size: env_parse("NOTIFY_BATCH_SIZE", 50),
            max_attempts: env_parse("NOTIFY_MAX_ATTEMPTS", 3),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub struct NotificationProcessor {
    notifications: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserDirectory>,
    templates: Arc<TemplateService>,
    providers: Arc<ProviderRegistry>,
    config: ProcessorConfig,
}

impl NotificationProcessor {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserDirectory>,
        templates: Arc<TemplateService>,
        providers: Arc<ProviderRegistry>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            notifications,
            users,
            templates,
            providers,
            config,
        }
    }

    /// Run the polling loop until the shutdown signal flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            max_attempts = self.config.max_attempts,
            "Notification processor started"
        );

        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        let error_backoff = Duration::from_secs(self.config.error_backoff_secs);

        loop {
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping processor");
                break;
            }

            let wait = match self.process_once().await {
                Ok(()) => poll_interval,
                Err(e) => {
                    error!(error = %e, "Processing pass failed, backing off");
                    error_backoff
                }
            };

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Received shutdown signal, stopping processor");
                        break;
                    }
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!("Notification processor stopped");
    }

    /// One polling pass: deliver pending records, then retry eligible
    /// failed ones.
    pub async fn process_once(&self) -> NotificationResult<()> {
        self.process_pending().await?;
        self.process_retries().await
    }

    async fn process_pending(&self) -> NotificationResult<()> {
        let batch = self.notifications.pending_batch(self.config.batch_size).await?;
        if batch.is_empty() {
            return Ok(());
        }

        info!(count = batch.len(), "Processing pending notifications");
        self.process_batch(batch).await
    }

    async fn process_retries(&self) -> NotificationResult<()> {
        let batch = self
            .notifications
            .failed_batch(self.config.max_attempts)
            .await?;
        if batch.is_empty() {
            return Ok(());
        }

        info!(count = batch.len(), "Retrying failed notifications");
        self.process_batch(batch).await
    }

    async fn process_batch(&self, batch: Vec<Notification>) -> NotificationResult<()> {
        let deliveries = batch.into_iter().map(|record| self.process_record(record));
        join_all(deliveries)
            .await
            .into_iter()
            .collect::<NotificationResult<Vec<()>>>()?;
        Ok(())
    }

    async fn process_record(&self, record: Notification) -> NotificationResult<()> {
        let Some(provider) = self.providers.find(&record.notification_type) else {
            error!(
                notification_id = %record.id,
                notification_type = %record.notification_type,
                "No provider registered for notification type"
            );
            self.notifications
                .update_status(
                    record.id,
                    NotificationStatus::Failed,
                    Some(format!(
                        "No provider found for type: {}",
                        record.notification_type
                    )),
                )
                .await?;
            return Ok(());
        };

        // Per-record failures must not take down the batch, so a user
        // lookup error is folded into the record like a missing user.
        let user = match self.users.get_by_id(record.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                error!(
                    notification_id = %record.id,
                    user_id = %record.user_id,
                    "User not found for queued notification"
                );
                self.notifications
                    .update_status(
                        record.id,
                        NotificationStatus::Failed,
                        Some("User not found".to_string()),
                    )
                    .await?;
                return Ok(());
            }
            Err(e) => {
                error!(
                    notification_id = %record.id,
                    user_id = %record.user_id,
                    error = %e,
                    "User lookup failed for queued notification"
                );
                self.notifications
                    .update_status(record.id, NotificationStatus::Failed, Some(e.to_string()))
                    .await?;
                return Ok(());
            }
        };

        let (subject, content) = self.resolve_content(&record).await;

        let mut metadata = TemplateData::new();
        metadata.insert("notificationId".to_string(), serde_json::json!(record.id));
        metadata.insert("userId".to_string(), serde_json::json!(record.user_id));
        metadata.insert("userName".to_string(), serde_json::json!(user.name));
        metadata.insert("userEmail".to_string(), serde_json::json!(user.email));
        metadata.insert(
            "priority".to_string(),
            serde_json::json!(record.priority.to_string()),
        );
        metadata.insert(
            "createdAt".to_string(),
            serde_json::json!(record.created_at.to_rfc3339()),
        );
        metadata.insert("attempts".to_string(), serde_json::json!(record.attempts + 1));

        let message = NotificationMessage {
            recipient: record.recipient.clone(),
            subject,
            content,
            metadata,
        };

        let result = provider.send(&message).await;

        if result.success {
            self.notifications
                .update_status(record.id, NotificationStatus::Sent, None)
                .await?;
            debug!(
                notification_id = %record.id,
                notification_type = %record.notification_type,
                recipient = %record.recipient,
                "Queued notification delivered"
            );
        } else {
            self.notifications
                .update_status(record.id, NotificationStatus::Failed, result.error_message.clone())
                .await?;
            warn!(
                notification_id = %record.id,
                notification_type = %record.notification_type,
                error = result.error_message.as_deref().unwrap_or("unknown"),
                "Queued notification delivery failed"
            );
        }

        Ok(())
    }

    /// Same render-with-fallback rule as the immediate send path.
    async fn resolve_content(&self, record: &Notification) -> (String, String) {
        let mut subject = record.subject.clone();
        let mut content = record.content.clone();

        let (Some(template_id), Some(data)) = (&record.template_id, &record.template_data) else {
            return (subject, content);
        };

        match self.templates.render(template_id, data).await {
            Ok(rendered) => {
                content = rendered;
                if subject.is_empty() {
                    subject = self
                        .templates
                        .get(template_id, &record.notification_type)
                        .await
                        .ok()
                        .flatten()
                        .map(|t| t.subject)
                        .unwrap_or_default();
                }
            }
            Err(e) => {
                error!(
                    notification_id = %record.id,
                    template_id,
                    error = %e,
                    "Template render failed, using stored content"
                );
            }
        }

        (subject, content)
    }
}
