//! Push notification delivery provider.
//!
//! Builds an FCM-style payload and simulates the gateway call. Unlike
//! the email and SMS providers, this one fails hard when disabled: a
//! push with no configured gateway cannot be meaningfully simulated for
//! a device token.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::NotificationProvider;
use crate::models::{DeliveryResult, NotificationMessage};

const SIMULATED_FAILURE_RATE: f64 = 0.03;

/// Push gateway settings, read from `PUSH_*` environment variables.
#[derive(Debug, Clone)]
pub struct PushProviderConfig {
    pub enabled: bool,
}

impl PushProviderConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("PUSH_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

pub struct PushProvider {
    config: PushProviderConfig,
}

impl PushProvider {
    pub fn new(config: PushProviderConfig) -> Self {
        Self { config }
    }

    fn build_payload(message: &NotificationMessage) -> serde_json::Value {
        json!({
            "notification": {
                "title": message.subject,
                "body": message.content,
                "icon": "default",
                "sound": "default",
            },
            "data": message.metadata,
            "timestamp": Utc::now().timestamp(),
        })
    }
}

#[async_trait]
impl NotificationProvider for PushProvider {
    fn name(&self) -> &'static str {
        "Push"
    }

    async fn send(&self, message: &NotificationMessage) -> DeliveryResult {
        if !self.config.enabled {
            warn!(recipient = %message.recipient, "Push provider is disabled, skipping push");
            return DeliveryResult::failure("Push notification provider is disabled");
        }

        if !is_valid_device_token(&message.recipient) {
            warn!(recipient = %message.recipient, "Invalid device token format");
            return DeliveryResult::failure("Invalid device token format");
        }

        let payload = Self::build_payload(message);
        debug!(recipient = %message.recipient, payload = %payload, "Sending push notification");

        tokio::time::sleep(Duration::from_millis(300)).await;

        let failed = rand::rng().random::<f64>() < SIMULATED_FAILURE_RATE;
        if failed {
            let details = "Simulated push notification service failure";
            error!(recipient = %message.recipient, error = details, "Push send failed");
            return DeliveryResult::failure(details);
        }

        info!(
            recipient = %message.recipient,
            title = %message.subject,
            "Push notification sent"
        );
        DeliveryResult::success(format!(
            "push_{}_{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            rand::rng().random_range(10000..100000)
        ))
    }
}

/// FCM tokens are long alphanumeric strings; APNs tokens are 64 hex
/// chars. Accept 32+ characters of alphanumerics plus `_`, `-`, `:`.
fn is_valid_device_token(token: &str) -> bool {
    token.len() >= 32
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplateData;

    fn message(recipient: &str) -> NotificationMessage {
        NotificationMessage {
            recipient: recipient.to_string(),
            subject: "Title".to_string(),
            content: "Body".to_string(),
            metadata: TemplateData::new(),
        }
    }

    #[test]
    fn device_token_validation() {
        assert!(is_valid_device_token(&"a".repeat(32)));
        assert!(is_valid_device_token("fcm_token:APA91b-G_4f8aBcDeFgHiJkLmNoP"));
        assert!(!is_valid_device_token("short_token"));
        assert!(!is_valid_device_token(&format!("{}!", "a".repeat(32))));
        assert!(!is_valid_device_token(""));
    }

    #[tokio::test]
    async fn fails_when_disabled() {
        let provider = PushProvider::new(PushProviderConfig { enabled: false });

        let result = provider.send(&message(&"a".repeat(64))).await;
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Push notification provider is disabled")
        );
    }

    #[tokio::test]
    async fn rejects_invalid_token_when_enabled() {
        let provider = PushProvider::new(PushProviderConfig { enabled: true });

        let result = provider.send(&message("bad token")).await;
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Invalid device token format")
        );
    }
}
