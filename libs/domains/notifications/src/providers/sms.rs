//! SMS delivery provider.
//!
//! No real gateway is wired up; when credentials are configured the
//! provider validates the phone number, simulates network latency, and
//! injects a small random failure rate so retry handling can be
//! exercised end to end. Without credentials (or when disabled) it
//! simulates unconditionally.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tracing::{error, info, warn};

use super::NotificationProvider;
use crate::models::{DeliveryResult, NotificationMessage};

const SIMULATED_FAILURE_RATE: f64 = 0.05;
const LOG_CONTENT_MAX: usize = 160;

/// SMS gateway settings, read from `SMS_*` environment variables.
#[derive(Debug, Clone)]
pub struct SmsProviderConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl SmsProviderConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SMS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            api_key: std::env::var("SMS_API_KEY").ok().filter(|v| !v.is_empty()),
            api_secret: std::env::var("SMS_API_SECRET").ok().filter(|v| !v.is_empty()),
        }
    }

    fn is_configured(&self) -> bool {
        self.enabled && self.api_key.is_some() && self.api_secret.is_some()
    }
}

pub struct SmsProvider {
    config: SmsProviderConfig,
}

impl SmsProvider {
    pub fn new(config: SmsProviderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NotificationProvider for SmsProvider {
    fn name(&self) -> &'static str {
        "SMS"
    }

    async fn send(&self, message: &NotificationMessage) -> DeliveryResult {
        if !self.config.is_configured() {
            info!(
                recipient = %message.recipient,
                content = %truncate(&message.content, LOG_CONTENT_MAX),
                "SMS gateway not configured or disabled, simulating SMS send"
            );
            tokio::time::sleep(Duration::from_millis(300)).await;
            return DeliveryResult::success(format!(
                "simulated_sms_{}",
                Utc::now().timestamp_nanos_opt().unwrap_or_default()
            ));
        }

        if !is_valid_phone_number(&message.recipient) {
            warn!(recipient = %message.recipient, "Invalid phone number format");
            return DeliveryResult::failure("Invalid phone number format");
        }

        tokio::time::sleep(Duration::from_millis(500)).await;

        let failed = rand::rng().random::<f64>() < SIMULATED_FAILURE_RATE;
        if failed {
            let details = "Simulated SMS provider failure";
            error!(recipient = %message.recipient, error = details, "SMS send failed");
            return DeliveryResult::failure(details);
        }

        info!(
            recipient = %message.recipient,
            content = %truncate(&message.content, LOG_CONTENT_MAX),
            "SMS sent"
        );
        DeliveryResult::success(format!(
            "sms_{}_{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            rand::rng().random_range(1000..10000)
        ))
    }
}

/// International format: leading `+` followed by 10 to 15 digits.
/// Spaces, hyphens, and parentheses are ignored.
fn is_valid_phone_number(phone: &str) -> bool {
    let cleaned: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let Some(digits) = cleaned.strip_prefix('+') else {
        return false;
    };

    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn truncate(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        return content.to_string();
    }
    let kept: String = content.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}
