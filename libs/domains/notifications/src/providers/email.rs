//! Email delivery over SMTP using lettre.
//!
//! When SMTP credentials are absent the provider runs in simulation
//! mode: it logs the message, waits a short artificial delay, and
//! reports success with a synthetic external id. This keeps local
//! development working without a mail server.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error, info};

use super::NotificationProvider;
use crate::models::{DeliveryResult, NotificationMessage};

/// SMTP settings, read from `SMTP_*` environment variables.
#[derive(Debug, Clone)]
pub struct EmailProviderConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: String,
}

impl EmailProviderConfig {
    pub fn from_env() -> Self {
        let username = std::env::var("SMTP_USERNAME").ok().filter(|v| !v.is_empty());
        let from_email = std::env::var("SMTP_FROM_EMAIL")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| username.clone())
            .unwrap_or_else(|| "noreply@localhost".to_string());

        Self {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            username,
            password: std::env::var("SMTP_PASSWORD").ok().filter(|v| !v.is_empty()),
            from_email,
            from_name: std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "JokeHub".to_string()),
        }
    }

    fn credentials(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username.clone(), password.clone())),
            _ => None,
        }
    }
}

pub struct EmailProvider {
    config: EmailProviderConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl EmailProvider {
    pub fn new(config: EmailProviderConfig) -> Self {
        let transport = config.credentials().and_then(|(username, password)| {
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host) {
                Ok(builder) => Some(
                    builder
                        .port(config.port)
                        .credentials(Credentials::new(username, password))
                        .build(),
                ),
                Err(e) => {
                    error!(host = %config.host, error = %e, "Failed to build SMTP transport");
                    None
                }
            }
        });

        Self { config, transport }
    }

    fn build_message(&self, message: &NotificationMessage) -> Result<Message, String> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| format!("Invalid from address: {e}"))?;
        let to: Mailbox = message
            .recipient
            .parse()
            .map_err(|e| format!("Invalid recipient address: {e}"))?;

        let content_type = if is_html_content(&message.content) {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        Message::builder()
            .from(from)
            .to(to)
            .subject(&message.subject)
            .header(content_type)
            .body(message.content.clone())
            .map_err(|e| format!("Failed to build email message: {e}"))
    }
}

#[async_trait]
impl NotificationProvider for EmailProvider {
    fn name(&self) -> &'static str {
        "Email"
    }

    async fn send(&self, message: &NotificationMessage) -> DeliveryResult {
        let Some(transport) = &self.transport else {
            info!(
                recipient = %message.recipient,
                subject = %message.subject,
                "SMTP credentials not configured, simulating email send"
            );
            tokio::time::sleep(Duration::from_millis(200)).await;
            return DeliveryResult::success(format!(
                "simulated_email_{}",
                Utc::now().timestamp_nanos_opt().unwrap_or_default()
            ));
        };

        let mail = match self.build_message(message) {
            Ok(mail) => mail,
            Err(details) => return DeliveryResult::failure(details),
        };

        debug!(
            recipient = %message.recipient,
            subject = %message.subject,
            host = %self.config.host,
            "Sending email via SMTP"
        );

        match transport.send(mail).await {
            Ok(_) => {
                info!(recipient = %message.recipient, subject = %message.subject, "Email sent");
                DeliveryResult::success(format!(
                    "email_{}",
                    Utc::now().timestamp_nanos_opt().unwrap_or_default()
                ))
            }
            Err(e) => {
                error!(recipient = %message.recipient, error = %e, "SMTP send failed");
                DeliveryResult::failure(format!("SMTP error: {e}"))
            }
        }
    }
}

fn is_html_content(content: &str) -> bool {
    let lowered = content.to_ascii_lowercase();
    ["<html>", "<body>", "<div>", "<p>", "<br>", "</"]
        .iter()
        .any(|tag| lowered.contains(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TemplateData;

    fn provider_without_credentials() -> EmailProvider {
        EmailProvider::new(EmailProviderConfig {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
            from_email: "noreply@localhost".to_string(),
            from_name: "JokeHub".to_string(),
        })
    }

    #[test]
    fn detects_html_content() {
        assert!(is_html_content("<p>Hello</p>"));
        assert!(is_html_content("<HTML>upper</HTML>"));
        assert!(!is_html_content("plain text with < and >"));
    }

    #[test]
    fn handles_email_channel_only() {
        let provider = provider_without_credentials();
        assert!(provider.can_handle("email"));
        assert!(provider.can_handle("EMAIL"));
        assert!(!provider.can_handle("SMS"));
    }

    #[tokio::test]
    async fn simulates_delivery_without_credentials() {
        let provider = provider_without_credentials();
        let message = NotificationMessage {
            recipient: "user@example.com".to_string(),
            subject: "Hello".to_string(),
            content: "Body".to_string(),
            metadata: TemplateData::new(),
        };

        let result = provider.send(&message).await;
        assert!(result.success);
        assert!(result
            .external_id
            .as_deref()
            .is_some_and(|id| id.starts_with("simulated_email_")));
    }
}
