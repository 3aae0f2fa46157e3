//! Delivery channel providers.
//!
//! Each provider owns one channel (email, SMS, push) and turns a
//! [`NotificationMessage`] into a [`DeliveryResult`]. Providers never
//! return errors through `Result`: every failure mode is reported as a
//! failed `DeliveryResult` so callers can persist the outcome uniformly.

mod email;
mod push;
mod sms;

pub use email::{EmailProvider, EmailProviderConfig};
pub use push::{PushProvider, PushProviderConfig};
pub use sms::{SmsProvider, SmsProviderConfig};

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{DeliveryResult, NotificationMessage};

/// A delivery channel implementation.
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    /// Channel name, e.g. "Email".
    fn name(&self) -> &'static str;

    /// Whether this provider serves the given channel name.
    /// Matching is case-insensitive.
    fn can_handle(&self, notification_type: &str) -> bool {
        notification_type.eq_ignore_ascii_case(self.name())
    }

    /// Deliver one message. Infallible at the type level; delivery
    /// problems come back inside the result.
    async fn send(&self, message: &NotificationMessage) -> DeliveryResult;
}

/// Holds the configured providers and resolves the one serving a
/// channel. Registration order is significant: the first provider whose
/// `can_handle` matches wins.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn NotificationProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in providers, configured from the
    /// environment.
    pub fn from_env() -> Self {
        Self::new()
            .register(Arc::new(EmailProvider::new(EmailProviderConfig::from_env())))
            .register(Arc::new(SmsProvider::new(SmsProviderConfig::from_env())))
            .register(Arc::new(PushProvider::new(PushProviderConfig::from_env())))
    }

    pub fn register(mut self, provider: Arc<dyn NotificationProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// First registered provider that serves the channel.
    pub fn find(&self, notification_type: &str) -> Option<Arc<dyn NotificationProvider>> {
        self.providers
            .iter()
            .find(|p| p.can_handle(notification_type))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider(&'static str);

    #[async_trait]
    impl NotificationProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn send(&self, _message: &NotificationMessage) -> DeliveryResult {
            DeliveryResult::success("fake")
        }
    }

    #[test]
    fn find_matches_case_insensitively() {
        let registry = ProviderRegistry::new().register(Arc::new(FakeProvider("Email")));

        assert!(registry.find("email").is_some());
        assert!(registry.find("EMAIL").is_some());
        assert!(registry.find("Sms").is_none());
    }

    #[test]
    fn find_returns_first_match() {
        let registry = ProviderRegistry::new()
            .register(Arc::new(FakeProvider("Email")))
            .register(Arc::new(FakeProvider("email")));

        let found = registry.find("Email").unwrap();
        assert_eq!(found.name(), "Email");
    }
}
