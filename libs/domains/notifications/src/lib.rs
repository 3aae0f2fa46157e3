//! Notifications Domain
//!
//! Multi-channel notification dispatch: immediate sends, a durable
//! pending queue with retries, per-user preferences, and parameterized
//! content templates.
//!
//! # Features
//!
//! - Email, SMS and push delivery behind one provider contract
//! - Per-user, per-channel, per-event opt-out preferences
//! - `{{variable}}` content templates with channel-scoped identity
//! - Background processor with bounded retries for queued records
//! - Event bridge fanning joke-created events out to author and admins
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  Event Bridge    │  ← Domain events (joke created)
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │ DispatchService  │  ← send / send_bulk / queue
//! └───┬──────────┬───┘
//!     │          │
//! ┌───▼──────┐ ┌─▼───────────────┐
//! │ Provider │ │ Notification DB │  ← pending + outcome records
//! │ Registry │ └─┬───────────────┘
//! └───┬──────┘   │
//!     │        ┌─▼───────────────┐
//!     │        │    Processor    │  ← polls pending/failed batches
//!     │        └─┬───────────────┘
//! ┌───▼──────────▼───┐
//! │ Email│SMS│Push   │  ← channel providers
//! └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_notifications::{
//!     DispatchService, NotificationRequest,
//!     providers::ProviderRegistry,
//! };
//!
//! let service = DispatchService::new(
//!     notifications, preferences, users, templates, providers,
//! );
//!
//! // Deliver now
//! let sent = service.send(request).await;
//!
//! // Or queue for the background processor
//! let record = service.queue(request).await?;
//! ```

pub mod entity;
pub mod error;
pub mod events;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod processor;
pub mod providers;
pub mod repository;
pub mod service;
pub mod templates;

// Re-export commonly used types
pub use error::{NotificationError, NotificationResult};
pub use events::{EventBridge, JokeCreated};
pub use models::{
    CreateTemplate, DeliveryResult, Notification, NotificationFilter, NotificationMessage,
    NotificationPreference, NotificationPriority, NotificationRequest, NotificationStats,
    NotificationStatus, NotificationTemplate, TemplateData, UpdateTemplate, UserProfile,
};
pub use processor::{NotificationProcessor, ProcessorConfig};
pub use providers::{
    EmailProvider, NotificationProvider, ProviderRegistry, PushProvider, SmsProvider,
};
pub use repository::{
    NotificationRepository, PreferenceRepository, TemplateRepository, UserDirectory,
};
pub use service::DispatchService;
pub use templates::TemplateService;
