//! Notification Worker Service
//!
//! A background worker that polls the notification store and delivers
//! pending records through the configured channel providers.
//!
//! ## Architecture
//!
//! ```text
//! PostgreSQL (notifications table)
//!   ↓ (pending + retryable batches)
//! NotificationProcessor
//!   ↓ (template render + metadata)
//! ProviderRegistry (Email | SMS | Push)
//!   ↓
//! Status update (sent / failed, attempts++)
//! ```
//!
//! ## Features
//!
//! - Fixed-interval polling with error backoff
//! - Bounded retries for failed deliveries
//! - Default template seeding on startup
//! - Graceful shutdown on SIGINT/SIGTERM
//!
//! The user directory wired here is process-local; a deployment that
//! owns a user store should swap in its own `UserDirectory` adapter.

use std::sync::Arc;

use core_config::database::DatabaseConfig;
use core_config::{Environment, FromEnv};
use domain_notifications::memory::InMemoryUserDirectory;
use domain_notifications::postgres::{PgNotificationRepository, PgTemplateRepository};
use domain_notifications::{
    NotificationProcessor, ProcessorConfig, ProviderRegistry, TemplateService,
};
use eyre::{Result, WrapErr};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Run the notification worker.
///
/// Sets up logging, connects to PostgreSQL, seeds the default
/// templates, and runs the processor loop until SIGINT or SIGTERM.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        ?environment,
        "Starting notification worker service"
    );

    let db_config = DatabaseConfig::from_env().wrap_err("Failed to load database configuration")?;

    info!("Connecting to PostgreSQL...");
    let db = sea_orm::Database::connect(&db_config.url)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;
    info!("Connected to PostgreSQL");

    let notifications = Arc::new(PgNotificationRepository::new(db.clone()));
    let templates = Arc::new(TemplateService::new(Arc::new(PgTemplateRepository::new(
        db,
    ))));
    let users = Arc::new(InMemoryUserDirectory::new());
    let providers = Arc::new(ProviderRegistry::from_env());

    templates
        .seed_defaults()
        .await
        .wrap_err("Failed to seed default templates")?;

    let config = ProcessorConfig::default();
    info!(
        poll_interval_secs = config.poll_interval_secs,
        batch_size = config.batch_size,
        max_attempts = config.max_attempts,
        "Processor configuration loaded"
    );

    let processor =
        NotificationProcessor::new(notifications, users, templates, providers, config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        let _ = shutdown_tx.send(true);
    });

    processor.run(shutdown_rx).await;

    info!("Notification worker service stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
