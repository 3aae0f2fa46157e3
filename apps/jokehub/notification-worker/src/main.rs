//! Notification Worker Service - Entry Point
//!
//! Background worker that delivers queued notifications.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    jokehub_notification_worker::run().await
}
