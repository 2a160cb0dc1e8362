//! Notification worker entry point.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    clinic_notification_worker::run().await
}
