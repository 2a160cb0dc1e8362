//! Outbound email transports.

mod smtp;

pub use smtp::{SmtpConfig, SmtpProvider};

use crate::error::NotificationResult;
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct SentEmail {
    /// First line of the server's reply, when it sent one.
    pub message_id: Option<String>,
}

/// A fully rendered message addressed to one recipient.
#[derive(Debug, Clone, Default)]
pub struct EmailContent {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail>;

    fn name(&self) -> &'static str;

    async fn health_check(&self) -> NotificationResult<bool>;
}
