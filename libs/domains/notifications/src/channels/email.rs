use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::NotificationResult;
use crate::providers::{EmailContent, EmailProvider};
use crate::templates;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn send_confirmation_email(&self, email: &str, full_name: &str) -> NotificationResult<()>;
}

/// Renders the confirmation template and hands it to an [`EmailProvider`].
pub struct ConfirmationMailer<P> {
    provider: Arc<P>,
}

impl<P: EmailProvider> ConfirmationMailer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

#[async_trait]
impl<P: EmailProvider + 'static> EmailChannel for ConfirmationMailer<P> {
    async fn send_confirmation_email(&self, email: &str, full_name: &str) -> NotificationResult<()> {
        let rendered = templates::confirmation_email(full_name);
        let content = EmailContent {
            to_email: email.to_string(),
            to_name: full_name.to_string(),
            subject: rendered.subject,
            html_body: rendered.html,
            text_body: rendered.text,
        };

        let sent = self.provider.send(&content).await?;
        info!(
            to = %email,
            provider = self.provider.name(),
            message_id = ?sent.message_id,
            "Confirmation email sent"
        );
        Ok(())
    }
}
