//! SMTP transport over lettre.
//!
//! Defaults target a local catch-all server (Mailpit/MailHog on port 1025,
//! no TLS, no auth).

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse_or_default};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_email: String,
    pub from_name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1025,
            from_email: "noreply@patientapp.dev".to_string(),
            from_name: None,
            username: None,
            password: None,
            use_tls: false,
        }
    }
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>, port: u16, from_email: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            from_email: from_email.into(),
            ..Self::default()
        }
    }

    pub fn with_from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user.clone(), pass.clone())),
            _ => None,
        }
    }
}

impl FromEnv for SmtpConfig {
    /// Reads `SMTP_HOST`, `SMTP_PORT`, `EMAIL_FROM`, `EMAIL_FROM_NAME`,
    /// `SMTP_USERNAME`, `SMTP_PASSWORD` and `SMTP_TLS`.
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let use_tls = matches!(
            env_or_default("SMTP_TLS", "false").to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        );

        Ok(Self {
            host: env_or_default("SMTP_HOST", &defaults.host),
            port: env_parse_or_default("SMTP_PORT", defaults.port)?,
            from_email: env_or_default("EMAIL_FROM", &defaults.from_email),
            from_name: std::env::var("EMAIL_FROM_NAME").ok().filter(|v| !v.is_empty()),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            use_tls,
        })
    }
}

pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: SmtpConfig,
}

impl SmtpProvider {
    /// Builds the transport. No connection is opened until the first send.
    pub fn new(config: SmtpConfig) -> NotificationResult<Self> {
        let transport = Self::build_transport(&config)?;
        Ok(Self { transport, config })
    }

    fn build_transport(config: &SmtpConfig) -> NotificationResult<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| NotificationError::Config(format!("SMTP relay {}: {}", config.host, e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        }
        .port(config.port);

        if let Some(credentials) = config.credentials() {
            builder = builder.credentials(credentials);
        }

        Ok(builder.build())
    }

    fn sender(&self) -> NotificationResult<Mailbox> {
        let raw = match &self.config.from_name {
            Some(name) => format!("{} <{}>", name, self.config.from_email),
            None => self.config.from_email.clone(),
        };
        raw.parse()
            .map_err(|e| NotificationError::Config(format!("Invalid sender {}: {}", raw, e)))
    }

    fn build_message(&self, email: &EmailContent) -> NotificationResult<Message> {
        let address = email
            .to_email
            .parse()
            .map_err(|e| NotificationError::InvalidAddress(format!("{}: {}", email.to_email, e)))?;
        let to = Mailbox::new(
            (!email.to_name.is_empty()).then(|| email.to_name.clone()),
            address,
        );

        Message::builder()
            .from(self.sender()?)
            .to(to)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::Provider(format!("Failed to build message: {}", e)))
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        debug!(
            to = %email.to_email,
            subject = %email.subject,
            host = %self.config.host,
            port = self.config.port,
            "Sending email via SMTP"
        );

        let message = self.build_message(email)?;

        let response = self.transport.send(message).await.map_err(|e| {
            error!(to = %email.to_email, error = %e, "SMTP send failed");
            NotificationError::Provider(format!("SMTP send failed: {}", e))
        })?;

        let message_id = response.message().next().map(str::to_string);
        info!(to = %email.to_email, message_id = ?message_id, "Email accepted by SMTP server");

        Ok(SentEmail { message_id })
    }

    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        self.transport
            .test_connection()
            .await
            .map_err(|e| NotificationError::Provider(format!("SMTP health check failed: {}", e)))
    }
}
