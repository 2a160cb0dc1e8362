//! Error types for the notifications domain.

use core_config::ConfigError;
use stream_worker::StreamError;
use thiserror::Error;

use crate::channels::SmsNotImplementedError;
use crate::models::JobType;

pub type NotificationResult<T> = Result<T, NotificationError>;

#[derive(Debug, Error)]
pub enum NotificationError {
    /// The stored preference is not a known channel. Raised before anything
    /// is enqueued.
    #[error("Unknown notification preference: {0}")]
    UnknownPreference(String),

    /// A job type has no handler in the worker's table.
    #[error("No handler registered for job type {0}")]
    MissingHandler(JobType),

    #[error(transparent)]
    SmsNotImplemented(#[from] SmsNotImplementedError),

    #[error("Email provider error: {0}")]
    Provider(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Enqueue failed; nothing was buffered or retried.
    #[error("Queue error: {0}")]
    Queue(#[from] StreamError),
}

impl From<ConfigError> for NotificationError {
    fn from(err: ConfigError) -> Self {
        NotificationError::Config(err.to_string())
    }
}
