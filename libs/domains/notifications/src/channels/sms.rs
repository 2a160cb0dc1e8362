use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::error::NotificationResult;

pub const SMS_EXPECTED_AVAILABILITY: &str = "Q2 2026";

/// SMS delivery has no provider yet. Every SMS job fails with this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SMS notifications are not yet implemented. Expected availability: {expected_availability}.")]
pub struct SmsNotImplementedError {
    pub expected_availability: &'static str,
}

impl Default for SmsNotImplementedError {
    fn default() -> Self {
        Self {
            expected_availability: SMS_EXPECTED_AVAILABILITY,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsChannel: Send + Sync {
    async fn send_confirmation_sms(
        &self,
        phone_code: &str,
        phone_number: &str,
        full_name: &str,
    ) -> NotificationResult<()>;
}

/// Placeholder channel until an SMS provider is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSmsChannel;

#[async_trait]
impl SmsChannel for UnavailableSmsChannel {
    async fn send_confirmation_sms(
        &self,
        phone_code: &str,
        phone_number: &str,
        _full_name: &str,
    ) -> NotificationResult<()> {
        let err = SmsNotImplementedError::default();
        warn!(phone = %format!("{}{}", phone_code, phone_number), "{}", err);
        Err(err.into())
    }
}
