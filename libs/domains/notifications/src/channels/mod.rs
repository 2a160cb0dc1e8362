//! Per-channel delivery seams used by the job handlers.

mod email;
mod sms;

#[cfg(test)]
pub use email::MockEmailChannel;
pub use email::{ConfirmationMailer, EmailChannel};
#[cfg(test)]
pub use sms::MockSmsChannel;
pub use sms::{SMS_EXPECTED_AVAILABILITY, SmsChannel, SmsNotImplementedError, UnavailableSmsChannel};
