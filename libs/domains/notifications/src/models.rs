//! Job type registry.
//!
//! Every job type has exactly one payload shape. Adding a channel means adding
//! a `JobType` variant, a payload, a `NotificationJob` variant and a handler;
//! the exhaustive matches below and in the processor refuse to compile until
//! all four exist.

use serde::{Deserialize, Serialize};
use stream_worker::StreamJob;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::{NotificationError, NotificationResult};

/// Delivery medium chosen by the patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum NotificationChannel {
    #[default]
    Email,
    Sms,
}

impl NotificationChannel {
    /// Exact match on `EMAIL` / `SMS`.
    pub fn parse(value: &str) -> NotificationResult<Self> {
        value
            .parse()
            .map_err(|_| NotificationError::UnknownPreference(value.to_string()))
    }

    /// The job type that delivers a confirmation over this channel.
    pub fn confirmation_job(self) -> JobType {
        match self {
            NotificationChannel::Email => JobType::SendConfirmationEmail,
            NotificationChannel::Sms => JobType::SendConfirmationSms,
        }
    }
}

/// Job-type tags, also used as the queue routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    SendConfirmationEmail,
    SendConfirmationSms,
}

impl JobType {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn channel(self) -> NotificationChannel {
        match self {
            JobType::SendConfirmationEmail => NotificationChannel::Email,
            JobType::SendConfirmationSms => NotificationChannel::Sms,
        }
    }

    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmailPayload {
    pub patient_id: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SmsPayload {
    pub patient_id: String,
    pub phone_code: String,
    pub phone_number: String,
    pub full_name: String,
}

/// Wire form: `{"type": "<JobType>", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationJob {
    #[serde(rename = "SEND_CONFIRMATION_EMAIL")]
    SendConfirmationEmail(EmailPayload),
    #[serde(rename = "SEND_CONFIRMATION_SMS")]
    SendConfirmationSms(SmsPayload),
}

impl NotificationJob {
    pub fn job_type(&self) -> JobType {
        match self {
            NotificationJob::SendConfirmationEmail(_) => JobType::SendConfirmationEmail,
            NotificationJob::SendConfirmationSms(_) => JobType::SendConfirmationSms,
        }
    }

    pub fn patient_id(&self) -> &str {
        match self {
            NotificationJob::SendConfirmationEmail(p) => &p.patient_id,
            NotificationJob::SendConfirmationSms(p) => &p.patient_id,
        }
    }
}

impl StreamJob for NotificationJob {
    fn job_id(&self) -> String {
        format!("{}:{}", self.job_type(), self.patient_id())
    }

    fn name(&self) -> &'static str {
        self.job_type().as_str()
    }
}

/// Registration event handed to the dispatcher after a patient is stored.
///
/// `notification_preference` stays a string: it comes from storage and is
/// only validated when routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub patient_id: String,
    pub full_name: String,
    pub email: String,
    pub phone_code: String,
    pub phone_number: String,
    pub notification_preference: String,
}

impl ConfirmationRequest {
    pub fn email_payload(&self) -> EmailPayload {
        EmailPayload {
            patient_id: self.patient_id.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
        }
    }

    pub fn sms_payload(&self) -> SmsPayload {
        SmsPayload {
            patient_id: self.patient_id.clone(),
            phone_code: self.phone_code.clone(),
            phone_number: self.phone_number.clone(),
            full_name: self.full_name.clone(),
        }
    }

    /// Pick the job for the stored preference. Pure; unknown preferences fail.
    pub fn route(&self) -> NotificationResult<NotificationJob> {
        let job = match NotificationChannel::parse(&self.notification_preference)? {
            NotificationChannel::Email => NotificationJob::SendConfirmationEmail(self.email_payload()),
            NotificationChannel::Sms => NotificationJob::SendConfirmationSms(self.sms_payload()),
        };
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(preference: &str) -> ConfirmationRequest {
        ConfirmationRequest {
            patient_id: "p1".to_string(),
            full_name: "Ana Ruiz".to_string(),
            email: "ana@gmail.com".to_string(),
            phone_code: "+34".to_string(),
            phone_number: "612345678".to_string(),
            notification_preference: preference.to_string(),
        }
    }

    #[test]
    fn test_job_type_tags() {
        assert_eq!(JobType::SendConfirmationEmail.as_str(), "SEND_CONFIRMATION_EMAIL");
        assert_eq!(JobType::SendConfirmationSms.to_string(), "SEND_CONFIRMATION_SMS");
        assert_eq!(
            "SEND_CONFIRMATION_SMS".parse::<JobType>().unwrap(),
            JobType::SendConfirmationSms
        );
        assert_eq!(JobType::all().count(), 2);
    }

    #[test]
    fn test_job_type_and_channel_agree() {
        for job_type in JobType::all() {
            assert_eq!(job_type.channel().confirmation_job(), job_type);
        }
    }

    #[test]
    fn test_channel_parse_is_exact() {
        assert_eq!(NotificationChannel::parse("EMAIL").unwrap(), NotificationChannel::Email);
        assert_eq!(NotificationChannel::parse("SMS").unwrap(), NotificationChannel::Sms);

        let err = NotificationChannel::parse("email").unwrap_err();
        assert_eq!(err.to_string(), "Unknown notification preference: email");
    }

    #[test]
    fn test_email_job_wire_format() {
        let job = request("EMAIL").route().unwrap();
        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            json!({
                "type": "SEND_CONFIRMATION_EMAIL",
                "payload": { "patientId": "p1", "email": "ana@gmail.com", "fullName": "Ana Ruiz" }
            })
        );
    }

    #[test]
    fn test_sms_job_wire_format() {
        let job = request("SMS").route().unwrap();
        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            json!({
                "type": "SEND_CONFIRMATION_SMS",
                "payload": {
                    "patientId": "p1",
                    "phoneCode": "+34",
                    "phoneNumber": "612345678",
                    "fullName": "Ana Ruiz"
                }
            })
        );
    }

    #[test]
    fn test_payload_shape_is_fixed_by_tag() {
        // An email payload under the SMS tag must not decode.
        let mixed = json!({
            "type": "SEND_CONFIRMATION_SMS",
            "payload": { "patientId": "p1", "email": "ana@gmail.com", "fullName": "Ana Ruiz" }
        });
        assert!(serde_json::from_value::<NotificationJob>(mixed).is_err());

        let extra = json!({
            "type": "SEND_CONFIRMATION_EMAIL",
            "payload": { "patientId": "p1", "email": "a@gmail.com", "fullName": "A", "phoneCode": "+1" }
        });
        assert!(serde_json::from_value::<NotificationJob>(extra).is_err());
    }

    #[test]
    fn test_route_unknown_preference() {
        let err = request("CARRIER_PIGEON").route().unwrap_err();
        assert!(matches!(err, NotificationError::UnknownPreference(ref p) if p == "CARRIER_PIGEON"));
        assert!(err.to_string().contains("Unknown notification preference"));
    }

    #[test]
    fn test_stream_job_identity() {
        let job = request("SMS").route().unwrap();
        assert_eq!(job.name(), "SEND_CONFIRMATION_SMS");
        assert_eq!(job.job_id(), "SEND_CONFIRMATION_SMS:p1");
    }
}
