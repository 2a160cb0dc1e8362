//! Producer side: turns registration events into queued confirmation jobs.

use std::sync::Arc;

use stream_worker::JobQueue;
use tracing::{info, instrument};

use crate::error::NotificationResult;
use crate::models::{ConfirmationRequest, EmailPayload, NotificationJob, SmsPayload};

/// Enqueues confirmation jobs. Each call appends exactly one job, or fails
/// without enqueueing anything.
pub struct NotificationService<Q> {
    queue: Arc<Q>,
}

impl<Q> Clone for NotificationService<Q> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<Q: JobQueue<NotificationJob>> NotificationService<Q> {
    pub fn new(queue: Q) -> Self {
        Self {
            queue: Arc::new(queue),
        }
    }

    pub fn from_arc(queue: Arc<Q>) -> Self {
        Self { queue }
    }

    /// Returns the queue-assigned entry id.
    #[instrument(skip(self, payload), fields(patient_id = %payload.patient_id))]
    pub async fn dispatch_confirmation_email(&self, payload: EmailPayload) -> NotificationResult<String> {
        self.enqueue(NotificationJob::SendConfirmationEmail(payload)).await
    }

    #[instrument(skip(self, payload), fields(patient_id = %payload.patient_id))]
    pub async fn dispatch_confirmation_sms(&self, payload: SmsPayload) -> NotificationResult<String> {
        self.enqueue(NotificationJob::SendConfirmationSms(payload)).await
    }

    /// Picks the job for the stored preference without touching the queue.
    pub fn route_confirmation(&self, request: &ConfirmationRequest) -> NotificationResult<NotificationJob> {
        request.route()
    }

    /// Routes on the stored preference. An unknown preference fails before
    /// the queue is touched.
    pub async fn dispatch_confirmation(&self, request: &ConfirmationRequest) -> NotificationResult<String> {
        match self.route_confirmation(request)? {
            NotificationJob::SendConfirmationEmail(payload) => self.dispatch_confirmation_email(payload).await,
            NotificationJob::SendConfirmationSms(payload) => self.dispatch_confirmation_sms(payload).await,
        }
    }

    async fn enqueue(&self, job: NotificationJob) -> NotificationResult<String> {
        let job_type = job.job_type();
        let id = self.queue.add(job_type.as_str(), &job).await?;
        info!(id = %id, job_type = %job_type, "Notification job queued");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotificationError;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;
    use stream_worker::{InMemoryQueue, StreamError};

    mock! {
        pub Queue {}

        #[async_trait]
        impl JobQueue<NotificationJob> for Queue {
            async fn add(&self, name: &str, job: &NotificationJob) -> Result<String, StreamError>;
        }
    }

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

    #[tokio::test]
    async fn test_email_preference_enqueues_email_job() {
        let queue = Arc::new(InMemoryQueue::<NotificationJob>::new());
        let service = NotificationService::from_arc(Arc::clone(&queue));

        service.dispatch_confirmation(&request("EMAIL")).await.unwrap();

        let entries = queue.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "SEND_CONFIRMATION_EMAIL");
        assert_eq!(
            entries[0].payload,
            json!({
                "type": "SEND_CONFIRMATION_EMAIL",
                "payload": { "patientId": "p1", "email": "ana@gmail.com", "fullName": "Ana Ruiz" }
            })
        );
    }

    #[tokio::test]
    async fn test_sms_preference_enqueues_sms_job() {
        let queue = Arc::new(InMemoryQueue::<NotificationJob>::new());
        let service = NotificationService::from_arc(Arc::clone(&queue));

        service.dispatch_confirmation(&request("SMS")).await.unwrap();

        let entries = queue.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "SEND_CONFIRMATION_SMS");
        assert_eq!(
            entries[0].payload["payload"],
            json!({
                "patientId": "p1",
                "phoneCode": "+34",
                "phoneNumber": "612345678",
                "fullName": "Ana Ruiz"
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_preference_never_touches_queue() {
        let mut queue = MockQueue::new();
        queue.expect_add().never();
        let service = NotificationService::new(queue);

        let err = service
            .dispatch_confirmation(&request("CARRIER_PIGEON"))
            .await
            .unwrap_err();

        assert!(matches!(err, NotificationError::UnknownPreference(_)));
        assert!(err.to_string().contains("Unknown notification preference"));
    }

    #[tokio::test]
    async fn test_direct_dispatch_uses_job_tag_as_name() {
        let mut queue = MockQueue::new();
        queue
            .expect_add()
            .withf(|name, job| name == "SEND_CONFIRMATION_EMAIL" && job.patient_id() == "p1")
            .times(1)
            .returning(|_, _| Ok("1-0".to_string()));
        let service = NotificationService::new(queue);

        let id = service
            .dispatch_confirmation_email(request("EMAIL").email_payload())
            .await
            .unwrap();
        assert_eq!(id, "1-0");
    }

    #[tokio::test]
    async fn test_queue_failure_surfaces() {
        let mut queue = MockQueue::new();
        queue
            .expect_add()
            .times(1)
            .returning(|_, _| Err(StreamError::Unavailable("redis down".to_string())));
        let service = NotificationService::new(queue);

        let err = service
            .dispatch_confirmation_sms(request("SMS").sms_payload())
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Queue(_)));
    }

    #[tokio::test]
    async fn test_unavailable_queue_keeps_nothing() {
        let queue = Arc::new(InMemoryQueue::<NotificationJob>::new());
        queue.set_available(false);
        let service = NotificationService::from_arc(Arc::clone(&queue));

        assert!(service.dispatch_confirmation(&request("EMAIL")).await.is_err());
        assert!(queue.entries().await.is_empty());
    }
}
