//! Consumer side: maps each job type to its channel handler.

use std::sync::Arc;

use async_trait::async_trait;
use stream_worker::{StreamError, StreamProcessor};
use tracing::debug;

use crate::channels::{EmailChannel, SmsChannel};
use crate::error::{NotificationError, NotificationResult};
use crate::models::{JobType, NotificationJob};

/// One handler per [`JobType`], checked when built.
#[derive(Clone)]
pub struct JobHandlers {
    email: Arc<dyn EmailChannel>,
    sms: Arc<dyn SmsChannel>,
}

#[derive(Default)]
pub struct JobHandlersBuilder {
    email: Option<Arc<dyn EmailChannel>>,
    sms: Option<Arc<dyn SmsChannel>>,
}

impl JobHandlersBuilder {
    pub fn email(mut self, channel: impl EmailChannel + 'static) -> Self {
        self.email = Some(Arc::new(channel));
        self
    }

    pub fn sms(mut self, channel: impl SmsChannel + 'static) -> Self {
        self.sms = Some(Arc::new(channel));
        self
    }

    /// Fails with [`NotificationError::MissingHandler`] naming the first
    /// job type left without a handler.
    pub fn build(self) -> NotificationResult<JobHandlers> {
        let email = self
            .email
            .ok_or(NotificationError::MissingHandler(JobType::SendConfirmationEmail))?;
        let sms = self
            .sms
            .ok_or(NotificationError::MissingHandler(JobType::SendConfirmationSms))?;

        Ok(JobHandlers { email, sms })
    }
}

impl JobHandlers {
    pub fn builder() -> JobHandlersBuilder {
        JobHandlersBuilder::default()
    }

    /// Runs the handler for `job` with exactly the payload fields it needs.
    pub async fn handle(&self, job: &NotificationJob) -> NotificationResult<()> {
        match job {
            NotificationJob::SendConfirmationEmail(payload) => {
                self.email
                    .send_confirmation_email(&payload.email, &payload.full_name)
                    .await
            }
            NotificationJob::SendConfirmationSms(payload) => {
                self.sms
                    .send_confirmation_sms(&payload.phone_code, &payload.phone_number, &payload.full_name)
                    .await
            }
        }
    }
}

/// Adapts [`JobHandlers`] to the stream worker.
pub struct NotificationProcessor {
    handlers: JobHandlers,
}

impl NotificationProcessor {
    pub fn new(handlers: JobHandlers) -> Self {
        Self { handlers }
    }
}

#[async_trait]
impl StreamProcessor<NotificationJob> for NotificationProcessor {
    async fn process(&self, job: &NotificationJob) -> Result<(), StreamError> {
        debug!(job_type = %job.job_type(), patient_id = %job.patient_id(), "Dispatching to handler");
        self.handlers
            .handle(job)
            .await
            .map_err(|e| StreamError::processing(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "notification_processor"
    }
}
