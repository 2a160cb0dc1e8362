//! Patient intake: validation, persistence, then confirmation dispatch.

use std::sync::Arc;

use domain_notifications::{NotificationJob, NotificationService};
use stream_worker::JobQueue;
use tracing::{info, instrument};
use validator::Validate;

use crate::error::{FieldErrors, PatientError, PatientResult};
use crate::models::{
    CreatePatient, DocumentUpload, NewPatient, PaginatedPatients, Pagination, Patient,
    PatientQuery, document_url, field_messages,
};
use crate::repository::PatientRepository;

pub struct PatientService<R, Q> {
    repository: Arc<R>,
    notifications: NotificationService<Q>,
}

impl<R, Q> Clone for PatientService<R, Q> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            notifications: self.notifications.clone(),
        }
    }
}

impl<R, Q> PatientService<R, Q>
where
    R: PatientRepository,
    Q: JobQueue<NotificationJob>,
{
    pub fn new(repository: R, notifications: NotificationService<Q>) -> Self {
        Self {
            repository: Arc::new(repository),
            notifications,
        }
    }

    /// Registers a patient and queues its confirmation.
    ///
    /// Returns once the job is enqueued; delivery happens in the worker.
    /// A failed enqueue is reported after the patient is already stored.
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn register(
        &self,
        input: CreatePatient,
        document: Option<DocumentUpload>,
    ) -> PatientResult<Patient> {
        let stored_name = Self::validate(&input, document.as_ref())?;

        if self.repository.find_by_email(&input.email).await?.is_some() {
            return Err(PatientError::email_taken());
        }

        let patient = self
            .repository
            .create(NewPatient {
                patient: input,
                document_url: document_url(&stored_name),
            })
            .await?;

        let message_id = self
            .notifications
            .dispatch_confirmation(&patient.confirmation_request())
            .await?;

        info!(
            patient_id = %patient.id,
            preference = %patient.notification_preference,
            message_id = %message_id,
            "Patient registered"
        );
        Ok(patient)
    }

    pub async fn list_patients(&self, query: PatientQuery) -> PatientResult<PaginatedPatients> {
        let (page, limit) = (query.page(), query.limit());
        let data = self.repository.list(query.offset(), limit).await?;
        let total = self.repository.count().await?;

        Ok(PaginatedPatients {
            data,
            pagination: Pagination::new(page, limit, total),
        })
    }

    /// Document and field errors are reported together. Returns the stored
    /// document name on success.
    fn validate(input: &CreatePatient, document: Option<&DocumentUpload>) -> PatientResult<String> {
        let mut errors = FieldErrors::new();

        let stored_name = match document {
            None => {
                errors.insert("document".to_string(), "Document photo is required".to_string());
                None
            }
            Some(doc) => match doc.check() {
                Ok(()) => Some(doc.stored_name()),
                Err(message) => {
                    errors.insert("document".to_string(), message.to_string());
                    None
                }
            },
        };

        if let Err(e) = input.validate() {
            errors.extend(field_messages(&e));
        }

        match stored_name {
            Some(name) if errors.is_empty() => Ok(name),
            _ => Err(PatientError::Validation(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryPatientRepository, MockPatientRepository};
    use domain_notifications::NotificationChannel;
    use serde_json::json;
    use stream_worker::InMemoryQueue;

    type Queue = InMemoryQueue<NotificationJob>;

    fn input(email: &str, preference: NotificationChannel) -> CreatePatient {
        CreatePatient {
            full_name: "Ana Ruiz".to_string(),
            email: email.to_string(),
            phone_code: "+34".to_string(),
            phone_number: "612345678".to_string(),
            notification_preference: preference,
        }
    }

    fn jpeg() -> Option<DocumentUpload> {
        Some(DocumentUpload {
            original_name: "id.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            size_bytes: 2048,
        })
    }

    fn service() -> (PatientService<InMemoryPatientRepository, Queue>, Arc<Queue>) {
        let queue = Arc::new(Queue::new());
        let service = PatientService::new(
            InMemoryPatientRepository::new(),
            NotificationService::from_arc(Arc::clone(&queue)),
        );
        (service, queue)
    }

    #[tokio::test]
    async fn test_register_email_queues_email_job() {
        let (service, queue) = service();

        let patient = service
            .register(input("ana@gmail.com", NotificationChannel::Email), jpeg())
            .await
            .unwrap();

        assert!(patient.document_url.starts_with("/uploads/"));
        assert!(patient.document_url.ends_with(".jpg"));

        let entries = queue.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].payload,
            json!({
                "type": "SEND_CONFIRMATION_EMAIL",
                "payload": {
                    "patientId": patient.id.to_string(),
                    "email": "ana@gmail.com",
                    "fullName": "Ana Ruiz"
                }
            })
        );
    }

    #[tokio::test]
    async fn test_register_sms_queues_sms_job() {
        let (service, queue) = service();

        service
            .register(input("ana@gmail.com", NotificationChannel::Sms), jpeg())
            .await
            .unwrap();

        let entries = queue.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "SEND_CONFIRMATION_SMS");
    }

    #[tokio::test]
    async fn test_missing_document_merges_with_field_errors() {
        let (service, queue) = service();

        let mut bad = input("ana@outlook.com", NotificationChannel::Email);
        bad.phone_code = "34".to_string();

        let err = service.register(bad, None).await.unwrap_err();
        let errors = err.field_errors().unwrap();
        assert_eq!(errors["document"], "Document photo is required");
        assert_eq!(errors["email"], "Email must be a @gmail.com address");
        assert_eq!(errors["phoneCode"], "Phone code must be + followed by 1-4 digits");
        assert!(queue.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_document_type() {
        let (service, _) = service();
        let png = DocumentUpload {
            original_name: "id.png".to_string(),
            content_type: "image/png".to_string(),
            size_bytes: 10,
        };

        let err = service
            .register(input("ana@gmail.com", NotificationChannel::Email), Some(png))
            .await
            .unwrap_err();
        assert_eq!(err.field_errors().unwrap()["document"], "Only .jpg files are allowed");
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_without_dispatch() {
        let (service, queue) = service();
        service
            .register(input("ana@gmail.com", NotificationChannel::Email), jpeg())
            .await
            .unwrap();

        let err = service
            .register(input("ana@gmail.com", NotificationChannel::Sms), jpeg())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "A patient with this email already exists");
        assert_eq!(err.field_errors().unwrap()["email"], "A patient with this email already exists");
        assert_eq!(queue.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_repository_failure_dispatches_nothing() {
        let mut repo = MockPatientRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));
        repo.expect_create()
            .times(1)
            .returning(|_| Err(PatientError::Repository("disk full".to_string())));

        let queue = Arc::new(Queue::new());
        let service = PatientService::new(repo, NotificationService::from_arc(Arc::clone(&queue)));

        let err = service
            .register(input("ana@gmail.com", NotificationChannel::Email), jpeg())
            .await
            .unwrap_err();
        assert!(matches!(err, PatientError::Repository(_)));
        assert!(queue.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_failure_surfaces_after_persist() {
        let (service, queue) = service();
        queue.set_available(false);

        let err = service
            .register(input("ana@gmail.com", NotificationChannel::Email), jpeg())
            .await
            .unwrap_err();
        assert!(matches!(err, PatientError::Notification(_)));

        let listed = service.list_patients(PatientQuery::default()).await.unwrap();
        assert_eq!(listed.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_list_patients_paginates() {
        let (service, _) = service();
        for i in 0..20 {
            service
                .register(input(&format!("p{}@gmail.com", i), NotificationChannel::Email), jpeg())
                .await
                .unwrap();
        }

        let first = service.list_patients(PatientQuery::default()).await.unwrap();
        assert_eq!(first.data.len(), 18);
        assert_eq!(first.data[0].email, "p19@gmail.com");
        assert_eq!(
            first.pagination,
            Pagination {
                page: 1,
                limit: 18,
                total: 20,
                total_pages: 2
            }
        );

        let second = service.list_patients(PatientQuery::new(2, 18)).await.unwrap();
        assert_eq!(second.data.len(), 2);
        assert_eq!(second.data[1].email, "p0@gmail.com");

        let value = serde_json::to_value(&second).unwrap();
        assert_eq!(value["pagination"]["totalPages"], 2);
    }
}
