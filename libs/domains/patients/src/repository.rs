use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{PatientError, PatientResult};
use crate::models::{NewPatient, Patient};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> PatientResult<Option<Patient>>;

    /// Fails with a conflict if the email is already registered.
    async fn create(&self, input: NewPatient) -> PatientResult<Patient>;

    /// Newest first.
    async fn list(&self, offset: u64, limit: u64) -> PatientResult<Vec<Patient>>;

    async fn count(&self) -> PatientResult<u64>;
}

/// Insertion-ordered store for development and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPatientRepository {
    patients: Arc<RwLock<Vec<Patient>>>,
}

impl InMemoryPatientRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatientRepository for InMemoryPatientRepository {
    async fn find_by_email(&self, email: &str) -> PatientResult<Option<Patient>> {
        let patients = self.patients.read().await;
        Ok(patients.iter().find(|p| p.email == email).cloned())
    }

    async fn create(&self, input: NewPatient) -> PatientResult<Patient> {
        let mut patients = self.patients.write().await;

        if patients.iter().any(|p| p.email == input.patient.email) {
            return Err(PatientError::email_taken());
        }

        let patient = Patient::new(input);
        patients.push(patient.clone());

        tracing::info!(patient_id = %patient.id, "Created patient");
        Ok(patient)
    }

    async fn list(&self, offset: u64, limit: u64) -> PatientResult<Vec<Patient>> {
        let patients = self.patients.read().await;
        Ok(patients
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self) -> PatientResult<u64> {
        Ok(self.patients.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreatePatient, document_url};
    use domain_notifications::NotificationChannel;

    fn new_patient(email: &str) -> NewPatient {
        NewPatient {
            patient: CreatePatient {
                full_name: "Ana Ruiz".to_string(),
                email: email.to_string(),
                phone_code: "+34".to_string(),
                phone_number: "612345678".to_string(),
                notification_preference: NotificationChannel::Email,
            },
            document_url: document_url("doc.jpg"),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryPatientRepository::new();
        let created = repo.create(new_patient("ana@gmail.com")).await.unwrap();

        let found = repo.find_by_email("ana@gmail.com").await.unwrap();
        assert_eq!(found, Some(created));
        assert!(repo.find_by_email("other@gmail.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = InMemoryPatientRepository::new();
        repo.create(new_patient("ana@gmail.com")).await.unwrap();

        let err = repo.create(new_patient("ana@gmail.com")).await.unwrap_err();
        assert!(matches!(err, PatientError::Conflict { ref field, .. } if field == "email"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_window() {
        let repo = InMemoryPatientRepository::new();
        for i in 0..5 {
            repo.create(new_patient(&format!("p{}@gmail.com", i))).await.unwrap();
        }

        let page: Vec<String> = repo
            .list(1, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.email)
            .collect();
        assert_eq!(page, vec!["p3@gmail.com", "p2@gmail.com"]);
        assert_eq!(repo.count().await.unwrap(), 5);
    }
}
