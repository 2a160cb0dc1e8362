use std::collections::BTreeMap;

use domain_notifications::NotificationError;
use thiserror::Error;

/// Field name → first failing message.
pub type FieldErrors = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{message}")]
    Conflict { field: String, message: String },

    #[error("Repository error: {0}")]
    Repository(String),

    /// The patient was stored but the confirmation could not be queued.
    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

impl PatientError {
    pub fn email_taken() -> Self {
        PatientError::Conflict {
            field: "email".to_string(),
            message: "A patient with this email already exists".to_string(),
        }
    }

    /// Per-field messages for validation and conflict errors.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            PatientError::Validation(errors) => Some(errors.clone()),
            PatientError::Conflict { field, message } => {
                Some(BTreeMap::from([(field.clone(), message.clone())]))
            }
            _ => None,
        }
    }
}

pub type PatientResult<T> = Result<T, PatientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_reports_its_field() {
        let errors = PatientError::email_taken().field_errors().unwrap();
        assert_eq!(errors["email"], "A patient with this email already exists");
    }

    #[test]
    fn test_non_field_errors_have_no_field_map() {
        assert!(PatientError::Repository("disk full".to_string()).field_errors().is_none());
        assert!(
            PatientError::Notification(NotificationError::UnknownPreference("FAX".to_string()))
                .field_errors()
                .is_none()
        );
    }
}
