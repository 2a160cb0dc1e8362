//! Patient intake: validates registrations, stores them and hands each new
//! patient to the notification dispatcher.

pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{FieldErrors, PatientError, PatientResult};
pub use models::{
    CreatePatient, DocumentUpload, NewPatient, PaginatedPatients, Pagination, Patient, PatientQuery,
};
pub use repository::{InMemoryPatientRepository, PatientRepository};
pub use service::PatientService;
