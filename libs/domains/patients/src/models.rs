use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use domain_notifications::{ConfirmationRequest, NotificationChannel};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::error::FieldErrors;

/// Letters (Latin-1 accented included) and whitespace
static FULL_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-ZÀ-ÿ\s]+$").unwrap());

static PHONE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+\d{1,4}$").unwrap());

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

const MAX_TEXT_LEN: usize = 255;

pub const MAX_DOCUMENT_BYTES: u64 = 5 * 1024 * 1024;

pub const ALLOWED_DOCUMENT_TYPES: &[&str] = &["image/jpeg"];

pub const UPLOADS_PREFIX: &str = "/uploads";

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

// Each validator reports only the first failing rule for its field.

fn validate_full_name(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(invalid("required", "Full name is required"));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(invalid("length", "Full name must be less than 255 characters"));
    }
    if !FULL_NAME.is_match(value) {
        return Err(invalid("pattern", "Full name must only contain letters and spaces"));
    }
    Ok(())
}

fn validate_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(invalid("required", "Email is required"));
    }
    if !value.validate_email() {
        return Err(invalid("email", "Invalid email format"));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(invalid("length", "Email must be less than 255 characters"));
    }
    if !value.ends_with("@gmail.com") {
        return Err(invalid("domain", "Email must be a @gmail.com address"));
    }
    Ok(())
}

fn validate_phone_code(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(invalid("required", "Phone code is required"));
    }
    if !PHONE_CODE.is_match(value) {
        return Err(invalid("pattern", "Phone code must be + followed by 1-4 digits"));
    }
    Ok(())
}

fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < 6 {
        return Err(invalid("length", "Phone number must be at least 6 digits"));
    }
    if len > 15 {
        return Err(invalid("length", "Phone number must be at most 15 digits"));
    }
    if !DIGITS.is_match(value) {
        return Err(invalid("pattern", "Phone number must only contain digits"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_code: String,
    pub phone_number: String,
    pub document_url: String,
    pub notification_preference: NotificationChannel,
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn new(input: NewPatient) -> Self {
        Self {
            id: Uuid::now_v7(),
            full_name: input.patient.full_name,
            email: input.patient.email,
            phone_code: input.patient.phone_code,
            phone_number: input.patient.phone_number,
            document_url: input.document_url,
            notification_preference: input.patient.notification_preference,
            created_at: Utc::now(),
        }
    }

    /// The event handed to the notification dispatcher once stored.
    pub fn confirmation_request(&self) -> ConfirmationRequest {
        ConfirmationRequest {
            patient_id: self.id.to_string(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone_code: self.phone_code.clone(),
            phone_number: self.phone_number.clone(),
            notification_preference: self.notification_preference.to_string(),
        }
    }
}

/// Registration form fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatient {
    #[validate(custom(function = "validate_full_name"))]
    pub full_name: String,
    #[validate(custom(function = "validate_email"))]
    pub email: String,
    #[validate(custom(function = "validate_phone_code"))]
    pub phone_code: String,
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: String,
    #[serde(default)]
    pub notification_preference: NotificationChannel,
}

/// A validated registration plus where its document was stored.
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub patient: CreatePatient,
    pub document_url: String,
}

/// Metadata of the uploaded identity document. The bytes themselves are
/// handled by the upload layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl DocumentUpload {
    pub fn check(&self) -> Result<(), &'static str> {
        if !ALLOWED_DOCUMENT_TYPES.contains(&self.content_type.as_str()) {
            return Err("Only .jpg files are allowed");
        }
        if self.size_bytes > MAX_DOCUMENT_BYTES {
            return Err("File size must be less than 5MB");
        }
        Ok(())
    }

    /// Random file name keeping the original extension.
    pub fn stored_name(&self) -> String {
        let extension = Path::new(&self.original_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        format!("{}{}", Uuid::new_v4(), extension)
    }
}

pub fn document_url(stored_name: &str) -> String {
    format!("{}/{}", UPLOADS_PREFIX, stored_name)
}

/// Collects the first message of every failing field, keyed by its wire name.
pub fn field_messages(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|err| {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                (wire_name(&field), message)
            })
        })
        .collect()
}

/// [`CreatePatient`] field names and their serialized form.
const WIRE_NAMES: &[(&str, &str)] = &[
    ("full_name", "fullName"),
    ("email", "email"),
    ("phone_code", "phoneCode"),
    ("phone_number", "phoneNumber"),
    ("notification_preference", "notificationPreference"),
];

fn wire_name(field: &str) -> String {
    WIRE_NAMES
        .iter()
        .find(|(name, _)| *name == field)
        .map_or(field, |(_, wire)| *wire)
        .to_string()
}

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 18;
const MAX_LIMIT: u64 = 100;

/// Listing query. Missing or zero values fall back to the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PatientQuery {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    pub fn page(&self) -> u64 {
        self.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    pub fn offset(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedPatients {
    pub data: Vec<Patient>,
    pub pagination: Pagination,
}
