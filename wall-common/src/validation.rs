//! Field-level validation errors reported back to API clients.
//!
//! Every message names the field it belongs to, e.g.
//! `"The username field may not be blank."`.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum FieldError {
    #[error("is required")]
    Required,
    #[error("may not be blank")]
    Blank,
    #[error("may not have more than {max} characters")]
    TooLong { max: usize },
    #[error("may only contain letters, digits and @/./+/-/_ characters")]
    InvalidUsername,
    #[error("must be a valid email address")]
    InvalidEmail,
    #[error("is already taken by another user")]
    AlreadyTaken,
}

impl FieldError {
    #[must_use]
    pub fn message(&self, field: &str) -> String {
        format!("The {field} field {self}.")
    }
}

/// Unwraps a field that must be present in the request body.
pub fn required(value: Option<String>) -> Result<String, FieldError> {
    value.ok_or(FieldError::Required)
}

/// Trims `value` and rejects it if nothing is left.
pub fn non_blank(value: &str) -> Result<&str, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FieldError::Blank)
    } else {
        Ok(trimmed)
    }
}

pub fn max_chars(value: &str, max: usize) -> Result<(), FieldError> {
    if value.chars().count() <= max {
        Ok(())
    } else {
        Err(FieldError::TooLong { max })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize, Error)]
#[serde(transparent)]
#[error("Request failed validation: {0:?}")]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: &'static str, error: &FieldError) -> Self {
        let mut errors = Self::new();
        errors.add(field, error);
        errors
    }

    #[must_use]
    pub fn non_field(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add_message(NON_FIELD_ERRORS, message.into());
        errors
    }

    pub fn add(&mut self, field: &'static str, error: &FieldError) {
        self.add_message(field, error.message(field));
    }

    fn add_message(&mut self, field: &'static str, message: String) {
        self.0.entry(field).or_default().push(message);
    }

    /// Records the error of a failed field check and passes on the value of a
    /// successful one.
    pub fn check<T>(&mut self, field: &'static str, result: Result<T, FieldError>) -> Option<T> {
        result.map_err(|error| self.add(field, &error)).ok()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }
}
