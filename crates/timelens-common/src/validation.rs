//! Validation trait and errors for configuration types

use thiserror::Error;

/// Validation error with context
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Value out of range for {field}: expected {expected}, got {actual}")]
    OutOfRange {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create an OutOfRange error
    pub fn out_of_range(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl ToString,
    ) -> Self {
        Self::OutOfRange {
            field: field.into(),
            expected: expected.into(),
            actual: actual.to_string(),
        }
    }

    /// Collapse a list of errors into one, or `Ok` when the list is empty
    pub fn from_list(mut errors: Vec<ValidationError>) -> Result<(), ValidationError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

/// Trait for types that can be validated
pub trait Validatable {
    /// Validate the instance, returning Ok(()) if valid or a ValidationError if invalid
    fn validate(&self) -> Result<(), ValidationError>;

    /// Check if the instance is valid without returning the error details
    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
