//! The aggregate output of a validation run.
//!
//! [`ValidationResult`] is an ordered, append-only list of
//! [`ValidationError`]s. Validity is derived: a result is valid when no error
//! has severity `Error` or above, so warnings and informational findings can
//! be reported without failing the input.

use stillwater::Validation;

use crate::error::{FailureScope, ValidationError, ValidationFailure};
use crate::severity::Severity;

/// Errors accumulated by one validation run.
///
/// # Example
///
/// ```rust
/// use ruleflow::{Severity, ValidationError, ValidationResult};
///
/// let mut result = ValidationResult::new();
/// result.add_error(ValidationError::new("name is short").with_severity(Severity::Warning));
/// assert!(result.is_valid());
///
/// result.add_error(ValidationError::new("name is missing"));
/// assert!(!result.is_valid());
/// assert!(result.throw_if_invalid().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Creates an empty, valid result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no error has severity `Error` or above.
    pub fn is_valid(&self) -> bool {
        !self.errors.iter().any(ValidationError::is_error)
    }

    /// Returns true if any error is `Critical`.
    pub fn has_critical_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.severity == Severity::Critical)
    }

    /// Returns all errors in the order they were added.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Returns the number of errors of any severity.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if no errors of any severity were recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Appends an error.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Appends several errors, keeping their order.
    pub fn add_errors<I>(&mut self, errors: I)
    where
        I: IntoIterator<Item = ValidationError>,
    {
        self.errors.extend(errors);
    }

    /// Appends every error of another result.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    /// Returns the errors with exactly the given severity.
    pub fn errors_by_severity(&self, severity: Severity) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.severity == severity)
    }

    /// Returns the errors with the given code.
    pub fn errors_with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors
            .iter()
            .filter(move |e| e.code.as_deref() == Some(code))
    }

    /// Returns `Ok(())` when valid, otherwise the aggregate failure.
    ///
    /// If any `Critical` error exists the aggregate holds only the critical
    /// errors. Otherwise it holds every error at `Error` severity or above.
    /// Errors below `Error` never cause a failure.
    pub fn throw_if_invalid(&self) -> Result<(), ValidationFailure> {
        match self.failure() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    /// Converts the result into a stillwater `Validation`.
    pub fn into_validation(self) -> Validation<(), ValidationFailure> {
        match self.failure() {
            Some(failure) => Validation::Failure(failure),
            None => Validation::Success(()),
        }
    }

    /// Runs `action` if the result is valid. Returns self for chaining.
    pub fn on_success<F>(&self, action: F) -> &Self
    where
        F: FnOnce(),
    {
        if self.is_valid() {
            action();
        }
        self
    }

    /// Runs `action` with the validated input if the result is valid.
    /// Returns self for chaining.
    pub fn on_success_with<I, F>(&self, input: I, action: F) -> &Self
    where
        F: FnOnce(I),
    {
        if self.is_valid() {
            action(input);
        }
        self
    }

    /// Runs `action` with the errors if the result is invalid. Returns self
    /// for chaining.
    pub fn on_failure<F>(&self, action: F) -> &Self
    where
        F: FnOnce(&[ValidationError]),
    {
        if !self.is_valid() {
            action(&self.errors);
        }
        self
    }

    fn failure(&self) -> Option<ValidationFailure> {
        if self.is_valid() {
            return None;
        }
        if self.has_critical_errors() {
            return ValidationFailure::from_errors(
                FailureScope::Critical,
                self.errors_by_severity(Severity::Critical).cloned(),
            );
        }
        ValidationFailure::from_errors(
            FailureScope::Invalid,
            self.errors.iter().filter(|e| e.is_error()).cloned(),
        )
    }
}

impl FromIterator<ValidationError> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValidationResult {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
