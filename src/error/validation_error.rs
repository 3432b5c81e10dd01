//! Captured rule failures and their aggregate.
//!
//! This module provides [`ValidationError`] for a single captured failure and
//! [`ValidationFailure`] for the non-empty aggregate raised by
//! [`ValidationResult::throw_if_invalid`](crate::ValidationResult::throw_if_invalid).

use std::fmt::{self, Display};
use std::sync::Arc;

use stillwater::prelude::*;

use crate::error::RuleError;
use crate::severity::Severity;

/// A single failure recorded during a validation run.
///
/// - **message**: Human-readable description of the failure
/// - **severity**: Drives validity and how `throw_if_invalid` reports it
/// - **code**: Machine-readable code; the executor uses the failing rule's name
/// - **context**: The [`RuleError`] the rule returned, when there was one
///
/// # Example
///
/// ```rust
/// use ruleflow::{Severity, ValidationError};
///
/// let error = ValidationError::new("amount must be positive")
///     .with_severity(Severity::Critical)
///     .with_code("AmountRule");
///
/// assert_eq!(error.code.as_deref(), Some("AmountRule"));
/// assert_eq!(error.to_string(), "[critical] (AmountRule) amount must be positive");
/// ```
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Human-readable error message.
    pub message: String,
    /// How serious the failure is.
    pub severity: Severity,
    /// Machine-readable error code.
    pub code: Option<String>,
    /// The error the rule raised.
    pub context: Option<Arc<RuleError>>,
}

impl ValidationError {
    /// Creates an error with `Severity::Error` and no code or context.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            code: None,
            context: None,
        }
    }

    /// Sets the severity and returns self for chaining.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the error code and returns self for chaining.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attaches the raised rule error and returns self for chaining.
    pub fn with_context(mut self, error: RuleError) -> Self {
        self.context = Some(Arc::new(error));
        self
    }

    /// Returns true if the severity counts toward invalidity.
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.severity)?;
        if let Some(ref code) = self.code {
            write!(f, "({}) ", code)?;
        }
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.context
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<ValidationError>();
    assert_sync::<ValidationError>();
};

/// Which errors an aggregate failure covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// Only the `Critical` errors of the result.
    Critical,
    /// Every error at `Error` severity or above.
    Invalid,
}

/// A non-empty aggregate of validation errors.
///
/// Raised by `throw_if_invalid` and by `Validator::validate_or_throw`. When
/// the result contains any `Critical` error the aggregate is scoped to the
/// critical errors only; otherwise it carries every error at `Error`
/// severity or above.
///
/// `ValidationFailure` implements `Semigroup`, so failures from separate
/// validators can be combined:
///
/// ```rust
/// use ruleflow::{FailureScope, ValidationError, ValidationFailure};
/// use stillwater::prelude::*;
///
/// let a = ValidationFailure::single(FailureScope::Invalid, ValidationError::new("a"));
/// let b = ValidationFailure::single(FailureScope::Invalid, ValidationError::new("b"));
///
/// assert_eq!(a.combine(b).len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    scope: FailureScope,
    errors: NonEmptyVec<ValidationError>,
}

impl ValidationFailure {
    /// Creates a failure holding a single error.
    pub fn single(scope: FailureScope, error: ValidationError) -> Self {
        Self {
            scope,
            errors: NonEmptyVec::singleton(error),
        }
    }

    /// Creates a failure from a list of errors, or `None` if the list is empty.
    pub fn from_errors<I>(scope: FailureScope, errors: I) -> Option<Self>
    where
        I: IntoIterator<Item = ValidationError>,
    {
        let errors = NonEmptyVec::from_vec(errors.into_iter().collect())?;
        Some(Self { scope, errors })
    }

    /// Returns which errors this failure covers.
    pub fn scope(&self) -> FailureScope {
        self.scope
    }

    /// Returns true if the failure is scoped to critical errors.
    pub fn is_critical(&self) -> bool {
        self.scope == FailureScope::Critical
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false; the aggregate is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over the contained errors.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Returns the first error.
    pub fn first(&self) -> &ValidationError {
        self.errors.head()
    }

    /// Converts the aggregate into a `Vec`.
    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors.into_vec()
    }
}

impl Semigroup for ValidationFailure {
    fn combine(self, other: Self) -> Self {
        let scope = if self.is_critical() || other.is_critical() {
            FailureScope::Critical
        } else {
            FailureScope::Invalid
        };
        ValidationFailure {
            scope,
            errors: self.errors.combine(other.errors),
        }
    }
}

impl Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            FailureScope::Critical => writeln!(
                f,
                "Validation failed with {} critical error(s):",
                self.len()
            )?,
            FailureScope::Invalid => {
                writeln!(f, "Validation failed with {} error(s):", self.len())?
            }
        }
        for (i, error) in self.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

impl IntoIterator for ValidationFailure {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_vec().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_defaults() {
        let error = ValidationError::new("bad input");

        assert_eq!(error.message, "bad input");
        assert_eq!(error.severity, Severity::Error);
        assert!(error.code.is_none());
        assert!(error.context.is_none());
        assert!(error.is_error());
    }

    #[test]
    fn test_validation_error_display_without_code() {
        let error = ValidationError::new("looks odd").with_severity(Severity::Warning);
        assert_eq!(error.to_string(), "[warning] looks odd");
        assert!(!error.is_error());
    }

    #[test]
    fn test_validation_error_source_is_context() {
        use std::error::Error;

        let error = ValidationError::new("failed").with_context(RuleError::failed("inner"));
        let source = error.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("inner"));
    }

    #[test]
    fn test_failure_from_empty_is_none() {
        assert!(ValidationFailure::from_errors(FailureScope::Invalid, Vec::new()).is_none());
    }

    #[test]
    fn test_failure_from_errors_keeps_order() {
        let failure = ValidationFailure::from_errors(
            FailureScope::Invalid,
            vec![
                ValidationError::new("first"),
                ValidationError::new("second"),
                ValidationError::new("third"),
            ],
        )
        .unwrap();

        assert_eq!(failure.len(), 3);
        assert_eq!(failure.first().message, "first");
        let messages: Vec<_> = failure.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failure_combine_escalates_scope() {
        let invalid = ValidationFailure::single(FailureScope::Invalid, ValidationError::new("a"));
        let critical = ValidationFailure::single(
            FailureScope::Critical,
            ValidationError::new("b").with_severity(Severity::Critical),
        );

        let combined = invalid.combine(critical);
        assert!(combined.is_critical());
        assert_eq!(combined.len(), 2);
    }

    #[test]
    fn test_failure_display() {
        let failure = ValidationFailure::single(
            FailureScope::Critical,
            ValidationError::new("disk on fire").with_severity(Severity::Critical),
        );
        let display = failure.to_string();

        assert!(display.contains("1 critical error(s)"));
        assert!(display.contains("1. [critical] disk on fire"));
    }
}
