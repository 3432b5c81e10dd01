//! Severity levels for rule failures.
//!
//! [`Severity`] is totally ordered: `Verbose < Debug < Information < Warning <
//! Error < Critical`. Anything at `Error` or above makes a
//! [`ValidationResult`](crate::ValidationResult) invalid.

use std::fmt::{self, Display};

/// How serious a rule failure is.
///
/// The ordering of the variants is significant and is what
/// [`ValidationResult::is_valid`](crate::ValidationResult::is_valid) compares
/// against.
///
/// # Example
///
/// ```rust
/// use ruleflow::Severity;
///
/// assert!(Severity::Warning < Severity::Error);
/// assert!(Severity::Critical.is_error());
/// assert!(!Severity::Information.is_error());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// Trace-level detail.
    Verbose,
    /// Diagnostic detail.
    Debug,
    /// Informational finding.
    Information,
    /// Suspicious, but does not invalidate the input.
    Warning,
    /// Invalidates the input.
    #[default]
    Error,
    /// Invalidates the input and is reported separately by `throw_if_invalid`.
    Critical,
}

impl Severity {
    /// Returns true if this severity counts toward invalidity.
    pub fn is_error(self) -> bool {
        self >= Severity::Error
    }

    /// Returns the lowercase name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Verbose => "verbose",
            Severity::Debug => "debug",
            Severity::Information => "information",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
