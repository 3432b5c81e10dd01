//! The error a rule returns from `validate`.

use std::error::Error as StdError;

/// Why a rule did not pass.
///
/// Every variant except [`RuleError::Cancelled`] is captured by the executor
/// and turned into a [`ValidationError`](crate::ValidationError) at the
/// rule's default severity. `Cancelled` always aborts the run.
///
/// # Example
///
/// ```rust
/// use ruleflow::RuleError;
///
/// let err = RuleError::failed("amount must be positive");
/// assert_eq!(err.to_string(), "amount must be positive");
/// assert!(!err.is_cancelled());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The rule's own business check failed.
    #[error("{0}")]
    Failed(String),

    /// Something other than the business check went wrong.
    #[error("{0}")]
    Unexpected(#[source] Box<dyn StdError + Send + Sync + 'static>),

    /// The rule panicked; the payload message is kept when it is a string.
    #[error("rule panicked: {0}")]
    Panicked(String),

    /// Cooperative cancellation was observed inside the rule.
    #[error("validation cancelled")]
    Cancelled,
}

impl RuleError {
    /// Creates a business-failure error.
    pub fn failed(message: impl Into<String>) -> Self {
        RuleError::Failed(message.into())
    }

    /// Wraps any other error raised while evaluating a rule.
    pub fn unexpected(error: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        RuleError::Unexpected(error.into())
    }

    /// Returns true for [`RuleError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RuleError::Cancelled)
    }

    /// Returns true for a plain business failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, RuleError::Failed(_))
    }

    /// Builds a `Panicked` error from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        RuleError::Panicked(message)
    }
}
