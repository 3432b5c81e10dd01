//! Errors about the rule set or the run, as opposed to the input.

use crate::error::ValidationFailure;

/// A circular dependency between rules.
///
/// `path` lists the rule ids in the order the cycle was discovered and closes
/// the loop by repeating the first id, so consecutive entries are always an
/// edge of the dependency graph.
///
/// # Example
///
/// ```rust
/// use ruleflow::CycleError;
///
/// let err = CycleError::new(vec!["a".into(), "b".into(), "a".into()]);
/// assert_eq!(err.to_string(), "circular dependency between rules: a -> b -> a");
/// assert_eq!(err.nodes(), &["a".to_string(), "b".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("circular dependency between rules: {}", .path.join(" -> "))]
pub struct CycleError {
    path: Vec<String>,
}

impl CycleError {
    /// Creates a cycle error from a closed path.
    pub fn new(path: Vec<String>) -> Self {
        Self { path }
    }

    /// Returns the closed cycle path (first id repeated at the end).
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Returns the distinct ids on the cycle, without the closing repeat.
    pub fn nodes(&self) -> &[String] {
        match self.path.split_last() {
            Some((_, rest)) if !rest.is_empty() => rest,
            _ => &self.path,
        }
    }
}

/// Errors raised by the validator façade.
///
/// Individual rule failures never appear here during `collect_results`; they
/// are captured into the [`ValidationResult`](crate::ValidationResult).
/// Only planning faults, cancellation and the explicit throw-on-invalid path
/// surface as an `EngineError`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The dependent rules form a cycle; detected before any rule runs.
    #[error(transparent)]
    CircularDependency(#[from] CycleError),

    /// Strict mode found dependency ids that no rule in the set declares.
    #[error("unresolved rule dependencies: {}", .0.join(", "))]
    UnresolvedDependencies(Vec<String>),

    /// The run was cancelled between rules.
    #[error("validation cancelled")]
    Cancelled,

    /// The input is invalid; raised by `validate_or_throw`.
    #[error(transparent)]
    Invalid(#[from] ValidationFailure),
}

impl EngineError {
    /// Returns true if the rule set itself is malformed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EngineError::CircularDependency(_) | EngineError::UnresolvedDependencies(_)
        )
    }

    /// Returns the aggregate failure if this error is `Invalid`.
    pub fn as_failure(&self) -> Option<&ValidationFailure> {
        match self {
            EngineError::Invalid(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_nodes() {
        let err = CycleError::new(vec!["a".into(), "b".into(), "c".into(), "a".into()]);
        assert_eq!(err.nodes().len(), 3);
        assert_eq!(err.path().len(), 4);
    }

    #[test]
    fn test_engine_error_classification() {
        let cycle: EngineError = CycleError::new(vec!["x".into(), "x".into()]).into();
        assert!(cycle.is_configuration_error());
        assert!(cycle.to_string().contains("x -> x"));

        let unresolved = EngineError::UnresolvedDependencies(vec!["ghost".into()]);
        assert!(unresolved.is_configuration_error());
        assert_eq!(unresolved.to_string(), "unresolved rule dependencies: ghost");

        assert!(!EngineError::Cancelled.is_configuration_error());
        assert!(EngineError::Cancelled.as_failure().is_none());
    }
}
