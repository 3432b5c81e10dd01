//! Closure-backed rules.

use std::sync::Arc;

use crate::context::ValidationContext;
use crate::error::RuleError;
use crate::rule::{Conditional, Dependent, DependencyPolicy, Rule};
use crate::severity::Severity;

type CheckFn<T> = Arc<dyn Fn(&T) -> Result<(), RuleError> + Send + Sync>;
type PredicateFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;
type ConditionFn<T> = Arc<dyn Fn(&T, &ValidationContext) -> bool + Send + Sync>;

const DEFAULT_MESSAGE: &str = "validation failed";

enum Check<T> {
    Result(CheckFn<T>),
    Predicate(PredicateFn<T>),
}

impl<T> Clone for Check<T> {
    fn clone(&self) -> Self {
        match self {
            Check::Result(check) => Check::Result(Arc::clone(check)),
            Check::Predicate(predicate) => Check::Predicate(Arc::clone(predicate)),
        }
    }
}

/// A rule built from closures.
///
/// `FnRule` exposes every capability through builder methods: an id, a
/// priority, a severity, a condition and a dependency list. Capabilities that
/// are never configured stay absent, so a plain `FnRule` is neither
/// conditional nor dependent.
///
/// # Example
///
/// ```rust
/// use ruleflow::{DependencyPolicy, FnRule, Rule, Severity};
///
/// let positive = FnRule::predicate(|n: &i64| *n > 0)
///     .with_id("positive")
///     .with_message("must be positive")
///     .with_priority(10);
///
/// let small = FnRule::predicate(|n: &i64| *n < 1_000)
///     .with_id("small")
///     .with_severity(Severity::Warning)
///     .depends_on(["positive"], DependencyPolicy::RequiresAllSuccess);
///
/// assert!(positive.validate(&5).is_ok());
/// assert_eq!(positive.validate(&-1).unwrap_err().to_string(), "must be positive");
/// assert!(small.as_dependent().is_some());
/// ```
pub struct FnRule<T> {
    check: Check<T>,
    id: Option<String>,
    name: Option<String>,
    message: Option<String>,
    severity: Severity,
    priority: i32,
    condition: Option<ConditionFn<T>>,
    depends_on: Option<(Vec<String>, DependencyPolicy)>,
}

impl<T> FnRule<T> {
    /// Creates a rule from a check that returns `Err` when the input fails.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&T) -> Result<(), RuleError> + Send + Sync + 'static,
    {
        Self::from_check(Check::Result(Arc::new(check)))
    }

    /// Creates a rule that passes when `predicate` returns true.
    ///
    /// A false predicate fails with the configured message (see
    /// [`with_message`](Self::with_message)).
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::from_check(Check::Predicate(Arc::new(predicate)))
    }

    fn from_check(check: Check<T>) -> Self {
        Self {
            check,
            id: None,
            name: None,
            message: None,
            severity: Severity::Error,
            priority: 0,
            condition: None,
            depends_on: None,
        }
    }

    /// Sets the rule id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the name used in logs and as the error code.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the failure message.
    ///
    /// For predicate rules it is the whole message. For check rules it
    /// replaces the message of unexpected errors; business failures keep
    /// their own message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the default severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Makes the rule conditional on the input and the run's context.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&T, &ValidationContext) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// Makes the rule conditional on the input only.
    pub fn when_input<F>(self, condition: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.when(move |input, _| condition(input))
    }

    /// Makes the rule dependent on the given rule ids.
    pub fn depends_on<I, S>(mut self, ids: I, policy: DependencyPolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = Some((ids.into_iter().map(Into::into).collect(), policy));
        self
    }

    fn failure_message(&self) -> &str {
        self.message.as_deref().unwrap_or(DEFAULT_MESSAGE)
    }
}

impl<T> Clone for FnRule<T> {
    fn clone(&self) -> Self {
        Self {
            check: self.check.clone(),
            id: self.id.clone(),
            name: self.name.clone(),
            message: self.message.clone(),
            severity: self.severity,
            priority: self.priority,
            condition: self.condition.clone(),
            depends_on: self.depends_on.clone(),
        }
    }
}

impl<T> Rule<T> for FnRule<T> {
    fn validate(&self, input: &T) -> Result<(), RuleError> {
        match &self.check {
            Check::Predicate(predicate) => {
                if predicate(input) {
                    Ok(())
                } else {
                    Err(RuleError::failed(self.failure_message()))
                }
            }
            Check::Result(check) => match check(input) {
                Err(RuleError::Unexpected(source)) if self.message.is_some() => Err(
                    RuleError::unexpected(format!("{}: {}", self.failure_message(), source)),
                ),
                other => other,
            },
        }
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn name(&self) -> &str {
        self.name.as_deref().or(self.id.as_deref()).unwrap_or("FnRule")
    }

    fn as_conditional(&self) -> Option<&dyn Conditional<T>> {
        self.condition.as_ref().map(|_| self as &dyn Conditional<T>)
    }

    fn as_dependent(&self) -> Option<&dyn Dependent> {
        self.depends_on.as_ref().map(|_| self as &dyn Dependent)
    }
}

impl<T> Conditional<T> for FnRule<T> {
    fn should_validate(&self, input: &T, context: &ValidationContext) -> bool {
        self.condition
            .as_ref()
            .map_or(true, |condition| condition(input, context))
    }
}

impl<T> Dependent for FnRule<T> {
    fn depends_on(&self) -> &[String] {
        self.depends_on
            .as_ref()
            .map(|(ids, _)| ids.as_slice())
            .unwrap_or(&[])
    }

    fn dependency_policy(&self) -> DependencyPolicy {
        self.depends_on
            .as_ref()
            .map_or(DependencyPolicy::default(), |(_, policy)| *policy)
    }
}
