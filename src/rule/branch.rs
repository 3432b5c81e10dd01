//! If / else-if / else selection between rules.

use std::sync::Arc;

use crate::context::ValidationContext;
use crate::error::RuleError;
use crate::rule::{evaluate_nested, Rule, SharedRule};
use crate::severity::Severity;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Runs the rule of the first branch whose condition holds.
///
/// Conditions are tried in declaration order: the `when` branch, then each
/// `else_if` branch, then the `otherwise` rule. When nothing matches and
/// there is no `otherwise` rule the branch passes without running anything.
/// At most one rule runs per call, and its error is returned unchanged. A
/// selected rule whose own condition is false is not run.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ruleflow::{BranchRule, FnRule, Rule};
///
/// let rule = BranchRule::when(
///     |n: &i32| *n < 0,
///     Arc::new(FnRule::predicate(|n: &i32| *n > -10).with_message("too negative")),
/// )
/// .else_if(
///     |n: &i32| *n > 100,
///     Arc::new(FnRule::predicate(|n: &i32| n % 10 == 0).with_message("large values step by 10")),
/// );
///
/// assert!(rule.validate(&-3).is_ok());
/// assert!(rule.validate(&-30).is_err());
/// assert!(rule.validate(&105).is_err());
/// assert!(rule.validate(&50).is_ok());
/// ```
pub struct BranchRule<T> {
    branches: Vec<(Predicate<T>, SharedRule<T>)>,
    otherwise: Option<SharedRule<T>>,
    id: Option<String>,
    name: Option<String>,
    severity: Severity,
    priority: i32,
}

impl<T> BranchRule<T> {
    /// Starts a branch rule: run `then` when `condition` holds.
    pub fn when<F>(condition: F, then: SharedRule<T>) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            branches: vec![(Arc::new(condition), then)],
            otherwise: None,
            id: None,
            name: None,
            severity: Severity::Error,
            priority: 0,
        }
    }

    /// Adds a branch tried after every earlier one.
    pub fn else_if<F>(mut self, condition: F, then: SharedRule<T>) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.branches.push((Arc::new(condition), then));
        self
    }

    /// Sets the rule run when no condition holds.
    pub fn otherwise(mut self, rule: SharedRule<T>) -> Self {
        self.otherwise = Some(rule);
        self
    }

    /// Sets the rule id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
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

    /// Returns the rule that would run for `input`, if any.
    pub fn select(&self, input: &T) -> Option<&SharedRule<T>> {
        self.branches
            .iter()
            .find(|(condition, _)| condition(input))
            .map(|(_, rule)| rule)
            .or(self.otherwise.as_ref())
    }
}

impl<T> Rule<T> for BranchRule<T> {
    fn validate(&self, input: &T) -> Result<(), RuleError> {
        self.evaluate(input, &mut ValidationContext::new())
    }

    fn evaluate(&self, input: &T, context: &mut ValidationContext) -> Result<(), RuleError> {
        match self.select(input) {
            Some(rule) => evaluate_nested(rule.as_ref(), input, context).unwrap_or(Ok(())),
            None => Ok(()),
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
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("BranchRule")
    }
}
