//! Rules whose outcome is computed from child rules.
//!
//! A [`CompositeRule`] evaluates its children in order and combines their
//! outcomes according to a [`CompositionMode`]:
//!
//! - **All**: stops at the first failing child
//! - **Any**: stops at the first passing child
//! - **Threshold** / **Percentage**: evaluates every child, then counts
//! - **Custom**: evaluates every child, then hands the outcomes to a closure
//!
//! Children are evaluated within the run's [`ValidationContext`]. The run's
//! cancellation signal is checked before every child, a child whose condition
//! is false is skipped and counts as passing, and the outcome of every
//! identifiable child is recorded in the context like a top-level rule's.
//! Once evaluation finishes the composite publishes [`TOTAL_CHILDREN`],
//! [`SUCCESSFUL_CHILDREN`] and [`FAILED_CHILDREN`] to the context properties,
//! where later rules and conditions can read them.
//!
//! Business failures of children are ordinary outcomes. Any other child error
//! (an unexpected error or a panic) ends the evaluation at once and fails the
//! composite with that error's message. Cancellation always propagates.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::context::{Properties, RuleOutcome, SkipReason, ValidationContext};
use crate::error::{RuleError, ValidationError};
use crate::rule::{evaluate_nested, Composite, Rule, SharedRule};
use crate::severity::Severity;

/// Property key holding the number of evaluated children.
pub const TOTAL_CHILDREN: &str = "totalChildren";
/// Property key holding the number of passing children.
pub const SUCCESSFUL_CHILDREN: &str = "successfulChildren";
/// Property key holding the number of failing children.
pub const FAILED_CHILDREN: &str = "failedChildren";

type CustomFn<T> = Arc<dyn Fn(&T, &Properties, &[ChildOutcome]) -> bool + Send + Sync>;

/// How child outcomes combine into the composite's outcome.
pub enum CompositionMode<T> {
    /// Every child must pass.
    All,
    /// At least one child must pass.
    Any,
    /// At least `n` children must pass.
    Threshold(usize),
    /// At least this percentage (0 to 100) of children must pass.
    Percentage(f64),
    /// A closure decides from the per-child outcomes.
    Custom(CustomFn<T>),
}

impl<T> Clone for CompositionMode<T> {
    fn clone(&self) -> Self {
        match self {
            CompositionMode::All => CompositionMode::All,
            CompositionMode::Any => CompositionMode::Any,
            CompositionMode::Threshold(n) => CompositionMode::Threshold(*n),
            CompositionMode::Percentage(p) => CompositionMode::Percentage(*p),
            CompositionMode::Custom(f) => CompositionMode::Custom(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for CompositionMode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositionMode::All => f.write_str("All"),
            CompositionMode::Any => f.write_str("Any"),
            CompositionMode::Threshold(n) => f.debug_tuple("Threshold").field(n).finish(),
            CompositionMode::Percentage(p) => f.debug_tuple("Percentage").field(p).finish(),
            CompositionMode::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The outcome of one evaluated child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildOutcome {
    /// The child's name.
    pub name: String,
    /// The child's id, if it has one.
    pub id: Option<String>,
    /// Whether the child passed. A skipped child counts as passing.
    pub success: bool,
    /// Whether the child was skipped because its condition was false.
    pub skipped: bool,
    /// The failure message of a failing child.
    pub message: Option<String>,
}

/// A rule composed of child rules.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ruleflow::{CompositeRule, FnRule, Rule, SharedRule};
///
/// let children: Vec<SharedRule<i32>> = vec![
///     Arc::new(FnRule::predicate(|n: &i32| *n > 0).with_name("Positive")),
///     Arc::new(FnRule::predicate(|n: &i32| n % 2 == 0).with_name("Even")),
///     Arc::new(FnRule::predicate(|n: &i32| *n < 100).with_name("Small")),
/// ];
///
/// let two_of_three = CompositeRule::minimum(children, 2).with_id("mostly_ok");
/// assert!(two_of_three.validate(&7).is_ok());
/// assert!(two_of_three.validate(&-7).is_err());
/// ```
pub struct CompositeRule<T> {
    children: Vec<SharedRule<T>>,
    mode: CompositionMode<T>,
    id: Option<String>,
    name: Option<String>,
    message: Option<String>,
    severity: Severity,
    priority: i32,
    cancellation: Option<CancellationToken>,
}

impl<T> CompositeRule<T> {
    /// Creates a composite over `children` with the given mode.
    pub fn new(children: Vec<SharedRule<T>>, mode: CompositionMode<T>) -> Self {
        Self {
            children,
            mode,
            id: None,
            name: None,
            message: None,
            severity: Severity::Error,
            priority: 0,
            cancellation: None,
        }
    }

    /// Every child must pass.
    pub fn and(children: Vec<SharedRule<T>>) -> Self {
        Self::new(children, CompositionMode::All)
    }

    /// At least one child must pass.
    pub fn or(children: Vec<SharedRule<T>>) -> Self {
        Self::new(children, CompositionMode::Any)
    }

    /// At least `minimum` children must pass.
    pub fn minimum(children: Vec<SharedRule<T>>, minimum: usize) -> Self {
        Self::new(children, CompositionMode::Threshold(minimum))
    }

    /// At least `percentage` percent of the children must pass.
    ///
    /// An empty child list passes.
    pub fn percentage(children: Vec<SharedRule<T>>, percentage: f64) -> Self {
        Self::new(children, CompositionMode::Percentage(percentage))
    }

    /// A closure decides the outcome after every child has been evaluated.
    ///
    /// The closure receives the input, the run's properties (already holding
    /// [`TOTAL_CHILDREN`], [`SUCCESSFUL_CHILDREN`] and [`FAILED_CHILDREN`] for
    /// this composite), and the per-child outcomes in evaluation order.
    pub fn custom<F>(children: Vec<SharedRule<T>>, decide: F) -> Self
    where
        F: Fn(&T, &Properties, &[ChildOutcome]) -> bool + Send + Sync + 'static,
    {
        Self::new(children, CompositionMode::Custom(Arc::new(decide)))
    }

    /// Sets the rule id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the name used in logs and failure messages.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Prefixes failure messages with `message`.
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

    /// Checks `token` before each child, in addition to the run's own
    /// cancellation signal, and stops with [`RuleError::Cancelled`] once it
    /// is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn check_cancelled(&self) -> Result<(), RuleError> {
        match self.cancellation {
            Some(ref token) if token.is_cancelled() => Err(RuleError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Evaluates one child. Business failures become a failing outcome; any
    /// other error aborts the composite.
    fn evaluate_child(
        &self,
        child: &SharedRule<T>,
        input: &T,
        context: &mut ValidationContext,
    ) -> Result<ChildOutcome, RuleError> {
        self.check_cancelled()?;

        let outcome = |success: bool, skipped: bool, message: Option<String>| ChildOutcome {
            name: child.name().to_string(),
            id: child.id().map(str::to_string),
            success,
            skipped,
            message,
        };

        let Some(result) = evaluate_nested(child.as_ref(), input, context) else {
            if let Some(id) = child.id() {
                context.record_skip(id, SkipReason::ConditionNotMet);
            }
            return Ok(outcome(true, true, None));
        };

        match result {
            Ok(()) => {
                if let Some(id) = child.id() {
                    context.record(id, RuleOutcome::success());
                }
                Ok(outcome(true, false, None))
            }
            Err(RuleError::Failed(message)) => {
                if let Some(id) = child.id() {
                    let error = ValidationError::new(message.clone())
                        .with_severity(child.default_severity())
                        .with_code(child.name());
                    context.record(id, RuleOutcome::failure(Some(error)));
                }
                Ok(outcome(false, false, Some(message)))
            }
            Err(RuleError::Cancelled) => Err(RuleError::Cancelled),
            Err(other) => Err(self.failure(format!(
                "error executing child rule '{}': {}",
                child.name(),
                other
            ))),
        }
    }

    /// Evaluates children in order, stopping early where the mode allows.
    fn evaluate_children(
        &self,
        input: &T,
        context: &mut ValidationContext,
    ) -> Result<Vec<ChildOutcome>, RuleError> {
        let mut outcomes = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let outcome = self.evaluate_child(child, input, context)?;
            let settled = match self.mode {
                CompositionMode::All => !outcome.success,
                CompositionMode::Any => outcome.success,
                _ => false,
            };
            outcomes.push(outcome);
            if settled {
                break;
            }
        }
        Ok(outcomes)
    }

    fn failure(&self, detail: String) -> RuleError {
        match self.message {
            Some(ref message) => RuleError::failed(format!("{} ({})", message, detail)),
            None => RuleError::failed(detail),
        }
    }
}

impl<T> Clone for CompositeRule<T> {
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
            mode: self.mode.clone(),
            id: self.id.clone(),
            name: self.name.clone(),
            message: self.message.clone(),
            severity: self.severity,
            priority: self.priority,
            cancellation: self.cancellation.clone(),
        }
    }
}

fn count_passed(outcomes: &[ChildOutcome]) -> usize {
    outcomes.iter().filter(|o| o.success).count()
}

fn publish_counts(context: &mut ValidationContext, total: usize, passed: usize) {
    context.set_property(TOTAL_CHILDREN, Value::from(total));
    context.set_property(SUCCESSFUL_CHILDREN, Value::from(passed));
    context.set_property(FAILED_CHILDREN, Value::from(total - passed));
}

impl<T> Rule<T> for CompositeRule<T> {
    /// Evaluates the children against a fresh context.
    fn validate(&self, input: &T) -> Result<(), RuleError> {
        self.evaluate(input, &mut ValidationContext::new())
    }

    fn evaluate(&self, input: &T, context: &mut ValidationContext) -> Result<(), RuleError> {
        let outcomes = self.evaluate_children(input, context)?;
        let passed = count_passed(&outcomes);
        publish_counts(context, outcomes.len(), passed);

        match &self.mode {
            CompositionMode::All => match outcomes.iter().find(|o| !o.success) {
                Some(failed) => Err(self.failure(format!(
                    "child rule '{}' failed: {}",
                    failed.name,
                    failed.message.as_deref().unwrap_or_default()
                ))),
                None => Ok(()),
            },
            CompositionMode::Any => {
                if passed > 0 {
                    Ok(())
                } else {
                    Err(self.failure(format!(
                        "none of the {} child rules passed",
                        self.children.len()
                    )))
                }
            }
            CompositionMode::Threshold(required) => {
                if passed >= *required {
                    Ok(())
                } else {
                    Err(self.failure(format!(
                        "{} of {} child rules passed, at least {} required",
                        passed,
                        outcomes.len(),
                        required
                    )))
                }
            }
            CompositionMode::Percentage(required) => {
                if outcomes.is_empty() {
                    return Ok(());
                }
                let rate = passed as f64 / outcomes.len() as f64 * 100.0;
                if rate >= *required {
                    Ok(())
                } else {
                    Err(self.failure(format!(
                        "{:.1}% of child rules passed, at least {}% required",
                        rate, required
                    )))
                }
            }
            CompositionMode::Custom(decide) => {
                if decide(input, context.properties(), &outcomes) {
                    Ok(())
                } else {
                    Err(self.failure(format!(
                        "custom composition rejected the outcome ({} of {} child rules passed)",
                        passed,
                        outcomes.len()
                    )))
                }
            }
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
            .unwrap_or("CompositeRule")
    }

    fn as_composite(&self) -> Option<&dyn Composite<T>> {
        Some(self)
    }
}

impl<T> Composite<T> for CompositeRule<T> {
    fn children(&self) -> &[SharedRule<T>] {
        &self.children
    }

    fn mode(&self) -> &CompositionMode<T> {
        &self.mode
    }
}
