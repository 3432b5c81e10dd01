//! Sequential rule execution.
//!
//! [`RuleExecutor`] walks a planned rule sequence on the calling thread. For
//! each rule it checks cancellation, then the rule's condition, then (for the
//! dependent phase) its dependency policy, and only then invokes it. Every
//! outcome is recorded into the [`ValidationContext`] before the next rule is
//! consulted, which is what lets later rules react to earlier ones.
//!
//! Rules are invoked through [`Rule::evaluate`] with the run's context, so
//! composite and selecting rules hand it down to the rules they contain.
//!
//! Rule failures, unexpected errors and panics are all captured as
//! [`ValidationError`]s; only cancellation aborts the run. A cancellation
//! requested while a rule runs is reported once that rule's outcome is
//! recorded, even when it was the last rule.

use std::panic::{self, AssertUnwindSafe};

use crate::context::{RuleOutcome, SkipReason, ValidationContext};
use crate::error::{EngineError, RuleError, ValidationError};
use crate::planner::ExecutionPlanner;
use crate::result::ValidationResult;
use crate::rule::{Rule, SharedRule};
use crate::severity::Severity;

/// Whether a gated rule should be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    Run,
    Skip,
}

/// Runs rules in a given order against one input.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ruleflow::{FnRule, RuleExecutor, SharedRule, ValidationContext, ValidationResult};
///
/// let rules: Vec<SharedRule<i32>> = vec![
///     Arc::new(FnRule::predicate(|n: &i32| *n > 0).with_id("positive").with_message("not positive")),
/// ];
///
/// let mut result = ValidationResult::new();
/// let mut context = ValidationContext::new();
/// RuleExecutor::new()
///     .execute_rules(&rules, &-1, &mut result, &mut context)
///     .unwrap();
///
/// assert_eq!(result.len(), 1);
/// assert!(context.has_rule_failed("positive"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleExecutor;

impl RuleExecutor {
    /// Creates an executor.
    pub fn new() -> Self {
        Self
    }

    /// Runs `rules` in order, honouring conditions but not dependencies.
    pub fn execute_rules<T>(
        &self,
        rules: &[SharedRule<T>],
        input: &T,
        result: &mut ValidationResult,
        context: &mut ValidationContext,
    ) -> Result<(), EngineError> {
        self.run(rules, input, result, context, false)
    }

    /// Runs `rules` in order, skipping any rule whose dependency policy is
    /// not satisfied by the outcomes recorded so far.
    pub fn execute_dependent_rules<T>(
        &self,
        rules: &[SharedRule<T>],
        input: &T,
        result: &mut ValidationResult,
        context: &mut ValidationContext,
    ) -> Result<(), EngineError> {
        self.run(rules, input, result, context, true)
    }

    /// Runs a whole plan: independent rules first, then dependent rules.
    pub fn execute_plan<T>(
        &self,
        planner: &ExecutionPlanner<T>,
        input: &T,
        result: &mut ValidationResult,
        context: &mut ValidationContext,
    ) -> Result<(), EngineError> {
        self.execute_rules(planner.independent_plan(), input, result, context)?;
        self.execute_dependent_rules(planner.dependent_plan(), input, result, context)
    }

    fn run<T>(
        &self,
        rules: &[SharedRule<T>],
        input: &T,
        result: &mut ValidationResult,
        context: &mut ValidationContext,
        check_dependencies: bool,
    ) -> Result<(), EngineError> {
        for rule in rules {
            if self.gate(rule.as_ref(), input, context, check_dependencies)? == Gate::Skip {
                continue;
            }
            let outcome = self.invoke(rule.as_ref(), input, context);
            self.record(rule.as_ref(), outcome, result, context)?;
        }
        Ok(())
    }

    /// Decides whether `rule` runs. Skips are noted in the context for
    /// identifiable rules.
    pub(crate) fn gate<T>(
        &self,
        rule: &dyn Rule<T>,
        input: &T,
        context: &mut ValidationContext,
        check_dependencies: bool,
    ) -> Result<Gate, EngineError> {
        if context.is_cancellation_requested() {
            tracing::info!(rule = rule.name(), "validation cancelled");
            return Err(EngineError::Cancelled);
        }

        if let Some(conditional) = rule.as_conditional() {
            if !conditional.should_validate(input, context) {
                tracing::debug!(
                    rule = rule.name(),
                    rule_id = ?rule.id(),
                    "rule skipped, condition not met"
                );
                if let Some(id) = rule.id() {
                    context.record_skip(id, SkipReason::ConditionNotMet);
                }
                return Ok(Gate::Skip);
            }
        }

        if check_dependencies {
            if let Some(dependent) = rule.as_dependent() {
                let depends_on = dependent.depends_on();
                if !dependent.dependency_policy().is_satisfied(depends_on, context) {
                    tracing::debug!(
                        rule = rule.name(),
                        rule_id = ?rule.id(),
                        depends_on = ?depends_on,
                        "rule skipped, dependencies not met"
                    );
                    if let Some(id) = rule.id() {
                        context.record_skip(id, SkipReason::DependenciesNotMet);
                    }
                    return Ok(Gate::Skip);
                }
            }
        }

        Ok(Gate::Run)
    }

    /// Invokes `rule`, turning a panic into [`RuleError::Panicked`].
    pub(crate) fn invoke<T>(
        &self,
        rule: &dyn Rule<T>,
        input: &T,
        context: &mut ValidationContext,
    ) -> Result<(), RuleError> {
        panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(input, context)))
            .unwrap_or_else(|payload| Err(RuleError::from_panic(payload)))
    }

    /// Records the outcome of an invoked rule, then fails with
    /// [`EngineError::Cancelled`] if cancellation was requested meanwhile.
    pub(crate) fn record<T>(
        &self,
        rule: &dyn Rule<T>,
        outcome: Result<(), RuleError>,
        result: &mut ValidationResult,
        context: &mut ValidationContext,
    ) -> Result<(), EngineError> {
        match outcome {
            Ok(()) => {
                tracing::debug!(rule = rule.name(), rule_id = ?rule.id(), "rule passed");
                if let Some(id) = rule.id() {
                    context.record(id, RuleOutcome::success());
                }
            }
            Err(RuleError::Cancelled) => {
                tracing::info!(rule = rule.name(), "validation cancelled");
                return Err(EngineError::Cancelled);
            }
            Err(err) => {
                let severity = rule.default_severity();
                log_failure(rule, severity, &err);
                let error = ValidationError::new(err.to_string())
                    .with_severity(severity)
                    .with_code(rule.name())
                    .with_context(err);
                if let Some(id) = rule.id() {
                    context.record(id, RuleOutcome::failure(Some(error.clone())));
                }
                result.add_error(error);
            }
        }

        if context.is_cancellation_requested() {
            tracing::info!(rule = rule.name(), "validation cancelled");
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }
}

fn log_failure<T>(rule: &dyn Rule<T>, severity: Severity, error: &RuleError) {
    let name = rule.name();
    let id = rule.id();
    match severity {
        Severity::Verbose => {
            tracing::trace!(rule = name, rule_id = ?id, %severity, %error, "rule failed")
        }
        Severity::Debug => {
            tracing::debug!(rule = name, rule_id = ?id, %severity, %error, "rule failed")
        }
        Severity::Information => {
            tracing::info!(rule = name, rule_id = ?id, %severity, %error, "rule failed")
        }
        Severity::Warning => {
            tracing::warn!(rule = name, rule_id = ?id, %severity, %error, "rule failed")
        }
        Severity::Error | Severity::Critical => {
            tracing::error!(rule = name, rule_id = ?id, %severity, %error, "rule failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{DependencyPolicy, FnRule};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_failure_is_captured_with_code_and_severity() {
        let rules: Vec<SharedRule<i32>> = vec![Arc::new(
            FnRule::predicate(|n: &i32| *n > 0)
                .with_id("positive")
                .with_name("PositiveRule")
                .with_message("must be positive")
                .with_severity(Severity::Critical),
        )];
        let mut result = ValidationResult::new();
        let mut context = ValidationContext::new();

        RuleExecutor::new()
            .execute_rules(&rules, &0, &mut result, &mut context)
            .unwrap();

        let error = &result.errors()[0];
        assert_eq!(error.message, "must be positive");
        assert_eq!(error.severity, Severity::Critical);
        assert_eq!(error.code.as_deref(), Some("PositiveRule"));
        assert!(error.context.is_some());
        assert_eq!(
            context
                .outcome("positive")
                .and_then(|o| o.error())
                .map(|e| e.message.as_str()),
            Some("must be positive")
        );
    }

    #[test]
    fn test_panicking_rule_is_captured() {
        let rules: Vec<SharedRule<i32>> = vec![Arc::new(
            FnRule::predicate(|_: &i32| panic!("kaboom")).with_id("boom"),
        )];
        let mut result = ValidationResult::new();
        let mut context = ValidationContext::new();

        RuleExecutor::new()
            .execute_rules(&rules, &0, &mut result, &mut context)
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.errors()[0].message, "rule panicked: kaboom");
        assert!(context.has_rule_failed("boom"));
    }

    #[test]
    fn test_condition_false_never_invokes() {
        let invoked = Arc::new(AtomicBool::new(false));
        let flag = invoked.clone();
        let rules: Vec<SharedRule<i32>> = vec![Arc::new(
            FnRule::predicate(move |_: &i32| {
                flag.store(true, Ordering::SeqCst);
                false
            })
            .with_id("guarded")
            .when_input(|n| *n > 100),
        )];
        let mut result = ValidationResult::new();
        let mut context = ValidationContext::new();

        RuleExecutor::new()
            .execute_rules(&rules, &1, &mut result, &mut context)
            .unwrap();

        assert!(!invoked.load(Ordering::SeqCst));
        assert!(result.is_empty());
        assert!(context.outcome("guarded").is_none());
        assert_eq!(context.skip_reason("guarded"), Some(SkipReason::ConditionNotMet));
    }

    #[test]
    fn test_execute_rules_ignores_dependencies() {
        let rules: Vec<SharedRule<i32>> = vec![Arc::new(
            FnRule::predicate(|_: &i32| true)
                .with_id("d")
                .depends_on(["missing"], DependencyPolicy::RequiresAllSuccess),
        )];
        let mut result = ValidationResult::new();
        let mut context = ValidationContext::new();
        let executor = RuleExecutor::new();

        executor
            .execute_dependent_rules(&rules, &0, &mut result, &mut context)
            .unwrap();
        assert_eq!(context.skip_reason("d"), Some(SkipReason::DependenciesNotMet));

        executor
            .execute_rules(&rules, &0, &mut result, &mut context)
            .unwrap();
        assert!(context.has_rule_succeeded("d"));
        assert!(context.skip_reason("d").is_none());
    }

    #[test]
    fn test_cancelled_rule_aborts_run() {
        let rules: Vec<SharedRule<i32>> = vec![
            Arc::new(FnRule::new(|_: &i32| Err(RuleError::Cancelled)).with_id("a")),
            Arc::new(FnRule::predicate(|_: &i32| true).with_id("b")),
        ];
        let mut result = ValidationResult::new();
        let mut context = ValidationContext::new();

        let err = RuleExecutor::new()
            .execute_rules(&rules, &0, &mut result, &mut context)
            .unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
        assert!(result.is_empty());
        assert!(context.rule_results().is_empty());
    }

    #[test]
    fn test_cancellation_during_last_rule_is_reported() {
        let rules: Vec<SharedRule<i32>> = vec![Arc::new(
            FnRule::predicate(|_: &i32| true)
                .with_id("last")
                .when(|_: &i32, context: &ValidationContext| {
                    context.cancel();
                    true
                }),
        )];
        let mut result = ValidationResult::new();
        let mut context = ValidationContext::new();

        let err = RuleExecutor::new()
            .execute_rules(&rules, &0, &mut result, &mut context)
            .unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
        assert!(context.has_rule_succeeded("last"));
    }
}
