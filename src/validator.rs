//! The validator façade.
//!
//! A [`Validator`] owns a rule set and its execution plan. Planning happens
//! once, when the validator is built, so a malformed rule set (a dependency
//! cycle, or unresolved dependencies in strict mode) is reported before any
//! input is validated. Every validation call then uses a fresh
//! [`ValidationContext`] unless the caller supplies one.
//!
//! # Example
//!
//! ```rust
//! use ruleflow::{DependencyPolicy, FnRule, Validator};
//!
//! struct Order {
//!     amount: i64,
//! }
//!
//! let validator = Validator::builder()
//!     .rule(FnRule::predicate(|_: &Order| true).with_id("R1").with_priority(10))
//!     .rule(
//!         FnRule::predicate(|o: &Order| o.amount > 0)
//!             .with_id("R2")
//!             .with_message("amount must be positive")
//!             .depends_on(["R1"], DependencyPolicy::RequiresAllSuccess),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let result = validator.collect_results(&Order { amount: -5 }).unwrap();
//! assert_eq!(result.len(), 1);
//! assert_eq!(result.errors()[0].message, "amount must be positive");
//! assert!(validator.validate_or_throw(&Order { amount: 5 }).is_ok());
//! ```

use std::sync::Arc;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::context::ValidationContext;
use crate::error::{EngineError, ValidationError};
use crate::executor::RuleExecutor;
use crate::planner::ExecutionPlanner;
use crate::result::ValidationResult;
use crate::rule::{Rule, SharedRule};

/// How [`Validator::validate`] treats an invalid result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Fail with [`EngineError::Invalid`] when the result is invalid.
    #[default]
    ThrowOnError,
    /// Always return the result.
    CollectResults,
}

/// Builder for [`Validator`].
pub struct ValidatorBuilder<T> {
    rules: Vec<SharedRule<T>>,
    strict_dependencies: bool,
}

impl<T> Default for ValidatorBuilder<T> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            strict_dependencies: false,
        }
    }
}

impl<T> ValidatorBuilder<T> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    pub fn rule<R>(mut self, rule: R) -> Self
    where
        R: Rule<T> + 'static,
    {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Adds an already shared rule.
    pub fn shared_rule(mut self, rule: SharedRule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds several shared rules, keeping their order.
    pub fn rules<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = SharedRule<T>>,
    {
        self.rules.extend(rules);
        self
    }

    /// When enabled, `build` fails if any dependency id is not declared by a
    /// rule in the set. Disabled by default: such rules are skipped at run
    /// time instead.
    pub fn strict_dependencies(mut self, strict: bool) -> Self {
        self.strict_dependencies = strict;
        self
    }

    /// Plans the rule set and builds the validator.
    pub fn build(self) -> Result<Validator<T>, EngineError> {
        let planner = ExecutionPlanner::new(&self.rules)?;

        let unresolved = planner.unresolved_dependencies();
        if !unresolved.is_empty() {
            if self.strict_dependencies {
                return Err(EngineError::UnresolvedDependencies(unresolved));
            }
            tracing::warn!(
                unresolved = ?unresolved,
                "rules depend on ids that no rule declares and will always be skipped"
            );
        }

        Ok(Validator {
            rules: self.rules,
            planner,
            executor: RuleExecutor::new(),
        })
    }
}

/// Validates inputs of type `T` against a planned rule set.
pub struct Validator<T> {
    rules: Vec<SharedRule<T>>,
    planner: ExecutionPlanner<T>,
    executor: RuleExecutor,
}

impl<T> Validator<T> {
    /// Returns a builder.
    pub fn builder() -> ValidatorBuilder<T> {
        ValidatorBuilder::new()
    }

    /// Builds a validator with default settings.
    pub fn new(rules: Vec<SharedRule<T>>) -> Result<Self, EngineError> {
        ValidatorBuilder::new().rules(rules).build()
    }

    /// The rules in registration order.
    pub fn rules(&self) -> &[SharedRule<T>] {
        &self.rules
    }

    /// The execution plan.
    pub fn planner(&self) -> &ExecutionPlanner<T> {
        &self.planner
    }

    /// Dependency ids that no rule in the set declares.
    pub fn unresolved_dependencies(&self) -> Vec<String> {
        self.planner.unresolved_dependencies()
    }

    /// Runs every rule and returns the accumulated result.
    ///
    /// Rule failures never surface as an `Err`; they are in the result.
    /// `Err` means the run was cancelled by a rule.
    pub fn collect_results(&self, input: &T) -> Result<ValidationResult, EngineError> {
        let mut context = ValidationContext::new();
        self.validate_with_context(input, &mut context)
    }

    /// Like [`collect_results`](Self::collect_results), aborting with
    /// [`EngineError::Cancelled`] once `token` is cancelled.
    pub fn collect_results_cancellable(
        &self,
        input: &T,
        token: CancellationToken,
    ) -> Result<ValidationResult, EngineError> {
        let mut context = ValidationContext::new().with_cancellation(token);
        self.validate_with_context(input, &mut context)
    }

    /// Runs every rule using a caller-supplied context, which is left holding
    /// the recorded outcomes and skips for inspection.
    pub fn validate_with_context(
        &self,
        input: &T,
        context: &mut ValidationContext,
    ) -> Result<ValidationResult, EngineError> {
        let mut result = ValidationResult::new();
        self.executor
            .execute_plan(&self.planner, input, &mut result, context)?;
        tracing::debug!(errors = result.len(), valid = result.is_valid(), "validation finished");
        Ok(result)
    }

    /// Runs every rule and fails with [`EngineError::Invalid`] carrying the
    /// aggregate of all errors if the result is invalid.
    pub fn validate_or_throw(&self, input: &T) -> Result<(), EngineError> {
        self.collect_results(input)?.throw_if_invalid()?;
        Ok(())
    }

    /// Runs every rule and applies `mode` to the result.
    pub fn validate(&self, input: &T, mode: ValidationMode) -> Result<ValidationResult, EngineError> {
        let result = self.collect_results(input)?;
        if mode == ValidationMode::ThrowOnError {
            result.throw_if_invalid()?;
        }
        Ok(result)
    }

    /// Returns true if the input is valid. A cancelled run is not valid.
    pub fn is_valid(&self, input: &T) -> bool {
        self.collect_results(input)
            .map(|result| result.is_valid())
            .unwrap_or(false)
    }

    /// Returns the first recorded error if the input is invalid.
    pub fn first_error(&self, input: &T) -> Option<ValidationError> {
        let result = self.collect_results(input).ok()?;
        if result.is_valid() {
            None
        } else {
            result.into_iter().next()
        }
    }

    /// Validates and calls `on_success` or `on_failure` with the errors.
    pub fn validate_and_execute<S, F>(
        &self,
        input: &T,
        on_success: S,
        on_failure: F,
    ) -> Result<(), EngineError>
    where
        S: FnOnce(),
        F: FnOnce(&[ValidationError]),
    {
        let result = self.collect_results(input)?;
        if result.is_valid() {
            on_success();
        } else {
            on_failure(result.errors());
        }
        Ok(())
    }

    /// Validates many inputs in parallel, one fresh context per input.
    ///
    /// Results are returned in input order.
    pub fn collect_results_par(&self, inputs: &[T]) -> Vec<Result<ValidationResult, EngineError>>
    where
        T: Sync,
    {
        inputs
            .par_iter()
            .map(|input| self.collect_results(input))
            .collect()
    }
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            planner: self.planner.clone(),
            executor: self.executor,
        }
    }
}

/// Runs several validators and merges their results.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ruleflow::{CompositeValidator, FnRule, Validator};
///
/// let length = Validator::builder()
///     .rule(FnRule::predicate(|s: &String| s.len() >= 3).with_message("too short"))
///     .build()
///     .unwrap();
/// let charset = Validator::builder()
///     .rule(FnRule::predicate(|s: &String| s.is_ascii()).with_message("not ascii"))
///     .build()
///     .unwrap();
///
/// let all = CompositeValidator::new(vec![Arc::new(length), Arc::new(charset)]);
/// assert_eq!(all.collect_results(&"é".to_string()).unwrap().len(), 2);
/// ```
pub struct CompositeValidator<T> {
    validators: Vec<Arc<Validator<T>>>,
}

impl<T> CompositeValidator<T> {
    /// Combines `validators`, run in the given order.
    pub fn new(validators: Vec<Arc<Validator<T>>>) -> Self {
        Self { validators }
    }

    /// The combined validators.
    pub fn validators(&self) -> &[Arc<Validator<T>>] {
        &self.validators
    }

    /// Runs every validator and merges the results in order.
    pub fn collect_results(&self, input: &T) -> Result<ValidationResult, EngineError> {
        let mut combined = ValidationResult::new();
        for validator in &self.validators {
            combined.merge(validator.collect_results(input)?);
        }
        tracing::info!(errors = combined.len(), "composite validation finished");
        Ok(combined)
    }

    /// Runs every validator and fails with the aggregate if invalid.
    pub fn validate_or_throw(&self, input: &T) -> Result<(), EngineError> {
        self.collect_results(input)?.throw_if_invalid()?;
        Ok(())
    }

    /// Runs every validator and applies `mode` to the merged result.
    pub fn validate(&self, input: &T, mode: ValidationMode) -> Result<ValidationResult, EngineError> {
        let result = self.collect_results(input)?;
        if mode == ValidationMode::ThrowOnError {
            result.throw_if_invalid()?;
        }
        Ok(result)
    }
}

impl<T> Clone for CompositeValidator<T> {
    fn clone(&self) -> Self {
        Self {
            validators: self.validators.clone(),
        }
    }
}
