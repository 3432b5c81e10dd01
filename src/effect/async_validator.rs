//! Async validation on tokio's blocking pool.

use std::sync::Arc;

use tokio::task;
use tokio_util::sync::CancellationToken;

use crate::context::ValidationContext;
use crate::error::EngineError;
use crate::executor::{Gate, RuleExecutor};
use crate::result::ValidationResult;
use crate::rule::SharedRule;
use crate::validator::Validator;

/// Runs a [`Validator`] without blocking the calling task.
///
/// Rules run one at a time in the planned order. Each one is moved onto
/// [`tokio::task::spawn_blocking`] together with the run's context and
/// awaited; the context comes back with the outcome, which is recorded before
/// the next rule is gated. Cancellation is checked between rules and inside
/// composite rules. Panics are captured on the worker; a worker that fails to
/// join ends the run with [`EngineError::Cancelled`].
///
/// Clones share the wrapped validator.
pub struct AsyncValidator<T> {
    validator: Arc<Validator<T>>,
}

impl<T> AsyncValidator<T>
where
    T: Send + Sync + 'static,
{
    /// Wraps a validator.
    pub fn new(validator: Validator<T>) -> Self {
        Self::from_shared(Arc::new(validator))
    }

    /// Wraps an already shared validator.
    pub fn from_shared(validator: Arc<Validator<T>>) -> Self {
        Self { validator }
    }

    /// The wrapped validator.
    pub fn validator(&self) -> &Validator<T> {
        &self.validator
    }

    /// Runs every rule and returns the accumulated result.
    pub async fn collect_results(&self, input: Arc<T>) -> Result<ValidationResult, EngineError> {
        let mut context = ValidationContext::new();
        self.validate_with_context(input, &mut context).await
    }

    /// Like [`collect_results`](Self::collect_results), aborting with
    /// [`EngineError::Cancelled`] once `token` is cancelled.
    pub async fn collect_results_cancellable(
        &self,
        input: Arc<T>,
        token: CancellationToken,
    ) -> Result<ValidationResult, EngineError> {
        let mut context = ValidationContext::new().with_cancellation(token);
        self.validate_with_context(input, &mut context).await
    }

    /// Runs every rule and fails with [`EngineError::Invalid`] if the result
    /// is invalid.
    pub async fn validate_or_throw(&self, input: Arc<T>) -> Result<(), EngineError> {
        self.collect_results(input).await?.throw_if_invalid()?;
        Ok(())
    }

    /// Runs every rule using a caller-supplied context.
    pub async fn validate_with_context(
        &self,
        input: Arc<T>,
        context: &mut ValidationContext,
    ) -> Result<ValidationResult, EngineError> {
        let planner = self.validator.planner();
        let mut result = ValidationResult::new();

        self.run(planner.independent_plan(), &input, &mut result, context, false)
            .await?;
        self.run(planner.dependent_plan(), &input, &mut result, context, true)
            .await?;

        tracing::debug!(errors = result.len(), valid = result.is_valid(), "async validation finished");
        Ok(result)
    }

    async fn run(
        &self,
        rules: &[SharedRule<T>],
        input: &Arc<T>,
        result: &mut ValidationResult,
        context: &mut ValidationContext,
        check_dependencies: bool,
    ) -> Result<(), EngineError> {
        let executor = RuleExecutor::new();

        for rule in rules {
            if executor.gate(rule.as_ref(), input.as_ref(), context, check_dependencies)? == Gate::Skip {
                continue;
            }

            let task_rule = Arc::clone(rule);
            let task_input = Arc::clone(input);
            let mut task_context = std::mem::take(context);
            let token = task_context.cancellation_token().clone();
            let joined = task::spawn_blocking(move || {
                let outcome =
                    executor.invoke(task_rule.as_ref(), task_input.as_ref(), &mut task_context);
                (outcome, task_context)
            })
            .await;

            let outcome = match joined {
                Ok((outcome, returned)) => {
                    *context = returned;
                    outcome
                }
                Err(err) => {
                    tracing::error!(rule = rule.name(), error = %err, "rule task failed to join");
                    *context = ValidationContext::new().with_cancellation(token);
                    return Err(EngineError::Cancelled);
                }
            };

            executor.record(rule.as_ref(), outcome, result, context)?;
        }
        Ok(())
    }
}

impl<T> Clone for AsyncValidator<T> {
    fn clone(&self) -> Self {
        Self {
            validator: Arc::clone(&self.validator),
        }
    }
}
