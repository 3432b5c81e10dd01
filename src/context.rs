//! Per-run shared state for a validation call.
//!
//! This module provides the [`ValidationContext`] type that the executor
//! threads through one validation run. It records each identifiable rule's
//! outcome so later rules can react to earlier ones, carries arbitrary
//! properties for cross-rule data passing, and carries the cooperative
//! cancellation signal.
//!
//! A context belongs to exactly one run. Reusing one for an unrelated input
//! requires [`ValidationContext::reset`] or a fresh instance; otherwise stale
//! outcomes leak into dependency checks.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ValidationError;

/// Arbitrary key/value data shared between rules.
pub type Properties = IndexMap<String, Value>;

/// The recorded outcome of an identifiable rule.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    success: bool,
    error: Option<ValidationError>,
}

impl RuleOutcome {
    /// A passing outcome.
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failing outcome, optionally carrying the captured error.
    pub fn failure(error: Option<ValidationError>) -> Self {
        Self {
            success: false,
            error,
        }
    }

    /// Returns true if the rule passed.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the captured error of a failing rule.
    pub fn error(&self) -> Option<&ValidationError> {
        self.error.as_ref()
    }
}

/// Why an identifiable rule did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The rule's condition returned false for the input.
    ConditionNotMet,
    /// The rule's dependency policy was not satisfied.
    DependenciesNotMet,
}

/// Shared state for one validation run.
///
/// # Example
///
/// ```rust
/// use ruleflow::{RuleOutcome, ValidationContext};
///
/// let mut context = ValidationContext::new();
/// context.record("email", RuleOutcome::success());
/// context.set_property("attempts", 3);
///
/// assert!(context.has_rule_succeeded("email"));
/// assert!(!context.has_rule_failed("email"));
/// assert_eq!(context.property("attempts").and_then(|v| v.as_i64()), Some(3));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    rule_results: IndexMap<String, RuleOutcome>,
    skipped: IndexMap<String, SkipReason>,
    properties: Properties,
    cancellation: CancellationToken,
}

impl ValidationContext {
    /// Creates an empty context with its own cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given token as this run's cancellation signal.
    ///
    /// Cancelling the token (or any parent it was derived from) aborts the
    /// run before the next rule starts.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the cancellation token for this run.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Requests cancellation of the run.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancellation_requested(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Records a rule's outcome under its id.
    ///
    /// A second record for the same id overwrites the first.
    pub fn record(&mut self, rule_id: impl Into<String>, outcome: RuleOutcome) {
        let rule_id = rule_id.into();
        self.skipped.shift_remove(&rule_id);
        self.rule_results.insert(rule_id, outcome);
    }

    /// Notes that a rule was skipped. Skips are not outcomes and never
    /// satisfy or violate a dependency policy.
    pub fn record_skip(&mut self, rule_id: impl Into<String>, reason: SkipReason) {
        self.skipped.insert(rule_id.into(), reason);
    }

    /// Returns every recorded outcome, in recording order.
    pub fn rule_results(&self) -> &IndexMap<String, RuleOutcome> {
        &self.rule_results
    }

    /// Returns the recorded outcome for a rule id.
    pub fn outcome(&self, rule_id: &str) -> Option<&RuleOutcome> {
        self.rule_results.get(rule_id)
    }

    /// Returns why a rule was skipped, if it was.
    pub fn skip_reason(&self, rule_id: &str) -> Option<SkipReason> {
        self.skipped.get(rule_id).copied()
    }

    /// Returns every skipped rule id and its reason.
    pub fn skipped(&self) -> &IndexMap<String, SkipReason> {
        &self.skipped
    }

    /// Returns true if the rule ran and passed.
    pub fn has_rule_succeeded(&self, rule_id: &str) -> bool {
        self.outcome(rule_id).is_some_and(RuleOutcome::is_success)
    }

    /// Returns true if the rule ran and failed.
    pub fn has_rule_failed(&self, rule_id: &str) -> bool {
        self.outcome(rule_id).is_some_and(|o| !o.is_success())
    }

    /// Returns true if every listed rule passed. True for an empty list.
    pub fn all_rules_succeeded<'a, I>(&self, rule_ids: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        rule_ids.into_iter().all(|id| self.has_rule_succeeded(id))
    }

    /// Returns true if any listed rule passed. False for an empty list.
    pub fn any_rule_succeeded<'a, I>(&self, rule_ids: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        rule_ids.into_iter().any(|id| self.has_rule_succeeded(id))
    }

    /// Returns true if every listed rule failed. True for an empty list.
    pub fn all_rules_failed<'a, I>(&self, rule_ids: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        rule_ids.into_iter().all(|id| self.has_rule_failed(id))
    }

    /// Returns true if any listed rule failed. False for an empty list.
    pub fn any_rule_failed<'a, I>(&self, rule_ids: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        rule_ids.into_iter().any(|id| self.has_rule_failed(id))
    }

    /// Returns the outcomes whose success flag equals `success`.
    pub fn results_by_success(&self, success: bool) -> impl Iterator<Item = (&str, &RuleOutcome)> {
        self.rule_results
            .iter()
            .filter(move |(_, outcome)| outcome.is_success() == success)
            .map(|(id, outcome)| (id.as_str(), outcome))
    }

    /// Returns all user properties.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Returns a property by key.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Adds or replaces a property.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Removes a property, returning its value.
    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.shift_remove(key)
    }

    /// Clears outcomes, skips and properties so the context can serve a new
    /// run. The cancellation token is kept.
    pub fn reset(&mut self) {
        self.rule_results.clear();
        self.skipped.clear();
        self.properties.clear();
    }
}

impl Display for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<String> = self
            .rule_results
            .iter()
            .map(|(id, outcome)| format!("{}={}", id, outcome.is_success()))
            .collect();
        let properties: Vec<String> = self
            .properties
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        write!(
            f,
            "ValidationContext: rules=[{}], properties=[{}]",
            rules.join(", "),
            properties.join(", ")
        )
    }
}
