//! The rule contract and its optional capabilities.
//!
//! Every rule implements [`Rule::validate`]. Everything else is a capability a
//! rule may or may not expose:
//!
//! - **Identifiable**: [`Rule::id`] returns `Some`; the outcome is recorded in
//!   the [`ValidationContext`] and other rules can depend on it
//! - **Prioritized**: [`Rule::priority`]; higher runs earlier when no
//!   dependency orders two rules
//! - **Conditional**: [`Rule::as_conditional`]; the rule is skipped when
//!   [`Conditional::should_validate`] returns false
//! - **Dependent**: [`Rule::as_dependent`]; the rule is gated on the recorded
//!   outcomes of the ids in [`Dependent::depends_on`]
//! - **Composite**: [`Rule::as_composite`]; the rule's outcome is derived from
//!   child rules, whose ids count as declared when dependencies are resolved
//!
//! The executor discovers capabilities through the `as_*` accessors, so a rule
//! type opts in by overriding the accessor and returning `Some(self)`.
//!
//! Inside a run the executor calls [`Rule::evaluate`] rather than
//! [`Rule::validate`]. Rules that evaluate other rules override it to hand
//! the run's [`ValidationContext`] down, so nested rules observe its
//! cancellation signal and conditions and can publish to its properties.
//!
//! # Example
//!
//! ```rust
//! use ruleflow::{Rule, RuleError};
//!
//! struct NonEmpty;
//!
//! impl Rule<String> for NonEmpty {
//!     fn validate(&self, input: &String) -> Result<(), RuleError> {
//!         if input.is_empty() {
//!             Err(RuleError::failed("value must not be empty"))
//!         } else {
//!             Ok(())
//!         }
//!     }
//!
//!     fn id(&self) -> Option<&str> {
//!         Some("non_empty")
//!     }
//! }
//!
//! assert!(NonEmpty.validate(&"x".to_string()).is_ok());
//! assert_eq!(NonEmpty.name(), "NonEmpty");
//! ```

pub mod branch;
pub mod composite;
mod fn_rule;
pub mod switch;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

pub use branch::BranchRule;
pub use composite::{ChildOutcome, CompositeRule, CompositionMode};
pub use fn_rule::FnRule;
pub use switch::SwitchRule;

use crate::context::ValidationContext;
use crate::error::RuleError;
use crate::severity::Severity;

/// A shared, type-erased rule.
pub type SharedRule<T> = Arc<dyn Rule<T>>;

/// A unit of validation logic over an input of type `T`.
///
/// The `Send + Sync` bounds let a validator built from rules be shared across
/// threads and used for parallel batch validation.
pub trait Rule<T>: Send + Sync {
    /// Checks the input. An `Err` means the rule did not pass.
    fn validate(&self, input: &T) -> Result<(), RuleError>;

    /// Checks the input as part of a run.
    ///
    /// Defaults to [`validate`](Rule::validate).
    fn evaluate(&self, input: &T, _context: &mut ValidationContext) -> Result<(), RuleError> {
        self.validate(input)
    }

    /// Severity assigned to a captured failure of this rule.
    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    /// Stable identifier, if the rule is identifiable.
    fn id(&self) -> Option<&str> {
        None
    }

    /// Ordering hint among rules with no dependency between them.
    fn priority(&self) -> i32 {
        0
    }

    /// Name used in logs and as the error code of captured failures.
    ///
    /// Defaults to the unqualified type name.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Returns the conditional capability, if any.
    fn as_conditional(&self) -> Option<&dyn Conditional<T>> {
        None
    }

    /// Returns the dependent capability, if any.
    fn as_dependent(&self) -> Option<&dyn Dependent> {
        None
    }

    /// Returns the composite capability, if any.
    fn as_composite(&self) -> Option<&dyn Composite<T>> {
        None
    }
}

/// A rule that decides per input whether it applies at all.
///
/// A rule whose condition is false is skipped: it is not invoked, produces no
/// error and records no outcome.
pub trait Conditional<T> {
    /// Returns true if the rule should run for this input.
    fn should_validate(&self, input: &T, context: &ValidationContext) -> bool;
}

/// A rule gated on the recorded outcomes of other rules.
pub trait Dependent {
    /// Ids of the rules this rule depends on.
    fn depends_on(&self) -> &[String];

    /// How the recorded outcomes of [`depends_on`](Dependent::depends_on)
    /// must look for this rule to run.
    fn dependency_policy(&self) -> DependencyPolicy;
}

/// A rule whose outcome is computed from child rules.
pub trait Composite<T> {
    /// The child rules, in evaluation order.
    fn children(&self) -> &[SharedRule<T>];

    /// How child outcomes combine.
    fn mode(&self) -> &CompositionMode<T>;
}

/// When a dependent rule is allowed to run.
///
/// A dependency id with no recorded outcome (never registered, skipped, or not
/// yet run) counts as neither succeeded nor failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DependencyPolicy {
    /// Every dependency succeeded.
    #[default]
    RequiresAllSuccess,
    /// At least one dependency succeeded.
    RequiresAnySuccess,
    /// Every dependency failed.
    RequiresAllFailure,
    /// At least one dependency failed.
    RequiresAnyFailure,
}

impl DependencyPolicy {
    /// Evaluates the policy against the context's recorded outcomes.
    ///
    /// An empty dependency list always satisfies the policy.
    pub fn is_satisfied(self, depends_on: &[String], context: &ValidationContext) -> bool {
        if depends_on.is_empty() {
            return true;
        }
        let ids = depends_on.iter().map(String::as_str);
        match self {
            DependencyPolicy::RequiresAllSuccess => context.all_rules_succeeded(ids),
            DependencyPolicy::RequiresAnySuccess => context.any_rule_succeeded(ids),
            DependencyPolicy::RequiresAllFailure => context.all_rules_failed(ids),
            DependencyPolicy::RequiresAnyFailure => context.any_rule_failed(ids),
        }
    }
}

impl<T, R: Rule<T> + ?Sized> Rule<T> for Arc<R> {
    fn validate(&self, input: &T) -> Result<(), RuleError> {
        (**self).validate(input)
    }

    fn evaluate(&self, input: &T, context: &mut ValidationContext) -> Result<(), RuleError> {
        (**self).evaluate(input, context)
    }

    fn default_severity(&self) -> Severity {
        (**self).default_severity()
    }

    fn id(&self) -> Option<&str> {
        (**self).id()
    }

    fn priority(&self) -> i32 {
        (**self).priority()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn as_conditional(&self) -> Option<&dyn Conditional<T>> {
        (**self).as_conditional()
    }

    fn as_dependent(&self) -> Option<&dyn Dependent> {
        (**self).as_dependent()
    }

    fn as_composite(&self) -> Option<&dyn Composite<T>> {
        (**self).as_composite()
    }
}

impl<T, R: Rule<T> + ?Sized> Rule<T> for Box<R> {
    fn validate(&self, input: &T) -> Result<(), RuleError> {
        (**self).validate(input)
    }

    fn evaluate(&self, input: &T, context: &mut ValidationContext) -> Result<(), RuleError> {
        (**self).evaluate(input, context)
    }

    fn default_severity(&self) -> Severity {
        (**self).default_severity()
    }

    fn id(&self) -> Option<&str> {
        (**self).id()
    }

    fn priority(&self) -> i32 {
        (**self).priority()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn as_conditional(&self) -> Option<&dyn Conditional<T>> {
        (**self).as_conditional()
    }

    fn as_dependent(&self) -> Option<&dyn Dependent> {
        (**self).as_dependent()
    }

    fn as_composite(&self) -> Option<&dyn Composite<T>> {
        (**self).as_composite()
    }
}

/// Evaluates a rule nested inside another rule.
///
/// Returns `None` when the rule's condition is false, in which case it is not
/// invoked. A cancelled run yields [`RuleError::Cancelled`] before anything
/// else is looked at. Panics become [`RuleError::Panicked`].
pub(crate) fn evaluate_nested<T>(
    rule: &dyn Rule<T>,
    input: &T,
    context: &mut ValidationContext,
) -> Option<Result<(), RuleError>> {
    if context.is_cancellation_requested() {
        return Some(Err(RuleError::Cancelled));
    }
    if let Some(conditional) = rule.as_conditional() {
        if !conditional.should_validate(input, context) {
            return None;
        }
    }
    Some(
        panic::catch_unwind(AssertUnwindSafe(|| rule.evaluate(input, context)))
            .unwrap_or_else(|payload| Err(RuleError::from_panic(payload))),
    )
}

/// Calls `visit` with the id of `rule` and of every identifiable rule nested
/// in it through the composite capability.
pub(crate) fn for_each_id<T>(rule: &dyn Rule<T>, visit: &mut dyn FnMut(&str)) {
    if let Some(id) = rule.id() {
        visit(id);
    }
    if let Some(composite) = rule.as_composite() {
        for child in composite.children() {
            for_each_id(child.as_ref(), visit);
        }
    }
}

/// Strips the module path and generic arguments from a type name.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RuleOutcome;

    struct Plain;

    impl Rule<i32> for Plain {
        fn validate(&self, _input: &i32) -> Result<(), RuleError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_capabilities() {
        let rule = Plain;
        assert_eq!(rule.id(), None);
        assert_eq!(rule.priority(), 0);
        assert_eq!(rule.default_severity(), Severity::Error);
        assert_eq!(rule.name(), "Plain");
        assert!(rule.as_conditional().is_none());
        assert!(rule.as_dependent().is_none());
        assert!(rule.as_composite().is_none());
    }

    #[test]
    fn test_arc_forwards_name() {
        let rule: SharedRule<i32> = Arc::new(Plain);
        assert_eq!(rule.name(), "Plain");
    }

    #[test]
    fn test_default_evaluate_delegates_to_validate() {
        let mut context = ValidationContext::new();
        assert!(Plain.evaluate(&0, &mut context).is_ok());
        assert!(context.rule_results().is_empty());
    }

    #[test]
    fn test_nested_rule_respects_condition_and_cancellation() {
        let guarded: SharedRule<i32> =
            Arc::new(FnRule::predicate(|_: &i32| false).when_input(|n: &i32| *n > 10));
        let mut context = ValidationContext::new();
        assert!(evaluate_nested(guarded.as_ref(), &1, &mut context).is_none());
        assert!(matches!(
            evaluate_nested(guarded.as_ref(), &11, &mut context),
            Some(Err(RuleError::Failed(_)))
        ));

        context.cancel();
        let plain: SharedRule<i32> = Arc::new(Plain);
        assert!(matches!(
            evaluate_nested(plain.as_ref(), &0, &mut context),
            Some(Err(RuleError::Cancelled))
        ));
    }

    #[test]
    fn test_for_each_id_walks_composite_children() {
        let inner: SharedRule<i32> = Arc::new(FnRule::predicate(|_: &i32| true).with_id("inner"));
        let outer: SharedRule<i32> =
            Arc::new(CompositeRule::and(vec![inner, Arc::new(Plain)]).with_id("outer"));

        let mut ids = Vec::new();
        for_each_id(outer.as_ref(), &mut |id| ids.push(id.to_string()));
        assert_eq!(ids, vec!["outer", "inner"]);
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::Thing"), "Thing");
        assert_eq!(short_type_name("a::b::Thing<c::D>"), "Thing");
        assert_eq!(short_type_name("Thing"), "Thing");
    }

    #[test]
    fn test_policy_with_empty_dependencies_is_satisfied() {
        let context = ValidationContext::new();
        for policy in [
            DependencyPolicy::RequiresAllSuccess,
            DependencyPolicy::RequiresAnySuccess,
            DependencyPolicy::RequiresAllFailure,
            DependencyPolicy::RequiresAnyFailure,
        ] {
            assert!(policy.is_satisfied(&[], &context));
        }
    }

    #[test]
    fn test_policy_against_recorded_outcomes() {
        let mut context = ValidationContext::new();
        context.record("a", RuleOutcome::success());
        context.record("b", RuleOutcome::failure(None));
        let both = vec!["a".to_string(), "b".to_string()];

        assert!(!DependencyPolicy::RequiresAllSuccess.is_satisfied(&both, &context));
        assert!(DependencyPolicy::RequiresAnySuccess.is_satisfied(&both, &context));
        assert!(!DependencyPolicy::RequiresAllFailure.is_satisfied(&both, &context));
        assert!(DependencyPolicy::RequiresAnyFailure.is_satisfied(&both, &context));
    }

    #[test]
    fn test_unrecorded_dependency_is_neither_success_nor_failure() {
        let mut context = ValidationContext::new();
        context.record("a", RuleOutcome::success());
        let deps = vec!["a".to_string(), "never_ran".to_string()];

        assert!(!DependencyPolicy::RequiresAllSuccess.is_satisfied(&deps, &context));
        assert!(!DependencyPolicy::RequiresAllFailure.is_satisfied(&deps, &context));
        assert!(DependencyPolicy::RequiresAnySuccess.is_satisfied(&deps, &context));
        assert!(!DependencyPolicy::RequiresAnyFailure.is_satisfied(&deps, &context));
    }
}
