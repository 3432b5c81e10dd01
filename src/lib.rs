//! # Ruleflow
//!
//! A rule engine that evaluates independently authored validation rules
//! against a value, in a correct and deterministic order, and accumulates
//! ALL of their errors.
//!
//! ## Overview
//!
//! Rules can depend on each other's outcomes. Before anything runs, the rule
//! set is planned: rules without dependencies run first by descending
//! priority, then dependent rules run in topological order. A dependency
//! cycle is reported at planning time, so a malformed rule set never
//! produces a partial run. During the run each rule may be skipped by its
//! condition or by its dependency policy, and every failure is captured as a
//! [`ValidationError`] rather than aborting the run.
//!
//! ## Core Types
//!
//! - [`Rule`]: The rule contract, with optional capabilities (id, priority,
//!   condition, dependencies, children)
//! - [`FnRule`], [`CompositeRule`], [`BranchRule`], [`SwitchRule`]: Ready-made rules
//! - [`DependencyGraph`] and [`ExecutionPlanner`]: Cycle detection and ordering
//! - [`RuleExecutor`]: Gates, invokes and records rules one at a time
//! - [`ValidationContext`]: Per-run outcomes, skip reasons and properties
//! - [`ValidationResult`]: The accumulated errors with derived validity
//! - [`Validator`]: The façade tying it all together
//!
//! ## Example
//!
//! ```rust
//! use ruleflow::{DependencyPolicy, FnRule, Severity, Validator};
//!
//! let validator = Validator::builder()
//!     .rule(FnRule::predicate(|s: &String| !s.is_empty())
//!         .with_id("present")
//!         .with_message("name is required"))
//!     .rule(FnRule::predicate(|s: &String| s.len() <= 8)
//!         .with_id("short")
//!         .with_message("name is long")
//!         .with_severity(Severity::Warning)
//!         .depends_on(["present"], DependencyPolicy::RequiresAllSuccess))
//!     .build()
//!     .unwrap();
//!
//! // Warnings are reported but do not make the input invalid
//! let result = validator.collect_results(&"Bartholomew".to_string()).unwrap();
//! assert!(result.is_valid());
//! assert_eq!(result.len(), 1);
//!
//! // The dependent rule is skipped when its dependency failed
//! let result = validator.collect_results(&String::new()).unwrap();
//! assert!(!result.is_valid());
//! assert_eq!(result.len(), 1);
//! ```

pub mod context;
pub mod error;
pub mod executor;
pub mod graph;
pub mod planner;
pub mod registry;
pub mod result;
pub mod rule;
pub mod severity;
pub mod validator;

#[cfg(feature = "effect")]
pub mod effect;

pub use context::{Properties, RuleOutcome, SkipReason, ValidationContext};
pub use error::{
    CycleError, EngineError, FailureScope, RuleError, ValidationError, ValidationFailure,
};
pub use executor::RuleExecutor;
pub use graph::DependencyGraph;
pub use planner::ExecutionPlanner;
pub use registry::{RegistryError, RuleRegistry};
pub use result::ValidationResult;
pub use rule::{
    BranchRule, ChildOutcome, Composite, CompositeRule, CompositionMode, Conditional, Dependent,
    DependencyPolicy, FnRule, Rule, SharedRule, SwitchRule,
};
pub use rule::composite::{FAILED_CHILDREN, SUCCESSFUL_CHILDREN, TOTAL_CHILDREN};
pub use severity::Severity;
pub use validator::{CompositeValidator, ValidationMode, Validator, ValidatorBuilder};

pub use tokio_util::sync::CancellationToken;
