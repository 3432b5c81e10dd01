//! Rule registry for named rule storage.
//!
//! This module provides the [`RuleRegistry`] type that stores identifiable
//! rules by id, reports dependency ids that no registered rule declares, and
//! builds validators from its contents.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::EngineError;
use crate::result::ValidationResult;
use crate::rule::{for_each_id, Rule, SharedRule};
use crate::validator::Validator;

/// Type alias for the rule storage map.
type RuleMap<T> = Arc<RwLock<IndexMap<String, SharedRule<T>>>>;

/// A thread-safe registry of rules keyed by id.
///
/// # Thread Safety
///
/// The registry uses `Arc<RwLock<...>>` for thread-safe access:
/// - Multiple threads can read and build validators concurrently
/// - Registration operations are serialized (write access)
///
/// Clones share the same storage.
///
/// # Example
///
/// ```rust
/// use ruleflow::{DependencyPolicy, FnRule, RuleRegistry};
///
/// let registry = RuleRegistry::new();
/// registry
///     .register(FnRule::predicate(|n: &i32| *n != 0).with_id("non_zero"))
///     .unwrap();
/// registry
///     .register(
///         FnRule::predicate(|n: &i32| 100 % n == 0)
///             .with_id("divides_100")
///             .depends_on(["non_zero"], DependencyPolicy::RequiresAllSuccess),
///     )
///     .unwrap();
///
/// let validator = registry.build_validator().unwrap();
/// assert!(validator.is_valid(&20));
/// assert!(!validator.is_valid(&0));
/// ```
pub struct RuleRegistry<T> {
    rules: RuleMap<T>,
}

impl<T> RuleRegistry<T> {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            rules: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    /// Registers a rule under its id.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::MissingId` if the rule has no id and
    /// `RegistryError::DuplicateId` if the id is already registered.
    pub fn register<R>(&self, rule: R) -> Result<(), RegistryError>
    where
        R: Rule<T> + 'static,
    {
        self.register_shared(Arc::new(rule))
    }

    /// Registers an already shared rule under its id.
    pub fn register_shared(&self, rule: SharedRule<T>) -> Result<(), RegistryError> {
        let id = rule
            .id()
            .ok_or_else(|| RegistryError::MissingId(rule.name().to_string()))?
            .to_string();
        let mut rules = self.rules.write();

        if rules.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        rules.insert(id, rule);
        Ok(())
    }

    /// Retrieves a rule by id.
    pub fn get(&self, id: &str) -> Option<SharedRule<T>> {
        self.rules.read().get(id).cloned()
    }

    /// Removes a rule by id, returning it.
    pub fn unregister(&self, id: &str) -> Option<SharedRule<T>> {
        self.rules.write().shift_remove(id)
    }

    /// Returns true if a rule with this id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.rules.read().contains_key(id)
    }

    /// Returns the number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns true if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Returns the registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.rules.read().keys().cloned().collect()
    }

    /// Returns the dependency ids that no registered rule declares, counting
    /// the ids of rules nested in registered composites.
    ///
    /// This should be called after all rules are registered. The list is
    /// sorted and free of duplicates.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ruleflow::{DependencyPolicy, FnRule, RuleRegistry};
    ///
    /// let registry = RuleRegistry::new();
    /// registry
    ///     .register(
    ///         FnRule::predicate(|_: &i32| true)
    ///             .with_id("checkout")
    ///             .depends_on(["cart", "address"], DependencyPolicy::RequiresAllSuccess),
    ///     )
    ///     .unwrap();
    ///
    /// assert_eq!(registry.validate_refs(), vec!["address", "cart"]);
    /// ```
    pub fn validate_refs(&self) -> Vec<String> {
        let rules = self.rules.read();

        let mut declared = HashSet::new();
        for rule in rules.values() {
            for_each_id(rule.as_ref(), &mut |id| {
                declared.insert(id.to_string());
            });
        }

        let mut unresolved: Vec<String> = rules
            .values()
            .filter_map(|rule| rule.as_dependent())
            .flat_map(|dependent| dependent.depends_on().iter())
            .filter(|id| !declared.contains(id.as_str()))
            .cloned()
            .collect();

        unresolved.sort();
        unresolved.dedup();
        unresolved
    }

    /// Builds a validator over a snapshot of the registered rules.
    ///
    /// # Errors
    ///
    /// Fails with `EngineError::CircularDependency` if the registered rules
    /// form a cycle.
    pub fn build_validator(&self) -> Result<Validator<T>, EngineError> {
        let rules: Vec<SharedRule<T>> = self.rules.read().values().cloned().collect();
        Validator::new(rules)
    }

    /// Validates `input` against every registered rule.
    pub fn validate(&self, input: &T) -> Result<ValidationResult, RegistryError> {
        let validator = self.build_validator()?;
        Ok(validator.collect_results(input)?)
    }
}

impl<T> Default for RuleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RuleRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
        }
    }
}

/// Errors that can occur during registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Attempted to register a rule with an id that already exists.
    #[error("rule '{0}' already registered")]
    DuplicateId(String),

    /// Attempted to register a rule that has no id.
    #[error("rule '{0}' has no id and cannot be registered")]
    MissingId(String),

    /// Planning or running the registered rules failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
