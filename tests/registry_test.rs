//! Tests for rule registry operations.

use std::sync::Arc;

use ruleflow::{DependencyPolicy, EngineError, FnRule, RegistryError, Rule, RuleRegistry};

fn non_negative() -> FnRule<i32> {
    FnRule::predicate(|n: &i32| *n >= 0)
        .with_id("non_negative")
        .with_message("must not be negative")
}

fn even() -> FnRule<i32> {
    FnRule::predicate(|n: &i32| n % 2 == 0)
        .with_id("even")
        .with_message("must be even")
        .depends_on(["non_negative"], DependencyPolicy::RequiresAllSuccess)
}

#[test]
fn test_register_and_get() {
    let registry = RuleRegistry::new();

    registry.register(non_negative()).unwrap();

    let rule = registry.get("non_negative");
    assert!(rule.is_some());
    assert!(rule.unwrap().validate(&3).is_ok());

    let missing = registry.get("missing");
    assert!(missing.is_none());
}

#[test]
fn test_duplicate_registration_fails() {
    let registry = RuleRegistry::new();

    registry.register(non_negative()).unwrap();

    let result = registry.register(FnRule::predicate(|_: &i32| true).with_id("non_negative"));
    assert!(matches!(result, Err(RegistryError::DuplicateId(ref id)) if id == "non_negative"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_validate_with_registry() {
    let registry = RuleRegistry::new();

    registry.register(non_negative()).unwrap();
    registry.register(even()).unwrap();

    let result = registry.validate(&4).unwrap();
    assert!(result.is_valid());

    let result = registry.validate(&3).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.errors()[0].message, "must be even");

    // "even" is skipped once its dependency fails
    let result = registry.validate(&-3).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.errors()[0].message, "must not be negative");
}

#[test]
fn test_validate_empty_registry() {
    let registry: RuleRegistry<i32> = RuleRegistry::new();

    assert!(registry.is_empty());
    assert!(registry.validate(&0).unwrap().is_valid());
}

#[test]
fn test_validate_refs_with_valid_references() {
    let registry = RuleRegistry::new();

    registry.register(non_negative()).unwrap();
    registry.register(even()).unwrap();

    let unresolved = registry.validate_refs();
    assert!(unresolved.is_empty());
}

#[test]
fn test_validate_refs_with_missing_references() {
    let registry = RuleRegistry::new();

    registry.register(even()).unwrap();

    let unresolved = registry.validate_refs();
    assert_eq!(unresolved, vec!["non_negative"]);
}

#[test]
fn test_validate_refs_with_multiple_missing() {
    let registry = RuleRegistry::new();

    registry
        .register(
            FnRule::predicate(|_: &i32| true)
                .with_id("checkout")
                .depends_on(["stock", "address", "stock"], DependencyPolicy::RequiresAnySuccess),
        )
        .unwrap();

    assert_eq!(registry.validate_refs(), vec!["address", "stock"]);
}

#[test]
fn test_cycle_surfaces_when_building() {
    let registry = RuleRegistry::new();

    registry
        .register(
            FnRule::predicate(|_: &i32| true)
                .with_id("a")
                .depends_on(["b"], DependencyPolicy::RequiresAllSuccess),
        )
        .unwrap();
    registry
        .register(
            FnRule::predicate(|_: &i32| true)
                .with_id("b")
                .depends_on(["a"], DependencyPolicy::RequiresAllSuccess),
        )
        .unwrap();

    assert!(matches!(
        registry.build_validator(),
        Err(EngineError::CircularDependency(_))
    ));
    assert!(matches!(
        registry.validate(&1),
        Err(RegistryError::Engine(EngineError::CircularDependency(_)))
    ));
}

#[test]
fn test_registry_clone() {
    let registry = RuleRegistry::new();

    registry.register(non_negative()).unwrap();

    let cloned = registry.clone();
    cloned.register(even()).unwrap();

    // Both handles see the same rules
    assert!(registry.get("even").is_some());
    assert!(cloned.get("non_negative").is_some());
    assert_eq!(registry.ids(), vec!["non_negative", "even"]);
}

#[test]
fn test_register_shared() {
    let registry = RuleRegistry::new();
    let rule = Arc::new(non_negative());

    registry.register_shared(rule.clone()).unwrap();

    assert!(registry.contains("non_negative"));
    assert!(registry.register_shared(rule).is_err());
}

#[test]
fn test_default_registry() {
    let registry = RuleRegistry::default();

    registry.register(non_negative()).unwrap();

    assert!(registry.get("non_negative").is_some());
}
