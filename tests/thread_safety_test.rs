//! Tests for thread-safe concurrent access to validators and the rule registry.

use ruleflow::{DependencyPolicy, FnRule, RuleRegistry, ValidationContext, Validator};
use std::sync::Arc;
use std::thread;

fn range_validator() -> Validator<i64> {
    Validator::builder()
        .rule(
            FnRule::predicate(|n: &i64| *n > 0)
                .with_id("positive")
                .with_message("must be positive"),
        )
        .rule(
            FnRule::predicate(|n: &i64| *n < 1_000)
                .with_id("bounded")
                .with_message("must be below 1000")
                .depends_on(["positive"], DependencyPolicy::RequiresAllSuccess),
        )
        .build()
        .unwrap()
}

#[test]
fn test_concurrent_validation() {
    let validator = Arc::new(range_validator());

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || {
                let result = validator.collect_results(&(i + 1)).unwrap();
                assert!(result.is_valid());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_contexts_do_not_leak_between_threads() {
    let validator = Arc::new(range_validator());

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || {
                let input = if i % 2 == 0 { i + 1 } else { -i };
                let mut context = ValidationContext::new();
                let result = validator
                    .validate_with_context(&input, &mut context)
                    .unwrap();

                if i % 2 == 0 {
                    assert!(result.is_valid());
                    assert!(context.has_rule_succeeded("bounded"));
                } else {
                    assert_eq!(result.len(), 1);
                    assert!(context.has_rule_failed("positive"));
                    assert!(context.outcome("bounded").is_none());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_concurrent_rule_access() {
    let registry = Arc::new(RuleRegistry::new());

    registry
        .register(FnRule::predicate(|n: &i64| *n != 0).with_id("non_zero"))
        .unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let rule = registry.get("non_zero");
                assert!(rule.is_some());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_registry_clone_thread_safety() {
    let registry = RuleRegistry::new();

    registry
        .register(FnRule::predicate(|n: &i64| *n > 0).with_id("positive"))
        .unwrap();

    let cloned = registry.clone();
    let registry1 = Arc::new(registry);
    let registry2 = Arc::new(cloned);

    let handle1 = {
        let registry = Arc::clone(&registry1);
        thread::spawn(move || {
            let result = registry.validate(&5).unwrap();
            assert!(result.is_valid());
        })
    };

    let handle2 = {
        let registry = Arc::clone(&registry2);
        thread::spawn(move || {
            let result = registry.validate(&-5).unwrap();
            assert!(!result.is_valid());
        })
    };

    handle1.join().unwrap();
    handle2.join().unwrap();
}

#[test]
fn test_concurrent_mixed_operations() {
    let registry = Arc::new(RuleRegistry::new());

    registry
        .register(FnRule::predicate(|n: &i64| *n > 0).with_id("positive"))
        .unwrap();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                if i % 2 == 0 {
                    // Even threads validate
                    let result = registry.validate(&(i + 1)).unwrap();
                    assert!(result.is_valid());
                } else {
                    // Odd threads register their own rule
                    registry
                        .register(
                            FnRule::predicate(|_: &i64| true).with_id(format!("extra_{}", i)),
                        )
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.len(), 11);
}

#[test]
fn test_concurrent_validate_refs() {
    let registry = Arc::new(RuleRegistry::new());

    registry
        .register(
            FnRule::predicate(|_: &i64| true)
                .with_id("a")
                .depends_on(["b"], DependencyPolicy::RequiresAllSuccess),
        )
        .unwrap();

    registry
        .register(FnRule::predicate(|_: &i64| true).with_id("b"))
        .unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let unresolved = registry.validate_refs();
                assert!(unresolved.is_empty());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_stress_concurrent_validation() {
    let validator = Arc::new(range_validator());

    // Create 100 threads all validating concurrently
    let handles: Vec<_> = (0..100)
        .map(|i| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || {
                for j in 0..10 {
                    let value = i * 10 + j;
                    let result = validator.collect_results(&value).unwrap();
                    assert_eq!(result.is_valid(), value > 0, "value {}", value);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
