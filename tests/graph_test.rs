//! Tests for dependency graph ordering and cycle detection.

use ruleflow::{DependencyGraph, DependencyPolicy, FnRule};

fn position(order: &[String], id: &str) -> usize {
    order
        .iter()
        .position(|n| n == id)
        .unwrap_or_else(|| panic!("{} missing from order", id))
}

/// Builds a layered acyclic graph where node `n{i}` depends on a few
/// lower-numbered nodes chosen by a fixed stride.
fn layered_graph(size: usize) -> (DependencyGraph, Vec<(String, Vec<String>)>) {
    let mut graph = DependencyGraph::new();
    let mut declared = Vec::new();

    for i in 0..size {
        let deps: Vec<String> = (0..i)
            .filter(|j| (i * 7 + j * 3) % 5 == 0)
            .map(|j| format!("n{}", j))
            .collect();
        graph.add_dependencies(format!("n{}", i), deps.clone());
        declared.push((format!("n{}", i), deps));
    }

    (graph, declared)
}

#[test]
fn test_topological_sort_places_dependencies_first() {
    let (graph, declared) = layered_graph(40);
    let order = graph.topological_sort().unwrap();

    assert_eq!(order.len(), 40);
    for (id, deps) in &declared {
        for dep in deps {
            assert!(
                position(&order, dep) < position(&order, id),
                "{} must come before {}",
                dep,
                id
            );
        }
    }
}

#[test]
fn test_priority_order_places_dependencies_first() {
    let (graph, declared) = layered_graph(40);
    let order = graph
        .priority_order(|id| id.len() as i32 * if id.ends_with('7') { 10 } else { 1 })
        .unwrap();

    for (id, deps) in &declared {
        for dep in deps {
            assert!(position(&order, dep) < position(&order, id));
        }
    }
}

#[test]
fn test_cycle_is_reported_as_traversable_path() {
    let mut graph = DependencyGraph::new();
    graph.add_dependencies("a", Vec::<String>::new());
    graph.add_dependencies("b", ["a", "d"]);
    graph.add_dependencies("c", ["b"]);
    graph.add_dependencies("d", ["c"]);

    let err = graph.validate_no_cycles().unwrap_err();
    let path = err.path();

    assert!(path.len() >= 2);
    assert_eq!(path.first(), path.last());
    for pair in path.windows(2) {
        assert!(
            graph.dependents(&pair[0]).contains(&pair[1]),
            "{} -> {} is not an edge",
            pair[0],
            pair[1]
        );
    }
    assert!(!err.nodes().contains(&"a".to_string()));
    assert!(err.to_string().starts_with("circular dependency between rules: "));
}

#[test]
fn test_topological_sort_detects_cycle() {
    let mut graph = DependencyGraph::new();
    graph.add_dependencies("x", ["y"]);
    graph.add_dependencies("y", ["x"]);

    assert!(graph.topological_sort().is_err());
}

#[test]
fn test_add_rule_uses_id_and_dependencies() {
    let mut graph = DependencyGraph::new();
    let rule = FnRule::predicate(|_: &i32| true)
        .with_id("checkout")
        .depends_on(["cart", "address"], DependencyPolicy::RequiresAllSuccess);

    graph.add_rule(&rule);

    assert!(graph.contains("checkout"));
    assert_eq!(graph.dependents("cart"), &["checkout".to_string()]);
    assert_eq!(
        graph.unresolved(),
        vec!["cart".to_string(), "address".to_string()]
    );
}

#[test]
fn test_empty_graph() {
    let graph = DependencyGraph::new();
    assert!(graph.is_empty());
    assert!(graph.validate_no_cycles().is_ok());
    assert!(graph.topological_sort().unwrap().is_empty());
}
