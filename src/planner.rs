//! Execution planning for a rule set.
//!
//! The planner partitions a rule set into independent rules (no dependency
//! capability) and dependent rules. Independent rules run first, ordered by
//! descending priority with a stable tie-break. Dependent rules run after
//! them in topological order; priority only breaks ties between dependent
//! rules that have no path between them.

use std::cmp::Reverse;
use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::CycleError;
use crate::graph::DependencyGraph;
use crate::rule::{for_each_id, Rule, SharedRule};

/// The planned run order of a rule set.
///
/// Construction fails fast with a [`CycleError`] when the dependent rules
/// form a cycle, so no partial run ever starts.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ruleflow::{DependencyPolicy, ExecutionPlanner, FnRule, Rule, SharedRule};
///
/// let rules: Vec<SharedRule<i32>> = vec![
///     Arc::new(FnRule::predicate(|n: &i32| *n < 10).with_id("small")
///         .depends_on(["positive"], DependencyPolicy::RequiresAllSuccess)),
///     Arc::new(FnRule::predicate(|n: &i32| *n > 0).with_id("positive")),
/// ];
///
/// let planner = ExecutionPlanner::new(&rules).unwrap();
/// assert_eq!(planner.independent_plan()[0].id(), Some("positive"));
/// assert_eq!(planner.dependent_plan()[0].id(), Some("small"));
/// ```
pub struct ExecutionPlanner<T> {
    independent: Vec<SharedRule<T>>,
    dependent: Vec<SharedRule<T>>,
    graph: DependencyGraph,
    known_ids: HashSet<String>,
}

impl<T> ExecutionPlanner<T> {
    /// Plans `rules`.
    pub fn new(rules: &[SharedRule<T>]) -> Result<Self, CycleError> {
        let mut known_ids = HashSet::new();
        let mut independent = Vec::new();
        let mut keyed: IndexMap<String, SharedRule<T>> = IndexMap::new();
        let mut graph = DependencyGraph::new();

        for (index, rule) in rules.iter().enumerate() {
            for_each_id(rule.as_ref(), &mut |id| {
                if !known_ids.insert(id.to_string()) {
                    tracing::warn!(
                        rule_id = id,
                        "duplicate rule id, later outcomes overwrite earlier ones"
                    );
                }
            });

            match rule.as_dependent() {
                None => independent.push(rule.clone()),
                Some(dependent) => {
                    let key = match rule.id() {
                        Some(id) if !keyed.contains_key(id) => id.to_string(),
                        _ => format!("{}#{}", rule.name(), index),
                    };
                    graph.add_dependencies(key.clone(), dependent.depends_on().iter().cloned());
                    keyed.insert(key, rule.clone());
                }
            }
        }

        independent.sort_by_key(|rule| Reverse(rule.priority()));

        let order = graph
            .priority_order(|key| keyed.get(key).map_or(0, |rule| rule.priority()))
            .map_err(|err| {
                tracing::error!(cycle = %err, "cycle detected");
                err
            })?;
        let dependent: Vec<SharedRule<T>> = order
            .iter()
            .filter_map(|key| keyed.get(key).cloned())
            .collect();

        tracing::debug!(
            independent = independent.len(),
            dependent = dependent.len(),
            "planned rule execution"
        );

        Ok(Self {
            independent,
            dependent,
            graph,
            known_ids,
        })
    }

    /// Independent rules, highest priority first.
    pub fn independent_plan(&self) -> &[SharedRule<T>] {
        &self.independent
    }

    /// Dependent rules in topological order.
    pub fn dependent_plan(&self) -> &[SharedRule<T>] {
        &self.dependent
    }

    /// The dependency graph over the dependent rules.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Dependency ids that no rule in the set declares.
    ///
    /// Ids of rules nested in composites count as declared, since composites
    /// record their children's outcomes.
    ///
    /// Such dependencies never get an outcome, so the rules that name them
    /// are skipped under every policy except the ones an empty outcome
    /// satisfies.
    pub fn unresolved_dependencies(&self) -> Vec<String> {
        self.graph
            .unresolved()
            .into_iter()
            .filter(|id| !self.known_ids.contains(id))
            .collect()
    }

    /// Total number of planned rules.
    pub fn len(&self) -> usize {
        self.independent.len() + self.dependent.len()
    }

    /// Returns true if there is nothing to run.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Clone for ExecutionPlanner<T> {
    fn clone(&self) -> Self {
        Self {
            independent: self.independent.clone(),
            dependent: self.dependent.clone(),
            graph: self.graph.clone(),
            known_ids: self.known_ids.clone(),
        }
    }
}
