//! Dependency graph over rule ids.
//!
//! Nodes are rule ids. An edge runs from every declared dependency to the
//! rule that declares it, so "runs after" means "reachable via edges".
//! Dependencies that no rule in the set declares are kept as placeholder
//! nodes: they are not a construction error, they simply never get an
//! outcome. [`DependencyGraph::unresolved`] reports them.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use indexmap::{IndexMap, IndexSet};

use crate::error::CycleError;
use crate::rule::Rule;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// A directed graph from dependencies to their dependents.
///
/// # Example
///
/// ```rust
/// use ruleflow::DependencyGraph;
///
/// let mut graph = DependencyGraph::new();
/// graph.add_dependencies("total", ["items", "tax"]);
/// graph.add_dependencies("tax", ["items"]);
///
/// let order = graph.topological_sort().unwrap();
/// let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
/// assert!(pos("items") < pos("tax"));
/// assert!(pos("tax") < pos("total"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: IndexMap<String, Vec<String>>,
    declared: IndexSet<String>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule keyed by its id, or by its name when it has none.
    ///
    /// Each dependency the rule declares gets a placeholder node (if absent)
    /// and an edge to the rule.
    pub fn add_rule<T, R>(&mut self, rule: &R)
    where
        R: Rule<T> + ?Sized,
    {
        let key = rule.id().unwrap_or_else(|| rule.name()).to_string();
        let depends_on = rule
            .as_dependent()
            .map(|d| d.depends_on().to_vec())
            .unwrap_or_default();
        self.add_dependencies(key, depends_on);
    }

    /// Declares `id` as a rule and adds an edge from each dependency to it.
    pub fn add_dependencies<I, S>(&mut self, id: impl Into<String>, depends_on: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        self.add_node(id.clone());
        self.declared.insert(id.clone());
        for dependency in depends_on {
            let dependency = dependency.into();
            self.add_node(dependency.clone());
            if let Some(dependents) = self.edges.get_mut(&dependency) {
                if !dependents.contains(&id) {
                    dependents.push(id.clone());
                }
            }
        }
    }

    /// Adds a node without declaring it. Existing nodes are left alone.
    pub fn add_node(&mut self, id: impl Into<String>) {
        self.edges.entry(id.into()).or_default();
    }

    /// Returns true if `id` is a node of the graph.
    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    /// Returns the number of nodes, placeholders included.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Returns all node ids in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Returns the rules that depend directly on `id`.
    pub fn dependents(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the placeholder nodes: ids that are depended on but were
    /// never declared as rules.
    pub fn unresolved(&self) -> Vec<String> {
        self.edges
            .keys()
            .filter(|id| !self.declared.contains(*id))
            .cloned()
            .collect()
    }

    /// Checks the graph for cycles.
    ///
    /// On failure the error carries the cycle in discovery order, closed by
    /// repeating its first id.
    pub fn validate_no_cycles(&self) -> Result<(), CycleError> {
        self.depth_first(self.nodes(), false).map(|_| ())
    }

    /// Orders the nodes so that every node comes after all of its
    /// dependencies.
    ///
    /// Nodes with no path between them keep their insertion order. Fails with
    /// the same error as [`validate_no_cycles`](Self::validate_no_cycles)
    /// when the graph is cyclic.
    pub fn topological_sort(&self) -> Result<Vec<String>, CycleError> {
        // Reverse postorder over reversed roots and neighbours keeps the
        // insertion order for unrelated nodes.
        let roots = self.edges.keys().rev().map(String::as_str);
        let mut postorder = self.depth_first(roots, true)?;
        postorder.reverse();
        Ok(postorder.into_iter().map(str::to_string).collect())
    }

    /// Orders the nodes topologically, breaking ties by `priority`.
    ///
    /// Among the nodes whose dependencies have all been emitted, the one with
    /// the highest priority comes next; equal priorities keep insertion
    /// order.
    pub fn priority_order<F>(&self, priority: F) -> Result<Vec<String>, CycleError>
    where
        F: Fn(&str) -> i32,
    {
        let index: HashMap<&str, usize> = self
            .nodes()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();

        let mut in_degree = vec![0_usize; self.edges.len()];
        for dependents in self.edges.values() {
            for dependent in dependents {
                if let Some(&i) = index.get(dependent.as_str()) {
                    in_degree[i] += 1;
                }
            }
        }

        let mut ready: BinaryHeap<(i32, Reverse<usize>)> = self
            .nodes()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] == 0)
            .map(|(i, id)| (priority(id), Reverse(i)))
            .collect();

        let mut order = Vec::with_capacity(self.edges.len());
        while let Some((_, Reverse(i))) = ready.pop() {
            let Some((id, dependents)) = self.edges.get_index(i) else {
                continue;
            };
            order.push(id.clone());
            for dependent in dependents {
                if let Some(&j) = index.get(dependent.as_str()) {
                    in_degree[j] -= 1;
                    if in_degree[j] == 0 {
                        ready.push((priority(dependent), Reverse(j)));
                    }
                }
            }
        }

        if order.len() < self.edges.len() {
            self.validate_no_cycles()?;
            // Kahn's algorithm only stalls on a cycle.
            let stalled = self
                .nodes()
                .filter(|id| !order.iter().any(|done| done.as_str() == *id))
                .map(str::to_string)
                .collect();
            return Err(CycleError::new(stalled));
        }
        Ok(order)
    }

    /// Three-colour depth-first traversal returning the postorder.
    fn depth_first<'a, I>(&'a self, roots: I, reverse_neighbours: bool) -> Result<Vec<&'a str>, CycleError>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut marks: HashMap<&'a str, Mark> = HashMap::with_capacity(self.edges.len());
        let mut postorder: Vec<&'a str> = Vec::with_capacity(self.edges.len());

        for root in roots {
            if !marks.contains_key(root) {
                self.visit(root, reverse_neighbours, &mut marks, &mut postorder)?;
            }
        }
        Ok(postorder)
    }

    /// Iterative DFS from `root`. Each stack frame is a node on the current
    /// path and the number of its dependents explored so far.
    fn visit<'a>(
        &'a self,
        root: &'a str,
        reverse_neighbours: bool,
        marks: &mut HashMap<&'a str, Mark>,
        postorder: &mut Vec<&'a str>,
    ) -> Result<(), CycleError> {
        let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::InProgress);

        while let Some(frame) = stack.last_mut() {
            let (node, explored) = *frame;
            let dependents = self.dependents(node);

            if explored == dependents.len() {
                stack.pop();
                marks.insert(node, Mark::Done);
                postorder.push(node);
                continue;
            }
            frame.1 += 1;

            let next = if reverse_neighbours {
                &dependents[dependents.len() - 1 - explored]
            } else {
                &dependents[explored]
            };

            match marks.get(next.as_str()) {
                Some(Mark::InProgress) => {
                    let start = stack
                        .iter()
                        .position(|(n, _)| *n == next.as_str())
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                    cycle.push(next.clone());
                    return Err(CycleError::new(cycle));
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(next.as_str(), Mark::InProgress);
                    stack.push((next.as_str(), 0));
                }
            }
        }
        Ok(())
    }
}
