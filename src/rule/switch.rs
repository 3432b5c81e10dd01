//! Key-based selection between rules.

use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::ValidationContext;
use crate::error::RuleError;
use crate::rule::{evaluate_nested, Rule, SharedRule};
use crate::severity::Severity;

type Selector<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// Runs the rule registered for the key computed from the input.
///
/// Keys are compared by equality. When no case matches the default rule runs;
/// without a default the switch passes. A selected rule whose own condition is
/// false is not run.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ruleflow::{FnRule, Rule, SwitchRule};
///
/// let rule = SwitchRule::new(|s: &String| s.chars().next())
///     .case(Some('A'), Arc::new(FnRule::predicate(|s: &String| s.len() > 2)))
///     .case(Some('B'), Arc::new(FnRule::predicate(|s: &String| s.ends_with('!'))));
///
/// assert!(rule.validate(&"Abc".to_string()).is_ok());
/// assert!(rule.validate(&"Bc".to_string()).is_err());
/// assert!(rule.validate(&"C".to_string()).is_ok());
/// ```
pub struct SwitchRule<T, K> {
    selector: Selector<T, K>,
    cases: IndexMap<K, SharedRule<T>>,
    default: Option<SharedRule<T>>,
    id: Option<String>,
    name: Option<String>,
    severity: Severity,
    priority: i32,
}

impl<T, K> SwitchRule<T, K>
where
    K: Eq + Hash,
{
    /// Creates a switch keyed by `selector` with no cases.
    pub fn new<F>(selector: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self {
            selector: Arc::new(selector),
            cases: IndexMap::new(),
            default: None,
            id: None,
            name: None,
            severity: Severity::Error,
            priority: 0,
        }
    }

    /// Registers the rule for `key`, replacing any earlier rule for it.
    pub fn case(mut self, key: K, rule: SharedRule<T>) -> Self {
        self.cases.insert(key, rule);
        self
    }

    /// Sets the rule run when no case matches.
    pub fn default_rule(mut self, rule: SharedRule<T>) -> Self {
        self.default = Some(rule);
        self
    }

    /// Sets the rule id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the default severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the rule that would run for `input`, if any.
    pub fn select(&self, input: &T) -> Option<&SharedRule<T>> {
        let key = (self.selector)(input);
        self.cases.get(&key).or(self.default.as_ref())
    }
}

impl<T, K> Rule<T> for SwitchRule<T, K>
where
    K: Eq + Hash + Send + Sync,
{
    fn validate(&self, input: &T) -> Result<(), RuleError> {
        self.evaluate(input, &mut ValidationContext::new())
    }

    fn evaluate(&self, input: &T, context: &mut ValidationContext) -> Result<(), RuleError> {
        match self.select(input) {
            Some(rule) => evaluate_nested(rule.as_ref(), input, context).unwrap_or(Ok(())),
            None => Ok(()),
        }
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("SwitchRule")
    }
}
