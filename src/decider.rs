//! Run-time decisions about whether a conditional task should execute.
//!
//! A decider is consulted only for tasks carrying a skip condition, right
//! before the dependency check. It gets a shared borrow of the context, so it
//! can read published results but never write them.

use crate::context::ContextStore;
use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Decides whether a conditional task runs or is skipped
#[async_trait::async_trait]
pub trait Decider: Send + Sync {
    async fn should_execute(&self, task: &Task, context: &ContextStore) -> bool;
}

/// A synchronous predicate over the task and the current context
pub type Condition = Arc<dyn Fn(&Task, &ContextStore) -> bool + Send + Sync>;

#[async_trait::async_trait]
impl Decider for Condition {
    async fn should_execute(&self, task: &Task, context: &ContextStore) -> bool {
        (**self)(task, context)
    }
}

/// One check a [`SkipRule`] applies to a context value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCheck {
    /// Value contains the text, ignoring ASCII case
    Contains(String),
    /// Value does not contain the text, ignoring ASCII case
    Lacks(String),
    /// Value has fewer than this many characters
    ShorterThan(usize),
}

impl RuleCheck {
    fn holds(&self, value: &str) -> bool {
        match self {
            RuleCheck::Contains(needle) => contains_ignore_case(value, needle),
            RuleCheck::Lacks(needle) => !contains_ignore_case(value, needle),
            RuleCheck::ShorterThan(limit) => value.chars().count() < *limit,
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// Skip tasks whose id contains `task` when every check holds on `key`.
///
/// A missing key reads as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRule {
    pub task: String,
    pub key: String,
    pub checks: Vec<RuleCheck>,
    pub reason: String,
}

impl SkipRule {
    pub fn new(task: impl Into<String>, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            key: key.into(),
            checks: Vec::new(),
            reason: reason.into(),
        }
    }

    pub fn check(mut self, check: RuleCheck) -> Self {
        self.checks.push(check);
        self
    }

    fn applies_to(&self, task: &Task) -> bool {
        task.id().contains(self.task.as_str())
    }

    fn matches(&self, context: &ContextStore) -> bool {
        let value = context.get(&self.key).unwrap_or_default();
        self.checks.iter().all(|check| check.holds(value))
    }
}

/// Rule-based coordinator: the first matching rule skips the task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDecider {
    #[serde(default)]
    rules: Vec<SkipRule>,
}

impl RuleDecider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: SkipRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Parse a rule set such as `{"rules": [{"task": "scan", ...}]}`
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn rules(&self) -> &[SkipRule] {
        &self.rules
    }

    /// The first rule that would skip `task`, if any
    pub fn matching_rule(&self, task: &Task, context: &ContextStore) -> Option<&SkipRule> {
        self.rules
            .iter()
            .find(|rule| rule.applies_to(task) && rule.matches(context))
    }
}

#[async_trait::async_trait]
impl Decider for RuleDecider {
    async fn should_execute(&self, task: &Task, context: &ContextStore) -> bool {
        match self.matching_rule(task, context) {
            Some(rule) => {
                debug!(task = task.id(), reason = %rule.reason, "coordinator: skip");
                false
            }
            None => {
                debug!(task = task.id(), "coordinator: execute");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::result_key;
    use crate::error::ExecutionError;
    use crate::executor::Executor;

    #[derive(Debug)]
    struct Noop;

    #[async_trait::async_trait]
    impl Executor for Noop {
        async fn execute(&self, _input: &str) -> Result<String, ExecutionError> {
            Ok(String::new())
        }
    }

    fn pr_rules() -> RuleDecider {
        RuleDecider::new()
            .with_rule(
                SkipRule::new("analyze_ci", result_key("fetch_pr"), "CI already passing")
                    .check(RuleCheck::Contains("all checks passed".to_string())),
            )
            .with_rule(
                SkipRule::new("review_code", result_key("fetch_pr"), "documentation only")
                    .check(RuleCheck::Contains(".md".to_string()))
                    .check(RuleCheck::Lacks(".py".to_string())),
            )
            .with_rule(
                SkipRule::new("scan_security", result_key("fetch_pr"), "small PR")
                    .check(RuleCheck::ShorterThan(500)),
            )
    }

    #[tokio::test]
    async fn test_rule_decider() {
        let decider = pr_rules();
        let mut ctx = ContextStore::new();
        ctx.set(result_key("fetch_pr"), "Changed README.md. All checks PASSED.");

        let ci = Task::new("analyze_ci", "Analyze CI", Noop);
        let review = Task::new("review_code", "Review", Noop);
        let scan = Task::new("scan_security", "Scan", Noop);
        let fetch = Task::new("fetch_pr", "Fetch", Noop);

        assert!(!decider.should_execute(&ci, &ctx).await);
        assert!(!decider.should_execute(&review, &ctx).await);
        assert!(!decider.should_execute(&scan, &ctx).await);
        assert!(decider.should_execute(&fetch, &ctx).await);

        ctx.set(result_key("fetch_pr"), format!("src/lib.py {}", "x".repeat(600)));
        assert!(decider.should_execute(&ci, &ctx).await);
        assert!(decider.should_execute(&review, &ctx).await);
        assert!(decider.should_execute(&scan, &ctx).await);
    }

    #[test]
    fn test_missing_key_reads_empty() {
        let decider = pr_rules();
        let ctx = ContextStore::new();
        let scan = Task::new("scan_security", "Scan", Noop);
        assert_eq!(
            decider.matching_rule(&scan, &ctx).map(|r| r.reason.as_str()),
            Some("small PR")
        );
    }

    #[tokio::test]
    async fn test_condition_closure() {
        let condition: Condition =
            Arc::new(|_task: &Task, ctx: &ContextStore| ctx.contains_key("go"));
        let task = Task::new("t", "T", Noop);
        let mut ctx = ContextStore::new();
        assert!(!condition.should_execute(&task, &ctx).await);
        ctx.set("go", "yes");
        assert!(condition.should_execute(&task, &ctx).await);
    }

    #[test]
    fn test_rules_from_json() {
        let json = r#"{
            "rules": [
                {
                    "task": "scan_security",
                    "key": "fetch_pr_result",
                    "checks": [{"shorter_than": 50}, {"lacks": ".rs"}],
                    "reason": "tiny change"
                }
            ]
        }"#;
        let decider = RuleDecider::from_json(json).unwrap();
        assert_eq!(decider.rules().len(), 1);
        assert_eq!(
            decider.rules()[0].checks,
            vec![RuleCheck::ShorterThan(50), RuleCheck::Lacks(".rs".to_string())]
        );
        assert!(RuleDecider::from_json("{\"rules\": 3}").is_err());
    }
}
