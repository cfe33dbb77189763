//! Consolidated outcome of a workflow run, for the host to present.

use crate::task::{SkipReason, Task, TaskStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Final state of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub skip_reason: Option<SkipReason>,
    pub duration_ms: Option<i64>,
}

impl TaskOutcome {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id().to_string(),
            name: task.name().to_string(),
            status: task.status(),
            result: task.result().map(str::to_string),
            error: task.error().map(str::to_string),
            skip_reason: task.skip_reason().cloned(),
            duration_ms: task.duration().map(|d| d.num_milliseconds()),
        }
    }

    fn headline(&self) -> String {
        match (&self.error, &self.skip_reason) {
            (Some(error), _) => format!("{}: {} ({})", self.id, self.status, error),
            (None, Some(reason)) => format!("{}: {} ({})", self.id, self.status, reason),
            (None, None) => format!("{}: {}", self.id, self.status),
        }
    }
}

/// Results, statuses and per-task outcomes of a run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowReport {
    pub order: Vec<String>,
    pub results: BTreeMap<String, Option<String>>,
    pub statuses: BTreeMap<String, TaskStatus>,
    pub tasks: Vec<TaskOutcome>,
}

impl WorkflowReport {
    pub(crate) fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut report = Self::default();
        for task in tasks {
            let outcome = TaskOutcome::from_task(task);
            report.order.push(outcome.id.clone());
            report
                .results
                .insert(outcome.id.clone(), outcome.result.clone());
            report.statuses.insert(outcome.id.clone(), outcome.status);
            report.tasks.push(outcome);
        }
        report
    }

    pub fn outcome(&self, id: &str) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|outcome| outcome.id == id)
    }

    /// Ids of tasks that ended in `status`, in execution order
    pub fn ids_with(&self, status: TaskStatus) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|outcome| outcome.status == status)
            .map(|outcome| outcome.id.as_str())
            .collect()
    }

    /// True when every task completed or was skipped
    pub fn succeeded(&self) -> bool {
        self.tasks
            .iter()
            .all(|outcome| outcome.status.satisfies_dependents())
    }

    /// One line per run: `id: status (detail) | ...`
    pub fn summary(&self) -> String {
        self.tasks
            .iter()
            .map(TaskOutcome::headline)
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for WorkflowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.tasks {
            writeln!(f, "{}", outcome.headline())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use crate::executor::Executor;
    use crate::{RuleCheck, RuleDecider, SkipRule, TaskOrchestrator};

    /// Replies with fixed text; an empty reply is a failure
    #[derive(Debug)]
    struct Agent(&'static str);

    #[async_trait::async_trait]
    impl Executor for Agent {
        async fn execute(&self, _input: &str) -> Result<String, ExecutionError> {
            if self.0.is_empty() {
                return Err(ExecutionError::failed("empty reply"));
            }
            Ok(self.0.to_string())
        }
    }

    async fn pr_review_report() -> WorkflowReport {
        let rules = RuleDecider::new().with_rule(
            SkipRule::new("scan_security", "fetch_pr_result", "small PR")
                .check(RuleCheck::ShorterThan(50)),
        );
        let mut orch = TaskOrchestrator::new().with_decider(rules);
        let fetch = Task::new("fetch_pr", "Fetch PR Data", Agent("docs/README.md +3 -1"));
        orch.add_task(fetch.with_priority(10))
            .unwrap()
            .add_task(
                Task::new("analyze_ci", "Analyze CI", Agent(""))
                    .depends_on("fetch_pr")
                    .with_priority(9),
            )
            .unwrap()
            .add_task(
                Task::new("scan_security", "Security Analysis", Agent("clean"))
                    .depends_on("fetch_pr")
                    .with_priority(7)
                    .with_skip_condition("Skip if PR is small"),
            )
            .unwrap()
            .add_task(
                Task::new("create_comments", "Generate PR Comments", Agent("posted 3 comments"))
                    .with_dependencies(["scan_security"])
                    .with_priority(5),
            )
            .unwrap();
        orch.execute_workflow("https://github.com/o/r/pull/6")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_report_contents() {
        let report = pr_review_report().await;

        assert_eq!(
            report.order,
            vec!["fetch_pr", "analyze_ci", "scan_security", "create_comments"]
        );
        assert_eq!(report.ids_with(TaskStatus::Completed), vec!["fetch_pr", "create_comments"]);
        assert_eq!(report.ids_with(TaskStatus::Failed), vec!["analyze_ci"]);
        assert_eq!(report.ids_with(TaskStatus::Skipped), vec!["scan_security"]);
        assert!(!report.succeeded());

        let fetch = report.outcome("fetch_pr").unwrap();
        assert_eq!(fetch.name, "Fetch PR Data");
        assert!(fetch.duration_ms.is_some());
        assert_eq!(report.results["create_comments"].as_deref(), Some("posted 3 comments"));
        assert_eq!(report.results["analyze_ci"], None);

        assert_eq!(
            report.summary(),
            "fetch_pr: completed | analyze_ci: failed (empty reply) | \
             scan_security: skipped (skipped by coordinator: Skip if PR is small) | \
             create_comments: completed"
        );
        assert_eq!(report.to_string().lines().count(), 4);
    }

    #[tokio::test]
    async fn test_report_json() {
        let report = pr_review_report().await;
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["statuses"]["scan_security"], "skipped");
        assert_eq!(json["tasks"][2]["skip_reason"]["kind"], "condition");
        assert_eq!(json["tasks"][1]["error"], "empty reply");
        assert!(json["results"]["analyze_ci"].is_null());
    }

    #[test]
    fn test_empty_report() {
        let report = WorkflowReport::default();
        assert!(report.succeeded());
        assert_eq!(report.summary(), "");
        assert!(report.outcome("anything").is_none());
    }
}
