//! Tasks and their lifecycle.

use crate::executor::Executor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a task.
///
/// A task starts `Pending` and moves forward only:
/// `Pending -> Running -> Completed | Failed`, or `Pending -> Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    /// Completed, Failed or Skipped
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }

    /// Whether a dependent task may run once its dependency is in this state
    pub fn satisfies_dependents(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Skipped)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Why a task ended up skipped instead of running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SkipReason {
    /// The decider declined to run the task under its skip condition.
    Condition { condition: String },
    /// A dependency had not completed or been skipped.
    Dependency {
        dependency: String,
        status: TaskStatus,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Condition { condition } => {
                write!(f, "skipped by coordinator: {}", condition)
            }
            SkipReason::Dependency { dependency, status } => {
                write!(f, "dependency {} is {}", dependency, status)
            }
        }
    }
}

/// A named unit of work with declared dependencies.
///
/// Built with [`Task::new`] and the `with_*` methods, then handed to
/// [`TaskOrchestrator::add_task`](crate::TaskOrchestrator::add_task). Status,
/// result and error are only ever written by the orchestrator.
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    name: String,
    executor: Arc<dyn Executor>,
    dependencies: Vec<String>,
    priority: i32,
    context: BTreeMap<String, String>,
    skip_condition: Option<String>,
    status: TaskStatus,
    result: Option<String>,
    error: Option<String>,
    skip_reason: Option<SkipReason>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new<E: Executor + 'static>(
        id: impl Into<String>,
        name: impl Into<String>,
        executor: E,
    ) -> Self {
        Self::with_shared_executor(id, name, Arc::new(executor))
    }

    /// Create a task around an executor that other tasks may share
    pub fn with_shared_executor(
        id: impl Into<String>,
        name: impl Into<String>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            executor,
            dependencies: Vec::new(),
            priority: 0,
            context: BTreeMap::new(),
            skip_condition: None,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            skip_reason: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a task-local context entry, merged into the input at run time
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Let the orchestrator's decider veto this task before it runs
    pub fn with_skip_condition(mut self, condition: impl Into<String>) -> Self {
        self.skip_condition = Some(condition.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    pub fn skip_condition(&self) -> Option<&str> {
        self.skip_condition.as_deref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        self.skip_reason.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Wall time spent running, for tasks that ran
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    pub(crate) fn executor(&self) -> Arc<dyn Executor> {
        self.executor.clone()
    }

    pub(crate) fn mark_running(&mut self) {
        debug_assert_eq!(self.status, TaskStatus::Pending);
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn complete(&mut self, result: String) {
        debug_assert_eq!(self.status, TaskStatus::Running);
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: String) {
        debug_assert_eq!(self.status, TaskStatus::Running);
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn skip(&mut self, reason: SkipReason) {
        debug_assert_eq!(self.status, TaskStatus::Pending);
        self.status = TaskStatus::Skipped;
        self.skip_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;

    #[derive(Debug)]
    struct Echo;

    #[async_trait::async_trait]
    impl Executor for Echo {
        async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
            Ok(input.to_string())
        }
    }

    #[test]
    fn test_builder() {
        let task = Task::new("review_code", "Code Quality Review", Echo)
            .depends_on("fetch_pr")
            .with_dependencies(["analyze_ci"])
            .with_priority(8)
            .with_context("focus", "style")
            .with_skip_condition("Skip documentation-only changes");

        assert_eq!(task.id(), "review_code");
        assert_eq!(task.name(), "Code Quality Review");
        assert_eq!(task.dependencies(), &["fetch_pr", "analyze_ci"]);
        assert_eq!(task.priority(), 8);
        assert_eq!(task.context().get("focus").map(String::as_str), Some("style"));
        assert_eq!(
            task.skip_condition(),
            Some("Skip documentation-only changes")
        );
        assert_eq!(task.status(), TaskStatus::Pending);
        assert!(task.result().is_none());
        assert!(task.duration().is_none());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut task = Task::new("a", "A", Echo);
        task.mark_running();
        assert_eq!(task.status(), TaskStatus::Running);
        task.complete("done".to_string());
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.result(), Some("done"));
        assert!(task.duration().is_some());

        let mut failing = Task::new("b", "B", Echo);
        failing.mark_running();
        failing.fail("boom".to_string());
        assert_eq!(failing.status(), TaskStatus::Failed);
        assert_eq!(failing.error(), Some("boom"));
        assert!(failing.result().is_none());
    }

    #[test]
    fn test_status_classification() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Skipped.satisfies_dependents());
        assert!(TaskStatus::Completed.satisfies_dependents());
        assert!(!TaskStatus::Failed.satisfies_dependents());
        assert_eq!(TaskStatus::Skipped.to_string(), "skipped");
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::Dependency {
            dependency: "fetch".to_string(),
            status: TaskStatus::Failed,
        };
        assert_eq!(reason.to_string(), "dependency fetch is failed");

        let reason = SkipReason::Condition {
            condition: "CI already passing".to_string(),
        };
        assert_eq!(
            reason.to_string(),
            "skipped by coordinator: CI already passing"
        );
    }
}
