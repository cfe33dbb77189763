//! The task dependency orchestrator.

use crate::config::{DependencyPolicy, ExecutionMode, OrchestratorConfig};
use crate::context::{ContextExt, ContextStore, INPUT_KEY, SharedContext, result_key};
use crate::decider::Decider;
use crate::error::{ExecutionError, OrchestratorError, Result};
use crate::order::topological_order;
use crate::report::WorkflowReport;
use crate::task::{SkipReason, Task, TaskStatus};
use crate::executor::Executor;
use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Debug, Write as _};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Outcome of the pre-run checks for a pending task
enum Admission {
    Run,
    Skip(SkipReason),
}

/// Runs a set of dependent tasks for one workflow.
///
/// Tasks are registered with [`add_task`](Self::add_task), which keeps a
/// dependency-respecting execution order up to date and rejects any task
/// that would close a cycle. [`execute_all`](Self::execute_all) then walks that
/// order. A completed task publishes its result under `"{id}_result"` in the
/// shared context, where dependents pick it up as part of their input.
///
/// A failing or panicking executor marks its task `Failed` and the run carries on;
/// dependents of a failed task are `Skipped`. Only structural problems are
/// returned as errors.
///
/// An orchestrator holds the audit trail of a single run. Tasks never go back
/// to `Pending`, so a new run needs a new orchestrator.
pub struct TaskOrchestrator {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    execution_order: Vec<String>,
    context: SharedContext,
    decider: Option<Arc<dyn Decider>>,
    config: OrchestratorConfig,
}

impl TaskOrchestrator {
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self {
            tasks: Vec::new(),
            index: HashMap::new(),
            execution_order: Vec::new(),
            context: Arc::new(RwLock::new(ContextStore::new())),
            decider: None,
            config,
        }
    }

    /// Install the decider consulted for tasks that carry a skip condition
    pub fn with_decider<D: Decider + 'static>(mut self, decider: D) -> Self {
        self.decider = Some(Arc::new(decider));
        self
    }

    /// Register a task and recompute the execution order.
    ///
    /// Fails on a duplicate id, a self or repeated dependency, an unknown
    /// dependency under [`DependencyPolicy::Strict`], or a cycle. A rejected
    /// task is not registered, so the caller can fix its dependencies and add
    /// it again.
    pub fn add_task(&mut self, task: Task) -> Result<&mut Self> {
        self.validate(&task)?;

        debug!(
            task = task.id(),
            dependencies = ?task.dependencies(),
            priority = task.priority(),
            "registering task"
        );
        self.index.insert(task.id().to_string(), self.tasks.len());
        self.tasks.push(task);
        self.refresh_order()?;
        Ok(self)
    }

    fn validate(&self, task: &Task) -> Result<()> {
        let task_id = task.id();
        if self.index.contains_key(task_id) {
            return Err(OrchestratorError::DuplicateTask(task_id.to_string()));
        }

        let mut seen = HashSet::new();
        for dependency in task.dependencies() {
            if dependency == task_id {
                return Err(OrchestratorError::SelfDependency {
                    task_id: task_id.to_string(),
                });
            }
            if !seen.insert(dependency.as_str()) {
                return Err(OrchestratorError::DuplicateDependency {
                    task_id: task_id.to_string(),
                    dependency: dependency.clone(),
                });
            }
            if self.config.dependency_policy == DependencyPolicy::Strict
                && !self.index.contains_key(dependency)
            {
                return Err(OrchestratorError::UnknownDependency {
                    task_id: task_id.to_string(),
                    dependency: dependency.clone(),
                });
            }
        }
        Ok(())
    }

    // A task closing a cycle is always the last one pushed, so rejecting it
    // leaves the previous order intact.
    fn refresh_order(&mut self) -> Result<()> {
        match topological_order(&self.tasks, &self.index) {
            Ok(order) => {
                self.execution_order = order
                    .into_iter()
                    .map(|i| self.tasks[i].id().to_string())
                    .collect();
                Ok(())
            }
            Err(cycle) => {
                if let Some(task) = self.tasks.pop() {
                    self.index.remove(task.id());
                }
                warn!(cycle = ?cycle, "rejected task closing a dependency cycle");
                Err(OrchestratorError::CircularDependency {
                    task_id: cycle.last().cloned().unwrap_or_default(),
                    cycle,
                })
            }
        }
    }

    /// The dependency-respecting order `execute_all` follows
    pub fn execution_order(&self) -> Result<&[String]> {
        Ok(&self.execution_order)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&i| &self.tasks[i])
    }

    /// Registered tasks in insertion order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Handle to the shared context
    pub fn context(&self) -> SharedContext {
        self.context.clone()
    }

    /// Seed the workflow text every task receives
    pub async fn set_input(&self, input: impl Into<String>) {
        self.context.set(INPUT_KEY, input.into()).await;
    }

    /// Current status of every task. Pure read.
    pub fn status_snapshot(&self) -> HashMap<String, TaskStatus> {
        self.tasks
            .iter()
            .map(|task| (task.id().to_string(), task.status()))
            .collect()
    }

    /// Result of every task; `None` unless it completed
    pub fn results(&self) -> HashMap<String, Option<String>> {
        self.tasks
            .iter()
            .map(|task| (task.id().to_string(), task.result().map(str::to_string)))
            .collect()
    }

    /// Snapshot of the run so far
    pub fn report(&self) -> WorkflowReport {
        let ordered = self
            .execution_order
            .iter()
            .filter_map(|id| self.task(id));
        WorkflowReport::from_tasks(ordered)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| OrchestratorError::TaskNotFound(id.to_string()))
    }

    /// Run a single task if it is still pending.
    ///
    /// A task that already left `Pending` is not re-run; its stored result is
    /// returned instead. A pending task is skipped when the decider vetoes it
    /// or when a registered dependency is neither completed nor skipped.
    /// Executor errors mark the task `Failed` and yield `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn execute_task(&mut self, id: &str) -> Result<Option<String>> {
        let idx = self.position(id)?;

        let task = &self.tasks[idx];
        if task.status() != TaskStatus::Pending {
            debug!(status = %task.status(), "task already left pending");
            return Ok(task.result().map(str::to_string));
        }

        if let Admission::Skip(reason) = self.admit(idx).await {
            info!(reason = %reason, "task skipped");
            self.tasks[idx].skip(reason);
            return Ok(None);
        }

        let input = self.build_input(idx).await;
        self.tasks[idx].mark_running();
        debug!(input_len = input.len(), "task running");
        let outcome = run_guarded(self.tasks[idx].executor(), input).await;
        Ok(self.settle(idx, outcome).await)
    }

    /// Run every pending task and return each task's result.
    ///
    /// Never fails because of an executor; only a cyclic graph is an error.
    #[instrument(skip(self))]
    pub async fn execute_all(&mut self) -> Result<HashMap<String, Option<String>>> {
        info!(tasks = self.tasks.len(), mode = ?self.config.mode, "executing tasks");

        match self.config.mode {
            ExecutionMode::Sequential => {
                for id in self.execution_order.clone() {
                    let pending = self
                        .task(&id)
                        .is_some_and(|task| task.status() == TaskStatus::Pending);
                    if pending {
                        self.execute_task(&id).await?;
                    }
                }
            }
            ExecutionMode::Concurrent => self.run_waves().await,
        }

        Ok(self.results())
    }

    /// Seed the input, run everything, and report.
    pub async fn execute_workflow(&mut self, input: impl Into<String>) -> Result<WorkflowReport> {
        self.set_input(input).await;
        self.execute_all().await?;

        let report = self.report();
        info!(summary = %report.summary(), "workflow finished");
        Ok(report)
    }

    // Each wave admits every pending task whose dependencies are terminal,
    // awaits their executors together, then publishes results before the
    // next wave reads the context.
    async fn run_waves(&mut self) {
        let order: Vec<usize> = self
            .execution_order
            .iter()
            .map(|id| self.index[id])
            .collect();

        loop {
            let mut skipped_any = false;
            let mut wave = Vec::new();

            for &idx in &order {
                if self.tasks[idx].status() != TaskStatus::Pending
                    || !self.dependencies_settled(idx)
                {
                    continue;
                }
                match self.admit(idx).await {
                    Admission::Skip(reason) => {
                        info!(task = self.tasks[idx].id(), reason = %reason, "task skipped");
                        self.tasks[idx].skip(reason);
                        skipped_any = true;
                    }
                    Admission::Run => wave.push(idx),
                }
            }

            if wave.is_empty() {
                if skipped_any {
                    continue;
                }
                break;
            }

            debug!(size = wave.len(), "starting wave");
            let mut jobs = Vec::with_capacity(wave.len());
            for idx in wave {
                let input = self.build_input(idx).await;
                self.tasks[idx].mark_running();
                let executor = self.tasks[idx].executor();
                jobs.push(async move { (idx, run_guarded(executor, input).await) });
            }

            for (idx, outcome) in join_all(jobs).await {
                self.settle(idx, outcome).await;
            }
        }
    }

    fn dependencies_settled(&self, idx: usize) -> bool {
        self.tasks[idx]
            .dependencies()
            .iter()
            .filter_map(|dep| self.index.get(dep))
            .all(|&d| self.tasks[d].status().is_terminal())
    }

    async fn admit(&self, idx: usize) -> Admission {
        let task = &self.tasks[idx];

        if let (Some(condition), Some(decider)) = (task.skip_condition(), &self.decider) {
            // the lock is released before the decider runs
            let ctx = self.context.read().await.clone();
            if !decider.should_execute(task, &ctx).await {
                return Admission::Skip(SkipReason::Condition {
                    condition: condition.to_string(),
                });
            }
        }

        for dependency in task.dependencies() {
            let Some(&d) = self.index.get(dependency) else {
                continue;
            };
            let status = self.tasks[d].status();
            if !status.satisfies_dependents() {
                return Admission::Skip(SkipReason::Dependency {
                    dependency: dependency.clone(),
                    status,
                });
            }
        }

        Admission::Run
    }

    /// Input text: the workflow input (a task-local `input` wins), the
    /// task-local entries, then a bounded digest of each dependency result.
    async fn build_input(&self, idx: usize) -> String {
        let task = &self.tasks[idx];
        let ctx = self.context.read().await;
        let mut sections = Vec::new();

        let base = task
            .context()
            .get(INPUT_KEY)
            .map(String::as_str)
            .or_else(|| ctx.input())
            .unwrap_or_default();
        if !base.is_empty() {
            sections.push(base.to_string());
        }

        let mut locals = String::new();
        for (key, value) in task.context() {
            if key != INPUT_KEY {
                let _ = writeln!(locals, "- {}: {}", key, value);
            }
        }
        if !locals.is_empty() {
            sections.push(format!("Task context:\n{}", locals.trim_end()));
        }

        let mut results = String::new();
        for dependency in task.dependencies() {
            if let Some(result) = ctx.result(dependency) {
                let _ = write!(
                    results,
                    "\n=== {} ===\n{}\n",
                    dependency.to_uppercase(),
                    digest(result, self.config.digest_chars)
                );
            }
        }
        if !results.is_empty() {
            sections.push(format!("Dependency results:\n{}", results.trim_end()));
        }

        sections.join("\n\n")
    }

    async fn settle(
        &mut self,
        idx: usize,
        outcome: std::result::Result<String, ExecutionError>,
    ) -> Option<String> {
        let task = &mut self.tasks[idx];
        match outcome {
            Ok(content) => {
                info!(task = task.id(), len = content.len(), "task completed");
                task.complete(content.clone());
                self.context
                    .set(result_key(task.id()), content.clone())
                    .await;
                Some(content)
            }
            Err(err) => {
                warn!(task = task.id(), error = %err, "task failed");
                task.fail(err.to_string());
                None
            }
        }
    }
}

impl Default for TaskOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for TaskOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOrchestrator")
            .field("tasks", &self.tasks.len())
            .field("execution_order", &self.execution_order)
            .field("has_decider", &self.decider.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Await an executor, turning a panic into a failed outcome
async fn run_guarded(
    executor: Arc<dyn Executor>,
    input: String,
) -> std::result::Result<String, ExecutionError> {
    match AssertUnwindSafe(executor.execute(&input)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(payload) => Err(ExecutionError::failed(format!(
            "executor panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// First `limit` characters of `text`, with `...` marking a cut
pub(crate) fn digest(text: &str, limit: usize) -> Cow<'_, str> {
    match text.char_indices().nth(limit) {
        None => Cow::Borrowed(text),
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
    }
}
