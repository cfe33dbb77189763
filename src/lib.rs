//! # Task Orchestrator
//!
//! A library for running agent-backed tasks in dependency order and passing
//! their results along to the tasks that depend on them.
//!
//! ## Features
//!
//! - Executors as a single-method async trait: text in, text out
//! - Deterministic execution order: dependencies first, then priority
//! - Cycle detection as soon as a task is registered
//! - Shared string context; every completed task publishes `"{id}_result"`
//! - Failures stay local: dependents of a failed task are skipped
//! - Optional decider that can veto conditional tasks at run time
//! - Sequential or wave-based concurrent execution
//!
//! ## Example
//!
//! ```rust
//! use task_orchestrator::{ExecutionError, Executor, Task, TaskOrchestrator, TaskStatus};
//!
//! #[derive(Debug)]
//! struct Shout;
//!
//! #[async_trait::async_trait]
//! impl Executor for Shout {
//!     async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
//!         Ok(input.to_uppercase())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut orchestrator = TaskOrchestrator::new();
//! orchestrator
//!     .add_task(Task::new("fetch", "Fetch PR", Shout).with_priority(10))?
//!     .add_task(Task::new("review", "Review PR", Shout).depends_on("fetch"))?;
//!
//! let report = orchestrator.execute_workflow("pr #6").await?;
//! assert_eq!(report.statuses["review"], TaskStatus::Completed);
//! assert_eq!(report.results["fetch"].as_deref(), Some("PR #6"));
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod decider;
mod error;
mod executor;
mod order;
mod orchestrator;
mod report;
mod task;

pub use config::{DependencyPolicy, ExecutionMode, OrchestratorConfig};
pub use context::{ContextExt, ContextStore, INPUT_KEY, SharedContext, result_key};
pub use decider::{Condition, Decider, RuleCheck, RuleDecider, SkipRule};
pub use error::{ExecutionError, OrchestratorError, Result};
pub use executor::{Executor, FnExecutor, Timeout};
pub use orchestrator::TaskOrchestrator;
pub use report::{TaskOutcome, WorkflowReport};
pub use task::{SkipReason, Task, TaskStatus};
