use std::time::Duration;
use thiserror::Error;

/// Structural errors raised while configuring or driving an orchestrator.
///
/// Executor failures never show up here; they are recorded on the task.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("circular dependency detected involving task {task_id} ({})", .cycle.join(" -> "))]
    CircularDependency { task_id: String, cycle: Vec<String> },
    #[error("Task already registered: {0}")]
    DuplicateTask(String),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Task {task_id} cannot depend on itself")]
    SelfDependency { task_id: String },
    #[error("Task {task_id} lists dependency {dependency} more than once")]
    DuplicateDependency { task_id: String, dependency: String },
    #[error("Task {task_id} depends on unknown task {dependency}")]
    UnknownDependency { task_id: String, dependency: String },
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Failure reported by an executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("{0}")]
    Failed(String),
    #[error("executor timed out after {0:?}")]
    Timeout(Duration),
}

impl ExecutionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::CircularDependency {
            task_id: "a".to_string(),
            cycle: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "circular dependency detected involving task a (a -> b -> a)"
        );
        assert_eq!(
            ExecutionError::Timeout(Duration::from_millis(50)).to_string(),
            "executor timed out after 50ms"
        );
        assert_eq!(ExecutionError::failed("boom").to_string(), "boom");
    }
}
