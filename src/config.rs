//! Orchestrator settings: scheduling mode, dependency policy and digest size.

use serde::{Deserialize, Serialize};

/// How the orchestrator schedules tasks whose dependencies are settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One task at a time, in execution order.
    #[default]
    Sequential,
    /// Waves of mutually independent tasks awaited together.
    Concurrent,
}

/// What to do with dependencies on ids that were never registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPolicy {
    /// Treat unknown ids as already satisfied.
    #[default]
    Permissive,
    /// Reject a task at `add_task` unless all its dependencies are registered.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Characters of each dependency result copied into a dependent's input
    #[serde(default = "default_digest_chars")]
    pub digest_chars: usize,

    #[serde(default)]
    pub mode: ExecutionMode,

    #[serde(default)]
    pub dependency_policy: DependencyPolicy,
}

fn default_digest_chars() -> usize {
    2_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            digest_chars: default_digest_chars(),
            mode: ExecutionMode::default(),
            dependency_policy: DependencyPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_dependency_policy(mut self, policy: DependencyPolicy) -> Self {
        self.dependency_policy = policy;
        self
    }

    pub fn with_digest_chars(mut self, digest_chars: usize) -> Self {
        self.digest_chars = digest_chars;
        self
    }
}
