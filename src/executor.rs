//! The unit of work a task delegates to.
//!
//! In a persona host an executor is usually an LLM agent; the orchestrator
//! only sees text in and text out.

use crate::error::ExecutionError;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

/// Trait that all task executors must implement
#[async_trait::async_trait]
pub trait Executor: Send + Sync + Debug {
    /// Run the unit of work on the assembled input text
    async fn execute(&self, input: &str) -> Result<String, ExecutionError>;
}

/// Executor backed by an async closure
pub struct FnExecutor<F> {
    f: F,
}

impl<F, Fut> FnExecutor<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ExecutionError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Debug for FnExecutor<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FnExecutor(<function>)")
    }
}

#[async_trait::async_trait]
impl<F, Fut> Executor for FnExecutor<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, ExecutionError>> + Send + 'static,
{
    async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
        (self.f)(input.to_string()).await
    }
}

/// Bounds the latency of an inner executor.
///
/// The orchestrator never imposes a timeout of its own; wrap executors with
/// this when a run must not hang on a slow agent.
#[derive(Debug)]
pub struct Timeout<E> {
    inner: E,
    limit: Duration,
}

impl<E: Executor> Timeout<E> {
    pub fn new(inner: E, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait::async_trait]
impl<E: Executor> Executor for Timeout<E> {
    async fn execute(&self, input: &str) -> Result<String, ExecutionError> {
        tokio::time::timeout(self.limit, self.inner.execute(input))
            .await
            .map_err(|_| ExecutionError::Timeout(self.limit))?
    }
}
