//! Shared key-value context passed between the tasks of one workflow run.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Key under which the workflow's initial text is stored.
pub const INPUT_KEY: &str = "input";

/// Key under which a completed task publishes its result.
pub fn result_key(task_id: &str) -> String {
    format!("{}_result", task_id)
}

/// String key-value store for sharing data between tasks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextStore {
    values: HashMap<String, String>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, overwriting any previous one
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> Vec<&String> {
        self.values.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The workflow input, if one was seeded
    pub fn input(&self) -> Option<&str> {
        self.get(INPUT_KEY)
    }

    /// The published result of a completed task
    pub fn result(&self, task_id: &str) -> Option<&str> {
        self.get(&result_key(task_id))
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.values
    }
}

/// A shared context that the orchestrator and its host can both observe
pub type SharedContext = Arc<RwLock<ContextStore>>;

/// Extension trait for SharedContext that hides lock handling
#[async_trait::async_trait]
pub trait ContextExt {
    async fn set(&self, key: impl Into<String> + Send, value: impl Into<String> + Send);

    async fn get(&self, key: &str) -> Option<String>;

    async fn get_or_default(&self, key: &str) -> String;

    async fn contains_key(&self, key: &str) -> bool;

    async fn keys(&self) -> Vec<String>;

    /// Copy of the whole store at this point in time
    async fn snapshot(&self) -> HashMap<String, String>;

    /// Execute a closure with read access to the context
    async fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ContextStore) -> R + Send,
        R: Send;
}

#[async_trait::async_trait]
impl ContextExt for SharedContext {
    async fn set(&self, key: impl Into<String> + Send, value: impl Into<String> + Send) {
        let mut ctx = self.write().await;
        ctx.set(key, value);
    }

    async fn get(&self, key: &str) -> Option<String> {
        let ctx = self.read().await;
        ctx.get(key).map(str::to_string)
    }

    async fn get_or_default(&self, key: &str) -> String {
        self.get(key).await.unwrap_or_default()
    }

    async fn contains_key(&self, key: &str) -> bool {
        let ctx = self.read().await;
        ctx.contains_key(key)
    }

    async fn keys(&self) -> Vec<String> {
        let ctx = self.read().await;
        ctx.keys().into_iter().cloned().collect()
    }

    async fn snapshot(&self) -> HashMap<String, String> {
        let ctx = self.read().await;
        ctx.as_map().clone()
    }

    async fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ContextStore) -> R + Send,
        R: Send,
    {
        let ctx = self.read().await;
        f(&*ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_accessors() {
        let mut store = ContextStore::new();
        assert!(store.is_empty());

        store.set(INPUT_KEY, "review PR #6");
        store.set(result_key("fetch"), "diff");

        assert_eq!(store.input(), Some("review PR #6"));
        assert_eq!(store.result("fetch"), Some("diff"));
        assert_eq!(store.get("fetch_result"), Some("diff"));
        assert_eq!(store.result("missing"), None);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_shared_context_ext() {
        let ctx: SharedContext = Arc::new(RwLock::new(ContextStore::new()));

        ctx.set("a", "1").await;
        ctx.set("a", "2").await;

        assert_eq!(ctx.get("a").await.as_deref(), Some("2"));
        assert_eq!(ctx.get_or_default("b").await, "");
        assert!(ctx.contains_key("a").await);
        assert_eq!(ctx.keys().await, vec!["a".to_string()]);

        let len = ctx.with_read(|store| store.len()).await;
        assert_eq!(len, 1);
        assert_eq!(ctx.snapshot().await.get("a").map(String::as_str), Some("2"));
    }
}
