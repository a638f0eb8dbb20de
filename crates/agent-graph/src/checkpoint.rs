//! Thread-scoped state persistence.

use crate::{GraphError, GraphState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stores the latest state of each conversation thread.
#[async_trait]
pub trait Checkpointer<S: GraphState>: Send + Sync {
    /// Latest state of `thread_id`, or `None` when the thread is unknown.
    async fn get(&self, thread_id: &str) -> Result<Option<S>, GraphError>;

    async fn put(&self, thread_id: &str, state: S) -> Result<(), GraphError>;

    async fn list_threads(&self) -> Result<Vec<String>, GraphError>;
}

/// Process-lifetime checkpointer.
pub struct InMemoryCheckpointer<S> {
    threads: Arc<RwLock<HashMap<String, S>>>,
}

impl<S> InMemoryCheckpointer<S> {
    pub fn new() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<S> Default for InMemoryCheckpointer<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: GraphState> Checkpointer<S> for InMemoryCheckpointer<S> {
    async fn get(&self, thread_id: &str) -> Result<Option<S>, GraphError> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn put(&self, thread_id: &str, state: S) -> Result<(), GraphError> {
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), state);
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>, GraphError> {
        let mut ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
