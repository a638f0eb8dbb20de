//! Scheduler trait: submit a run, get its status.

use agent_core::MessagesUpdate;
use agent_graph::RunConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// A background run on a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub thread_id: String,
    pub status: RunStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_summary: Option<serde_json::Value>,
}

/// Contract: `get_status` returns `Ok(None)` when the run is unknown or belongs to another
/// thread. The API layer maps that to 404.
#[async_trait]
pub trait RunScheduler: Send + Sync {
    /// Queue `input` for `thread_id`; returns the run id immediately.
    async fn submit(
        &self,
        thread_id: &str,
        input: MessagesUpdate,
        config: RunConfig,
    ) -> Result<String, SchedulerError>;

    async fn get_status(&self, thread_id: &str, run_id: &str) -> Result<Option<Run>, SchedulerError>;
}
