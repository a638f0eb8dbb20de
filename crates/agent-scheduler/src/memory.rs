//! In-memory scheduler: single queue + one worker, run state in a map.

use crate::{Run, RunScheduler, RunStatus, SchedulerError};
use agent_core::{AgentState, MessagesUpdate};
use agent_graph::{CompiledGraph, RunConfig};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

struct Job {
    run_id: String,
    thread_id: String,
    input: MessagesUpdate,
    config: RunConfig,
}

/// Queues runs; one worker executes them in order against the graph's checkpointed threads.
pub struct InMemoryRunScheduler {
    runs: Arc<RwLock<HashMap<String, Run>>>,
    tx: mpsc::UnboundedSender<Job>,
}

impl InMemoryRunScheduler {
    /// Create the scheduler and spawn its worker. The graph must have a checkpointer.
    pub fn new(graph: CompiledGraph<AgentState>) -> Self {
        let runs: Arc<RwLock<HashMap<String, Run>>> = Arc::new(RwLock::new(HashMap::new()));
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let runs_worker = Arc::clone(&runs);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                set_status(&runs_worker, &job.run_id, RunStatus::Running, None).await;
                let result = graph
                    .invoke_thread(&job.thread_id, job.input, job.config)
                    .await;
                let (status, summary) = match result {
                    Ok(state) => {
                        let last = state.last_message().map(|m| m.content.clone());
                        tracing::info!(run_id = %job.run_id, thread_id = %job.thread_id, "run done");
                        (
                            RunStatus::Done,
                            serde_json::json!({
                                "messages": state.messages.len(),
                                "last_message": last,
                            }),
                        )
                    }
                    Err(e) => {
                        tracing::warn!(run_id = %job.run_id, error = %e, "run failed");
                        (
                            RunStatus::Failed,
                            serde_json::json!({ "error": e.to_string() }),
                        )
                    }
                };
                set_status(&runs_worker, &job.run_id, status, Some(summary)).await;
            }
        });

        Self { runs, tx }
    }
}

async fn set_status(
    runs: &RwLock<HashMap<String, Run>>,
    run_id: &str,
    status: RunStatus,
    summary: Option<serde_json::Value>,
) {
    let mut guard = runs.write().await;
    if let Some(run) = guard.get_mut(run_id) {
        run.status = status;
        run.updated_at = Utc::now().to_rfc3339();
        if summary.is_some() {
            run.result_summary = summary;
        }
    }
}

#[async_trait]
impl RunScheduler for InMemoryRunScheduler {
    async fn submit(
        &self,
        thread_id: &str,
        input: MessagesUpdate,
        config: RunConfig,
    ) -> Result<String, SchedulerError> {
        let run_id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let run = Run {
            run_id: run_id.clone(),
            thread_id: thread_id.to_string(),
            status: RunStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
            result_summary: None,
        };
        self.runs.write().await.insert(run_id.clone(), run);
        self.tx
            .send(Job {
                run_id: run_id.clone(),
                thread_id: thread_id.to_string(),
                input,
                config,
            })
            .map_err(|_| SchedulerError::Other("worker channel closed".to_string()))?;
        Ok(run_id)
    }

    async fn get_status(&self, thread_id: &str, run_id: &str) -> Result<Option<Run>, SchedulerError> {
        let guard = self.runs.read().await;
        Ok(guard
            .get(run_id)
            .filter(|r| r.thread_id == thread_id)
            .cloned())
    }
}
