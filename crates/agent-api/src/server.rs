//! Axum server and routes.

use agent_core::{AgentState, MessagesUpdate};
use agent_graph::{CompiledGraph, GraphState, RunConfig};
use agent_scheduler::{Run, RunScheduler};
use agent_types::{Message, Role};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub struct AppState {
    /// ReAct graph with a checkpointer attached.
    pub graph: CompiledGraph<AgentState>,
    pub scheduler: Arc<dyn RunScheduler + Send + Sync>,
}

/// Response envelope. HTTP status is always 200; `code` carries the outcome.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Json<Self> {
        Json(Self {
            code: 200,
            message: "Success".to_string(),
            data: Some(data),
        })
    }

    fn error(code: i32, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            code,
            message: message.into(),
            data: None,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ThreadCreated {
    pub thread_id: String,
}

#[derive(Debug, Serialize)]
pub struct ThreadValues {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct RunSubmitted {
    pub run_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InputMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct RunInput {
    #[serde(default)]
    pub messages: Vec<InputMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunConfigBody {
    #[serde(default)]
    pub recursion_limit: Option<usize>,
    #[serde(default)]
    pub configurable: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub input: RunInput,
    #[serde(default)]
    pub config: Option<RunConfigBody>,
}

impl RunRequest {
    /// Validate input messages and build the run config.
    fn into_parts(self) -> Result<(MessagesUpdate, RunConfig), String> {
        if self.input.messages.is_empty() {
            return Err("input.messages must not be empty".to_string());
        }
        let mut messages = Vec::with_capacity(self.input.messages.len());
        for m in self.input.messages {
            let role = match Role::parse(&m.role) {
                Some(r @ (Role::User | Role::Assistant | Role::System)) => r,
                _ => return Err(format!("unsupported message role: {}", m.role)),
            };
            messages.push(Message::new(role, m.content));
        }
        let mut config = RunConfig::default();
        if let Some(body) = self.config {
            if let Some(limit) = body.recursion_limit {
                if limit == 0 {
                    return Err("config.recursion_limit must be at least 1".to_string());
                }
                config.recursion_limit = limit;
            }
            if let Some(c) = body.configurable {
                config.configurable = c;
            }
        }
        Ok((MessagesUpdate { messages }, config))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ok", get(handle_health))
        .route("/health", get(handle_health))
        .route("/threads", post(handle_create_thread))
        .route("/threads/:thread_id/state", get(handle_thread_state))
        .route("/threads/:thread_id/runs", post(handle_submit_run))
        .route("/threads/:thread_id/runs/wait", post(handle_thread_run_wait))
        .route("/threads/:thread_id/runs/:run_id", get(handle_run_status))
        .route("/runs/wait", post(handle_stateless_run_wait))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn thread_exists(state: &AppState, thread_id: &str) -> Result<bool, String> {
    let Some(checkpointer) = state.graph.checkpointer() else {
        return Err("graph has no checkpointer".to_string());
    };
    checkpointer
        .get(thread_id)
        .await
        .map(|s| s.is_some())
        .map_err(|e| e.to_string())
}

async fn handle_create_thread(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ThreadCreated>> {
    let Some(checkpointer) = state.graph.checkpointer() else {
        return ApiResponse::error(500, "graph has no checkpointer");
    };
    let thread_id = Uuid::new_v4().to_string();
    match checkpointer.put(&thread_id, AgentState::default()).await {
        Ok(()) => {
            tracing::info!(thread_id = %thread_id, "thread created");
            ApiResponse::success(ThreadCreated { thread_id })
        }
        Err(e) => ApiResponse::error(500, e.to_string()),
    }
}

async fn handle_thread_state(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Json<ApiResponse<ThreadValues>> {
    let Some(checkpointer) = state.graph.checkpointer() else {
        return ApiResponse::error(500, "graph has no checkpointer");
    };
    match checkpointer.get(&thread_id).await {
        Ok(Some(s)) => ApiResponse::success(ThreadValues {
            messages: s.messages,
        }),
        Ok(None) => ApiResponse::error(404, "Thread not found"),
        Err(e) => ApiResponse::error(500, e.to_string()),
    }
}

async fn handle_thread_run_wait(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(req): Json<RunRequest>,
) -> Json<ApiResponse<ThreadValues>> {
    let (input, config) = match req.into_parts() {
        Ok(p) => p,
        Err(msg) => return ApiResponse::error(400, msg),
    };
    match thread_exists(&state, &thread_id).await {
        Ok(true) => {}
        Ok(false) => return ApiResponse::error(404, "Thread not found"),
        Err(e) => return ApiResponse::error(500, e),
    }
    match state.graph.invoke_thread(&thread_id, input, config).await {
        Ok(s) => ApiResponse::success(ThreadValues {
            messages: s.messages,
        }),
        Err(e) => ApiResponse::error(500, e.to_string()),
    }
}

async fn handle_stateless_run_wait(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RunRequest>,
) -> Json<ApiResponse<ThreadValues>> {
    let (input, config) = match req.into_parts() {
        Ok(p) => p,
        Err(msg) => return ApiResponse::error(400, msg),
    };
    let mut initial = AgentState::default();
    initial.apply(input);
    match state.graph.invoke(initial, config).await {
        Ok(s) => ApiResponse::success(ThreadValues {
            messages: s.messages,
        }),
        Err(e) => ApiResponse::error(500, e.to_string()),
    }
}

async fn handle_submit_run(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(req): Json<RunRequest>,
) -> Json<ApiResponse<RunSubmitted>> {
    let (input, config) = match req.into_parts() {
        Ok(p) => p,
        Err(msg) => return ApiResponse::error(400, msg),
    };
    match thread_exists(&state, &thread_id).await {
        Ok(true) => {}
        Ok(false) => return ApiResponse::error(404, "Thread not found"),
        Err(e) => return ApiResponse::error(500, e),
    }
    match state.scheduler.submit(&thread_id, input, config).await {
        Ok(run_id) => {
            tracing::info!(run_id = %run_id, thread_id = %thread_id, "run submitted");
            ApiResponse::success(RunSubmitted { run_id })
        }
        Err(e) => ApiResponse::error(500, e.to_string()),
    }
}

async fn handle_run_status(
    State(state): State<Arc<AppState>>,
    Path((thread_id, run_id)): Path<(String, String)>,
) -> Json<ApiResponse<Run>> {
    match state.scheduler.get_status(&thread_id, &run_id).await {
        Ok(Some(run)) => ApiResponse::success(run),
        Ok(None) => ApiResponse::error(404, "Run not found"),
        Err(e) => ApiResponse::error(500, e.to_string()),
    }
}

async fn handle_health() -> &'static str {
    "ok"
}
