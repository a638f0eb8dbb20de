//! Wiring shared by the binaries: tracing, memory backend, server state.

use crate::server::AppState;
use agent_core::{build_react_graph, default_tools, AgentConfiguration, AgentDeps, AgentState};
use agent_graph::InMemoryCheckpointer;
use agent_llm::{load_chat_model, ProviderSettings};
use agent_memory::{InMemoryMemoryStore, Mem0Client};
use agent_scheduler::InMemoryRunScheduler;
use agent_types::MemoryClient;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Install the global subscriber. `RUST_LOG` wins; default is `info`.
/// Logs go to stderr so the REPL keeps stdout to itself.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Mem0 when `MEM0_API_KEY` is set, otherwise the process-local store.
pub fn memory_from_env() -> Arc<dyn MemoryClient> {
    match Mem0Client::from_env() {
        Some(client) => {
            tracing::info!("using Mem0 memory backend");
            Arc::new(client)
        }
        None => {
            tracing::warn!("MEM0_API_KEY not set, memories are kept in process only");
            Arc::new(InMemoryMemoryStore::new())
        }
    }
}

/// Build the ReAct graph, checkpointer and run scheduler from the environment.
/// Must be called inside a tokio runtime (the scheduler spawns its worker).
pub fn app_state_from_env() -> Result<Arc<AppState>, BoxError> {
    let config = AgentConfiguration::from_env()?;
    let model = load_chat_model(&config.model, &ProviderSettings::from_env())?;
    let tools = default_tools(&config);
    tracing::info!(model = %config.model, tools = ?tools.names(), "agent configured");

    let graph = build_react_graph(AgentDeps {
        model,
        memory: memory_from_env(),
        tools: Arc::new(tools),
        config,
    })?
    .with_checkpointer(Arc::new(InMemoryCheckpointer::<AgentState>::new()));
    let scheduler = Arc::new(InMemoryRunScheduler::new(graph.clone()));
    Ok(Arc::new(AppState { graph, scheduler }))
}
