//! ReAct agent: the model reasons, calls tools, and loops until it answers.
//!
//! ```text
//! __start__ -> call_model --(tool calls)--> tools -> call_model
//!                        \--(no tool calls)--> __end__
//! ```

use crate::memory_context::{build_prompt, save_turn, MemoryScope};
use crate::{AgentConfiguration, AgentState, MessagesUpdate, ToolRegistry};
use agent_graph::{CompiledGraph, GraphError, Node, RunContext, StateGraph, END, START};
use agent_types::{ChatModel, MemoryClient, Message, Role};
use async_trait::async_trait;
use std::sync::Arc;

pub const CALL_MODEL: &str = "call_model";
pub const TOOLS: &str = "tools";

pub const OUT_OF_STEPS_REPLY: &str =
    "Sorry, I could not find an answer to your question in the specified number of steps.";

/// Collaborators of the ReAct graph.
#[derive(Clone)]
pub struct AgentDeps {
    pub model: Arc<dyn ChatModel>,
    pub memory: Arc<dyn MemoryClient>,
    pub tools: Arc<ToolRegistry>,
    pub config: AgentConfiguration,
}

struct CallModel {
    deps: AgentDeps,
}

#[async_trait]
impl Node<AgentState> for CallModel {
    async fn run(&self, state: &AgentState, ctx: &RunContext) -> Result<MessagesUpdate, GraphError> {
        let config = self
            .deps
            .config
            .with_overrides(&ctx.configurable)
            .map_err(|e| GraphError::Config(e.to_string()))?;
        let system_message = config.render_system_prompt(chrono::Utc::now());
        let scope = MemoryScope::from(&config);

        let prompt = build_prompt(
            self.deps.memory.as_ref(),
            &scope,
            &state.messages,
            &system_message,
        )
        .await;
        let reply = self
            .deps
            .model
            .invoke(&prompt, &self.deps.tools.specs())
            .await?;

        if ctx.is_last_step() && reply.has_tool_calls() {
            tracing::warn!(step = ctx.step, "out of steps with pending tool calls");
            let mut sorry = Message::assistant(OUT_OF_STEPS_REPLY);
            sorry.id = reply.id;
            return Ok(MessagesUpdate::one(sorry));
        }

        save_turn(
            self.deps.memory.as_ref(),
            &scope,
            state.last_user_message(),
            &reply,
        )
        .await;
        Ok(MessagesUpdate::one(reply))
    }
}

struct ToolsNode {
    tools: Arc<ToolRegistry>,
}

#[async_trait]
impl Node<AgentState> for ToolsNode {
    async fn run(&self, state: &AgentState, _ctx: &RunContext) -> Result<MessagesUpdate, GraphError> {
        let last = state
            .last_message()
            .filter(|m| m.role == Role::Assistant)
            .ok_or_else(|| {
                GraphError::InvalidState("tools node expects an assistant message".to_string())
            })?;

        let mut results = Vec::with_capacity(last.tool_calls.len());
        for call in &last.tool_calls {
            let content = match self.tools.get(&call.name) {
                None => format!(
                    "Error: {} is not a valid tool, try one of [{}].",
                    call.name,
                    self.tools.names().join(", ")
                ),
                Some(tool) => match tool.call(call.arguments.clone()).await {
                    Ok(out) => out,
                    Err(e) => {
                        tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                        format!("Error: {}\n Please fix your mistakes.", e)
                    }
                },
            };
            results.push(Message::tool(call.id.clone(), call.name.clone(), content));
        }
        Ok(MessagesUpdate { messages: results })
    }
}

/// Route to `tools` when the model asked for tool calls, otherwise finish.
pub fn route_model_output(state: &AgentState) -> Result<String, GraphError> {
    let last = state
        .last_message()
        .ok_or_else(|| GraphError::InvalidState("no messages in state".to_string()))?;
    if last.role != Role::Assistant {
        return Err(GraphError::InvalidState(format!(
            "expected assistant message in output edges, but got {}",
            last.role
        )));
    }
    Ok(if last.has_tool_calls() { TOOLS } else { END }.to_string())
}

pub fn build_react_graph(deps: AgentDeps) -> Result<CompiledGraph<AgentState>, GraphError> {
    let tools = Arc::clone(&deps.tools);
    StateGraph::new("ReAct Agent")
        .add_node(CALL_MODEL, CallModel { deps })
        .add_node(TOOLS, ToolsNode { tools })
        .add_edge(START, CALL_MODEL)
        .add_conditional_edges(CALL_MODEL, route_model_output)
        .add_edge(TOOLS, CALL_MODEL)
        .compile()
}
