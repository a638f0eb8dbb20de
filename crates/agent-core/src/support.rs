//! Customer support chatbot: every turn replays the user's memory history to the model.

use crate::memory_context::{save_turn, MemoryScope};
use crate::{AgentState, MessagesUpdate};
use agent_graph::{CompiledGraph, GraphError, GraphState, Node, RunConfig, RunContext, StateGraph, START};
use agent_types::{ChatModel, MemoryClient, Message, Role};
use async_trait::async_trait;
use std::sync::Arc;

pub const CHATBOT: &str = "chatbot";
pub const SUPPORT_AGENT_ID: &str = "langgraph-agent";
pub const GREETING: &str = "Welcome to Customer Support! How can I assist you today?";
pub const FAREWELL: &str = "Thank you for contacting us. Have a great day!";

#[derive(Clone)]
pub struct SupportDeps {
    pub model: Arc<dyn ChatModel>,
    pub memory: Arc<dyn MemoryClient>,
    pub user_id: String,
}

struct Chatbot {
    deps: SupportDeps,
}

fn history_to_messages(records: Vec<agent_types::MemoryRecord>) -> Vec<Message> {
    records
        .into_iter()
        .filter_map(|r| match r.role.as_deref().and_then(Role::parse) {
            Some(Role::User) => Some(Message::user(r.memory)),
            Some(Role::Assistant) => Some(Message::assistant(r.memory)),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl Node<AgentState> for Chatbot {
    async fn run(&self, state: &AgentState, _ctx: &RunContext) -> Result<MessagesUpdate, GraphError> {
        let mut prompt = match self.deps.memory.get_all(&self.deps.user_id).await {
            Ok(records) => history_to_messages(records),
            Err(e) => {
                tracing::warn!(error = %e, "memory history unavailable");
                Vec::new()
            }
        };
        prompt.extend(state.messages.iter().cloned());

        let reply = self.deps.model.invoke(&prompt, &[]).await?;

        let scope = MemoryScope {
            user_id: self.deps.user_id.clone(),
            agent_id: SUPPORT_AGENT_ID.to_string(),
            search_limit: 0,
        };
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

/// `chatbot` loops back on itself; callers stream and stop after the first step.
pub fn build_support_graph(deps: SupportDeps) -> Result<CompiledGraph<AgentState>, GraphError> {
    StateGraph::new("Customer Support")
        .add_node(CHATBOT, Chatbot { deps })
        .add_edge(START, CHATBOT)
        .add_edge(CHATBOT, CHATBOT)
        .compile()
}

pub fn is_exit_command(input: &str) -> bool {
    matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "quit" | "exit" | "bye"
    )
}

/// One support conversation. Each turn starts from a fresh state; continuity comes from memory.
pub struct SupportSession {
    graph: CompiledGraph<AgentState>,
    user_id: String,
}

impl SupportSession {
    pub fn new(deps: SupportDeps) -> Result<Self, GraphError> {
        let user_id = deps.user_id.clone();
        Ok(Self {
            graph: build_support_graph(deps)?,
            user_id,
        })
    }

    /// Run one turn and return the reply text.
    pub async fn respond(&self, input: &str) -> Result<String, GraphError> {
        let mut state = AgentState::default();
        state.apply(MessagesUpdate::one(Message::user(input)));
        let config = RunConfig::default().with_thread(self.user_id.clone());

        let mut exec = self.graph.stream(state, config);
        let event = exec
            .next_step()
            .await
            .ok_or_else(|| GraphError::InvalidState("graph produced no step".to_string()))??;
        event
            .update
            .messages
            .last()
            .map(|m| m.content.clone())
            .ok_or_else(|| GraphError::InvalidState("chatbot returned no message".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_context::test_support::FailingMemory;
    use agent_llm::ScriptedChatModel;
    use agent_memory::InMemoryMemoryStore;

    fn session(model: Arc<ScriptedChatModel>, memory: Arc<dyn MemoryClient>) -> SupportSession {
        SupportSession::new(SupportDeps {
            model,
            memory,
            user_id: "123".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn exit_commands() {
        for s in ["quit", "EXIT", "  Bye \n"] {
            assert!(is_exit_command(s), "{s:?}");
        }
        for s in ["goodbye", "", "quit now"] {
            assert!(!is_exit_command(s), "{s:?}");
        }
    }

    #[tokio::test]
    async fn turns_replay_history_from_memory() {
        let model = Arc::new(ScriptedChatModel::with_replies([
            Message::assistant("Sorry to hear that. What is your order number?"),
            Message::assistant("Thanks, order 4411 is on its way."),
        ]));
        let memory = Arc::new(InMemoryMemoryStore::new());
        let chat = session(model.clone(), memory.clone());

        let first = chat.respond("My package is late").await.unwrap();
        assert_eq!(first, "Sorry to hear that. What is your order number?");
        let second = chat.respond("It is 4411").await.unwrap();
        assert_eq!(second, "Thanks, order 4411 is on its way.");

        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].messages.len(), 1);
        assert!(calls[0].tools.is_empty());
        let replayed: Vec<(Role, &str)> = calls[1]
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            replayed,
            [
                (Role::User, "My package is late"),
                (Role::Assistant, "Sorry to hear that. What is your order number?"),
                (Role::User, "It is 4411"),
            ]
        );

        let saved = memory.get_all("123").await.unwrap();
        assert_eq!(saved.len(), 4);
        assert_eq!(saved[3].metadata["agent_id"], SUPPORT_AGENT_ID);
    }

    #[tokio::test]
    async fn history_failure_falls_back_to_session() {
        let model = Arc::new(ScriptedChatModel::with_replies([Message::assistant("Hello!")]));
        let chat = session(model.clone(), Arc::new(FailingMemory));
        assert_eq!(chat.respond("hi").await.unwrap(), "Hello!");
        assert_eq!(model.calls()[0].messages.len(), 1);
    }

    #[test]
    fn history_skips_unknown_roles() {
        let records = vec![
            agent_types::MemoryRecord {
                id: "1".into(),
                memory: "a fact".into(),
                role: None,
                score: None,
                metadata: Default::default(),
            },
            agent_types::MemoryRecord {
                id: "2".into(),
                memory: "hi".into(),
                role: Some("user".into()),
                score: None,
                metadata: Default::default(),
            },
        ];
        let msgs = history_to_messages(records);
        assert_eq!(msgs, vec![Message::user("hi")]);
    }
}
