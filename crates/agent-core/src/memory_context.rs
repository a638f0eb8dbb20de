//! Memory search and save around a model call.
//!
//! Memory failures never fail a turn: they are logged and the agent carries on
//! without memory context.

use crate::AgentConfiguration;
use agent_types::{
    AddOptions, MemoryClient, MemoryMessage, MemoryRecord, Message, Role, SearchOptions,
};

/// Which user's memory to read and write, and as which agent.
#[derive(Debug, Clone)]
pub struct MemoryScope {
    pub user_id: String,
    pub agent_id: String,
    pub search_limit: usize,
}

impl From<&AgentConfiguration> for MemoryScope {
    fn from(cfg: &AgentConfiguration) -> Self {
        Self {
            user_id: cfg.memory_user_id.clone(),
            agent_id: cfg.agent_id.clone(),
            search_limit: cfg.memory_search_limit,
        }
    }
}

/// Bullet list of memories, or `None` when there are none.
pub fn format_memories(records: &[MemoryRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }
    let lines: Vec<String> = records.iter().map(|r| format!("- {}", r.memory)).collect();
    Some(lines.join("\n"))
}

/// Prompt for the model: optional memory context, the system prompt, then the conversation.
pub async fn build_prompt(
    memory: &dyn MemoryClient,
    scope: &MemoryScope,
    messages: &[Message],
    system_message: &str,
) -> Vec<Message> {
    let query = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("");
    let opts = SearchOptions {
        user_id: scope.user_id.clone(),
        limit: scope.search_limit,
    };

    let mut prompt = Vec::with_capacity(messages.len() + 2);
    match memory.search(query, &opts).await {
        Ok(records) => {
            tracing::info!(query = %query, hits = records.len(), "memory search");
            if let Some(context) = format_memories(&records) {
                prompt.push(Message::system(format!(
                    "Relevant memories for this user:\n{}",
                    context
                )));
            }
        }
        Err(e) => tracing::warn!(error = %e, "memory search failed"),
    }
    prompt.push(Message::system(system_message));
    prompt.extend(messages.iter().cloned());
    prompt
}

/// Save the user's message and the reply as one turn.
pub async fn save_turn(
    memory: &dyn MemoryClient,
    scope: &MemoryScope,
    last_user: Option<&Message>,
    reply: &Message,
) {
    let mut to_save = Vec::with_capacity(2);
    if let Some(user) = last_user {
        to_save.push(MemoryMessage::new(Role::User, user.content.clone()));
    }
    to_save.push(MemoryMessage::new(Role::Assistant, reply.content.clone()));

    let opts = AddOptions {
        user_id: scope.user_id.clone(),
        agent_id: Some(scope.agent_id.clone()),
    };
    match memory.add(&to_save, &opts).await {
        Ok(()) => tracing::info!(user_id = %scope.user_id, saved = to_save.len(), "memory saved"),
        Err(e) => tracing::warn!(error = %e, "memory save failed"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use agent_types::{
        AddOptions, MemoryClient, MemoryError, MemoryMessage, MemoryRecord, SearchOptions,
    };

    /// Memory service that is always down.
    pub struct FailingMemory;

    #[async_trait::async_trait]
    impl MemoryClient for FailingMemory {
        async fn search(
            &self,
            _query: &str,
            _opts: &SearchOptions,
        ) -> Result<Vec<MemoryRecord>, MemoryError> {
            Err(MemoryError::Http("connection refused".into()))
        }

        async fn add(
            &self,
            _messages: &[MemoryMessage],
            _opts: &AddOptions,
        ) -> Result<(), MemoryError> {
            Err(MemoryError::Http("connection refused".into()))
        }

        async fn get_all(&self, _user_id: &str) -> Result<Vec<MemoryRecord>, MemoryError> {
            Err(MemoryError::Http("connection refused".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::FailingMemory;
    use super::*;
    use agent_memory::InMemoryMemoryStore;

    fn scope() -> MemoryScope {
        MemoryScope::from(&AgentConfiguration::default())
    }

    #[tokio::test]
    async fn prompt_leads_with_memory_context() {
        let memory = InMemoryMemoryStore::new();
        memory
            .add(
                &[MemoryMessage::new(Role::User, "My dog is called Biscuit")],
                &AddOptions {
                    user_id: "123".into(),
                    agent_id: None,
                },
            )
            .await
            .unwrap();

        let convo = vec![Message::user("What is my dog called?")];
        let prompt = build_prompt(&memory, &scope(), &convo, "SYS").await;
        assert_eq!(prompt.len(), 3);
        assert_eq!(prompt[0].role, Role::System);
        assert_eq!(
            prompt[0].content,
            "Relevant memories for this user:\n- My dog is called Biscuit"
        );
        assert_eq!(prompt[1].content, "SYS");
        assert_eq!(prompt[2].content, "What is my dog called?");
    }

    #[tokio::test]
    async fn prompt_without_hits_or_with_failure_has_no_context() {
        let convo = vec![Message::user("hello")];
        let empty = build_prompt(&InMemoryMemoryStore::new(), &scope(), &convo, "SYS").await;
        let failed = build_prompt(&FailingMemory, &scope(), &convo, "SYS").await;
        for prompt in [empty, failed] {
            assert_eq!(prompt.len(), 2);
            assert_eq!(prompt[0].content, "SYS");
            assert_eq!(prompt[1].content, "hello");
        }
    }

    #[tokio::test]
    async fn save_turn_stores_user_then_assistant() {
        let memory = InMemoryMemoryStore::new();
        let user = Message::user("I moved to Lisbon");
        save_turn(&memory, &scope(), Some(&user), &Message::assistant("Noted!")).await;
        let all = memory.get_all("123").await.unwrap();
        let pairs: Vec<(Option<&str>, &str)> = all
            .iter()
            .map(|r| (r.role.as_deref(), r.memory.as_str()))
            .collect();
        assert_eq!(
            pairs,
            [(Some("user"), "I moved to Lisbon"), (Some("assistant"), "Noted!")]
        );
        assert_eq!(all[0].metadata["agent_id"], "react-agent");

        // A failing store is tolerated.
        save_turn(&FailingMemory, &scope(), None, &Message::assistant("x")).await;
    }
}
