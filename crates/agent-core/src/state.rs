//! Conversation state shared by the agent graphs.

use agent_graph::GraphState;
use agent_types::{Message, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Messages to merge into the state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagesUpdate {
    pub messages: Vec<Message>,
}

impl MessagesUpdate {
    pub fn one(message: Message) -> Self {
        Self {
            messages: vec![message],
        }
    }
}

impl AgentState {
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut state = Self::default();
        state.apply(MessagesUpdate { messages });
        state
    }

    pub fn last_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl GraphState for AgentState {
    type Update = MessagesUpdate;

    /// Append messages; a message whose id is already present replaces the old one in place.
    fn apply(&mut self, update: MessagesUpdate) {
        for mut message in update.messages {
            let id = message
                .id
                .get_or_insert_with(|| Uuid::new_v4().to_string())
                .clone();
            match self
                .messages
                .iter()
                .position(|m| m.id.as_deref() == Some(id.as_str()))
            {
                Some(pos) => self.messages[pos] = message,
                None => self.messages.push(message),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_ids_and_appends() {
        let state = AgentState::from_messages(vec![Message::user("a"), Message::user("b")]);
        assert_eq!(state.messages.len(), 2);
        assert!(state.messages.iter().all(|m| m.id.is_some()));
        assert_ne!(state.messages[0].id, state.messages[1].id);
    }

    #[test]
    fn same_id_replaces_in_place() {
        let mut state = AgentState::from_messages(vec![
            Message::user("q").with_id("1"),
            Message::assistant("draft").with_id("2"),
            Message::user("next").with_id("3"),
        ]);
        state.apply(MessagesUpdate::one(Message::assistant("final").with_id("2")));
        let contents: Vec<&str> = state.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["q", "final", "next"]);
    }

    #[test]
    fn last_user_message_skips_other_roles() {
        let state = AgentState::from_messages(vec![
            Message::user("first"),
            Message::assistant("reply"),
            Message::tool("c1", "search", "[]"),
        ]);
        assert_eq!(state.last_user_message().unwrap().content, "first");
        assert!(AgentState::default().last_user_message().is_none());
    }
}
