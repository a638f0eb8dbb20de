//! Scripted chat model for tests: queued replies, no network.

use agent_types::{ChatModel, ChatModelError, Message, ToolSpec};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded `invoke` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
}

/// Chat model that replays queued responses in order and records every request.
#[derive(Default)]
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<Result<Message, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedChatModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: impl IntoIterator<Item = Message>) -> Self {
        let model = Self::new();
        for r in replies {
            model.push_reply(r);
        }
        model
    }

    pub fn push_reply(&self, reply: Message) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Err(message.into()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChatModel for ScriptedChatModel {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ChatModelError> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(ChatModelError::Api(e)),
            None => Err(ChatModelError::Other("no scripted reply left".to_string())),
        }
    }
}
