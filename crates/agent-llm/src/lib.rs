//! OpenAI-compatible chat model client.

#[cfg(feature = "test-util")]
pub mod mock;
mod model;
mod openai;

pub use agent_types::{ChatModel, ChatModelError};
pub use model::{load_chat_model, ModelSpec, ProviderSettings};
pub use openai::OpenAiChatModel;

#[cfg(feature = "test-util")]
pub use mock::ScriptedChatModel;
