//! Memory-backed agents built on the state graph runtime.
//!
//! - [`react`]: reasoning-and-action loop with tool calling and memory context
//! - [`support`]: customer support chatbot that replays the user's memory history
//! - [`memory_context`]: memory search/save helpers shared by both graphs

pub mod configuration;
pub mod memory_context;
pub mod react;
pub mod state;
pub mod support;
pub mod tools;

pub use configuration::{AgentConfiguration, ConfigError};
pub use react::{build_react_graph, route_model_output, AgentDeps};
pub use state::{AgentState, MessagesUpdate};
pub use support::{build_support_graph, is_exit_command, SupportDeps, SupportSession};
pub use tools::{default_tools, ToolRegistry, WebSearchTool};
