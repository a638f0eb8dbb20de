use agent_types::{ChatModelError, MemoryError, ToolError};

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph has no edge from __start__")]
    NoEntryPoint,
    #[error("node already exists: {0}")]
    DuplicateNode(String),
    #[error("reserved node name: {0}")]
    ReservedName(String),
    #[error("node already has an outgoing edge: {0}")]
    DuplicateRoute(String),
    #[error("unknown node: {0}")]
    UnknownNode(String),
    #[error("recursion limit of {0} reached without hitting a stop condition")]
    RecursionLimit(usize),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("no checkpointer configured")]
    NoCheckpointer,
    #[error("configuration: {0}")]
    Config(String),
    #[error("model: {0}")]
    Model(#[from] ChatModelError),
    #[error("memory: {0}")]
    Memory(#[from] MemoryError),
    #[error("tool: {0}")]
    Tool(#[from] ToolError),
}
