//! State graph runtime: build a graph of async nodes, compile it, and run it step by step.

mod builder;
mod checkpoint;
mod error;
mod runtime;

pub use builder::{node_fn, FnNode, Node, StateGraph};
pub use checkpoint::{Checkpointer, InMemoryCheckpointer};
pub use error::GraphError;
pub use runtime::{CompiledGraph, Execution, RunConfig, RunContext, StepEvent};

/// Virtual entry node.
pub const START: &str = "__start__";
/// Virtual exit node.
pub const END: &str = "__end__";

/// Graph state with its reducer.
pub trait GraphState: Clone + Send + Sync + 'static {
    /// Partial update returned by a node.
    type Update: Clone + Send + Sync + 'static;

    /// Merge a node's update into the state.
    fn apply(&mut self, update: Self::Update);
}
