//! Graph builder: nodes and edges, validated by `compile`.

use crate::runtime::{CompiledGraph, Route, Router};
use crate::{GraphError, GraphState, RunContext, END, START};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// One step of work in the graph.
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    async fn run(&self, state: &S, ctx: &RunContext) -> Result<S::Update, GraphError>;
}

/// Node backed by an async closure over an owned snapshot of the state.
pub struct FnNode<F>(F);

/// Wrap an async closure `(state, ctx) -> Result<Update>` as a node.
pub fn node_fn<F>(f: F) -> FnNode<F> {
    FnNode(f)
}

#[async_trait]
impl<S, F, Fut> Node<S> for FnNode<F>
where
    S: GraphState,
    F: Fn(S, RunContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S::Update, GraphError>> + Send + 'static,
{
    async fn run(&self, state: &S, ctx: &RunContext) -> Result<S::Update, GraphError> {
        (self.0)(state.clone(), ctx.clone()).await
    }
}

/// Mutable graph definition.
pub struct StateGraph<S: GraphState> {
    name: String,
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    routes: HashMap<String, Route<S>>,
    errors: Vec<GraphError>,
}

impl<S: GraphState> StateGraph<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: HashMap::new(),
            routes: HashMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_node(mut self, name: impl Into<String>, node: impl Node<S> + 'static) -> Self {
        let name = name.into();
        if name == START || name == END {
            self.errors.push(GraphError::ReservedName(name));
        } else if self.nodes.contains_key(&name) {
            self.errors.push(GraphError::DuplicateNode(name));
        } else {
            self.nodes.insert(name, Arc::new(node));
        }
        self
    }

    pub fn add_edge(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.add_route(from.into(), Route::Fixed(to.into()))
    }

    /// Route out of `from` by calling `router` on the state after `from` runs.
    /// The router returns a node name or [`END`].
    pub fn add_conditional_edges<R>(self, from: impl Into<String>, router: R) -> Self
    where
        R: Fn(&S) -> Result<String, GraphError> + Send + Sync + 'static,
    {
        let router: Router<S> = Arc::new(router);
        self.add_route(from.into(), Route::Conditional(router))
    }

    fn add_route(mut self, from: String, route: Route<S>) -> Self {
        if from == END {
            self.errors.push(GraphError::ReservedName(from));
        } else if self.routes.contains_key(&from) {
            self.errors.push(GraphError::DuplicateRoute(from));
        } else {
            self.routes.insert(from, route);
        }
        self
    }

    /// Validate and freeze the graph.
    pub fn compile(mut self) -> Result<CompiledGraph<S>, GraphError> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        if !self.routes.contains_key(START) {
            return Err(GraphError::NoEntryPoint);
        }
        // Deterministic order so the first reported problem is stable.
        let mut sources: Vec<&String> = self.routes.keys().collect();
        sources.sort();
        for from in sources {
            if from != START && !self.nodes.contains_key(from) {
                return Err(GraphError::UnknownNode(from.clone()));
            }
            if let Route::Fixed(ref to) = self.routes[from] {
                if to != END && !self.nodes.contains_key(to) {
                    return Err(GraphError::UnknownNode(to.clone()));
                }
            }
        }
        tracing::debug!(graph = %self.name, nodes = self.nodes.len(), "graph compiled");
        Ok(CompiledGraph::new(self.name, self.nodes, self.routes))
    }
}
