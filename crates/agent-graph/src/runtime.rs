//! Compiled graph execution: one node per step, routed by fixed or conditional edges.

use crate::{Checkpointer, GraphError, GraphState, Node, END, START};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) type Router<S> = Arc<dyn Fn(&S) -> Result<String, GraphError> + Send + Sync>;

pub(crate) enum Route<S> {
    Fixed(String),
    Conditional(Router<S>),
}

impl<S> Clone for Route<S> {
    fn clone(&self) -> Self {
        match self {
            Route::Fixed(to) => Route::Fixed(to.clone()),
            Route::Conditional(router) => Route::Conditional(Arc::clone(router)),
        }
    }
}

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Maximum number of node executions in one run.
    pub recursion_limit: usize,
    pub thread_id: Option<String>,
    /// Free-form per-run overrides, visible to nodes through [`RunContext`].
    pub configurable: serde_json::Map<String, serde_json::Value>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 25,
            thread_id: None,
            configurable: serde_json::Map::new(),
        }
    }
}

impl RunConfig {
    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }
}

/// What a node sees about the run it is part of.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Zero-based index of the step being executed.
    pub step: usize,
    pub recursion_limit: usize,
    pub thread_id: Option<String>,
    pub configurable: serde_json::Map<String, serde_json::Value>,
}

impl RunContext {
    pub fn remaining_steps(&self) -> usize {
        self.recursion_limit.saturating_sub(self.step)
    }

    /// True when this step is the last one allowed by the recursion limit.
    pub fn is_last_step(&self) -> bool {
        self.step + 1 >= self.recursion_limit
    }
}

/// Output of one executed node.
#[derive(Debug, Clone)]
pub struct StepEvent<S: GraphState> {
    pub step: usize,
    pub node: String,
    pub update: S::Update,
    /// State after the update was applied.
    pub state: S,
}

struct GraphInner<S: GraphState> {
    name: String,
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    routes: HashMap<String, Route<S>>,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    /// One lock per thread id; thread runs hold it from load to save.
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Immutable, cheaply clonable runnable graph.
pub struct CompiledGraph<S: GraphState> {
    inner: Arc<GraphInner<S>>,
}

impl<S: GraphState> Clone for CompiledGraph<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: GraphState> CompiledGraph<S> {
    pub(crate) fn new(
        name: String,
        nodes: HashMap<String, Arc<dyn Node<S>>>,
        routes: HashMap<String, Route<S>>,
    ) -> Self {
        Self {
            inner: Arc::new(GraphInner {
                name,
                nodes,
                routes,
                checkpointer: None,
                thread_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Attach a checkpointer for thread-scoped runs.
    pub fn with_checkpointer(self, checkpointer: Arc<dyn Checkpointer<S>>) -> Self {
        let inner = match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.checkpointer = Some(checkpointer);
                inner
            }
            Err(shared) => GraphInner {
                name: shared.name.clone(),
                nodes: shared.nodes.clone(),
                routes: shared.routes.clone(),
                checkpointer: Some(checkpointer),
                thread_locks: Mutex::new(HashMap::new()),
            },
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn checkpointer(&self) -> Option<&Arc<dyn Checkpointer<S>>> {
        self.inner.checkpointer.as_ref()
    }

    /// Start a run without executing anything; drive it with [`Execution::next_step`].
    pub fn stream(&self, state: S, config: RunConfig) -> Execution<S> {
        Execution {
            graph: self.clone(),
            state,
            config,
            next: None,
            started: false,
            finished: false,
            step: 0,
        }
    }

    /// Run until the graph reaches `END` and return the final state.
    pub async fn invoke(&self, state: S, config: RunConfig) -> Result<S, GraphError> {
        let mut exec = self.stream(state, config);
        while let Some(event) = exec.next_step().await {
            event?;
        }
        Ok(exec.into_state())
    }

    /// Run against the checkpointed state of `thread_id`: load, apply `input`, run, save.
    /// Runs on the same thread are serialized so none of them is lost.
    pub async fn invoke_thread(
        &self,
        thread_id: &str,
        input: S::Update,
        config: RunConfig,
    ) -> Result<S, GraphError>
    where
        S: Default,
    {
        let checkpointer = self
            .inner
            .checkpointer
            .as_ref()
            .ok_or(GraphError::NoCheckpointer)?;
        let lock = self.thread_lock(thread_id).await;
        let _guard = lock.lock().await;
        let mut state = checkpointer.get(thread_id).await?.unwrap_or_default();
        state.apply(input);
        let final_state = self.invoke(state, config.with_thread(thread_id)).await?;
        checkpointer.put(thread_id, final_state.clone()).await?;
        tracing::info!(graph = %self.inner.name, thread_id = %thread_id, "thread run complete");
        Ok(final_state)
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.inner.thread_locks.lock().await;
        Arc::clone(locks.entry(thread_id.to_string()).or_default())
    }

    fn route_from(&self, from: &str, state: &S) -> Result<String, GraphError> {
        let next = match self.inner.routes.get(from) {
            None => return Ok(END.to_string()),
            Some(Route::Fixed(to)) => to.clone(),
            Some(Route::Conditional(router)) => router(state)?,
        };
        if next != END && !self.inner.nodes.contains_key(&next) {
            return Err(GraphError::UnknownNode(next));
        }
        Ok(next)
    }
}

/// An in-progress run. Nothing executes until the caller asks for the next step.
pub struct Execution<S: GraphState> {
    graph: CompiledGraph<S>,
    state: S,
    config: RunConfig,
    next: Option<String>,
    started: bool,
    finished: bool,
    step: usize,
}

impl<S: GraphState> Execution<S> {
    /// Execute one node. Returns `None` once the run has reached `END` or failed.
    pub async fn next_step(&mut self) -> Option<Result<StepEvent<S>, GraphError>> {
        if self.finished {
            return None;
        }
        if !self.started {
            self.started = true;
            match self.graph.route_from(START, &self.state) {
                Ok(n) => self.next = Some(n),
                Err(e) => return Some(Err(self.fail(e))),
            }
        }
        let node_name = match self.next.take() {
            Some(n) if n != END => n,
            _ => {
                self.finished = true;
                return None;
            }
        };
        if self.step >= self.config.recursion_limit {
            let limit = self.config.recursion_limit;
            return Some(Err(self.fail(GraphError::RecursionLimit(limit))));
        }
        let node = match self.graph.inner.nodes.get(&node_name) {
            Some(n) => Arc::clone(n),
            None => return Some(Err(self.fail(GraphError::UnknownNode(node_name)))),
        };

        let ctx = RunContext {
            step: self.step,
            recursion_limit: self.config.recursion_limit,
            thread_id: self.config.thread_id.clone(),
            configurable: self.config.configurable.clone(),
        };
        tracing::debug!(graph = %self.graph.inner.name, node = %node_name, step = self.step, "running node");
        let update = match node.run(&self.state, &ctx).await {
            Ok(u) => u,
            Err(e) => return Some(Err(self.fail(e))),
        };
        self.state.apply(update.clone());

        match self.graph.route_from(&node_name, &self.state) {
            Ok(n) => self.next = Some(n),
            Err(e) => return Some(Err(self.fail(e))),
        }
        let event = StepEvent {
            step: self.step,
            node: node_name,
            update,
            state: self.state.clone(),
        };
        self.step += 1;
        Some(Ok(event))
    }

    fn fail(&mut self, err: GraphError) -> GraphError {
        self.finished = true;
        tracing::warn!(graph = %self.graph.inner.name, error = %err, "run failed");
        err
    }

    pub fn steps_taken(&self) -> usize {
        self.step
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{node_fn, InMemoryCheckpointer, StateGraph};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Trace {
        visited: Vec<String>,
        count: u32,
    }

    impl GraphState for Trace {
        type Update = (String, u32);

        fn apply(&mut self, (node, n): (String, u32)) {
            self.visited.push(node);
            self.count += n;
        }
    }

    fn bump(name: &'static str) -> impl Node<Trace> {
        node_fn(move |_state: Trace, _ctx: RunContext| async move {
            Ok::<_, GraphError>((name.to_string(), 1u32))
        })
    }

    fn loop_graph(stop_at: u32) -> CompiledGraph<Trace> {
        StateGraph::new("loop")
            .add_node("work", bump("work"))
            .add_node("check", bump("check"))
            .add_edge(START, "work")
            .add_edge("work", "check")
            .add_conditional_edges("check", move |s: &Trace| {
                Ok(if s.count >= stop_at { END } else { "work" }.to_string())
            })
            .compile()
            .unwrap()
    }

    #[tokio::test]
    async fn conditional_edges_loop_until_end() {
        let out = loop_graph(6)
            .invoke(Trace::default(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(out.count, 6);
        assert_eq!(out.visited, ["work", "check", "work", "check", "work", "check"]);
    }

    #[tokio::test]
    async fn recursion_limit_stops_runaway_loop() {
        let err = loop_graph(u32::MAX)
            .invoke(Trace::default(), RunConfig::default().with_recursion_limit(5))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::RecursionLimit(5)));
    }

    #[tokio::test]
    async fn stream_runs_one_node_per_step() {
        let graph = StateGraph::new("self-loop")
            .add_node("chat", bump("chat"))
            .add_edge(START, "chat")
            .add_edge("chat", "chat")
            .compile()
            .unwrap();
        let mut exec = graph.stream(Trace::default(), RunConfig::default());
        let first = exec.next_step().await.unwrap().unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(first.node, "chat");
        assert_eq!(first.state.count, 1);
        // Dropping here leaves the self loop unexecuted.
        assert_eq!(exec.steps_taken(), 1);
    }

    #[tokio::test]
    async fn last_step_is_visible_to_nodes() {
        let graph = StateGraph::new("flags")
            .add_node(
                "n",
                node_fn(|_s: Trace, ctx: RunContext| async move {
                    Ok::<_, GraphError>((format!("last={}", ctx.is_last_step()), 1u32))
                }),
            )
            .add_edge(START, "n")
            .add_conditional_edges("n", |s: &Trace| {
                Ok(if s.visited.last().map(String::as_str) == Some("last=true") {
                    END
                } else {
                    "n"
                }
                .to_string())
            })
            .compile()
            .unwrap();
        let out = graph
            .invoke(Trace::default(), RunConfig::default().with_recursion_limit(3))
            .await
            .unwrap();
        assert_eq!(out.visited, ["last=false", "last=false", "last=true"]);
    }

    #[test]
    fn remaining_steps_counts_down() {
        let ctx = RunContext {
            step: 3,
            recursion_limit: 5,
            thread_id: None,
            configurable: serde_json::Map::new(),
        };
        assert_eq!(ctx.remaining_steps(), 2);
        assert!(!ctx.is_last_step());
        let last = RunContext { step: 4, ..ctx.clone() };
        assert_eq!(last.remaining_steps(), 1);
        assert!(last.is_last_step());
        let past = RunContext { step: 9, ..ctx };
        assert_eq!(past.remaining_steps(), 0);
    }

    #[tokio::test]
    async fn zero_recursion_limit_runs_nothing() {
        let mut exec =
            loop_graph(1).stream(Trace::default(), RunConfig::default().with_recursion_limit(0));
        let err = exec.next_step().await.unwrap().unwrap_err();
        assert!(matches!(err, GraphError::RecursionLimit(0)));
        assert_eq!(exec.steps_taken(), 0);
        assert!(exec.next_step().await.is_none());
    }

    #[tokio::test]
    async fn router_to_unknown_node_fails() {
        let graph = StateGraph::new("bad")
            .add_node("a", bump("a"))
            .add_edge(START, "a")
            .add_conditional_edges("a", |_s: &Trace| Ok("nowhere".to_string()))
            .compile()
            .unwrap();
        let mut exec = graph.stream(Trace::default(), RunConfig::default());
        let err = exec.next_step().await.unwrap().unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(ref n) if n == "nowhere"));
        assert!(exec.next_step().await.is_none());
    }

    #[tokio::test]
    async fn node_without_route_finishes() {
        let graph = StateGraph::new("single")
            .add_node("only", bump("only"))
            .add_edge(START, "only")
            .compile()
            .unwrap();
        let out = graph
            .invoke(Trace::default(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(out.visited, ["only"]);
    }

    #[test]
    fn compile_validates_structure() {
        let missing_start = StateGraph::<Trace>::new("g")
            .add_node("a", bump("a"))
            .compile();
        assert!(matches!(missing_start, Err(GraphError::NoEntryPoint)));

        let dangling = StateGraph::<Trace>::new("g")
            .add_node("a", bump("a"))
            .add_edge(START, "a")
            .add_edge("a", "b")
            .compile();
        assert!(matches!(dangling, Err(GraphError::UnknownNode(ref n)) if n == "b"));

        let dup = StateGraph::<Trace>::new("g")
            .add_node("a", bump("a"))
            .add_node("a", bump("a"))
            .add_edge(START, "a")
            .compile();
        assert!(matches!(dup, Err(GraphError::DuplicateNode(_))));

        let reserved = StateGraph::<Trace>::new("g")
            .add_node(END, bump("x"))
            .compile();
        assert!(matches!(reserved, Err(GraphError::ReservedName(_))));

        let two_routes = StateGraph::<Trace>::new("g")
            .add_node("a", bump("a"))
            .add_edge(START, "a")
            .add_edge("a", END)
            .add_edge("a", "a")
            .compile();
        assert!(matches!(two_routes, Err(GraphError::DuplicateRoute(_))));
    }

    #[tokio::test]
    async fn invoke_thread_resumes_checkpoint() {
        let graph = StateGraph::new("single")
            .add_node("only", bump("only"))
            .add_edge(START, "only")
            .compile()
            .unwrap()
            .with_checkpointer(Arc::new(InMemoryCheckpointer::<Trace>::new()));

        let input = ("input".to_string(), 10);
        let first = graph
            .invoke_thread("t1", input.clone(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(first.count, 11);
        let second = graph
            .invoke_thread("t1", input, RunConfig::default())
            .await
            .unwrap();
        assert_eq!(second.count, 22);
        assert_eq!(second.visited, ["input", "only", "input", "only"]);

        let stored = graph.checkpointer().unwrap().get("t1").await.unwrap();
        assert_eq!(stored, Some(second));
    }

    #[tokio::test]
    async fn concurrent_thread_runs_keep_both_turns() {
        let slow = node_fn(|_s: Trace, _ctx: RunContext| async move {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            Ok::<_, GraphError>(("reply".to_string(), 1u32))
        });
        let graph = StateGraph::new("slow")
            .add_node("reply", slow)
            .add_edge(START, "reply")
            .compile()
            .unwrap()
            .with_checkpointer(Arc::new(InMemoryCheckpointer::<Trace>::new()));

        let (a, b) = tokio::join!(
            graph.invoke_thread("t", ("first".to_string(), 0), RunConfig::default()),
            graph.invoke_thread("t", ("second".to_string(), 0), RunConfig::default()),
        );
        a.unwrap();
        b.unwrap();

        let stored = graph.checkpointer().unwrap().get("t").await.unwrap().unwrap();
        assert_eq!(stored.visited.len(), 4);
        assert_eq!(stored.count, 2);
        assert!(stored.visited.contains(&"first".to_string()));
        assert!(stored.visited.contains(&"second".to_string()));
    }

    #[tokio::test]
    async fn invoke_thread_without_checkpointer_fails() {
        let graph = loop_graph(1);
        let err = graph
            .invoke_thread("t", ("x".to_string(), 0), RunConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::NoCheckpointer));
    }
}
