//! Persistence-backed driver around [`Flow`]
//!
//! A [`Pipe`] binds a flow name, a graph and a [`Store`]. Every run it starts gets a
//! persistence observer that writes the full [`ExecutionState`] after each node
//! execution, each edge resolution and at graph end, so a paused run can be picked up
//! from the store by a later process.
//!
//! - [`Pipe::invoke`] starts a fresh run under an instance id, overwriting whatever
//!   was stored for it.
//! - [`Pipe::resume`] loads the stored state, validates the supplied answers against
//!   the pending interrupt and re-enters the graph at the interrupting node.
//!
//! ```rust
//! use flowgraph_core::{
//!     interrupt, node_fn, ExecutionContext, GraphBuilder, Noop, Pipe, Requirement,
//!     Requirements, ResumeConfig,
//! };
//! use flowgraph_checkpoint::InMemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> flowgraph_core::Result<()> {
//! let graph = GraphBuilder::<String>::new()
//!     .add_node("ask", node_fn(|ctx, greeting: &mut String| {
//!         let answers = interrupt(ctx, "Who?", "input", Requirements::new().with("name", Requirement::custom()))?;
//!         *greeting = format!("hello {}", answers["name"]);
//!         Ok(())
//!     }))
//!     .add_node("end", Noop)
//!     .add_edge("ask", "end")
//!     .set_start_node("ask")
//!     .build()?;
//!
//! let pipe = Pipe::new("greeter", graph, Arc::new(InMemoryStore::<String>::new()));
//! let ctx = ExecutionContext::new();
//!
//! let paused = pipe.invoke(&ctx, "run-1", String::new()).await?;
//! assert!(paused.is_interrupted());
//!
//! let done = pipe
//!     .resume(&ctx, "run-1", ResumeConfig::new().with_value("name", "ada"))
//!     .await?
//!     .into_result()?;
//! assert_eq!(done, "hello ada");
//! # Ok(())
//! # }
//! ```

use crate::context::ExecutionContext;
use crate::error::{GraphError, Result};
use crate::flow::{Execution, Flow, FlowObserver};
use crate::graph::Graph;
use async_trait::async_trait;
use flowgraph_checkpoint::{
    CheckpointState, ExecutionId, ExecutionState, ResolvedHitlInterrupt, Store,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Answers supplied when resuming a paused run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeConfig {
    pub interrupt_values: HashMap<String, String>,
}

impl ResumeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.interrupt_values.insert(key.into(), value.into());
        self
    }
}

impl From<HashMap<String, String>> for ResumeConfig {
    fn from(interrupt_values: HashMap<String, String>) -> Self {
        Self { interrupt_values }
    }
}

struct PersistObserver<S> {
    store: Arc<dyn Store<S>>,
    id: ExecutionId,
}

impl<S> PersistObserver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn persist(&self, checkpoint: &CheckpointState, state: &S) -> Result<()> {
        let snapshot = ExecutionState::new(checkpoint.clone(), state.clone());
        self.store.set(&self.id, &snapshot).await?;
        tracing::trace!(execution = %self.id, node = %checkpoint.checkpoint_id, "Persisted execution state");
        Ok(())
    }
}

#[async_trait]
impl<S> FlowObserver<S> for PersistObserver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn on_node_execution(&self, checkpoint: &CheckpointState, state: &S) -> Result<()> {
        self.persist(checkpoint, state).await
    }

    async fn on_node_resolution(&self, checkpoint: &CheckpointState, state: &S) -> Result<()> {
        self.persist(checkpoint, state).await
    }

    async fn on_graph_end(&self, checkpoint: &CheckpointState, state: &S) -> Result<()> {
        self.persist(checkpoint, state).await
    }
}

/// Named, persistent front end to a graph
pub struct Pipe<S> {
    name: String,
    graph: Arc<Graph<S>>,
    store: Arc<dyn Store<S>>,
    max_steps: Option<usize>,
}

impl<S> Pipe<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: impl Into<String>,
        graph: impl Into<Arc<Graph<S>>>,
        store: Arc<dyn Store<S>>,
    ) -> Self {
        Self {
            name: name.into(),
            graph: graph.into(),
            store,
            max_steps: None,
        }
    }

    /// Apply a step limit to every run started through this pipe
    pub fn with_max_steps(mut self, limit: usize) -> Self {
        self.max_steps = Some(limit);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }

    pub fn store(&self) -> &Arc<dyn Store<S>> {
        &self.store
    }

    /// Store key for instance `id` of this pipe's flow
    pub fn execution_id(&self, id: &str) -> ExecutionId {
        ExecutionId::new(id, self.name.as_str())
    }

    /// Start a fresh run under `id` from the graph's start node.
    ///
    /// The outcome of the run is in the returned [`Execution`]. A store write that
    /// fails mid-run ends it as [`ExecutionOutcome::Failed`](crate::ExecutionOutcome::Failed).
    #[tracing::instrument(skip(self, ctx, init), fields(flow = %self.name))]
    pub async fn invoke(&self, ctx: &ExecutionContext, id: &str, init: S) -> Result<Execution<S>> {
        let execution_id = self.execution_id(id);
        tracing::info!(execution = %execution_id, "Invoking flow");

        let ctx = ctx.clone().with_execution_id(execution_id.clone());
        Ok(self.run(&ctx, execution_id, CheckpointState::new(), init).await)
    }

    /// Continue the paused run `id` with the supplied answers.
    ///
    /// Fails with [`GraphError::ResumeValidation`], leaving the stored state untouched,
    /// when nothing is pending, a required key is missing or an `enum` answer is not
    /// one of the allowed values. Keys nobody asked for are ignored.
    #[tracing::instrument(skip(self, ctx, resume), fields(flow = %self.name))]
    pub async fn resume(
        &self,
        ctx: &ExecutionContext,
        id: &str,
        resume: ResumeConfig,
    ) -> Result<Execution<S>> {
        let execution_id = self.execution_id(id);
        let stored = self.store.get(&execution_id).await?;

        let Some(pending) = stored.checkpoint_state.interrupt.clone() else {
            return Err(GraphError::ResumeValidation(format!(
                "execution {} has no pending interrupt",
                execution_id
            )));
        };

        let answers = pending
            .requirements
            .validate(&resume.interrupt_values)
            .map_err(|violation| {
                tracing::warn!(execution = %execution_id, error = %violation, "Resume rejected");
                GraphError::from(violation)
            })?;

        tracing::info!(
            execution = %execution_id,
            node = %pending.interrupt_id.node_id,
            "Resuming flow"
        );

        let ctx = ctx
            .clone()
            .with_execution_id(execution_id.clone())
            .with_resolved_interrupt(ResolvedHitlInterrupt::new(pending, answers));

        Ok(self
            .run(&ctx, execution_id, stored.checkpoint_state, stored.application_state)
            .await)
    }

    /// Persisted state of run `id`; the zero state if it never ran
    pub async fn snapshot(&self, id: &str) -> Result<ExecutionState<S>> {
        Ok(self.store.get(&self.execution_id(id)).await?)
    }

    async fn run(
        &self,
        ctx: &ExecutionContext,
        execution_id: ExecutionId,
        checkpoint: CheckpointState,
        state: S,
    ) -> Execution<S> {
        let persist = PersistObserver {
            store: Arc::clone(&self.store),
            id: execution_id,
        };

        let mut flow = Flow::new(self.name.as_str(), Arc::clone(&self.graph))
            .with_checkpoint(checkpoint)
            .with_observer(Arc::new(persist));
        if let Some(limit) = self.max_steps {
            flow = flow.with_max_steps(limit);
        }

        flow.execute(ctx, state).await
    }
}

impl<S> Clone for Pipe<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            graph: Arc::clone(&self.graph),
            store: Arc::clone(&self.store),
            max_steps: self.max_steps,
        }
    }
}

impl<S> fmt::Debug for Pipe<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("name", &self.name)
            .field("graph", &self.graph)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}
