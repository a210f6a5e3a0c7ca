//! Step-by-step execution engine
//!
//! A [`Flow`] drives application state through a [`Graph`], one node at a time,
//! starting from the graph's start node or from the node stored in its
//! [`CheckpointState`].
//!
//! # State machine
//!
//! ```text
//!               ┌──────────────────────────────────────────────┐
//!               ▼                                              │
//!  Running ── visit node ── execute ──ok──▶ notify exec ── resolve edge ── notify resolution
//!     │                       │                  │
//!     │                       │ interrupt        │ no edge
//!     │                       ▼                  ▼
//!     │              Paused(Interrupted)   Terminated(Success)
//!     │                       │
//!     │ other error           │
//!     ▼                       │
//!  Terminated(Failed)         │
//!     └──────────┬────────────┘
//!                ▼
//!        notify graph end (exactly once per execute)
//! ```
//!
//! - An interrupt is stored as the checkpoint's pending interrupt and the node's
//!   partial state mutations are kept.
//! - Any other node error rolls the state back to what it was before that node ran.
//! - After a node with answered interrupt completes, the answers move to
//!   `interrupt_history` and the pending interrupt is cleared.
//!
//! Notifications run inline through every attached [`FlowObserver`]; a slow observer
//! slows the whole run.

use crate::context::{ExecutionContext, StepContext};
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use async_trait::async_trait;
use flowgraph_checkpoint::{CheckpointState, HitlInterrupt, NodeId};
use std::fmt;
use std::sync::Arc;

/// How an execution ended
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// A terminal node was reached
    Completed,
    /// A node asked for input; resume to continue
    Interrupted(HitlInterrupt),
    /// A node, router or observer failed
    Failed(GraphError),
}

/// Result of one [`Flow::execute`] call
#[derive(Debug)]
pub struct Execution<S> {
    /// Final application state: partial on interrupt, last good state on failure
    pub state: S,
    pub checkpoint: CheckpointState,
    pub outcome: ExecutionOutcome,
}

impl<S> Execution<S> {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Completed)
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Interrupted(_))
    }

    pub fn interrupt(&self) -> Option<&HitlInterrupt> {
        match &self.outcome {
            ExecutionOutcome::Interrupted(interrupt) => Some(interrupt),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&GraphError> {
        match &self.outcome {
            ExecutionOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Collapse into the final state, treating an interrupt as an error
    pub fn into_result(self) -> Result<S> {
        match self.outcome {
            ExecutionOutcome::Completed => Ok(self.state),
            ExecutionOutcome::Interrupted(interrupt) => Err(GraphError::Interrupted(interrupt)),
            ExecutionOutcome::Failed(e) => Err(e),
        }
    }
}

/// Lifecycle hooks fired synchronously within a run
///
/// Returning an error from `on_node_execution` or `on_node_resolution` terminates
/// the run as failed. An error from `on_graph_end` fails an otherwise completed run
/// and is logged in every other case.
#[async_trait]
pub trait FlowObserver<S>: Send + Sync {
    /// After a node executed successfully or raised an interrupt
    async fn on_node_execution(&self, checkpoint: &CheckpointState, state: &S) -> Result<()>;

    /// After the next node was resolved and the cursor moved
    async fn on_node_resolution(&self, checkpoint: &CheckpointState, state: &S) -> Result<()>;

    /// Once per execute call, whatever the outcome
    async fn on_graph_end(&self, checkpoint: &CheckpointState, state: &S) -> Result<()>;
}

type Callback<S> = Box<dyn Fn(&CheckpointState, &S) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowEvent {
    NodeExecution,
    NodeResolution,
    GraphEnd,
}

struct CallbackObserver<S> {
    event: FlowEvent,
    callback: Callback<S>,
}

#[async_trait]
impl<S: Sync> FlowObserver<S> for CallbackObserver<S> {
    async fn on_node_execution(&self, checkpoint: &CheckpointState, state: &S) -> Result<()> {
        if self.event == FlowEvent::NodeExecution {
            (self.callback)(checkpoint, state);
        }
        Ok(())
    }

    async fn on_node_resolution(&self, checkpoint: &CheckpointState, state: &S) -> Result<()> {
        if self.event == FlowEvent::NodeResolution {
            (self.callback)(checkpoint, state);
        }
        Ok(())
    }

    async fn on_graph_end(&self, checkpoint: &CheckpointState, state: &S) -> Result<()> {
        if self.event == FlowEvent::GraphEnd {
            (self.callback)(checkpoint, state);
        }
        Ok(())
    }
}

/// Executes a graph against application state `S`
pub struct Flow<S> {
    name: String,
    graph: Arc<Graph<S>>,
    checkpoint: CheckpointState,
    observers: Vec<Arc<dyn FlowObserver<S>>>,
    max_steps: Option<usize>,
}

impl<S> Flow<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, graph: impl Into<Arc<Graph<S>>>) -> Self {
        Self {
            name: name.into(),
            graph: graph.into(),
            checkpoint: CheckpointState::default(),
            observers: Vec::new(),
            max_steps: None,
        }
    }

    /// Resume from `checkpoint` instead of the graph's start node
    pub fn with_checkpoint(mut self, checkpoint: CheckpointState) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FlowObserver<S>>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Fail the run once more than `limit` nodes executed in one call
    pub fn with_max_steps(mut self, limit: usize) -> Self {
        self.max_steps = Some(limit);
        self
    }

    pub fn on_node_exec<F>(self, f: F) -> Self
    where
        F: Fn(&CheckpointState, &S) + Send + Sync + 'static,
    {
        self.with_callback(FlowEvent::NodeExecution, Box::new(f))
    }

    pub fn on_node_resolution<F>(self, f: F) -> Self
    where
        F: Fn(&CheckpointState, &S) + Send + Sync + 'static,
    {
        self.with_callback(FlowEvent::NodeResolution, Box::new(f))
    }

    pub fn on_graph_end<F>(self, f: F) -> Self
    where
        F: Fn(&CheckpointState, &S) + Send + Sync + 'static,
    {
        self.with_callback(FlowEvent::GraphEnd, Box::new(f))
    }

    fn with_callback(self, event: FlowEvent, callback: Callback<S>) -> Self {
        self.with_observer(Arc::new(CallbackObserver { event, callback }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }

    /// Cursor as of the last step
    pub fn checkpoint(&self) -> &CheckpointState {
        &self.checkpoint
    }

    /// Run until a terminal node, an error or an interrupt.
    ///
    /// The graph-end notification fires exactly once before this returns.
    #[tracing::instrument(skip(self, ctx, state), fields(flow = %self.name))]
    pub async fn execute(&mut self, ctx: &ExecutionContext, state: S) -> Execution<S> {
        let current = if self.checkpoint.is_started() {
            self.checkpoint.checkpoint_id.clone()
        } else {
            self.checkpoint.checkpoint_id = self.graph.start().to_string();
            self.graph.start().to_string()
        };

        tracing::debug!(node = %current, resumed = !ctx.resolved_interrupts().is_empty(), "Starting flow");

        let mut state = state;
        let outcome = self.run(ctx, current, &mut state).await;
        let outcome = self.finish(outcome, &state).await;

        match &outcome {
            ExecutionOutcome::Completed => {
                tracing::info!(steps = self.checkpoint.visited.len(), "Flow completed")
            }
            ExecutionOutcome::Interrupted(interrupt) => {
                tracing::info!(node = %interrupt.interrupt_id.node_id, reason = %interrupt.reason, "Flow paused for input")
            }
            ExecutionOutcome::Failed(e) => tracing::error!(error = %e, "Flow failed"),
        }

        Execution {
            state,
            checkpoint: self.checkpoint.clone(),
            outcome,
        }
    }

    async fn run(&mut self, ctx: &ExecutionContext, mut current: NodeId, state: &mut S) -> ExecutionOutcome {
        let mut resolved = Arc::new(ctx.resolved_interrupts().clone());
        let mut step = 0usize;

        loop {
            if let Some(limit) = self.max_steps {
                if step >= limit {
                    return ExecutionOutcome::Failed(GraphError::StepLimitExceeded { limit });
                }
            }

            let Some(node) = self.graph.node(&current).cloned() else {
                return ExecutionOutcome::Failed(GraphError::UnknownNode(current));
            };

            self.checkpoint.visited.push(current.clone());

            let step_ctx = StepContext::for_step(
                current.clone(),
                step,
                &self.name,
                ctx.execution_id().cloned(),
                Arc::clone(&resolved),
                ctx.cancellation_token().clone(),
            );

            tracing::debug!(node = %current, step, "Executing node");
            let last_good = state.clone();

            match node.execute(&step_ctx, state).await {
                Ok(()) => {}
                Err(GraphError::Interrupted(interrupt)) => {
                    self.checkpoint.interrupt = Some(interrupt.clone());
                    if let Err(e) = self.notify(FlowEvent::NodeExecution, state).await {
                        return ExecutionOutcome::Failed(e);
                    }
                    return ExecutionOutcome::Interrupted(interrupt);
                }
                Err(e) => {
                    *state = last_good;
                    tracing::error!(node = %current, error = %e, "Node execution failed");
                    return ExecutionOutcome::Failed(e);
                }
            }

            if let Some(mut answered) = resolved.get(&current).cloned() {
                tracing::debug!(node = %current, interrupt = %answered.interrupt.interrupt_id, "Interrupt resolved");
                // Accepted answers carry no earlier rejection
                answered.interrupt.validation_error = None;
                self.checkpoint.interrupt = None;
                self.checkpoint.interrupt_history.push(answered);
                // A revisit through a cycle must ask again
                Arc::make_mut(&mut resolved).remove(&current);
            }

            if let Err(e) = self.notify(FlowEvent::NodeExecution, state).await {
                return ExecutionOutcome::Failed(e);
            }

            let Some(edge) = self.graph.edge(&current) else {
                return ExecutionOutcome::Completed;
            };

            let next = match edge.resolve(&step_ctx, state).await {
                Ok(next) => next,
                Err(e) => return ExecutionOutcome::Failed(e),
            };

            tracing::debug!(from = %current, to = %next, "Resolved next node");
            self.checkpoint.checkpoint_id = next.clone();

            if let Err(e) = self.notify(FlowEvent::NodeResolution, state).await {
                return ExecutionOutcome::Failed(e);
            }

            current = next;
            step += 1;
        }
    }

    async fn finish(&self, outcome: ExecutionOutcome, state: &S) -> ExecutionOutcome {
        match self.notify(FlowEvent::GraphEnd, state).await {
            Ok(()) => outcome,
            Err(e) => match outcome {
                ExecutionOutcome::Completed => ExecutionOutcome::Failed(e),
                other => {
                    tracing::warn!(error = %e, "Graph end notification failed");
                    other
                }
            },
        }
    }

    async fn notify(&self, event: FlowEvent, state: &S) -> Result<()> {
        for observer in &self.observers {
            match event {
                FlowEvent::NodeExecution => observer.on_node_execution(&self.checkpoint, state).await?,
                FlowEvent::NodeResolution => observer.on_node_resolution(&self.checkpoint, state).await?,
                FlowEvent::GraphEnd => observer.on_graph_end(&self.checkpoint, state).await?,
            }
        }
        Ok(())
    }
}

impl<S> fmt::Debug for Flow<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("name", &self.name)
            .field("checkpoint", &self.checkpoint)
            .field("observers", &self.observers.len())
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::interrupt::interrupt;
    use crate::node::{node_fn, router_fn, Noop};
    use flowgraph_checkpoint::{Requirement, Requirements, ResolvedHitlInterrupt};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn add(n: i64) -> impl crate::node::Node<i64> {
        node_fn(move |_, sum: &mut i64| {
            *sum += n;
            Ok(())
        })
    }

    fn number_play() -> Graph<i64> {
        GraphBuilder::<i64>::new()
            .add_node("addition_1", add(1))
            .add_node("addition_2", add(2))
            .add_node("end", Noop)
            .add_edge("addition_1", "addition_2")
            .add_conditional_edge(
                "addition_2",
                router_fn(|sum: &i64| if *sum >= 10 { "End".to_string() } else { "continue".to_string() }),
                [("continue", "addition_1"), ("End", "end")],
            )
            .set_start_node("addition_1")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_number_play_scenario() {
        let mut flow = Flow::new("number_play", number_play());
        let execution = flow.execute(&ExecutionContext::new(), 6).await;

        assert!(execution.is_completed());
        assert_eq!(execution.state, 12);
        assert_eq!(
            execution.checkpoint.visited,
            vec!["addition_1", "addition_2", "addition_1", "addition_2", "end"]
        );
        assert_eq!(execution.checkpoint.checkpoint_id, "end");
        assert!(execution.checkpoint.interrupt.is_none());
    }

    #[tokio::test]
    async fn test_notifications_fire_per_step() {
        let execs = Arc::new(AtomicUsize::new(0));
        let resolutions = Arc::new(Mutex::new(Vec::new()));
        let ends = Arc::new(AtomicUsize::new(0));

        let (e, r, g) = (execs.clone(), resolutions.clone(), ends.clone());
        let mut flow = Flow::new("number_play", number_play())
            .on_node_exec(move |_, _| {
                e.fetch_add(1, Ordering::SeqCst);
            })
            .on_node_resolution(move |cp, _| r.lock().unwrap().push(cp.checkpoint_id.clone()))
            .on_graph_end(move |_, _| {
                g.fetch_add(1, Ordering::SeqCst);
            });

        flow.execute(&ExecutionContext::new(), 6).await.into_result().unwrap();

        assert_eq!(execs.load(Ordering::SeqCst), 5);
        assert_eq!(
            *resolutions.lock().unwrap(),
            vec!["addition_2", "addition_1", "addition_2", "end"]
        );
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_restores_last_good_state() {
        let graph = GraphBuilder::<i64>::new()
            .add_node("inc", add(5))
            .add_node(
                "explode",
                node_fn(|_, sum: &mut i64| {
                    *sum = -1;
                    Err(GraphError::node_execution("explode", "boom"))
                }),
            )
            .add_node("end", Noop)
            .add_edge("inc", "explode")
            .add_edge("explode", "end")
            .set_start_node("inc")
            .build()
            .unwrap();

        let ends = Arc::new(AtomicUsize::new(0));
        let counter = ends.clone();
        let mut flow = Flow::new("f", graph).on_graph_end(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let execution = flow.execute(&ExecutionContext::new(), 0).await;

        assert!(matches!(execution.error(), Some(GraphError::NodeExecution { .. })));
        assert_eq!(execution.state, 5);
        assert_eq!(execution.checkpoint.visited, vec!["inc", "explode"]);
        assert_eq!(execution.checkpoint.checkpoint_id, "explode");
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    fn gated() -> Graph<i64> {
        GraphBuilder::<i64>::new()
            .add_node("inc", add(1))
            .add_node(
                "gate",
                node_fn(|ctx, sum: &mut i64| {
                    *sum += 100;
                    let answers = interrupt(
                        ctx,
                        "Multiply?",
                        "approval",
                        Requirements::new().with("factor", Requirement::one_of(["2", "3"])),
                    )?;
                    let factor: i64 = answers["factor"]
                        .parse()
                        .map_err(|e| GraphError::node_execution("gate", format!("{}", e)))?;
                    *sum *= factor;
                    Ok(())
                }),
            )
            .add_node("end", Noop)
            .add_edge("inc", "gate")
            .add_edge("gate", "end")
            .set_start_node("inc")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_interrupt_pauses_and_keeps_partial_state() {
        let ends = Arc::new(AtomicUsize::new(0));
        let counter = ends.clone();
        let mut flow = Flow::new("gated", gated()).on_graph_end(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let execution = flow.execute(&ExecutionContext::new(), 0).await;

        let interrupt = execution.interrupt().expect("paused");
        assert_eq!(interrupt.interrupt_id.node_id, "gate");
        assert_eq!(execution.state, 101);
        assert_eq!(execution.checkpoint.checkpoint_id, "gate");
        assert_eq!(execution.checkpoint.visited, vec!["inc", "gate"]);
        assert_eq!(execution.checkpoint.interrupt.as_ref(), Some(interrupt));
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resume_from_checkpoint_records_history() {
        let mut first = Flow::new("gated", gated());
        let paused = first.execute(&ExecutionContext::new(), 0).await;
        let pending = paused.interrupt().cloned().unwrap();

        // Partial state (101) is carried into the re-run of the gate node
        let ctx = ExecutionContext::new().with_resolved_interrupt(ResolvedHitlInterrupt::new(
            pending.clone(),
            HashMap::from([("factor".to_string(), "2".to_string())]),
        ));
        let mut second = Flow::new("gated", gated()).with_checkpoint(paused.checkpoint);
        let done = second.execute(&ctx, paused.state).await;

        assert!(done.is_completed());
        assert_eq!(done.state, 402);
        assert_eq!(done.checkpoint.visited, vec!["inc", "gate", "gate", "end"]);
        assert!(done.checkpoint.interrupt.is_none());
        assert_eq!(done.checkpoint.interrupt_history.len(), 1);
        assert_eq!(done.checkpoint.interrupt_history[0].interrupt, pending);
        assert_eq!(done.checkpoint.interrupt_history[0].values["factor"], "2");
    }

    #[tokio::test]
    async fn test_unresolved_branch_fails_run() {
        let graph = GraphBuilder::<i64>::new()
            .add_node("a", add(1))
            .add_node("end", Noop)
            .add_conditional_edge("a", router_fn(|_: &i64| "nowhere".to_string()), [("done", "end")])
            .set_start_node("a")
            .build()
            .unwrap();

        let mut flow = Flow::new("f", graph);
        let execution = flow.execute(&ExecutionContext::new(), 0).await;

        assert!(matches!(
            execution.error(),
            Some(GraphError::UnresolvedBranch { node, branch }) if node == "a" && branch == "nowhere"
        ));
        assert_eq!(execution.state, 1);
        assert_eq!(execution.checkpoint.checkpoint_id, "a");
    }

    #[tokio::test]
    async fn test_step_limit() {
        let graph = GraphBuilder::<i64>::new()
            .add_node("a", add(1))
            .add_node("end", Noop)
            .add_conditional_edge(
                "a",
                router_fn(|_: &i64| "again".to_string()),
                [("again", "a"), ("done", "end")],
            )
            .set_start_node("a")
            .build()
            .unwrap();

        let mut flow = Flow::new("spin", graph).with_max_steps(4);
        let execution = flow.execute(&ExecutionContext::new(), 0).await;

        assert!(matches!(execution.error(), Some(GraphError::StepLimitExceeded { limit: 4 })));
        assert_eq!(execution.state, 4);
    }

    #[tokio::test]
    async fn test_unknown_checkpoint_node() {
        let mut flow = Flow::new("f", number_play()).with_checkpoint(CheckpointState::at("ghost"));
        let execution = flow.execute(&ExecutionContext::new(), 0).await;

        assert!(matches!(execution.error(), Some(GraphError::UnknownNode(id)) if id == "ghost"));
        assert!(execution.checkpoint.visited.is_empty());
    }

    struct FailingObserver;

    #[async_trait]
    impl FlowObserver<i64> for FailingObserver {
        async fn on_node_execution(&self, _: &CheckpointState, _: &i64) -> Result<()> {
            Ok(())
        }

        async fn on_node_resolution(&self, _: &CheckpointState, _: &i64) -> Result<()> {
            Ok(())
        }

        async fn on_graph_end(&self, _: &CheckpointState, _: &i64) -> Result<()> {
            Err(GraphError::Custom("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failing_end_observer_fails_completed_run() {
        let mut flow = Flow::new("f", number_play()).with_observer(Arc::new(FailingObserver));
        let execution = flow.execute(&ExecutionContext::new(), 6).await;

        assert!(matches!(execution.error(), Some(GraphError::Custom(msg)) if msg == "disk full"));
        assert_eq!(execution.state, 12);
    }
}
