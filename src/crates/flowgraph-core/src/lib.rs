//! # flowgraph-core - Resumable graph execution with human-in-the-loop pauses
//!
//! Drive a caller-defined application state through a directed graph of nodes, one
//! step at a time. A run can **pause** at any node to ask a human for structured
//! input, be persisted, and later **resume** at exactly that node once the answers
//! arrive, possibly in another process.
//!
//! ## Core Concepts
//!
//! - [`Node`] / [`ConditionalNode`] - units of work and branch selectors supplied by
//!   the caller; closures work through [`node_fn`] and [`router_fn`]
//! - [`GraphBuilder`] - registers nodes and edges, validates that a terminal node is
//!   reachable from the start, and produces an immutable [`Graph`]
//! - [`Flow`] - the step engine: executes nodes, resolves edges, records visited
//!   nodes and pending interrupts on a [`CheckpointState`], and notifies
//!   [`FlowObserver`]s
//! - [`interrupt`] - raised from inside a node to request input; returns the answers
//!   once the run is resumed
//! - [`Pipe`] - named driver binding a graph to a [`Store`]; `invoke` starts a run,
//!   `resume` validates answers and continues it
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  invoke / resume   ┌──────────────┐  persist after every step
//! │   caller    │ ─────────────────▶ │     Pipe     │ ─────────────────────────┐
//! └─────────────┘                    └──────┬───────┘                          ▼
//!                                           │ Flow::execute            ┌──────────────┐
//!                                           ▼                          │  Store<S>    │
//!                  ┌──────────────────────────────────────────┐       │ memory/file  │
//!                  │ visit ─▶ Node::execute ─▶ EdgeResolver   │       └──────────────┘
//!                  │   ▲         │ Err(Interrupted) = pause    │
//!                  │   └─────────┘ no edge = done            │
//!                  └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use flowgraph_core::{node_fn, router_fn, ExecutionContext, Flow, GraphBuilder, Noop};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> flowgraph_core::Result<()> {
//! let graph = GraphBuilder::<i64>::new()
//!     .add_node("addition_1", node_fn(|_, sum: &mut i64| { *sum += 1; Ok(()) }))
//!     .add_node("addition_2", node_fn(|_, sum: &mut i64| { *sum += 2; Ok(()) }))
//!     .add_node("end", Noop)
//!     .add_edge("addition_1", "addition_2")
//!     .add_conditional_edge(
//!         "addition_2",
//!         router_fn(|sum: &i64| if *sum < 10 { "continue".into() } else { "end".into() }),
//!         [("continue", "addition_1"), ("end", "end")],
//!     )
//!     .set_start_node("addition_1")
//!     .build()?;
//!
//! let mut flow = Flow::new("number_play", graph);
//! let execution = flow.execute(&ExecutionContext::new(), 6).await;
//!
//! assert_eq!(execution.checkpoint.visited, ["addition_1", "addition_2", "addition_1", "addition_2", "end"]);
//! assert_eq!(execution.into_result()?, 12);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Everything returns [`GraphError`]. An interrupt travels as
//! [`GraphError::Interrupted`] out of a node so it can be propagated with `?`; the
//! engine turns it into [`ExecutionOutcome::Interrupted`] rather than a failure.

pub mod builder;
pub mod config;
pub mod context;
pub mod edge;
pub mod error;
pub mod flow;
pub mod graph;
pub mod interrupt;
pub mod node;
pub mod pipe;
pub mod visualization;

pub use builder::GraphBuilder;
pub use config::{PipeConfig, SerializationFormat, StoreConfig};
pub use context::{ExecutionContext, ResolvedInterrupts, StepContext};
pub use edge::EdgeResolver;
pub use error::{GraphError, Result};
pub use flow::{Execution, ExecutionOutcome, Flow, FlowObserver};
pub use graph::Graph;
pub use interrupt::{interrupt, interrupt_for_choice, interrupt_with_validation};
pub use node::{node_fn, router_fn, ConditionalNode, FnNode, FnRouter, Node, Noop};
pub use pipe::{Pipe, ResumeConfig};

pub use flowgraph_checkpoint::{
    CheckpointState, ExecutionId, ExecutionState, HitlInterrupt, InterruptId, NodeId,
    Requirement, RequirementType, Requirements, ResolvedHitlInterrupt, Store,
};
