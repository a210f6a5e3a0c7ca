//! # flowgraph-checkpoint - Execution snapshots for resumable graph runs
//!
//! This crate holds everything that gets **persisted** while a flowgraph execution runs:
//! the checkpoint cursor, pending and resolved human-in-the-loop interrupts, and the
//! [`Store`] abstraction that saves them next to the caller's application state.
//!
//! ## Core Concepts
//!
//! - [`CheckpointState`] - current node, visited history, pending interrupt, and the
//!   history of resolved interrupts
//! - [`HitlInterrupt`] - a node's request for input, with [`Requirements`] describing
//!   each expected answer
//! - [`ExecutionId`] / [`ExecutionState`] - the key and the value a [`Store`] persists
//! - [`Store`] - async get/set contract; `get` of an unknown id yields the zero state
//!
//! ## Backends
//!
//! - [`InMemoryStore`] - `HashMap` behind a `tokio` lock, for tests and single processes
//! - [`FileStore`] - one file per execution, encoded via a [`SerializerProtocol`]
//!   ([`JsonSerializer`] or [`BincodeSerializer`])
//!
//! ## Quick Start
//!
//! ```rust
//! use flowgraph_checkpoint::{CheckpointState, ExecutionId, ExecutionState, InMemoryStore, Store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::<u64>::new();
//!     let id = ExecutionId::new("order-42", "checkout");
//!
//!     store.set(&id, &ExecutionState::new(CheckpointState::at("charge"), 100u64)).await?;
//!
//!     let snapshot = store.get(&id).await?;
//!     assert_eq!(snapshot.checkpoint_state.checkpoint_id, "charge");
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod error;
pub mod file;
pub mod memory;
pub mod serializer;
pub mod traits;

pub use checkpoint::{
    CheckpointState, ExecutionId, ExecutionState, HitlInterrupt, InterruptId, NodeId,
    Requirement, RequirementType, RequirementViolation, Requirements, ResolvedHitlInterrupt,
};
pub use error::{CheckpointError, Result};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use serializer::{BincodeSerializer, JsonSerializer, SerializerProtocol};
pub use traits::Store;
