//! Storage trait for execution snapshots
//!
//! A [`Store`] persists the pair (checkpoint cursor, application state) keyed by
//! [`ExecutionId`]. The engine only needs get/set semantics; retention and deletion
//! are backend policy.
//!
//! # Contract
//!
//! - `get` on an id that was never written returns [`ExecutionState::default()`]
//!   without error. Absence is not failure.
//! - `set` replaces whatever was stored for the id.
//! - No locking across executions is implied. Callers that need at most one
//!   concurrent run per id must enforce it themselves.
//!
//! # Implementing a backend
//!
//! ```rust,ignore
//! use flowgraph_checkpoint::{ExecutionId, ExecutionState, Result, Store};
//! use async_trait::async_trait;
//!
//! struct RedisStore { client: redis::Client }
//!
//! #[async_trait]
//! impl<S> Store<S> for RedisStore
//! where
//!     S: serde::Serialize + serde::de::DeserializeOwned + Default + Send + Sync + 'static,
//! {
//!     async fn get(&self, id: &ExecutionId) -> Result<ExecutionState<S>> {
//!         // GET "{id}:{flow}" and deserialize, or ExecutionState::default()
//!         todo!()
//!     }
//!
//!     async fn set(&self, id: &ExecutionId, state: &ExecutionState<S>) -> Result<()> {
//!         // SET "{id}:{flow}" to the serialized snapshot
//!         todo!()
//!     }
//! }
//! ```

use crate::{
    checkpoint::{ExecutionId, ExecutionState},
    error::Result,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence backend for execution snapshots
#[async_trait]
pub trait Store<S>: Send + Sync {
    /// Load the snapshot for `id`, or the zero state if none was written
    async fn get(&self, id: &ExecutionId) -> Result<ExecutionState<S>>;

    /// Replace the snapshot for `id`
    async fn set(&self, id: &ExecutionId, state: &ExecutionState<S>) -> Result<()>;
}

#[async_trait]
impl<S, T> Store<S> for Arc<T>
where
    S: Send + Sync + 'static,
    T: Store<S> + ?Sized,
{
    async fn get(&self, id: &ExecutionId) -> Result<ExecutionState<S>> {
        (**self).get(id).await
    }

    async fn set(&self, id: &ExecutionId, state: &ExecutionState<S>) -> Result<()> {
        (**self).set(id, state).await
    }
}
