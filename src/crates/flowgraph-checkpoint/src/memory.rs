//! In-memory execution store for development and testing
//!
//! [`InMemoryStore`] keeps every snapshot in a `HashMap` behind a `tokio` read/write
//! lock. Data is lost when the process exits. Cloning the store shares the same map,
//! so a clone handed to a pipe can be inspected from a test afterwards.

use crate::{
    checkpoint::{ExecutionId, ExecutionState},
    error::Result,
    traits::Store,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Snapshots<S> = Arc<RwLock<HashMap<ExecutionId, ExecutionState<S>>>>;

/// Thread-safe in-memory store
///
/// # Example
///
/// ```rust
/// use flowgraph_checkpoint::{ExecutionId, ExecutionState, InMemoryStore, Store};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::<i64>::new();
///     let id = ExecutionId::new("run-1", "counter");
///
///     // Unknown ids read back as the zero state
///     assert_eq!(store.get(&id).await?, ExecutionState::default());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct InMemoryStore<S> {
    snapshots: Snapshots<S>,
}

impl<S> InMemoryStore<S> {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored executions
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }

    /// Drop the snapshot for `id`, returning it if present
    pub async fn remove(&self, id: &ExecutionId) -> Option<ExecutionState<S>> {
        self.snapshots.write().await.remove(id)
    }

    pub async fn clear(&self) {
        self.snapshots.write().await.clear();
    }
}

impl<S> Clone for InMemoryStore<S> {
    fn clone(&self) -> Self {
        Self {
            snapshots: Arc::clone(&self.snapshots),
        }
    }
}

impl<S> Default for InMemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> Store<S> for InMemoryStore<S>
where
    S: Clone + Default + Send + Sync + 'static,
{
    async fn get(&self, id: &ExecutionId) -> Result<ExecutionState<S>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(id).cloned().unwrap_or_default())
    }

    async fn set(&self, id: &ExecutionId, state: &ExecutionState<S>) -> Result<()> {
        self.snapshots.write().await.insert(id.clone(), state.clone());
        Ok(())
    }
}
