//! Node and router capabilities supplied by the caller
//!
//! - [`Node`] transforms the application state in place for one step.
//! - [`ConditionalNode`] inspects the state and returns a branch key used by a
//!   conditional edge. It never mutates persisted state.
//!
//! Closures can be used through [`FnNode`] and [`FnRouter`]; [`Noop`] is a node that
//! does nothing, handy as an explicit terminal.

use crate::context::StepContext;
use crate::error::Result;
use async_trait::async_trait;
use std::marker::PhantomData;

/// A named unit of work in a graph
///
/// Mutations made before returning an interrupt are kept and persisted with the
/// pending question. On any other error the engine rolls the state back to what it
/// was before the node ran.
#[async_trait]
pub trait Node<S>: Send + Sync {
    async fn execute(&self, ctx: &StepContext, state: &mut S) -> Result<()>;
}

/// Chooses a branch key for a conditional edge
#[async_trait]
pub trait ConditionalNode<S>: Send + Sync {
    async fn route(&self, ctx: &StepContext, state: &S) -> String;
}

/// A node that leaves the state untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl<S: Send + 'static> Node<S> for Noop {
    async fn execute(&self, _ctx: &StepContext, _state: &mut S) -> Result<()> {
        Ok(())
    }
}

/// Node backed by a synchronous closure
pub struct FnNode<S, F> {
    f: F,
    _state: PhantomData<fn(&mut S)>,
}

impl<S, F> FnNode<S, F>
where
    F: Fn(&StepContext, &mut S) -> Result<()> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _state: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F> Node<S> for FnNode<S, F>
where
    S: Send + 'static,
    F: Fn(&StepContext, &mut S) -> Result<()> + Send + Sync,
{
    async fn execute(&self, ctx: &StepContext, state: &mut S) -> Result<()> {
        (self.f)(ctx, state)
    }
}

/// Router backed by a synchronous closure
pub struct FnRouter<S, F> {
    f: F,
    _state: PhantomData<fn(&S)>,
}

impl<S, F> FnRouter<S, F>
where
    F: Fn(&S) -> String + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _state: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F> ConditionalNode<S> for FnRouter<S, F>
where
    S: Sync + 'static,
    F: Fn(&S) -> String + Send + Sync,
{
    async fn route(&self, _ctx: &StepContext, state: &S) -> String {
        (self.f)(state)
    }
}

/// Shorthand for [`FnNode::new`]
pub fn node_fn<S, F>(f: F) -> FnNode<S, F>
where
    F: Fn(&StepContext, &mut S) -> Result<()> + Send + Sync,
{
    FnNode::new(f)
}

/// Shorthand for [`FnRouter::new`]
pub fn router_fn<S, F>(f: F) -> FnRouter<S, F>
where
    F: Fn(&S) -> String + Send + Sync,
{
    FnRouter::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[tokio::test]
    async fn test_noop_leaves_state() {
        let mut state = 5;
        Noop.execute(&StepContext::detached(), &mut state).await.unwrap();
        assert_eq!(state, 5);
    }

    #[tokio::test]
    async fn test_fn_node_mutates_state() {
        let add_two = node_fn(|_ctx, sum: &mut i64| {
            *sum += 2;
            Ok(())
        });

        let mut state = 1;
        add_two.execute(&StepContext::detached(), &mut state).await.unwrap();
        assert_eq!(state, 3);
    }

    #[tokio::test]
    async fn test_fn_node_propagates_errors() {
        let failing = node_fn(|_ctx, _sum: &mut i64| Err(GraphError::node_execution("x", "boom")));

        let mut state = 0;
        let err = failing.execute(&StepContext::detached(), &mut state).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_fn_router() {
        let router = router_fn(|sum: &i64| if *sum >= 10 { "end".into() } else { "again".into() });

        assert_eq!(router.route(&StepContext::detached(), &3).await, "again");
        assert_eq!(router.route(&StepContext::detached(), &12).await, "end");
    }
}
