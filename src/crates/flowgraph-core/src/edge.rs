//! Edge resolvers: choosing the node that runs next
//!
//! An [`EdgeResolver`] is attached to a source node and is asked for the successor
//! after that node completes. It exposes two views that must stay in sync:
//!
//! - [`EdgeResolver::resolve`] - the runtime choice for a concrete state
//! - [`EdgeResolver::targets`] - every statically possible successor, used by the
//!   build-time reachability check

use crate::context::StepContext;
use crate::error::{GraphError, Result};
use crate::node::ConditionalNode;
use flowgraph_checkpoint::NodeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Routing rule leaving a node
pub enum EdgeResolver<S> {
    /// Always continue with the same node
    Const(NodeId),

    /// Ask a router for a branch key and map it to a node
    Conditional {
        router: Arc<dyn ConditionalNode<S>>,
        redirections: BTreeMap<String, NodeId>,
    },
}

impl<S> EdgeResolver<S> {
    pub fn constant(target: impl Into<NodeId>) -> Self {
        Self::Const(target.into())
    }

    pub fn conditional(
        router: Arc<dyn ConditionalNode<S>>,
        redirections: BTreeMap<String, NodeId>,
    ) -> Self {
        Self::Conditional {
            router,
            redirections,
        }
    }

    /// Every node this edge can lead to, independent of state
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Self::Const(target) => vec![target.as_str()],
            Self::Conditional { redirections, .. } => {
                redirections.values().map(String::as_str).collect()
            }
        }
    }

    /// Pick the successor for `state`.
    ///
    /// A branch key with no redirection is an error rather than an implicit end of
    /// the run; the graph must route to a terminal node explicitly.
    pub async fn resolve(&self, ctx: &StepContext, state: &S) -> Result<NodeId>
    where
        S: Sync,
    {
        match self {
            Self::Const(target) => Ok(target.clone()),
            Self::Conditional {
                router,
                redirections,
            } => {
                let branch = router.route(ctx, state).await;
                redirections.get(&branch).cloned().ok_or_else(|| {
                    GraphError::unresolved_branch(ctx.node_id().unwrap_or_default(), branch)
                })
            }
        }
    }
}

impl<S> Clone for EdgeResolver<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Const(target) => Self::Const(target.clone()),
            Self::Conditional {
                router,
                redirections,
            } => Self::Conditional {
                router: Arc::clone(router),
                redirections: redirections.clone(),
            },
        }
    }
}

impl<S> fmt::Debug for EdgeResolver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(target) => f.debug_tuple("Const").field(target).finish(),
            Self::Conditional { redirections, .. } => f
                .debug_struct("Conditional")
                .field("router", &"<router>")
                .field("redirections", redirections)
                .finish(),
        }
    }
}
