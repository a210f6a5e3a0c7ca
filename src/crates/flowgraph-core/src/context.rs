//! Explicit per-invocation and per-step context
//!
//! Nodes never look up their identity or their resolved interrupts through ambient
//! state. The caller hands the engine an [`ExecutionContext`]; for every step the
//! engine builds a fresh [`StepContext`] carrying the current node id, the step index,
//! the resolved interrupts and the caller's cancellation token, and passes it to the
//! node as an ordinary argument.
//!
//! ```text
//! caller ──ExecutionContext──▶ Flow::execute
//!                                 │  per step
//!                                 ▼
//!                     StepContext { node_id, step, resolved, cancellation }
//!                                 │
//!                                 ▼
//!                     Node::execute(&StepContext, &mut S)
//! ```
//!
//! The engine never inspects the cancellation token. Nodes doing blocking or
//! long-running work should select on [`StepContext::cancelled`] themselves.

use flowgraph_checkpoint::{ExecutionId, NodeId, ResolvedHitlInterrupt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolved interrupts keyed by the id of the node that raised them
pub type ResolvedInterrupts = HashMap<NodeId, ResolvedHitlInterrupt>;

/// Caller-supplied context for one invocation of the engine
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    execution_id: Option<ExecutionId>,
    cancellation: CancellationToken,
    resolved: ResolvedInterrupts,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution_id(mut self, id: ExecutionId) -> Self {
        self.execution_id = Some(id);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Register answers for an interrupt, keyed by the node that raised it
    pub fn with_resolved_interrupt(mut self, resolved: ResolvedHitlInterrupt) -> Self {
        self.resolved
            .insert(resolved.interrupt.interrupt_id.node_id.clone(), resolved);
        self
    }

    pub fn execution_id(&self) -> Option<&ExecutionId> {
        self.execution_id.as_ref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn resolved_interrupts(&self) -> &ResolvedInterrupts {
        &self.resolved
    }
}

/// Context handed to a node for exactly one step
#[derive(Debug, Clone)]
pub struct StepContext {
    node_id: Option<NodeId>,
    step: usize,
    flow_name: String,
    execution_id: Option<ExecutionId>,
    resolved: Arc<ResolvedInterrupts>,
    cancellation: CancellationToken,
}

impl StepContext {
    pub(crate) fn for_step(
        node_id: NodeId,
        step: usize,
        flow_name: &str,
        execution_id: Option<ExecutionId>,
        resolved: Arc<ResolvedInterrupts>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            node_id: Some(node_id),
            step,
            flow_name: flow_name.to_string(),
            execution_id,
            resolved,
            cancellation,
        }
    }

    /// A context with no node identity.
    ///
    /// Useful for calling nodes and routers directly in tests. Interrupt helpers
    /// invoked with it fail with [`GraphError::NodeContext`](crate::GraphError::NodeContext).
    pub fn detached() -> Self {
        Self {
            node_id: None,
            step: 0,
            flow_name: String::new(),
            execution_id: None,
            resolved: Arc::new(HashMap::new()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Id of the node being executed, `None` outside the engine
    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    /// Zero-based index of this step within the current invocation
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    pub fn execution_id(&self) -> Option<&ExecutionId> {
        self.execution_id.as_ref()
    }

    /// Answers previously supplied for an interrupt raised by `node_id`
    pub fn resolved_interrupt(&self, node_id: &str) -> Option<&ResolvedHitlInterrupt> {
        self.resolved.get(node_id)
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the caller cancels the run
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgraph_checkpoint::{HitlInterrupt, InterruptId, Requirements};

    fn resolved(node: &str) -> ResolvedHitlInterrupt {
        ResolvedHitlInterrupt::new(
            HitlInterrupt {
                reason: "r".to_string(),
                message: "m".to_string(),
                validation_error: None,
                requirements: Requirements::new(),
                interrupt_id: InterruptId::new(node, "tok"),
            },
            HashMap::from([("k".to_string(), "v".to_string())]),
        )
    }

    #[test]
    fn test_resolved_interrupts_keyed_by_node() {
        let ctx = ExecutionContext::new()
            .with_execution_id(ExecutionId::new("run-1", "flow"))
            .with_resolved_interrupt(resolved("gate"));

        assert!(ctx.resolved_interrupts().contains_key("gate"));
        assert_eq!(ctx.execution_id().unwrap().id, "run-1");
    }

    #[test]
    fn test_step_context_lookup() {
        let exec = ExecutionContext::new().with_resolved_interrupt(resolved("gate"));
        let step = StepContext::for_step(
            "gate".to_string(),
            3,
            "flow",
            None,
            Arc::new(exec.resolved_interrupts().clone()),
            exec.cancellation_token().clone(),
        );

        assert_eq!(step.node_id(), Some("gate"));
        assert_eq!(step.step(), 3);
        assert_eq!(step.flow_name(), "flow");
        assert_eq!(step.resolved_interrupt("gate").unwrap().values["k"], "v");
        assert!(step.resolved_interrupt("other").is_none());
    }

    #[tokio::test]
    async fn test_cancellation_is_shared_with_caller() {
        let token = CancellationToken::new();
        let exec = ExecutionContext::new().with_cancellation(token.clone());
        let step = StepContext::for_step(
            "n".to_string(),
            0,
            "flow",
            None,
            Arc::new(HashMap::new()),
            exec.cancellation_token().clone(),
        );

        assert!(!step.is_cancelled());
        token.cancel();
        step.cancelled().await;
        assert!(step.is_cancelled());
    }

    #[test]
    fn test_detached_has_no_identity() {
        let ctx = StepContext::detached();
        assert!(ctx.node_id().is_none());
        assert!(ctx.execution_id().is_none());
    }
}
