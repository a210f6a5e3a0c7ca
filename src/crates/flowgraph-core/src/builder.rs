//! Builder that accumulates nodes and edges and validates them into a [`Graph`]
//!
//! Edge declarations that reference unknown nodes are **skipped, not fatal**: a
//! warning is logged and the problem is kept in [`GraphBuilder::issues`]. Register
//! nodes before the edges that mention them.
//!
//! [`GraphBuilder::build`] fails with [`GraphError::Validation`] when:
//!
//! - no start node was set
//! - the start node is not registered
//! - no terminal node (one without an outgoing edge) is reachable from the start
//!
//! # Example
//!
//! ```rust
//! use flowgraph_core::{node_fn, router_fn, GraphBuilder, Noop};
//!
//! let graph = GraphBuilder::<i64>::new()
//!     .add_node("addition_1", node_fn(|_, sum: &mut i64| { *sum += 1; Ok(()) }))
//!     .add_node("addition_2", node_fn(|_, sum: &mut i64| { *sum += 2; Ok(()) }))
//!     .add_node("end", Noop)
//!     .add_edge("addition_1", "addition_2")
//!     .add_conditional_edge(
//!         "addition_2",
//!         router_fn(|sum: &i64| if *sum >= 10 { "end".to_string() } else { "continue".to_string() }),
//!         [("continue", "addition_1"), ("end", "end")],
//!     )
//!     .set_start_node("addition_1")
//!     .build()
//!     .expect("valid graph");
//!
//! assert_eq!(graph.terminal_nodes(), vec!["end"]);
//! ```

use crate::edge::EdgeResolver;
use crate::error::{GraphError, Result};
use crate::graph::{has_reachable_terminal, Graph};
use crate::node::{ConditionalNode, Node};
use flowgraph_checkpoint::NodeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Accumulates graph structure; see the [module docs](self)
pub struct GraphBuilder<S> {
    nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
    edges: HashMap<NodeId, EdgeResolver<S>>,
    start: Option<NodeId>,
    issues: Vec<String>,
}

impl<S: 'static> GraphBuilder<S> {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            start: None,
            issues: Vec::new(),
        }
    }

    /// Register a node; an existing node with the same id is replaced
    pub fn add_node(&mut self, id: impl Into<NodeId>, node: impl Node<S> + 'static) -> &mut Self {
        self.add_shared_node(id, Arc::new(node))
    }

    /// Register a node that is already reference counted
    pub fn add_shared_node(&mut self, id: impl Into<NodeId>, node: Arc<dyn Node<S>>) -> &mut Self {
        let id = id.into();
        if self.nodes.insert(id.clone(), node).is_some() {
            tracing::debug!(node = %id, "Replacing previously registered node");
        }
        self
    }

    /// Register several nodes at once
    pub fn add_nodes<I, K>(&mut self, nodes: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Arc<dyn Node<S>>)>,
        K: Into<NodeId>,
    {
        for (id, node) in nodes {
            self.add_shared_node(id, node);
        }
        self
    }

    /// Unconditional edge `from -> to`. Skipped if either node is unknown.
    pub fn add_edge(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        let from = from.into();
        let to = to.into();

        if !self.nodes.contains_key(&from) {
            self.skip(format!("start node not found: {}, skipping edge to {}", from, to));
            return self;
        }
        if !self.nodes.contains_key(&to) {
            self.skip(format!("end node not found: {}, skipping edge from {}", to, from));
            return self;
        }

        self.insert_edge(from, EdgeResolver::Const(to));
        self
    }

    /// Conditional edge leaving `from`.
    ///
    /// `router` yields a branch key which `redirections` maps to the next node.
    /// Redirections to unknown nodes are dropped; the whole edge is skipped if `from`
    /// is unknown or no redirection survives.
    pub fn add_conditional_edge<I, K, V>(
        &mut self,
        from: impl Into<NodeId>,
        router: impl ConditionalNode<S> + 'static,
        redirections: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<NodeId>,
    {
        self.add_shared_conditional_edge(from, Arc::new(router), redirections)
    }

    /// [`add_conditional_edge`](Self::add_conditional_edge) for a shared router
    pub fn add_shared_conditional_edge<I, K, V>(
        &mut self,
        from: impl Into<NodeId>,
        router: Arc<dyn ConditionalNode<S>>,
        redirections: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<NodeId>,
    {
        let from = from.into();
        if !self.nodes.contains_key(&from) {
            self.skip(format!("start node not found: {}, skipping conditional edge", from));
            return self;
        }

        let mut targets = BTreeMap::new();
        for (key, to) in redirections {
            let key = key.into();
            let to = to.into();
            if !self.nodes.contains_key(&to) {
                self.skip(format!(
                    "end node not found: {}, dropping branch '{}' from {}",
                    to, key, from
                ));
                continue;
            }
            targets.insert(key, to);
        }

        if targets.is_empty() {
            self.skip(format!("no known branch targets for {}, skipping conditional edge", from));
            return self;
        }

        self.insert_edge(from, EdgeResolver::conditional(router, targets));
        self
    }

    /// Node every fresh execution starts from. Empty ids are ignored.
    pub fn set_start_node(&mut self, id: impl Into<NodeId>) -> &mut Self {
        let id = id.into();
        if id.is_empty() {
            self.skip("start node cannot be empty, skipping".to_string());
            return self;
        }
        self.start = Some(id);
        self
    }

    /// Declarations that were skipped so far
    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    /// Validate and produce the graph. The builder stays usable afterwards.
    pub fn build(&self) -> Result<Graph<S>> {
        let start = self
            .start
            .clone()
            .ok_or_else(|| GraphError::Validation("no invocation node found".to_string()))?;

        if !self.nodes.contains_key(&start) {
            return Err(GraphError::Validation(format!(
                "start node '{}' is not registered",
                start
            )));
        }

        if !has_reachable_terminal(&start, &self.edges) {
            return Err(GraphError::Validation(
                "graph has no reachable terminal node from start: execution would loop forever"
                    .to_string(),
            ));
        }

        tracing::debug!(
            start = %start,
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            skipped = self.issues.len(),
            "Graph built"
        );

        Ok(Graph {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            start,
        })
    }

    fn insert_edge(&mut self, from: NodeId, edge: EdgeResolver<S>) {
        if self.edges.insert(from.clone(), edge).is_some() {
            tracing::debug!(node = %from, "Replacing previously declared edge");
        }
    }

    fn skip(&mut self, issue: String) {
        tracing::warn!("{}", issue);
        self.issues.push(issue);
    }
}

impl<S: 'static> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
