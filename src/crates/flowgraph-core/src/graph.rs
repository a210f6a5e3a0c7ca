//! Immutable, validated graph of nodes and edge resolvers
//!
//! A [`Graph`] is produced by [`GraphBuilder::build`](crate::GraphBuilder::build) and
//! never changes afterwards. Nodes and routers are reference counted, so a graph is
//! cheap to clone and can be shared by any number of concurrent executions.
//!
//! # Terminal nodes
//!
//! A node with no outgoing edge is **terminal**: reaching it ends the run
//! successfully. Construction requires that at least one terminal is reachable from
//! the start node when every possible branch is followed. This is a reachability
//! check only; a conditional edge that never picks its exit branch at runtime can
//! still loop forever.

use crate::edge::EdgeResolver;
use crate::node::Node;
use flowgraph_checkpoint::NodeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// A validated execution graph over application state `S`
pub struct Graph<S> {
    pub(crate) nodes: HashMap<NodeId, Arc<dyn Node<S>>>,
    pub(crate) edges: HashMap<NodeId, EdgeResolver<S>>,
    pub(crate) start: NodeId,
}

impl<S> Graph<S> {
    /// Node every fresh execution begins with
    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn node(&self, id: &str) -> Option<&Arc<dyn Node<S>>> {
        self.nodes.get(id)
    }

    /// Outgoing edge of `id`; `None` for terminal nodes
    pub fn edge(&self, id: &str) -> Option<&EdgeResolver<S>> {
        self.edges.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_terminal(&self, id: &str) -> bool {
        self.contains(id) && !self.edges.contains_key(id)
    }

    /// All node ids, sorted
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Terminal node ids, sorted
    pub fn terminal_nodes(&self) -> Vec<&str> {
        self.node_ids()
            .into_iter()
            .filter(|id| !self.edges.contains_key(*id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<S> Clone for Graph<S> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            start: self.start.clone(),
        }
    }
}

impl<S> fmt::Debug for Graph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("start", &self.start)
            .field("nodes", &self.node_ids())
            .field("edges", &self.edges)
            .finish()
    }
}

/// Depth-first search from `start` for a node without an outgoing edge.
///
/// Every statically possible successor is followed. Nodes already seen are not
/// expanded again, so cycles terminate the search instead of recursing forever.
pub(crate) fn has_reachable_terminal<S>(start: &str, edges: &HashMap<NodeId, EdgeResolver<S>>) -> bool {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }

        match edges.get(node) {
            None => return true,
            Some(resolver) => stack.extend(resolver.targets()),
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::router_fn;
    use std::collections::BTreeMap;

    fn edges(pairs: &[(&str, &str)]) -> HashMap<NodeId, EdgeResolver<i64>> {
        pairs
            .iter()
            .map(|(from, to)| (from.to_string(), EdgeResolver::constant(*to)))
            .collect()
    }

    #[test]
    fn test_single_node_is_terminal() {
        assert!(has_reachable_terminal("a", &edges(&[])));
    }

    #[test]
    fn test_chain_reaches_terminal() {
        assert!(has_reachable_terminal("a", &edges(&[("a", "b"), ("b", "c")])));
    }

    #[test]
    fn test_two_node_cycle_has_no_terminal() {
        assert!(!has_reachable_terminal("a", &edges(&[("a", "b"), ("b", "a")])));
    }

    #[test]
    fn test_self_loop_has_no_terminal() {
        assert!(!has_reachable_terminal("a", &edges(&[("a", "a")])));
    }

    #[test]
    fn test_conditional_exit_branch_counts() {
        let mut map = edges(&[("a", "b")]);
        map.insert(
            "b".to_string(),
            EdgeResolver::conditional(
                Arc::new(router_fn(|_: &i64| "loop".to_string())),
                BTreeMap::from([
                    ("loop".to_string(), "a".to_string()),
                    ("exit".to_string(), "end".to_string()),
                ]),
            ),
        );

        // The router never picks "exit", but the branch exists statically
        assert!(has_reachable_terminal("a", &map));
    }

    #[test]
    fn test_unreachable_terminal_does_not_count() {
        // "z" is terminal but nothing leads there from "a"
        let map = edges(&[("a", "b"), ("b", "a"), ("y", "z")]);
        assert!(!has_reachable_terminal("a", &map));
    }
}
