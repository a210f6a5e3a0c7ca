//! Mermaid rendering of a [`Graph`]
//!
//! ```text
//! graph TD
//!     addition_1(["addition_1"])
//!     addition_2["addition_2"]
//!     end_(("end"))
//!     addition_1 --> addition_2
//!     addition_2 -.->|continue| addition_1
//!     addition_2 -.->|end| end_
//! ```
//!
//! - The start node is drawn as a stadium and styled green.
//! - Terminal nodes are drawn as circles and styled red.
//! - Conditional branches are dashed and labelled with their key.
//!
//! Node and branch order is sorted, so the output is stable across runs.

use crate::edge::EdgeResolver;
use crate::graph::Graph;
use std::fmt::Write;

impl<S> Graph<S> {
    /// Render as a mermaid `graph TD` diagram
    pub fn to_mermaid(&self) -> String {
        self.render_mermaid(None)
    }

    /// [`to_mermaid`](Self::to_mermaid) with a title node at the top
    pub fn to_mermaid_with_title(&self, title: &str) -> String {
        self.render_mermaid(Some(title))
    }

    fn render_mermaid(&self, title: Option<&str>) -> String {
        let mut out = String::from("graph TD\n");

        if let Some(title) = title {
            let _ = writeln!(out, "    title[\"{}\"]", escape_label(title));
        }

        for id in self.node_ids() {
            let label = escape_label(id);
            let node = sanitize_id(id);
            let _ = if id == self.start() {
                writeln!(out, "    {}([\"{}\"])", node, label)
            } else if self.is_terminal(id) {
                writeln!(out, "    {}((\"{}\"))", node, label)
            } else {
                writeln!(out, "    {}[\"{}\"]", node, label)
            };
        }

        for id in self.node_ids() {
            let from = sanitize_id(id);
            match self.edge(id) {
                Some(EdgeResolver::Const(to)) => {
                    let _ = writeln!(out, "    {} --> {}", from, sanitize_id(to));
                }
                Some(EdgeResolver::Conditional { redirections, .. }) => {
                    for (key, to) in redirections {
                        let _ = writeln!(
                            out,
                            "    {} -.->|{}| {}",
                            from,
                            escape_label(key),
                            sanitize_id(to)
                        );
                    }
                }
                None => {}
            }
        }

        let _ = writeln!(
            out,
            "    style {} fill:#90EE90,stroke:#228B22,stroke-width:2px",
            sanitize_id(self.start())
        );
        for id in self.terminal_nodes() {
            let _ = writeln!(
                out,
                "    style {} fill:#FFB6C1,stroke:#DC143C,stroke-width:2px",
                sanitize_id(id)
            );
        }

        out
    }
}

fn escape_label(s: &str) -> String {
    s.replace('"', "#quot;").replace('|', "#124;")
}

/// Mermaid ids: alphanumerics and underscores only, and `end` is reserved
fn sanitize_id(s: &str) -> String {
    let id: String = s
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if id.eq_ignore_ascii_case("end") || id.is_empty() {
        format!("{}_", id)
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::GraphBuilder;
    use crate::graph::Graph;
    use crate::node::{router_fn, Noop};

    fn number_play() -> Graph<i64> {
        GraphBuilder::<i64>::new()
            .add_node("addition_1", Noop)
            .add_node("addition_2", Noop)
            .add_node("end", Noop)
            .add_edge("addition_1", "addition_2")
            .add_conditional_edge(
                "addition_2",
                router_fn(|_: &i64| "end".to_string()),
                [("continue", "addition_1"), ("end", "end")],
            )
            .set_start_node("addition_1")
            .build()
            .unwrap()
    }

    #[test]
    fn test_mermaid_edges_and_shapes() {
        let mermaid = number_play().to_mermaid();

        assert!(mermaid.starts_with("graph TD\n"));
        assert!(mermaid.contains("addition_1([\"addition_1\"])"));
        assert!(mermaid.contains("addition_2[\"addition_2\"]"));
        assert!(mermaid.contains("end_((\"end\"))"));
        assert!(mermaid.contains("addition_1 --> addition_2"));
        assert!(mermaid.contains("addition_2 -.->|continue| addition_1"));
        assert!(mermaid.contains("addition_2 -.->|end| end_"));
        assert!(mermaid.contains("style end_ fill:#FFB6C1"));
    }

    #[test]
    fn test_mermaid_is_stable() {
        let graph = number_play();
        assert_eq!(graph.to_mermaid(), graph.to_mermaid());
    }

    #[test]
    fn test_ids_are_sanitized() {
        let graph = GraphBuilder::<()>::new()
            .add_node("load data", Noop)
            .add_node("save-it", Noop)
            .add_edge("load data", "save-it")
            .set_start_node("load data")
            .build()
            .unwrap();

        let mermaid = graph.to_mermaid_with_title("Pipeline \"v2\"");
        assert!(mermaid.contains("title[\"Pipeline #quot;v2#quot;\"]"));
        assert!(mermaid.contains("load_data --> save_it"));
        assert!(mermaid.contains("save_it((\"save-it\"))"));
    }
}
