//! Demo graph driven by the CLI
//!
//! ```text
//! addition_1 (+1) ──▶ addition_2 (+2) ──sum < 10──▶ addition_1
//!                           │
//!                           └──sum >= 10──▶ approve ──▶ end
//! ```
//!
//! `approve` pauses for a `decision` answer of `approve` or `reject`.

use flowgraph_core::{interrupt_for_choice, node_fn, router_fn, Graph, GraphBuilder, Noop, Result};
use serde::{Deserialize, Serialize};

pub const FLOW_NAME: &str = "number_play";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub sum: i64,
    pub decision: Option<String>,
}

pub fn graph() -> Result<Graph<Tally>> {
    GraphBuilder::<Tally>::new()
        .add_node(
            "addition_1",
            node_fn(|_, tally: &mut Tally| {
                tally.sum += 1;
                Ok(())
            }),
        )
        .add_node(
            "addition_2",
            node_fn(|_, tally: &mut Tally| {
                tally.sum += 2;
                Ok(())
            }),
        )
        .add_node(
            "approve",
            node_fn(|ctx, tally: &mut Tally| {
                let message = format!("Accept the final sum of {}?", tally.sum);
                let decision = interrupt_for_choice(ctx, message, "decision", ["approve", "reject"])?;
                tally.decision = Some(decision);
                Ok(())
            }),
        )
        .add_node("end", Noop)
        .add_edge("addition_1", "addition_2")
        .add_conditional_edge(
            "addition_2",
            router_fn(|tally: &Tally| {
                if tally.sum < 10 {
                    "continue".to_string()
                } else {
                    "review".to_string()
                }
            }),
            [("continue", "addition_1"), ("review", "approve")],
        )
        .add_edge("approve", "end")
        .set_start_node("addition_1")
        .build()
}
