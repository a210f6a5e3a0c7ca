//! Human-in-the-loop interrupts raised from inside a node
//!
//! A node that needs input calls [`interrupt`] (or [`interrupt_with_validation`]) with
//! the answers it requires. The first time through, no answers exist for the node, so
//! the call returns `Err(GraphError::Interrupted(..))`; the node propagates it with `?`
//! and the engine records it as the checkpoint's pending interrupt.
//!
//! When the run is resumed with valid answers, the *same* node executes again. This
//! time the helper finds the resolved interrupt for the node's id in the
//! [`StepContext`] and returns the answers instead.
//!
//! ```text
//! invoke ──▶ node ──interrupt()──▶ Err(Interrupted) ──▶ checkpoint.interrupt = Some(..)
//!                                                         │ paused
//! resume(answers) ──validate requirements──▶ node ──interrupt()──▶ Ok(answers)
//! ```
//!
//! # Example
//!
//! ```rust
//! use flowgraph_core::{interrupt, Node, Requirement, Requirements, Result, StepContext};
//! use async_trait::async_trait;
//!
//! struct Approve;
//!
//! #[async_trait]
//! impl Node<Vec<String>> for Approve {
//!     async fn execute(&self, ctx: &StepContext, log: &mut Vec<String>) -> Result<()> {
//!         let answers = interrupt(
//!             ctx,
//!             "Approve the transfer?",
//!             "approval",
//!             Requirements::new().with("decision", Requirement::one_of(["approve", "reject"])),
//!         )?;
//!         log.push(answers["decision"].clone());
//!         Ok(())
//!     }
//! }
//! ```

use crate::context::StepContext;
use crate::error::{GraphError, Result};
use flowgraph_checkpoint::{HitlInterrupt, InterruptId, Requirement, Requirements};
use std::collections::HashMap;
use std::fmt::Display;
use uuid::Uuid;

/// Ask for input, or return the answers supplied on resume
pub fn interrupt(
    ctx: &StepContext,
    message: impl Into<String>,
    reason: impl Into<String>,
    requirements: Requirements,
) -> Result<HashMap<String, String>> {
    interrupt_with_validation(ctx, message, reason, requirements, |_| Ok::<(), String>(()))
}

/// Like [`interrupt`], but run `validate` over resumed answers first.
///
/// If `validate` fails, the stored interrupt is raised again with its
/// `validation_error` set, pausing at the same node until corrected answers arrive.
pub fn interrupt_with_validation<F, E>(
    ctx: &StepContext,
    message: impl Into<String>,
    reason: impl Into<String>,
    requirements: Requirements,
    validate: F,
) -> Result<HashMap<String, String>>
where
    F: FnOnce(&HashMap<String, String>) -> std::result::Result<(), E>,
    E: Display,
{
    // No identity means the call did not come from a step the engine set up
    let node_id = ctx.node_id().ok_or_else(|| {
        GraphError::NodeContext("interrupt requested outside of a node step".to_string())
    })?;

    if let Some(resolved) = ctx.resolved_interrupt(node_id) {
        return match validate(&resolved.values) {
            Ok(()) => Ok(resolved.values.clone()),
            Err(e) => {
                tracing::info!(node = %node_id, error = %e, "Resumed answers rejected by node");
                Err(GraphError::Interrupted(
                    resolved.interrupt.clone().with_validation_error(e.to_string()),
                ))
            }
        };
    }

    Err(GraphError::Interrupted(HitlInterrupt {
        reason: reason.into(),
        message: message.into(),
        validation_error: None,
        requirements,
        interrupt_id: InterruptId::new(node_id, Uuid::new_v4().simple().to_string()),
    }))
}

/// Ask the user to pick one of `options`; returns the chosen value
pub fn interrupt_for_choice<I, T>(
    ctx: &StepContext,
    message: impl Into<String>,
    key: &str,
    options: I,
) -> Result<String>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let mut answers = interrupt(
        ctx,
        message,
        "choice",
        Requirements::new().with(key, Requirement::one_of(options)),
    )?;
    answers
        .remove(key)
        .ok_or_else(|| {
            GraphError::NodeContext(format!(
                "resolved answers for {} lack key {}",
                ctx.node_id().unwrap_or_default(),
                key
            ))
        })
}

impl StepContext {
    /// Method form of [`interrupt`]
    pub fn interrupt(
        &self,
        message: impl Into<String>,
        reason: impl Into<String>,
        requirements: Requirements,
    ) -> Result<HashMap<String, String>> {
        interrupt(self, message, reason, requirements)
    }

    /// Method form of [`interrupt_with_validation`]
    pub fn interrupt_with_validation<F, E>(
        &self,
        message: impl Into<String>,
        reason: impl Into<String>,
        requirements: Requirements,
        validate: F,
    ) -> Result<HashMap<String, String>>
    where
        F: FnOnce(&HashMap<String, String>) -> std::result::Result<(), E>,
        E: Display,
    {
        interrupt_with_validation(self, message, reason, requirements, validate)
    }
}
