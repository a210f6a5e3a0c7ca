//! Error types for graph construction, execution and resumption
//!
//! [`GraphError`] covers every failure the engine and driver can report:
//!
//! | Kind | Variant | Recoverable |
//! |------|---------|-------------|
//! | Construction | [`GraphError::Validation`] | fix the graph |
//! | Execution | [`GraphError::NodeExecution`], [`GraphError::UnresolvedBranch`], [`GraphError::UnknownNode`], [`GraphError::StepLimitExceeded`] | caller retries |
//! | Interrupt | [`GraphError::Interrupted`] | always, via resume |
//! | Resume validation | [`GraphError::ResumeValidation`] | resupply answers |
//! | Node context | [`GraphError::NodeContext`] | misuse of interrupt helpers |
//!
//! Only [`GraphError::Interrupted`] is a voluntary pause; the engine records it on the
//! checkpoint before returning it.

use flowgraph_checkpoint::{CheckpointError, HitlInterrupt, RequirementViolation};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Graph validation failed: {0}")]
    Validation(String),

    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        node: String,
        error: String,
    },

    #[error("Graph execution interrupted at node '{}': {}", .0.interrupt_id.node_id, .0)]
    Interrupted(HitlInterrupt),

    #[error("Resume rejected: {0}")]
    ResumeValidation(String),

    #[error("Node context error: {0}")]
    NodeContext(String),

    #[error("No branch of the edge leaving '{node}' matches key '{branch}'")]
    UnresolvedBranch {
        node: String,
        branch: String,
    },

    #[error("Node '{0}' is not registered in the graph")]
    UnknownNode(String),

    #[error("Execution exceeded the limit of {limit} steps")]
    StepLimitExceeded {
        limit: usize,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Custom(String),
}

impl GraphError {
    pub fn node_execution(node: impl Into<String>, error: impl Into<String>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.into(),
        }
    }

    pub fn unresolved_branch(node: impl Into<String>, branch: impl Into<String>) -> Self {
        Self::UnresolvedBranch {
            node: node.into(),
            branch: branch.into(),
        }
    }

    /// True for the voluntary pause raised by interrupt helpers
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }

    /// The pending interrupt, if this error is one
    pub fn as_interrupt(&self) -> Option<&HitlInterrupt> {
        match self {
            Self::Interrupted(interrupt) => Some(interrupt),
            _ => None,
        }
    }
}

impl From<RequirementViolation> for GraphError {
    fn from(violation: RequirementViolation) -> Self {
        Self::ResumeValidation(violation.to_string())
    }
}
