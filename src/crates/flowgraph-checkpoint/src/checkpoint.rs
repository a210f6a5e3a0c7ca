//! Persisted execution cursor and human-in-the-loop interrupt records
//!
//! The types in this module form the serialized compatibility surface of an execution:
//!
//! ```text
//! ExecutionState
//! ├─ checkpoint_state: CheckpointState
//! │    ├─ checkpoint_id       current node id
//! │    ├─ visited             every node executed, in order (repeats on cycles)
//! │    ├─ interrupt           pending HitlInterrupt, null when none
//! │    └─ interrupt_history   resolved interrupts with the answers supplied
//! └─ application_state: S     opaque caller state
//! ```
//!
//! Field names are stable; external stores may rely on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Node identifier, unique within a graph
pub type NodeId = String;

/// Identity of one interrupt: the node that raised it plus a unique token
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterruptId {
    pub node_id: NodeId,
    pub id: String,
}

impl InterruptId {
    pub fn new(node_id: impl Into<NodeId>, id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for InterruptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.id)
    }
}

/// How a supplied answer is checked on resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    /// Answer must be one of the suggestions
    Enum,
    /// Free-form answer
    Custom,
    /// Free-form answer; suggestions are hints only
    CustomWithSuggestions,
}

/// Expected shape of one externally supplied answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(rename = "type")]
    pub kind: RequirementType,
    pub suggestions: Vec<String>,
}

impl Requirement {
    /// An answer restricted to `options`
    pub fn one_of<I, T>(options: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            kind: RequirementType::Enum,
            suggestions: options.into_iter().map(Into::into).collect(),
        }
    }

    /// A free-form answer
    pub fn custom() -> Self {
        Self {
            kind: RequirementType::Custom,
            suggestions: Vec::new(),
        }
    }

    /// A free-form answer with hints
    pub fn custom_with_suggestions<I, T>(suggestions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            kind: RequirementType::CustomWithSuggestions,
            suggestions: suggestions.into_iter().map(Into::into).collect(),
        }
    }

    /// Check a single answer against this requirement
    pub fn accepts(&self, answer: &str) -> bool {
        match self.kind {
            RequirementType::Enum => self.suggestions.iter().any(|s| s == answer),
            RequirementType::Custom | RequirementType::CustomWithSuggestions => true,
        }
    }
}

/// A supplied answer set failed the requirements of a pending interrupt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementViolation {
    #[error("key {key} not found in interrupt response")]
    Missing { key: String },

    #[error("invalid value for {key}: {value}, need one of {allowed:?}")]
    NotAllowed {
        key: String,
        value: String,
        allowed: Vec<String>,
    },
}

/// Required answers keyed by logical field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requirements(BTreeMap<String, Requirement>);

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a requirement, builder style
    pub fn with(mut self, key: impl Into<String>, requirement: Requirement) -> Self {
        self.0.insert(key.into(), requirement);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, requirement: Requirement) {
        self.0.insert(key.into(), requirement);
    }

    pub fn get(&self, key: &str) -> Option<&Requirement> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Requirement)> {
        self.0.iter()
    }

    /// Validate `answers` and return only the required keys.
    ///
    /// Every required key must be present; `enum` answers must be one of the
    /// suggestions. Keys are checked in sorted order so the reported violation
    /// is stable.
    pub fn validate(
        &self,
        answers: &HashMap<String, String>,
    ) -> std::result::Result<HashMap<String, String>, RequirementViolation> {
        let mut accepted = HashMap::with_capacity(self.0.len());

        for (key, requirement) in &self.0 {
            let answer = answers
                .get(key)
                .ok_or_else(|| RequirementViolation::Missing { key: key.clone() })?;

            if !requirement.accepts(answer) {
                return Err(RequirementViolation::NotAllowed {
                    key: key.clone(),
                    value: answer.clone(),
                    allowed: requirement.suggestions.clone(),
                });
            }

            accepted.insert(key.clone(), answer.clone());
        }

        Ok(accepted)
    }
}

impl FromIterator<(String, Requirement)> for Requirements {
    fn from_iter<I: IntoIterator<Item = (String, Requirement)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A node's request for human input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitlInterrupt {
    pub reason: String,
    pub message: String,
    /// Set when answers supplied on resume failed the node's own validation
    pub validation_error: Option<String>,
    pub requirements: Requirements,
    pub interrupt_id: InterruptId,
}

impl HitlInterrupt {
    /// Id of the node that raised the interrupt
    pub fn node_id(&self) -> &str {
        &self.interrupt_id.node_id
    }

    pub fn with_validation_error(mut self, error: impl Into<String>) -> Self {
        self.validation_error = Some(error.into());
        self
    }
}

impl fmt::Display for HitlInterrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow interrupted: {}", self.reason)?;
        if let Some(err) = &self.validation_error {
            write!(f, " (validation failed: {})", err)?;
        }
        Ok(())
    }
}

/// An interrupt together with the answers that resolved it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHitlInterrupt {
    pub interrupt: HitlInterrupt,
    pub values: HashMap<String, String>,
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedHitlInterrupt {
    pub fn new(interrupt: HitlInterrupt, values: HashMap<String, String>) -> Self {
        Self {
            interrupt,
            values,
            resolved_at: Utc::now(),
        }
    }
}

/// Execution cursor needed to resume a paused run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Node the run is at; empty before the first step
    pub checkpoint_id: NodeId,
    pub visited: Vec<NodeId>,
    pub interrupt: Option<HitlInterrupt>,
    pub interrupt_history: Vec<ResolvedHitlInterrupt>,
}

impl CheckpointState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor positioned at `node_id` with no history
    pub fn at(node_id: impl Into<NodeId>) -> Self {
        Self {
            checkpoint_id: node_id.into(),
            ..Self::default()
        }
    }

    /// True once a run has started from this checkpoint
    pub fn is_started(&self) -> bool {
        !self.checkpoint_id.is_empty()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_some()
    }
}

/// Identity of one execution instance, unique per store
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionId {
    pub id: String,
    pub flow_name: String,
}

impl ExecutionId {
    pub fn new(id: impl Into<String>, flow_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            flow_name: flow_name.into(),
        }
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.flow_name)
    }
}

/// Full persisted snapshot: checkpoint cursor plus application state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState<S> {
    pub checkpoint_state: CheckpointState,
    pub application_state: S,
}

impl<S> ExecutionState<S> {
    pub fn new(checkpoint_state: CheckpointState, application_state: S) -> Self {
        Self {
            checkpoint_state,
            application_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approval() -> Requirements {
        Requirements::new()
            .with("decision", Requirement::one_of(["approve", "reject"]))
            .with("comment", Requirement::custom())
    }

    #[test]
    fn test_validate_accepts_complete_answers() {
        let answers = HashMap::from([
            ("decision".to_string(), "approve".to_string()),
            ("comment".to_string(), "looks fine".to_string()),
            ("extra".to_string(), "ignored".to_string()),
        ]);

        let accepted = approval().validate(&answers).unwrap();
        assert_eq!(accepted.len(), 2);
        assert_eq!(accepted["decision"], "approve");
        assert!(!accepted.contains_key("extra"));
    }

    #[test]
    fn test_validate_missing_key() {
        let answers = HashMap::from([("decision".to_string(), "approve".to_string())]);

        let err = approval().validate(&answers).unwrap_err();
        assert_eq!(
            err,
            RequirementViolation::Missing {
                key: "comment".to_string()
            }
        );
    }

    #[test]
    fn test_validate_enum_outside_suggestions() {
        let answers = HashMap::from([
            ("decision".to_string(), "maybe".to_string()),
            ("comment".to_string(), String::new()),
        ]);

        let err = approval().validate(&answers).unwrap_err();
        assert!(matches!(err, RequirementViolation::NotAllowed { ref key, .. } if key == "decision"));
        assert!(err.to_string().contains("need one of"));
    }

    #[test]
    fn test_custom_with_suggestions_accepts_anything() {
        let req = Requirement::custom_with_suggestions(["red", "blue"]);
        assert!(req.accepts("green"));
    }

    #[test]
    fn test_execution_state_wire_shape() {
        let mut checkpoint = CheckpointState::at("review");
        checkpoint.visited.push("review".to_string());
        checkpoint.interrupt = Some(HitlInterrupt {
            reason: "approval".to_string(),
            message: "approve the payout?".to_string(),
            validation_error: None,
            requirements: Requirements::new().with("decision", Requirement::one_of(["yes", "no"])),
            interrupt_id: InterruptId::new("review", "abc"),
        });

        let state = ExecutionState::new(checkpoint, json!({"sum": 3}));
        let value = serde_json::to_value(&state).unwrap();

        assert_eq!(value["checkpoint_state"]["checkpoint_id"], "review");
        assert_eq!(value["checkpoint_state"]["visited"], json!(["review"]));
        assert_eq!(value["checkpoint_state"]["interrupt"]["interrupt_id"]["node_id"], "review");
        assert_eq!(
            value["checkpoint_state"]["interrupt"]["requirements"]["decision"]["type"],
            "enum"
        );
        assert_eq!(value["checkpoint_state"]["interrupt"]["validation_error"], json!(null));
        assert_eq!(value["checkpoint_state"]["interrupt_history"], json!([]));
        assert_eq!(value["application_state"]["sum"], 3);
    }

    #[test]
    fn test_zero_state_has_no_interrupt() {
        let state: ExecutionState<i64> = ExecutionState::default();
        assert!(!state.checkpoint_state.is_started());
        assert!(!state.checkpoint_state.is_interrupted());
        assert_eq!(state.application_state, 0);
    }

    #[test]
    fn test_interrupt_display() {
        let interrupt = HitlInterrupt {
            reason: "needs input".to_string(),
            message: String::new(),
            validation_error: None,
            requirements: Requirements::new(),
            interrupt_id: InterruptId::new("n", "1"),
        }
        .with_validation_error("too short");

        assert_eq!(
            interrupt.to_string(),
            "flow interrupted: needs input (validation failed: too short)"
        );
        assert_eq!(interrupt.interrupt_id.to_string(), "n:1");
    }
}
