//! Encodings for persisted execution snapshots

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

/// Protocol for turning snapshots into bytes and back
///
/// Implementations pick the on-disk format used by file-backed stores.
pub trait SerializerProtocol: Send + Sync {
    /// File extension for payloads written with this serializer
    fn extension(&self) -> &'static str;

    /// Serialize a value to bytes
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes
    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}

/// JSON serializer (default); keeps the documented field names readable
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl SerializerProtocol for JsonSerializer {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(value)?)
    }

    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Compact binary serializer using bincode
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeSerializer;

impl BincodeSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl SerializerProtocol for BincodeSerializer {
    fn extension(&self) -> &'static str {
        "bin"
    }

    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn loads<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        Ok(bincode::deserialize(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{
        CheckpointState, ExecutionState, HitlInterrupt, InterruptId, Requirement, Requirements,
        ResolvedHitlInterrupt,
    };
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Ledger {
        sum: i64,
        entries: Vec<String>,
    }

    fn snapshot() -> ExecutionState<Ledger> {
        let interrupt = HitlInterrupt {
            reason: "approval".to_string(),
            message: "ok?".to_string(),
            validation_error: Some("try again".to_string()),
            requirements: Requirements::new().with("decision", Requirement::one_of(["y", "n"])),
            interrupt_id: InterruptId::new("gate", "1"),
        };
        let mut checkpoint = CheckpointState::at("gate");
        checkpoint.visited = vec!["start".to_string(), "gate".to_string()];
        checkpoint.interrupt_history.push(ResolvedHitlInterrupt::new(
            interrupt.clone(),
            HashMap::from([("decision".to_string(), "y".to_string())]),
        ));
        checkpoint.interrupt = Some(interrupt);

        ExecutionState::new(
            checkpoint,
            Ledger {
                sum: 12,
                entries: vec!["a".to_string()],
            },
        )
    }

    #[test]
    fn test_json_snapshot_is_readable() {
        let bytes = JsonSerializer::new().dumps(&snapshot()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("\"checkpoint_state\""));
        assert!(text.contains("\"interrupt_history\""));
        assert_eq!(JsonSerializer.extension(), "json");
    }

    #[test]
    fn test_bincode_preserves_snapshot() {
        let serializer = BincodeSerializer::new();
        let original = snapshot();

        let bytes = serializer.dumps(&original).unwrap();
        let restored: ExecutionState<Ledger> = serializer.loads(&bytes).unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn test_json_rejects_garbage() {
        let result: Result<ExecutionState<Ledger>> = JsonSerializer.loads(b"not json");
        assert!(result.is_err());
    }
}
