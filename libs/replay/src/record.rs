use serde::{Deserialize, Serialize};

use crate::ReplayError;

/// One event read from a single line of the source file.
///
/// Any well-formed JSON value is accepted; in practice every line is an
/// object. Records are never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(serde_json::Value);

impl Record {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Compact JSON, the wire payload handed to the publisher.
    /// Never contains a raw newline, so line framing stays valid.
    pub fn to_payload(&self) -> Result<Vec<u8>, ReplayError> {
        serde_json::to_vec(&self.0).map_err(ReplayError::Serialize)
    }
}

impl From<serde_json::Value> for Record {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}
