//! Deterministic cache keys.
//!
//! A key is the SHA-256 of a canonical JSON document holding the function
//! identity and its arguments. Object keys are sorted recursively, so
//! keyword-style arguments hash the same regardless of field order, while
//! positional arguments (arrays, tuples) keep their order.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Content-addressed cache key (lowercase hex SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from a function identity and its arguments.
    ///
    /// Fails only when the arguments cannot be represented as JSON
    /// (e.g. maps with non-string keys).
    pub fn for_call<A: Serialize + ?Sized>(name: &str, args: &A) -> Result<Self, serde_json::Error> {
        let args = canonicalize(serde_json::to_value(args)?);
        let mut doc = Map::new();
        doc.insert("args".to_string(), args);
        doc.insert("func".to_string(), Value::String(name.to_string()));
        let bytes = serde_json::to_vec(&Value::Object(doc))?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Hash arbitrary caller-supplied key material.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn prefix(&self) -> &str {
        &self.0[..16.min(self.0.len())]
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rebuild objects with their keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
