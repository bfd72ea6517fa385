// ledger-core/src/transaction.rs

use crate::{types::*, LedgerError, LedgerResult};
use ledger_crypto::{canonical, digest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque key-value payload carried by a transaction
pub type Payload = Map<String, Value>;

/// World-mutating actions observed upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    /// A new agent was born from text
    Add,
    /// Two agents were merged into a hybrid
    Merge,
    /// The world state was exported
    Export,
    /// The world was wiped
    Clear,
    /// A world state was imported wholesale
    Import,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Add => "ADD",
            TxKind::Merge => "MERGE",
            TxKind::Export => "EXPORT",
            TxKind::Clear => "CLEAR",
            TxKind::Import => "IMPORT",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TxKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADD" => Ok(TxKind::Add),
            "MERGE" => Ok(TxKind::Merge),
            "EXPORT" => Ok(TxKind::Export),
            "CLEAR" => Ok(TxKind::Clear),
            "IMPORT" => Ok(TxKind::Import),
            other => Err(LedgerError::MalformedTransaction(format!(
                "unknown kind {other}"
            ))),
        }
    }
}

/// Pending transaction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// `digest(kind | canonical(payload) | submitted_at)`
    pub id: TxId,
    pub kind: TxKind,
    pub payload: Payload,
    pub submitted_at: Timestamp,
}

impl Transaction {
    /// Build a transaction stamped with the current time.
    ///
    /// The payload must serialize to a JSON object.
    pub fn new<P: Serialize + ?Sized>(kind: TxKind, payload: &P) -> LedgerResult<Self> {
        Self::with_timestamp(kind, payload, current_timestamp())
    }

    pub fn with_timestamp<P: Serialize + ?Sized>(
        kind: TxKind,
        payload: &P,
        submitted_at: Timestamp,
    ) -> LedgerResult<Self> {
        let value = serde_json::to_value(payload)
            .map_err(|e| LedgerError::MalformedTransaction(e.to_string()))?;
        let payload = match value {
            Value::Object(map) => map,
            other => {
                return Err(LedgerError::MalformedTransaction(format!(
                    "payload must be a key-value mapping, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let id = compute_id(kind, &payload, submitted_at)?;
        Ok(Self {
            id,
            kind,
            payload,
            submitted_at,
        })
    }

    /// Recompute the id from the record's content
    pub fn compute_id(&self) -> LedgerResult<TxId> {
        compute_id(self.kind, &self.payload, self.submitted_at)
    }

    /// Check that the stored id matches the content
    pub fn validate_id(&self) -> LedgerResult<()> {
        let expected = self.compute_id()?;
        if expected != self.id {
            return Err(LedgerError::MalformedTransaction(format!(
                "id {} does not match content (expected {})",
                self.id, expected
            )));
        }
        Ok(())
    }
}

fn compute_id(kind: TxKind, payload: &Payload, submitted_at: Timestamp) -> LedgerResult<TxId> {
    let body = canonical(payload)
        .map_err(|e| LedgerError::MalformedTransaction(e.to_string()))?;
    let body = String::from_utf8(body)
        .map_err(|e| LedgerError::MalformedTransaction(e.to_string()))?;
    Ok(digest(format!("{kind}|{body}|{submitted_at}")))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_transaction_creation() {
        let tx = Transaction::new(TxKind::Add, &json!({"text": "sun"})).unwrap();
        assert_eq!(tx.kind, TxKind::Add);
        assert_eq!(tx.payload["text"], "sun");
        assert!(tx.validate_id().is_ok());
    }

    #[test]
    fn test_id_is_content_and_time_bound() {
        let a = Transaction::with_timestamp(TxKind::Add, &json!({"text": "sun"}), 10).unwrap();
        let b = Transaction::with_timestamp(TxKind::Add, &json!({"text": "sun"}), 10).unwrap();
        let later = Transaction::with_timestamp(TxKind::Add, &json!({"text": "sun"}), 11).unwrap();
        let other_kind =
            Transaction::with_timestamp(TxKind::Merge, &json!({"text": "sun"}), 10).unwrap();

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, later.id);
        assert_ne!(a.id, other_kind.id);
    }

    #[test]
    fn test_id_ignores_key_order() {
        let mut first = HashMap::new();
        first.insert("a", 1);
        first.insert("b", 2);
        let second = json!({"b": 2, "a": 1});

        let x = Transaction::with_timestamp(TxKind::Import, &first, 5).unwrap();
        let y = Transaction::with_timestamp(TxKind::Import, &second, 5).unwrap();
        assert_eq!(x.id, y.id);
    }

    #[test]
    fn test_id_preimage_layout() {
        let tx = Transaction::with_timestamp(TxKind::Add, &json!({"text": "sun"}), 42).unwrap();
        assert_eq!(tx.id, digest(r#"ADD|{"text":"sun"}|42"#));
    }

    #[test]
    fn test_non_mapping_payload_rejected() {
        let err = Transaction::new(TxKind::Add, &json!(["not", "a", "map"])).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedTransaction(_)));

        let err = Transaction::new(TxKind::Add, "plain string").unwrap_err();
        assert!(matches!(err, LedgerError::MalformedTransaction(_)));
    }

    #[test]
    fn test_non_string_keys_rejected() {
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], "x");
        let err = Transaction::new(TxKind::Add, &bad).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedTransaction(_)));
    }

    #[test]
    fn test_tampered_id_detected() {
        let mut tx = Transaction::new(TxKind::Clear, &json!({})).unwrap();
        tx.payload.insert("extra".into(), json!(true));
        assert!(tx.validate_id().is_err());
    }

    #[test]
    fn test_kind_wire_format() {
        assert_eq!(serde_json::to_string(&TxKind::Export).unwrap(), "\"EXPORT\"");
        assert_eq!("merge".parse::<TxKind>().unwrap(), TxKind::Merge);
        assert!("teleport".parse::<TxKind>().is_err());
    }
}
