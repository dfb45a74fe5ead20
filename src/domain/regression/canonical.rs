//! Canonical JSON form and content hash.
//!
//! Object keys are sorted, volatile keys removed at every depth, `-0.0`
//! rewritten as `0.0`. Floats keep serde_json's shortest round-trip form.

use crate::domain::error::SwingscanError;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

pub fn canonicalize(value: &Value, volatile: &[String]) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(k, _)| !volatile.iter().any(|v| v == *k))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (k, v) in entries {
                out.insert(k.clone(), canonicalize(v, volatile));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| canonicalize(v, volatile)).collect()),
        Value::Number(n) if n.is_f64() && n.as_f64() == Some(0.0) => Number::from_f64(0.0)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

pub fn hash_canonical(canonical: &Value) -> Result<String, SwingscanError> {
    let json = serde_json::to_string(canonical)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 (hex, 64 chars) of the canonical JSON form of `value`.
pub fn canonical_hash<T: Serialize + ?Sized>(
    value: &T,
    volatile: &[String],
) -> Result<String, SwingscanError> {
    let value = serde_json::to_value(value)?;
    hash_canonical(&canonicalize(&value, volatile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn volatile() -> Vec<String> {
        vec!["elapsed_ms".to_string(), "generated_at".to_string()]
    }

    #[test]
    fn hash_is_64_hex_chars() {
        let hash = canonical_hash(&json!({"a": 1}), &[]).unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_order_does_not_change_hash() {
        let a: Value = serde_json::from_str(r#"{"b": 2, "a": {"y": 1, "x": [1, 2]}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": [1, 2], "y": 1}, "b": 2}"#).unwrap();
        assert_eq!(
            canonical_hash(&a, &[]).unwrap(),
            canonical_hash(&b, &[]).unwrap()
        );
    }

    #[test]
    fn volatile_keys_are_ignored_at_any_depth() {
        let a = json!({"summary": {"analyzed": 3, "elapsed_ms": 12}, "generated_at": "x"});
        let b = json!({"summary": {"analyzed": 3, "elapsed_ms": 99}, "generated_at": "y"});
        assert_eq!(
            canonical_hash(&a, &volatile()).unwrap(),
            canonical_hash(&b, &volatile()).unwrap()
        );
    }

    #[test]
    fn array_order_matters() {
        let a = json!([1, 2]);
        let b = json!([2, 1]);
        assert_ne!(canonical_hash(&a, &[]).unwrap(), canonical_hash(&b, &[]).unwrap());
    }

    #[test]
    fn negative_zero_is_normalized() {
        let a = json!({"v": -0.0});
        let b = json!({"v": 0.0});
        assert_eq!(canonical_hash(&a, &[]).unwrap(), canonical_hash(&b, &[]).unwrap());
    }

    #[test]
    fn value_changes_change_hash() {
        let a = json!({"rr": 4.0});
        let b = json!({"rr": 4.000001});
        assert_ne!(canonical_hash(&a, &[]).unwrap(), canonical_hash(&b, &[]).unwrap());
    }
}
