//! Deterministic, key-order-independent JSON bytes.
//!
//! Object keys are sorted lexicographically at every depth; array order is
//! preserved because it is semantic. The compact form is hash input; the
//! pretty form is what lands on disk. Both are derived from the same sorted
//! value, so whitespace never reaches a digest.

use crate::error::CanonicalError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Canonical compact bytes for any serializable value.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    let value = to_json_value(value)?;
    Ok(canonical_json_bytes(&value))
}

/// Canonical pretty-printed bytes (two-space indent, trailing newline).
pub fn canonicalize_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    let value = canonical_value(&to_json_value(value)?);
    let mut bytes =
        serde_json::to_vec_pretty(&value).map_err(|e| CanonicalError::Serialize(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Rebuild `value` with every object's keys inserted in sorted order.
pub fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                if let Some(inner) = map.get(key) {
                    out.insert(key.clone(), canonical_value(inner));
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Compact canonical encoding of an already-built JSON value.
pub fn canonical_json_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(_) => out.extend_from_slice(value.to_string().as_bytes()),
        Value::Array(items) => {
            out.push(b'[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push(b'{');
            for (idx, (key, inner)) in entries.into_iter().enumerate() {
                if idx > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(Value::String(key.clone()).to_string().as_bytes());
                out.push(b':');
                write_canonical(inner, out);
            }
            out.push(b'}');
        }
    }
}

fn to_json_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, CanonicalError> {
    serde_json::to_value(value).map_err(|e| CanonicalError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_bytes() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"y":2,"x":[1,2]}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"x":[1,2],"y":2},"b":1}"#).unwrap();
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn array_order_is_semantic() {
        let a = json!({"items": [1, 2]});
        let b = json!({"items": [2, 1]});
        assert_ne!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn compact_form_is_pinned() {
        let value = json!({"b": 1, "a": [3, {"d": true, "c": null}], "s": "q\"uote"});
        let text = String::from_utf8(canonicalize(&value).unwrap()).unwrap();
        insta::assert_snapshot!(text, @r#"{"a":[3,{"c":null,"d":true}],"b":1,"s":"q\"uote"}"#);
    }

    #[test]
    fn pretty_form_reparses_to_same_canonical_bytes() {
        let value = json!({"z": {"k": [1.5, "two"]}, "a": false});
        let pretty = canonicalize_pretty(&value).unwrap();
        assert!(pretty.ends_with(b"\n"));
        let reparsed: Value = serde_json::from_slice(&pretty).unwrap();
        assert_eq!(
            canonicalize(&reparsed).unwrap(),
            canonicalize(&value).unwrap()
        );
    }

    #[test]
    fn repeated_calls_are_identical() {
        let value = json!({"nodes": [{"id": "n1", "data": {"w": 0.25, "label": "x"}}]});
        let first = canonicalize(&value).unwrap();
        for _ in 0..8 {
            assert_eq!(canonicalize(&value).unwrap(), first);
        }
    }
}
