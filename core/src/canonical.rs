//! Canonical JSON hashing.
//!
//! Grounded on `tos_common::arbitration::message`'s `canonicalize_json_value`
//! / `canonical_hash` helpers: sort object keys recursively before
//! serializing so two independent implementations of the same struct hash
//! to the same bytes regardless of field-declaration order or serde's
//! iteration order over a map.

use serde::Serialize;
use serde_json::Value;

use crate::crypto::Hash;

pub fn canonicalize_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            for (k, mut v) in entries {
                canonicalize_json_value(&mut v);
                map.insert(k, v);
            }
        }
        Value::Array(items) => {
            for item in items {
                canonicalize_json_value(item);
            }
        }
        _ => {}
    }
}

pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut json = serde_json::to_value(value)?;
    canonicalize_json_value(&mut json);
    serde_json::to_vec(&json)
}

/// Hash `value`'s canonical JSON encoding under a domain-separation tag.
pub fn canonical_hash<T: Serialize>(
    domain_tag: &[u8],
    value: &T,
) -> Result<Hash, serde_json::Error> {
    let bytes = canonical_json_bytes(value)?;
    Ok(crate::crypto::domain_hash(domain_tag, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalization_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        let mut a = a;
        let mut b = b;
        canonicalize_json_value(&mut a);
        canonicalize_json_value(&mut b);
        assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
    }

    #[test]
    fn hash_is_deterministic() {
        let value = json!({"x": 1, "y": [1, 2, 3]});
        let h1 = canonical_hash(b"TEST", &value).unwrap();
        let h2 = canonical_hash(b"TEST", &value).unwrap();
        assert_eq!(h1, h2);
    }
}
