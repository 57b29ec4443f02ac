use serde_json::Value;
use sha2::{Digest, Sha256};

/// Content hash of a structured value, stable across processes.
///
/// Mapping keys are sorted recursively before encoding; sequences are
/// encoded positionally. Payloads that feed hashes must stick to exact
/// scalars (integers, strings, booleans, null) so the digest never depends
/// on float formatting.
pub fn content_hash(value: &Value) -> String {
    let canonical = sort_value(value.clone());
    let bytes = serde_json::to_vec(&canonical).expect("canonical value serializable");
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn sort_value(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for k in keys {
                let child = map.get(&k).cloned().unwrap_or(Value::Null);
                sorted.insert(k, sort_value(child));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_value).collect()),
        other => other,
    }
}
