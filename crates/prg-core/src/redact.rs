use serde_json::{Map, Value};

/// Marker written in place of values held under sensitive-looking keys.
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEY_TOKENS: [&str; 5] = ["password", "secret", "token", "api_key", "credential"];

/// Redact a structured evidence value before it is hashed or persisted.
///
/// Any mapping key whose lowercased form contains a sensitive token has its
/// value replaced with [`REDACTED`]. Nested mappings and sequences are walked
/// unconditionally; scalar leaves pass through unchanged.
pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        other => other.clone(),
    }
}

fn sanitize_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut sanitized = Map::new();
    for (key, value) in map {
        let key_lower = key.to_lowercase();
        if SENSITIVE_KEY_TOKENS.iter().any(|token| key_lower.contains(token)) {
            sanitized.insert(key.clone(), Value::String(REDACTED.to_string()));
        } else {
            sanitized.insert(key.clone(), sanitize_value(value));
        }
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_sensitive_keys_case_insensitively() {
        let v = json!({"API_Key": "abc", "Password": "hunter2", "note": "fine"});
        let s = sanitize_value(&v);
        assert_eq!(s["API_Key"], REDACTED);
        assert_eq!(s["Password"], REDACTED);
        assert_eq!(s["note"], "fine");
    }

    #[test]
    fn redacts_substring_matches() {
        let v = json!({"db_password_hash": "x", "service_token_id": "y"});
        let s = sanitize_value(&v);
        assert_eq!(s["db_password_hash"], REDACTED);
        assert_eq!(s["service_token_id"], REDACTED);
    }

    #[test]
    fn walks_nested_mappings_and_sequences() {
        let v = json!({
            "outer": [{"secret": "s1"}, {"inner": {"credential": "c1", "ok": 1}}]
        });
        let s = sanitize_value(&v);
        assert_eq!(s["outer"][0]["secret"], REDACTED);
        assert_eq!(s["outer"][1]["inner"]["credential"], REDACTED);
        assert_eq!(s["outer"][1]["inner"]["ok"], 1);
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(sanitize_value(&json!(42)), json!(42));
        assert_eq!(sanitize_value(&json!("password")), json!("password"));
        assert_eq!(sanitize_value(&Value::Null), Value::Null);
    }

    #[test]
    fn redacted_subtree_is_dropped_entirely() {
        // The whole value under a sensitive key is replaced, even if nested.
        let v = json!({"credentials": {"user": "u", "pass": "p"}});
        let s = sanitize_value(&v);
        assert_eq!(s["credentials"], REDACTED);
    }
}
