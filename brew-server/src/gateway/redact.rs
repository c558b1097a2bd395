//! Secret redaction for audit payloads
//!
//! Provider request/response payloads are stored verbatim for debugging and
//! replay analysis, except that denylisted keys are masked first. The
//! denylist is applied recursively, independent of the transport that
//! produced the payload.

use serde_json::Value;

/// Keys whose values must never reach durable storage.
const DENYLIST: &[&str] = &[
    "card_number",
    "cvv",
    "password",
    "token",
    "secret",
    "authorization",
    "api_key",
];

const MASK: &str = "[REDACTED]";

fn is_sensitive(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    DENYLIST.contains(&lower.as_str())
}

/// Return a copy of `value` with every denylisted key masked, at any depth.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if is_sensitive(k) {
                        (k.clone(), Value::String(MASK.to_string()))
                    } else {
                        (k.clone(), redact(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacts_top_level_keys() {
        let payload = json!({ "value": 1250, "card_number": "4242424242424242" });
        let clean = redact(&payload);
        assert_eq!(clean["value"], 1250);
        assert_eq!(clean["card_number"], MASK);
    }

    #[test]
    fn test_redacts_nested_and_array_payloads() {
        let payload = json!({
            "charge": { "cvv": "123", "amount": 500 },
            "attempts": [ { "token": "tok_abc", "ok": false } ]
        });
        let clean = redact(&payload);
        assert_eq!(clean["charge"]["cvv"], MASK);
        assert_eq!(clean["charge"]["amount"], 500);
        assert_eq!(clean["attempts"][0]["token"], MASK);
        assert_eq!(clean["attempts"][0]["ok"], false);
    }

    #[test]
    fn test_key_match_is_case_insensitive() {
        let payload = json!({ "Authorization": "Bearer xyz", "API_KEY": "k" });
        let clean = redact(&payload);
        assert_eq!(clean["Authorization"], MASK);
        assert_eq!(clean["API_KEY"], MASK);
    }

    #[test]
    fn test_non_listed_keys_untouched() {
        let payload = json!({ "status": "approved", "provider_id": "p_1", "values": [1, 2] });
        assert_eq!(redact(&payload), payload);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(redact(&json!(42)), json!(42));
        assert_eq!(redact(&json!("ok")), json!("ok"));
        assert_eq!(redact(&Value::Null), Value::Null);
    }
}
