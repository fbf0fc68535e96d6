use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

const DEFAULT_REDACTION: &str = "[REDACTED]";

static SENSITIVE_KEYS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "access_token",
        "accesstoken",
        "refresh_token",
        "refreshtoken",
        "client_secret",
        "clientsecret",
        "authorization",
        "code",
        "secret",
        "password",
    ]
    .into_iter()
    .collect()
});

static INLINE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(Bearer)\s+([A-Za-z0-9._~+/=-]{6,})").expect("inline redaction regex"),
            "$1 ***REDACTED***",
        ),
        (
            Regex::new(
                r#"\b(access[_-]?token|refresh[_-]?token|client[_-]?secret|code)=([^&\s"']+)"#,
            )
            .expect("inline redaction regex"),
            "$1=***REDACTED***",
        ),
    ]
});

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_lowercase();
    if normalized.is_empty() {
        return false;
    }
    SENSITIVE_KEYS.contains(normalized.as_str())
        || normalized.ends_with("_token")
        || normalized.ends_with("secret")
}

pub fn redact_text(value: &str) -> String {
    let mut out = value.to_string();
    for (re, replacement) in INLINE_PATTERNS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *replacement).to_string();
        }
    }
    out
}

/// Copies `value` with every sensitive key masked and inline credentials
/// scrubbed from string leaves.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(redact_text(text)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, entry)| {
                    let masked = if is_sensitive_key(key) && !entry.is_null() {
                        Value::String(DEFAULT_REDACTION.to_string())
                    } else {
                        redact_value(entry)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_token_keys_at_any_depth() {
        let input = serde_json::json!({
            "name": "get_matters",
            "arguments": {"access_token": "abc", "limit": 5},
            "grant": {"refresh_token": "r1", "client_secret": "s"}
        });
        let out = redact_value(&input);
        assert_eq!(out["arguments"]["access_token"], "[REDACTED]");
        assert_eq!(out["arguments"]["limit"], 5);
        assert_eq!(out["grant"]["refresh_token"], "[REDACTED]");
        assert_eq!(out["grant"]["client_secret"], "[REDACTED]");
        assert_eq!(out["name"], "get_matters");
    }

    #[test]
    fn scrubs_inline_bearer_and_form_values() {
        let text = redact_text("Authorization: Bearer abcdef123456 code=xyz&state=1");
        assert!(!text.contains("abcdef123456"));
        assert!(!text.contains("xyz"));
        assert!(text.contains("state=1"));
    }
}
