//! Redaction of tool arguments before they are written to logs.
//!
//! Tool arguments are investigation targets (usernames, domains, e-mail
//! addresses). Logs keep the shape of the request and the length of each
//! value, never the value itself.

use serde_json::Value;

/// Replace every string and number in `args` with a length-only placeholder.
///
/// Object keys, booleans and nulls are kept so a log line still shows which
/// parameters were supplied.
pub fn redact_arguments(args: &Value) -> Value {
    match args {
        Value::String(s) => Value::String(placeholder(s.chars().count())),
        Value::Number(n) => Value::String(placeholder(n.to_string().len())),
        Value::Array(items) => Value::Array(items.iter().map(redact_arguments).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), redact_arguments(value)))
                .collect(),
        ),
        Value::Bool(_) | Value::Null => args.clone(),
    }
}

fn placeholder(len: usize) -> String {
    format!("[REDACTED len={}]", len)
}
