//! Argument extraction and sanitization shared by the built-in tools.

use serde_json::Value;

use crate::error::ToolError;
use crate::safety::{CharClass, sanitize};

/// Upper bound on a single sanitized argument.
pub const MAX_ARGUMENT_CHARS: usize = 256;

fn invalid(tool: &str, reason: impl Into<String>) -> ToolError {
    ToolError::InvalidParameters {
        name: tool.to_string(),
        reason: reason.into(),
    }
}

/// Fetch a required, non-empty string argument.
pub fn required_string<'a>(tool: &str, args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(invalid(tool, format!("missing '{}' parameter", key))),
        Some(Value::String(s)) if s.is_empty() => {
            Err(invalid(tool, format!("'{}' must not be empty", key)))
        }
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(invalid(
            tool,
            format!("'{}' must be a string, got {}", key, json_type_name(other)),
        )),
    }
}

/// Restrict `raw` to `class` and check the result is still usable as a
/// single positional argument.
pub fn sanitize_argument(
    tool: &str,
    key: &str,
    raw: &str,
    class: CharClass,
) -> Result<String, ToolError> {
    let cleaned = sanitize(raw, class);
    if cleaned.is_empty() {
        return Err(invalid(
            tool,
            format!("'{}' contains no permitted characters", key),
        ));
    }
    if cleaned.starts_with('-') {
        return Err(invalid(tool, format!("'{}' must not begin with '-'", key)));
    }
    if cleaned.chars().count() > MAX_ARGUMENT_CHARS {
        return Err(invalid(
            tool,
            format!("'{}' exceeds {} characters", key, MAX_ARGUMENT_CHARS),
        ));
    }
    Ok(cleaned)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
