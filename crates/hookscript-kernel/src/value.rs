//! Dynamically-typed values exchanged with script code.
//!
//! The host never sees a backend's native type system. Every result coming
//! out of a script is one of: nil, boolean, number, text, ordered sequence or
//! key-ordered mapping, which is exactly the shape of a JSON value.

/// A value crossing the script boundary.
pub type ScriptValue = serde_json::Value;

/// A key-ordered mapping crossing the script boundary.
pub type ScriptMap = serde_json::Map<String, ScriptValue>;

/// Short human-readable name of a value's kind, used in logs and errors.
pub fn kind_name(value: &ScriptValue) -> &'static str {
    match value {
        ScriptValue::Null => "nil",
        ScriptValue::Bool(_) => "boolean",
        ScriptValue::Number(n) if n.is_f64() => "float",
        ScriptValue::Number(_) => "integer",
        ScriptValue::String(_) => "text",
        ScriptValue::Array(_) => "sequence",
        ScriptValue::Object(_) => "mapping",
    }
}

/// Comma-separated summary of argument kinds, or `none` when empty.
pub fn kinds_summary(args: &[ScriptValue]) -> String {
    if args.is_empty() {
        return "none".to_string();
    }
    args.iter().map(kind_name).collect::<Vec<_>>().join(", ")
}
