//! Request context handed to delegate scripts.

use crate::value::{ScriptMap, ScriptValue};
use serde::{Deserialize, Serialize};

/// Key under which the requested resource identifier is stored.
pub const IDENTIFIER_KEY: &str = "identifier";

/// Opaque key-value mapping describing the request or session a delegate
/// serves. The delegate runtime never interprets the entries; they are only
/// forwarded to script code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    entries: ScriptMap,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Into<ScriptValue>>(mut self, key: &str, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_identifier(self, identifier: &str) -> Self {
        self.with(IDENTIFIER_KEY, identifier)
    }

    pub fn set<V: Into<ScriptValue>>(&mut self, key: &str, value: V) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn set_identifier(&mut self, identifier: &str) {
        self.set(IDENTIFIER_KEY, identifier);
    }

    pub fn get(&self, key: &str) -> Option<&ScriptValue> {
        self.entries.get(key)
    }

    pub fn identifier(&self) -> Option<&str> {
        self.get(IDENTIFIER_KEY).and_then(ScriptValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the entries as a mapping value.
    pub fn to_map(&self) -> ScriptValue {
        ScriptValue::Object(self.entries.clone())
    }
}

impl From<ScriptMap> for RequestContext {
    fn from(entries: ScriptMap) -> Self {
        Self { entries }
    }
}
