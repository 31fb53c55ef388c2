//! Conversion between Rhai values and script boundary values.

use hookscript_kernel::{BackendError, BackendResult, ScriptValue};
use rhai::{Array, Dynamic, Map};

/// Convert a boundary value to a Rhai `Dynamic`.
///
/// `null` becomes `()`, sequences become arrays and mappings become object
/// maps.
pub fn json_to_dynamic(value: &ScriptValue) -> Dynamic {
    match value {
        ScriptValue::Null => Dynamic::UNIT,
        ScriptValue::Bool(b) => Dynamic::from(*b),
        ScriptValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::UNIT
            }
        }
        ScriptValue::String(s) => Dynamic::from(s.clone()),
        ScriptValue::Array(arr) => {
            let vec: Array = arr.iter().map(json_to_dynamic).collect();
            Dynamic::from_array(vec)
        }
        ScriptValue::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                map.insert(k.as_str().into(), json_to_dynamic(v));
            }
            Dynamic::from_map(map)
        }
    }
}

/// Convert a Rhai `Dynamic` to a boundary value.
///
/// Shared values are read through. Values with no boundary counterpart
/// (function pointers, timestamps, custom types, non-finite floats) are a
/// [`BackendError::Conversion`].
pub fn dynamic_to_json(value: &Dynamic) -> BackendResult<ScriptValue> {
    if value.is_shared() {
        return dynamic_to_json(&value.flatten_clone());
    }

    if value.is_unit() {
        Ok(ScriptValue::Null)
    } else if let Ok(b) = value.as_bool() {
        Ok(ScriptValue::Bool(b))
    } else if let Ok(i) = value.as_int() {
        Ok(ScriptValue::from(i))
    } else if let Ok(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(ScriptValue::Number)
            .ok_or_else(|| BackendError::Conversion(format!("non-finite float {}", f)))
    } else if let Ok(c) = value.as_char() {
        Ok(ScriptValue::String(c.to_string()))
    } else if value.is_string() {
        Ok(ScriptValue::String(value.to_string()))
    } else if value.is_array() {
        let arr = value.clone().cast::<Array>();
        arr.iter()
            .map(dynamic_to_json)
            .collect::<BackendResult<Vec<_>>>()
            .map(ScriptValue::Array)
    } else if value.is_map() {
        let map = value.clone().cast::<Map>();
        let mut obj = serde_json::Map::new();
        for (k, v) in map.iter() {
            obj.insert(k.to_string(), dynamic_to_json(v)?);
        }
        Ok(ScriptValue::Object(obj))
    } else {
        Err(BackendError::Conversion(format!(
            "unsupported script value of type {}",
            value.type_name()
        )))
    }
}
