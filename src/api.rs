//! Embedding conveniences: building object graphs from JSON and reading
//! them back.
//!
//! Hosts that feed configuration or module data into the runtime usually
//! have it as `serde_json::Value`; these helpers translate through the
//! Object Protocol so the resulting objects behave exactly like ones the
//! interpreter built itself.

use std::rc::Rc;

use crate::context::Context;
use crate::error::JsError;
use crate::object::{new_array, new_ordinary};
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::protocol;
use crate::value::{JsObjectRef, JsValue};

/// Build a value graph from JSON. Arrays become Array-kind objects,
/// objects become ordinary objects with default-attribute data properties,
/// and numbers lose nothing (JSON numbers are read as f64).
pub fn value_from_json(cx: &mut Context, json: &serde_json::Value) -> Result<JsValue, JsError> {
    match json {
        serde_json::Value::Null => Ok(JsValue::Null),
        serde_json::Value::Bool(b) => Ok(JsValue::Boolean(*b)),
        serde_json::Value::Number(n) => Ok(JsValue::Number(n.as_f64().unwrap_or(f64::NAN))),
        serde_json::Value::String(s) => Ok(JsValue::from(s.as_str())),
        serde_json::Value::Array(items) => {
            let elements = items
                .iter()
                .map(|item| value_from_json(cx, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(JsValue::Object(new_array(cx, elements)))
        }
        serde_json::Value::Object(fields) => {
            let obj = new_ordinary(cx);
            for (name, field) in fields {
                let value = value_from_json(cx, field)?;
                let key = PropertyKey::from(name.as_str());
                protocol::define_own_property(
                    &obj,
                    &key,
                    PropertyDescriptor::data_default(value),
                    true,
                    cx,
                )?;
            }
            Ok(JsValue::Object(obj))
        }
    }
}

/// Export a value graph to JSON. `undefined` maps to JSON null; symbols
/// and functions are not representable and report a TypeError. Cycles are
/// detected and reported rather than recursed into.
pub fn value_to_json(value: &JsValue, cx: &mut Context) -> Result<serde_json::Value, JsError> {
    let mut visiting: Vec<*const ()> = Vec::new();
    export_value(value, cx, &mut visiting)
}

fn export_value(
    value: &JsValue,
    cx: &mut Context,
    visiting: &mut Vec<*const ()>,
) -> Result<serde_json::Value, JsError> {
    match value {
        JsValue::Undefined | JsValue::Null => Ok(serde_json::Value::Null),
        JsValue::Boolean(b) => Ok(serde_json::Value::Bool(*b)),
        JsValue::Number(n) => Ok(number_to_json(*n)),
        JsValue::String(s) => Ok(serde_json::Value::String(s.as_str().to_string())),
        JsValue::Symbol(_) => Err(JsError::type_error("Cannot convert a Symbol to JSON")),
        JsValue::Object(obj) => export_object(obj, cx, visiting),
    }
}

/// Safely-integral values export as JSON integers so a JSON → value → JSON
/// round trip is the identity; everything else stays floating point.
/// Non-finite numbers have no JSON spelling and become null.
fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9e15 {
        serde_json::Value::Number(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn export_object(
    obj: &JsObjectRef,
    cx: &mut Context,
    visiting: &mut Vec<*const ()>,
) -> Result<serde_json::Value, JsError> {
    let marker = Rc::as_ptr(obj) as *const ();
    if visiting.contains(&marker) {
        return Err(JsError::type_error("Converting circular structure to JSON"));
    }
    if obj.borrow().is_callable() {
        return Err(JsError::type_error("Cannot convert a function to JSON"));
    }
    visiting.push(marker);

    let result = if obj.borrow().as_array().is_some() {
        let length = match protocol::get(obj, &PropertyKey::from("length"), cx)? {
            JsValue::Number(n) => n as u32,
            _ => 0,
        };
        let mut items = Vec::with_capacity(length as usize);
        for i in 0..length {
            let element = protocol::get(obj, &PropertyKey::Index(i), cx)?;
            items.push(export_value(&element, cx, visiting)?);
        }
        Ok(serde_json::Value::Array(items))
    } else {
        let mut fields = serde_json::Map::new();
        for key in protocol::own_property_keys(obj) {
            let enumerable_string = match &key {
                PropertyKey::Symbol(_) => false,
                _ => protocol::get_own_property(obj, &key, cx)?
                    .map(|desc| desc.enumerable == Some(true))
                    .unwrap_or(false),
            };
            if !enumerable_string {
                continue;
            }
            let value = protocol::get(obj, &key, cx)?;
            fields.insert(key.to_string(), export_value(&value, cx, visiting)?);
        }
        Ok(serde_json::Value::Object(fields))
    };

    visiting.pop();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip() {
        let mut cx = Context::new();
        let input = json!({
            "name": "fixture",
            "count": 3,
            "tags": ["a", "b"],
            "nested": { "enabled": true, "ratio": 0.5 }
        });
        let value = value_from_json(&mut cx, &input).unwrap();
        let output = value_to_json(&value, &mut cx).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn test_arrays_become_array_kind() {
        let mut cx = Context::new();
        let value = value_from_json(&mut cx, &json!([1, 2, 3])).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.borrow().class_name(), "Array");
        assert_eq!(
            protocol::get(obj, &PropertyKey::from("length"), &mut cx).unwrap(),
            JsValue::Number(3.0)
        );
    }

    #[test]
    fn test_cycle_detection() {
        let mut cx = Context::new();
        let obj = new_ordinary(&mut cx);
        protocol::set(
            &obj,
            &PropertyKey::from("self"),
            JsValue::Object(obj.clone()),
            true,
            &mut cx,
        )
        .unwrap();
        let err = value_to_json(&JsValue::Object(obj), &mut cx).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_undefined_exports_as_null() {
        let mut cx = Context::new();
        let out = value_to_json(&JsValue::Undefined, &mut cx).unwrap();
        assert_eq!(out, serde_json::Value::Null);
    }
}
