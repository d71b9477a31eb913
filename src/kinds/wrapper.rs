//! Boxed primitives.
//!
//! Boolean, Number, and Symbol boxes are ordinary objects plus a
//! `[[PrimitiveValue]]` slot. Boxed strings are exotic: every character
//! position is a read-only, non-configurable indexed property, and
//! `length` is reified and immutable. Indices past the end remain
//! available for ordinary expando properties.

use crate::context::Context;
use crate::error::JsError;
use crate::object::JsObject;
use crate::property::{PropertyDescriptor, PropertyFlags, PropertyKey};
use crate::protocol::{
    ordinary_define_own_property, ordinary_delete, reject, validate_descriptor, KindOps,
    Validation,
};
use crate::value::{JsObjectRef, JsString, JsValue};

pub struct PrimitiveWrapperOps;

impl KindOps for PrimitiveWrapperOps {
    fn class_name(&self, obj: &JsObject) -> &'static str {
        match obj.as_primitive() {
            Some(JsValue::Boolean(_)) => "Boolean",
            Some(JsValue::Number(_)) => "Number",
            Some(JsValue::Symbol(_)) => "Symbol",
            _ => "Object",
        }
    }
}

/// Length in UTF-16 code units, the unit string indices count in.
fn utf16_length(s: &JsString) -> usize {
    s.as_str().encode_utf16().count()
}

fn char_at(s: &JsString, index: usize) -> Option<JsValue> {
    let unit = s.as_str().encode_utf16().nth(index)?;
    Some(JsValue::String(JsString::from(
        String::from_utf16_lossy(&[unit]),
    )))
}

fn synthesized_property(s: &JsString, key: &PropertyKey) -> Option<PropertyDescriptor> {
    if let Some(index) = key.as_index() {
        return char_at(s, index as usize)
            .map(|value| PropertyDescriptor::data(value, PropertyFlags::ENUMERABLE));
    }
    if key.eq_str("length") {
        return Some(PropertyDescriptor::data(
            JsValue::from(utf16_length(s) as u32),
            PropertyFlags::empty(),
        ));
    }
    None
}

pub struct StringWrapperOps;

impl KindOps for StringWrapperOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "String"
    }

    fn get_own_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        _cx: &mut Context,
    ) -> Result<Option<PropertyDescriptor>, JsError> {
        let o = obj.borrow();
        if let Some(s) = o.as_string_wrapper() {
            if let Some(desc) = synthesized_property(s, key) {
                return Ok(Some(desc));
            }
        }
        Ok(o.ordinary_property(key))
    }

    fn define_own_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        desc: PropertyDescriptor,
        strict: bool,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        let _ = cx;
        let synthesized = {
            let o = obj.borrow();
            o.as_string_wrapper()
                .and_then(|s| synthesized_property(s, key))
        };
        if let Some(current) = synthesized {
            // Character slots and length are immutable; only a restatement
            // succeeds, and nothing is ever stored.
            return match validate_descriptor(Some(&current), &desc, false) {
                Validation::Rejected(reason) => reject(strict, reason.into_error(key)),
                Validation::Apply(_) => Ok(true),
            };
        }
        ordinary_define_own_property(obj, key, desc, strict)
    }

    fn delete(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        strict: bool,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        let _ = cx;
        let synthesized = {
            let o = obj.borrow();
            o.as_string_wrapper()
                .and_then(|s| synthesized_property(s, key))
        };
        if synthesized.is_some() {
            return reject(strict, JsError::not_deletable(key));
        }
        ordinary_delete(obj, key, strict)
    }

    fn own_property_keys(&self, obj: &JsObjectRef) -> Vec<PropertyKey> {
        let o = obj.borrow();
        let char_count = o.as_string_wrapper().map(utf16_length).unwrap_or(0) as u32;

        let mut indices: Vec<u32> = (0..char_count).collect();
        let mut strings: Vec<PropertyKey> = Vec::new();
        let mut symbols: Vec<PropertyKey> = Vec::new();
        for key in o.shape().keys() {
            match key {
                PropertyKey::Index(i) => indices.push(*i),
                PropertyKey::String(_) => strings.push(key.clone()),
                PropertyKey::Symbol(_) => symbols.push(key.clone()),
            }
        }
        indices.sort_unstable();

        let mut keys: Vec<PropertyKey> = indices.into_iter().map(PropertyKey::Index).collect();
        keys.push(PropertyKey::String(JsString::from("length")));
        keys.extend(strings);
        keys.extend(symbols);
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_characters() {
        let s = JsString::from("hi");
        let desc = synthesized_property(&s, &PropertyKey::Index(1)).unwrap();
        assert_eq!(desc.value, Some(JsValue::from("i")));
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.enumerable, Some(true));
        assert_eq!(desc.configurable, Some(false));
        assert!(synthesized_property(&s, &PropertyKey::Index(2)).is_none());
    }

    #[test]
    fn test_synthesized_length() {
        let s = JsString::from("héllo");
        let desc = synthesized_property(&s, &PropertyKey::from("length")).unwrap();
        assert_eq!(desc.value, Some(JsValue::Number(5.0)));
        assert_eq!(desc.writable, Some(false));
    }
}
