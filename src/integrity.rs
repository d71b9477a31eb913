//! Generic algorithms over the Object Protocol: integrity levels and
//! default `toString` tag resolution.
//!
//! Everything here is written purely against the protocol entry points and
//! works unmodified for every kind. Precondition: the object's
//! `own_property_keys()` must be finite and stable for the duration of a
//! scan (module namespaces derive their keys from external bindings; their
//! export set is fixed at construction, which satisfies this).

use crate::context::{Context, WellKnownSymbol};
use crate::error::JsError;
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::protocol;
use crate::value::{JsObjectRef, JsString, JsValue};

/// Non-extensible with non-configurable properties ("sealed"), or
/// additionally with non-writable data properties ("frozen").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityLevel {
    Sealed,
    Frozen,
}

/// Raise an object to an integrity level. Calls `prevent_extensions`
/// first; if that fails the algorithm aborts. Every own property is then
/// forced non-configurable (and, when freezing, data properties
/// non-writable) through `define_own_property`; the first rejected
/// redefinition aborts the run with the caller's throw/return convention.
pub fn set_integrity_level(
    obj: &JsObjectRef,
    level: IntegrityLevel,
    strict: bool,
    cx: &mut Context,
) -> Result<bool, JsError> {
    if !protocol::prevent_extensions(obj, strict)? {
        return Ok(false);
    }
    for key in protocol::own_property_keys(obj) {
        let Some(current) = protocol::get_own_property(obj, &key, cx)? else {
            continue;
        };
        let mut desc = PropertyDescriptor {
            configurable: Some(false),
            ..Default::default()
        };
        if level == IntegrityLevel::Frozen && !current.is_accessor_descriptor() {
            desc.writable = Some(false);
        }
        if !protocol::define_own_property(obj, &key, desc, strict, cx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Test whether an object is at an integrity level: extensible objects
/// fail immediately; otherwise any configurable property (or, for
/// `Frozen`, any writable data property) disqualifies it.
pub fn test_integrity_level(
    obj: &JsObjectRef,
    level: IntegrityLevel,
    cx: &mut Context,
) -> Result<bool, JsError> {
    if protocol::is_extensible(obj) {
        return Ok(false);
    }
    for key in protocol::own_property_keys(obj) {
        let Some(desc) = protocol::get_own_property(obj, &key, cx)? else {
            continue;
        };
        if desc.configurable == Some(true) {
            return Ok(false);
        }
        if level == IntegrityLevel::Frozen
            && desc.is_data_descriptor()
            && desc.writable == Some(true)
        {
            return Ok(false);
        }
    }
    Ok(true)
}

/// `Object.seal` semantics.
pub fn seal(obj: &JsObjectRef, strict: bool, cx: &mut Context) -> Result<bool, JsError> {
    set_integrity_level(obj, IntegrityLevel::Sealed, strict, cx)
}

/// `Object.freeze` semantics.
pub fn freeze(obj: &JsObjectRef, strict: bool, cx: &mut Context) -> Result<bool, JsError> {
    set_integrity_level(obj, IntegrityLevel::Frozen, strict, cx)
}

pub fn is_sealed(obj: &JsObjectRef, cx: &mut Context) -> Result<bool, JsError> {
    test_integrity_level(obj, IntegrityLevel::Sealed, cx)
}

pub fn is_frozen(obj: &JsObjectRef, cx: &mut Context) -> Result<bool, JsError> {
    test_integrity_level(obj, IntegrityLevel::Frozen, cx)
}

/// Default `toString` tag resolution: the kind's builtin tag unless the
/// object carries a string-valued `@@toStringTag`, rendered as
/// `"[object Tag]"`.
pub fn to_string_tag(value: &JsValue, cx: &mut Context) -> Result<JsString, JsError> {
    let builtin = match value {
        JsValue::Undefined => "Undefined",
        JsValue::Null => "Null",
        JsValue::Boolean(_) => "Boolean",
        JsValue::Number(_) => "Number",
        JsValue::String(_) => "String",
        JsValue::Symbol(_) => "Symbol",
        JsValue::Object(obj) => {
            let kind = obj.borrow().kind();
            let tag_key = PropertyKey::Symbol(cx.well_known(WellKnownSymbol::ToStringTag));
            if let JsValue::String(custom) = protocol::get(obj, &tag_key, cx)? {
                return Ok(JsString::from(format!("[object {}]", custom)));
            }
            let o = obj.borrow();
            protocol::kind_ops(kind).builtin_tag(&o)
        }
    };
    Ok(JsString::from(format!("[object {}]", builtin)))
}
