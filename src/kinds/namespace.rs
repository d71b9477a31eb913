//! Module namespace objects: a frozen, live view over a module
//! environment's exports.
//!
//! The namespace has no prototype, is never extensible, and exposes the
//! sorted export names plus `@@toStringTag: "Module"`. Reads go through to
//! the live binding every time; a binding still in its temporal dead zone
//! reports a ReferenceError, never a sentinel. Writes and deletions of
//! exports always fail, and `defineOwnProperty` succeeds only when it
//! restates what is already there.
//!
//! The export name set is finite and stable for the lifetime of the
//! namespace; the integrity-level algorithms rely on that precondition.

use crate::bindings::ModuleEnvRef;
use crate::context::{Context, WellKnownSymbol};
use crate::error::JsError;
use crate::object::JsObject;
use crate::property::{PropertyDescriptor, PropertyFlags, PropertyKey};
use crate::protocol::{reject, KindOps};
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue};

/// Extra state of a namespace object.
#[derive(Debug)]
pub struct NamespaceData {
    environment: ModuleEnvRef,
    /// Sorted at construction; never changes afterwards.
    exports: Vec<JsString>,
}

impl NamespaceData {
    pub fn new(environment: ModuleEnvRef, mut exports: Vec<JsString>) -> NamespaceData {
        exports.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        exports.dedup_by(|a, b| a.as_str() == b.as_str());
        NamespaceData {
            environment,
            exports,
        }
    }

    pub fn exports(&self) -> &[JsString] {
        &self.exports
    }

    pub fn has_export(&self, name: &str) -> bool {
        self.exports
            .binary_search_by(|export| export.as_str().cmp(name))
            .is_ok()
    }

    /// Read the live binding for an export.
    pub fn read(&self, name: &JsString) -> Result<JsValue, JsError> {
        self.environment.borrow().read(name)
    }
}

fn export_name(obj: &JsObjectRef, key: &PropertyKey) -> Option<JsString> {
    let o = obj.borrow();
    let data = o.as_namespace()?;
    match key {
        PropertyKey::String(name) if data.has_export(name.as_str()) => Some(name.cheap_clone()),
        _ => None,
    }
}

fn is_to_string_tag(key: &PropertyKey) -> bool {
    matches!(key, PropertyKey::Symbol(sym) if *sym == WellKnownSymbol::ToStringTag.to_symbol())
}

fn export_descriptor(value: JsValue) -> PropertyDescriptor {
    // Exports read as writable (writes still fail through [[Set]]) but are
    // never configurable.
    PropertyDescriptor::data(
        value,
        PropertyFlags::WRITABLE | PropertyFlags::ENUMERABLE,
    )
}

fn tag_descriptor() -> PropertyDescriptor {
    PropertyDescriptor::data(JsValue::from("Module"), PropertyFlags::empty())
}

pub struct NamespaceOps;

impl KindOps for NamespaceOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "Module"
    }

    fn get_own_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        cx: &mut Context,
    ) -> Result<Option<PropertyDescriptor>, JsError> {
        let _ = cx;
        if is_to_string_tag(key) {
            return Ok(Some(tag_descriptor()));
        }
        if let Some(name) = export_name(obj, key) {
            let value = {
                let o = obj.borrow();
                let data = o
                    .as_namespace()
                    .ok_or_else(|| JsError::internal_error("namespace object without state"))?;
                data.read(&name)?
            };
            return Ok(Some(export_descriptor(value)));
        }
        Ok(None)
    }

    fn define_own_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        desc: PropertyDescriptor,
        strict: bool,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        // Only restating the current descriptor is allowed.
        let Some(current) = self.get_own_property(obj, key, cx)? else {
            return reject(strict, JsError::not_extensible(key));
        };
        if desc.is_accessor_descriptor()
            || desc.configurable == Some(true)
            || desc.enumerable == Some(false)
            || desc.writable == Some(false)
        {
            return reject(strict, JsError::not_configurable(key));
        }
        if let Some(value) = &desc.value {
            let unchanged = current
                .value
                .as_ref()
                .map(|cur| cur.same_value(value))
                .unwrap_or(false);
            if !unchanged {
                return reject(strict, JsError::not_configurable(key));
            }
        }
        Ok(true)
    }

    fn set(
        &self,
        _obj: &JsObjectRef,
        key: &PropertyKey,
        _value: JsValue,
        _receiver: &JsValue,
        strict: bool,
        _cx: &mut Context,
    ) -> Result<bool, JsError> {
        reject(strict, JsError::not_writable(key))
    }

    fn delete(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        strict: bool,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        let _ = cx;
        if is_to_string_tag(key) || export_name(obj, key).is_some() {
            return reject(strict, JsError::not_deletable(key));
        }
        Ok(true)
    }

    fn own_property_keys(&self, obj: &JsObjectRef) -> Vec<PropertyKey> {
        let o = obj.borrow();
        let mut keys: Vec<PropertyKey> = Vec::new();
        if let Some(data) = o.as_namespace() {
            keys.extend(
                data.exports()
                    .iter()
                    .map(|name| PropertyKey::String(name.cheap_clone())),
            );
        }
        keys.push(PropertyKey::Symbol(
            WellKnownSymbol::ToStringTag.to_symbol(),
        ));
        keys
    }

    fn get_prototype(&self, _obj: &JsObjectRef) -> Option<JsObjectRef> {
        None
    }

    fn set_prototype(
        &self,
        _obj: &JsObjectRef,
        prototype: Option<JsObjectRef>,
        strict: bool,
    ) -> Result<bool, JsError> {
        // Only the existing (null) prototype may be restated.
        if prototype.is_none() {
            return Ok(true);
        }
        reject(
            strict,
            JsError::type_error("Cannot set prototype of a module namespace object"),
        )
    }

    fn is_extensible(&self, _obj: &JsObjectRef) -> bool {
        false
    }

    fn prevent_extensions(&self, _obj: &JsObjectRef, _strict: bool) -> Result<bool, JsError> {
        Ok(true)
    }
}
