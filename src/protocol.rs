//! The Object Protocol: the polymorphic contract every object kind
//! implements, plus the ordinary (default) behavior most kinds share.
//!
//! The interpreter calls the free functions in this module; each dispatches
//! through the `ObjectKind` tag on the receiver's shape to a stateless
//! per-kind singleton implementing `KindOps`. Kinds override only the
//! operations whose semantics diverge from ordinary objects; everything
//! else falls through to the trait's default methods.
//!
//! Every mutating operation takes a `strict` flag: a policy violation
//! (write to non-writable, delete non-configurable, extend non-extensible)
//! either raises `TypeError` or reports `Ok(false)`, chosen by that flag.
//! Never both, never silent success.

use std::rc::Rc;

use crate::context::Context;
use crate::error::JsError;
use crate::kinds;
use crate::object::{JsObject, SlotValue};
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::shape::ObjectKind;
use crate::value::{CheapClone, JsObjectRef, JsValue};

/// The per-kind strategy contract. Implementations are stateless singleton
/// policy objects; all instance state lives on the object itself.
pub trait KindOps {
    fn class_name(&self, obj: &JsObject) -> &'static str;

    /// Builtin tag used by default `toString` tag resolution; usually the
    /// class name.
    fn builtin_tag(&self, obj: &JsObject) -> &'static str {
        self.class_name(obj)
    }

    fn get_own_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        cx: &mut Context,
    ) -> Result<Option<PropertyDescriptor>, JsError> {
        let _ = cx;
        Ok(obj.borrow().ordinary_property(key))
    }

    fn has_own_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        Ok(self.get_own_property(obj, key, cx)?.is_some())
    }

    fn has_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        if self.get_own_property(obj, key, cx)?.is_some() {
            return Ok(true);
        }
        match self.get_prototype(obj) {
            Some(parent) => has_property(&parent, key, cx),
            None => Ok(false),
        }
    }

    fn get(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        receiver: &JsValue,
        cx: &mut Context,
    ) -> Result<JsValue, JsError> {
        match self.get_own_property(obj, key, cx)? {
            Some(desc) => {
                if desc.is_accessor_descriptor() {
                    match desc.get {
                        Some(JsValue::Object(getter)) => cx.call(&getter, receiver, &[]),
                        _ => Ok(JsValue::Undefined),
                    }
                } else {
                    Ok(desc.value.unwrap_or(JsValue::Undefined))
                }
            }
            None => match self.get_prototype(obj) {
                Some(parent) => get_with_receiver(&parent, key, receiver, cx),
                None => Ok(JsValue::Undefined),
            },
        }
    }

    fn set(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
        strict: bool,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        ordinary_set(self, obj, key, value, receiver, strict, cx)
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
        ordinary_delete(obj, key, strict)
    }

    fn own_property_keys(&self, obj: &JsObjectRef) -> Vec<PropertyKey> {
        order_keys(obj.borrow().shape().keys().cloned())
    }

    fn get_prototype(&self, obj: &JsObjectRef) -> Option<JsObjectRef> {
        obj.borrow().prototype().map(CheapClone::cheap_clone)
    }

    fn set_prototype(
        &self,
        obj: &JsObjectRef,
        prototype: Option<JsObjectRef>,
        strict: bool,
    ) -> Result<bool, JsError> {
        ordinary_set_prototype(obj, prototype, strict)
    }

    fn is_extensible(&self, obj: &JsObjectRef) -> bool {
        obj.borrow().shape().is_extensible()
    }

    fn prevent_extensions(&self, obj: &JsObjectRef, strict: bool) -> Result<bool, JsError> {
        let _ = strict;
        let mut o = obj.borrow_mut();
        let next = o.shape().with_prevented_extensions();
        if let Some(shape) = next {
            o.set_shape(shape);
        }
        Ok(true)
    }
}

/// Ordinary objects: every operation is the trait default.
pub struct OrdinaryOps;

impl KindOps for OrdinaryOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "Object"
    }
}

/// Strict/unmapped arguments: ordinary storage, distinct class.
pub struct UnmappedArgumentsOps;

impl KindOps for UnmappedArgumentsOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "Arguments"
    }
}

/// Resolve the singleton strategy for a kind tag.
pub fn kind_ops(kind: ObjectKind) -> &'static dyn KindOps {
    match kind {
        ObjectKind::Ordinary => &OrdinaryOps,
        ObjectKind::Array => &kinds::array::ArrayOps,
        ObjectKind::MappedArguments => &kinds::arguments::MappedArgumentsOps,
        ObjectKind::UnmappedArguments => &UnmappedArgumentsOps,
        ObjectKind::Function => &kinds::FunctionOps,
        ObjectKind::PrimitiveWrapper => &kinds::wrapper::PrimitiveWrapperOps,
        ObjectKind::StringWrapper => &kinds::wrapper::StringWrapperOps,
        ObjectKind::ArrayBuffer => &kinds::buffer::ArrayBufferOps,
        ObjectKind::SharedArrayBuffer => &kinds::buffer::SharedArrayBufferOps,
        ObjectKind::TypedView => &kinds::buffer::TypedViewOps,
        ObjectKind::Map => &kinds::map::MapOps,
        ObjectKind::Set => &kinds::set::SetOps,
        ObjectKind::ModuleNamespace => &kinds::namespace::NamespaceOps,
        ObjectKind::Promise => &kinds::promise::PromiseOps,
    }
}

fn ops_for(obj: &JsObjectRef) -> &'static dyn KindOps {
    kind_ops(obj.borrow().kind())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Public protocol entry points
// ═══════════════════════════════════════════════════════════════════════════════

/// Reject a value that must be an object.
pub fn require_object(value: &JsValue) -> Result<&JsObjectRef, JsError> {
    value
        .as_object()
        .ok_or_else(|| JsError::type_error(format!("{:?} is not an object", value)))
}

pub fn get(obj: &JsObjectRef, key: &PropertyKey, cx: &mut Context) -> Result<JsValue, JsError> {
    let receiver = JsValue::Object(obj.cheap_clone());
    ops_for(obj).get(obj, key, &receiver, cx)
}

pub fn get_with_receiver(
    obj: &JsObjectRef,
    key: &PropertyKey,
    receiver: &JsValue,
    cx: &mut Context,
) -> Result<JsValue, JsError> {
    ops_for(obj).get(obj, key, receiver, cx)
}

pub fn set(
    obj: &JsObjectRef,
    key: &PropertyKey,
    value: JsValue,
    strict: bool,
    cx: &mut Context,
) -> Result<bool, JsError> {
    let receiver = JsValue::Object(obj.cheap_clone());
    ops_for(obj).set(obj, key, value, &receiver, strict, cx)
}

pub fn set_with_receiver(
    obj: &JsObjectRef,
    key: &PropertyKey,
    value: JsValue,
    receiver: &JsValue,
    strict: bool,
    cx: &mut Context,
) -> Result<bool, JsError> {
    ops_for(obj).set(obj, key, value, receiver, strict, cx)
}

pub fn get_own_property(
    obj: &JsObjectRef,
    key: &PropertyKey,
    cx: &mut Context,
) -> Result<Option<PropertyDescriptor>, JsError> {
    ops_for(obj).get_own_property(obj, key, cx)
}

pub fn define_own_property(
    obj: &JsObjectRef,
    key: &PropertyKey,
    desc: PropertyDescriptor,
    strict: bool,
    cx: &mut Context,
) -> Result<bool, JsError> {
    check_accessor_fields(&desc)?;
    ops_for(obj).define_own_property(obj, key, desc, strict, cx)
}

pub fn has_property(
    obj: &JsObjectRef,
    key: &PropertyKey,
    cx: &mut Context,
) -> Result<bool, JsError> {
    ops_for(obj).has_property(obj, key, cx)
}

pub fn has_own_property(
    obj: &JsObjectRef,
    key: &PropertyKey,
    cx: &mut Context,
) -> Result<bool, JsError> {
    ops_for(obj).has_own_property(obj, key, cx)
}

pub fn delete(
    obj: &JsObjectRef,
    key: &PropertyKey,
    strict: bool,
    cx: &mut Context,
) -> Result<bool, JsError> {
    ops_for(obj).delete(obj, key, strict, cx)
}

/// Own keys in enumeration order: integer indices ascending, then the
/// remaining string keys in insertion order, then symbols in insertion
/// order. This ordering is load-bearing for enumeration.
pub fn own_property_keys(obj: &JsObjectRef) -> Vec<PropertyKey> {
    ops_for(obj).own_property_keys(obj)
}

pub fn get_prototype(obj: &JsObjectRef) -> Option<JsObjectRef> {
    ops_for(obj).get_prototype(obj)
}

pub fn set_prototype(
    obj: &JsObjectRef,
    prototype: Option<JsObjectRef>,
    strict: bool,
) -> Result<bool, JsError> {
    ops_for(obj).set_prototype(obj, prototype, strict)
}

pub fn is_extensible(obj: &JsObjectRef) -> bool {
    ops_for(obj).is_extensible(obj)
}

pub fn prevent_extensions(obj: &JsObjectRef, strict: bool) -> Result<bool, JsError> {
    ops_for(obj).prevent_extensions(obj, strict)
}

pub fn class_name(obj: &JsObjectRef) -> &'static str {
    obj.borrow().class_name()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Ordinary (default) algorithms
// ═══════════════════════════════════════════════════════════════════════════════

/// Map a policy violation to the caller's chosen failure mode.
pub(crate) fn reject(strict: bool, err: JsError) -> Result<bool, JsError> {
    if strict { Err(err) } else { Ok(false) }
}

pub(crate) fn ordinary_set<O: KindOps + ?Sized>(
    ops: &O,
    obj: &JsObjectRef,
    key: &PropertyKey,
    value: JsValue,
    receiver: &JsValue,
    strict: bool,
    cx: &mut Context,
) -> Result<bool, JsError> {
    let own = match ops.get_own_property(obj, key, cx)? {
        Some(desc) => desc,
        None => match ops.get_prototype(obj) {
            Some(parent) => {
                return set_with_receiver(&parent, key, value, receiver, strict, cx);
            }
            None => PropertyDescriptor::data_default(JsValue::Undefined),
        },
    };

    if own.is_accessor_descriptor() {
        return match own.set {
            Some(JsValue::Object(setter)) => {
                cx.call(&setter, receiver, &[value])?;
                Ok(true)
            }
            _ => reject(
                strict,
                JsError::type_error(format!(
                    "Cannot set property '{}' which has only a getter",
                    key
                )),
            ),
        };
    }

    if !own.writable.unwrap_or(false) {
        return reject(strict, JsError::not_writable(key));
    }
    let Some(receiver_obj) = receiver.as_object() else {
        return reject(
            strict,
            JsError::type_error(format!("Cannot create property '{}' on primitive", key)),
        );
    };
    match get_own_property(receiver_obj, key, cx)? {
        Some(existing) => {
            if existing.is_accessor_descriptor() || !existing.writable.unwrap_or(false) {
                return reject(strict, JsError::not_writable(key));
            }
            define_own_property(
                receiver_obj,
                key,
                PropertyDescriptor::value_only(value),
                strict,
                cx,
            )
        }
        None => define_own_property(
            receiver_obj,
            key,
            PropertyDescriptor::data_default(value),
            strict,
            cx,
        ),
    }
}

pub(crate) fn ordinary_define_own_property(
    obj: &JsObjectRef,
    key: &PropertyKey,
    desc: PropertyDescriptor,
    strict: bool,
) -> Result<bool, JsError> {
    let current = obj.borrow().ordinary_property(key);
    let extensible = obj.borrow().shape().is_extensible();
    match validate_descriptor(current.as_ref(), &desc, extensible) {
        Validation::Rejected(reason) => reject(strict, reason.into_error(key)),
        Validation::Apply(resolved) => {
            let flags = resolved.flags();
            let content = SlotValue::from_descriptor(&resolved);
            obj.borrow_mut().define_ordinary(key, content, flags);
            Ok(true)
        }
    }
}

pub(crate) fn ordinary_delete(
    obj: &JsObjectRef,
    key: &PropertyKey,
    strict: bool,
) -> Result<bool, JsError> {
    let record = obj.borrow().shape().lookup(key);
    match record {
        None => Ok(true),
        Some(record) if record.flags.is_configurable() => {
            obj.borrow_mut().remove_ordinary(key);
            Ok(true)
        }
        Some(_) => reject(strict, JsError::not_deletable(key)),
    }
}

pub(crate) fn ordinary_set_prototype(
    obj: &JsObjectRef,
    prototype: Option<JsObjectRef>,
    strict: bool,
) -> Result<bool, JsError> {
    let unchanged = {
        let o = obj.borrow();
        match (o.prototype(), &prototype) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    };
    if unchanged {
        return Ok(true);
    }
    if !obj.borrow().shape().is_extensible() {
        return reject(
            strict,
            JsError::type_error("Cannot set prototype of a non-extensible object"),
        );
    }
    // Walking the plain prototype links terminates: cycles cannot have been
    // created through this check before.
    let mut cursor = prototype.clone();
    while let Some(parent) = cursor {
        if Rc::ptr_eq(&parent, obj) {
            return reject(strict, JsError::type_error("Cyclic prototype chain"));
        }
        cursor = parent.borrow().prototype().map(CheapClone::cheap_clone);
    }
    obj.borrow_mut().set_prototype_link(prototype);
    Ok(true)
}

/// Partition keys into enumeration order: integer indices ascending, then
/// strings in insertion order, then symbols in insertion order.
pub(crate) fn order_keys(keys: impl Iterator<Item = PropertyKey>) -> Vec<PropertyKey> {
    let mut indices: Vec<u32> = Vec::new();
    let mut strings: Vec<PropertyKey> = Vec::new();
    let mut symbols: Vec<PropertyKey> = Vec::new();
    for key in keys {
        match key {
            PropertyKey::Index(i) => indices.push(i),
            PropertyKey::String(_) => strings.push(key),
            PropertyKey::Symbol(_) => symbols.push(key),
        }
    }
    indices.sort_unstable();
    let mut ordered: Vec<PropertyKey> = Vec::with_capacity(indices.len() + strings.len() + symbols.len());
    ordered.extend(indices.into_iter().map(PropertyKey::Index));
    ordered.extend(strings);
    ordered.extend(symbols);
    ordered
}

// ═══════════════════════════════════════════════════════════════════════════════
// Descriptor negotiation (ValidateAndApplyPropertyDescriptor)
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) enum Validation {
    Rejected(RejectReason),
    /// The resolved, complete descriptor to store.
    Apply(PropertyDescriptor),
}

#[derive(Debug)]
pub(crate) enum RejectReason {
    NotExtensible,
    NotConfigurable,
}

impl RejectReason {
    pub(crate) fn into_error(self, key: &PropertyKey) -> JsError {
        match self {
            RejectReason::NotExtensible => JsError::not_extensible(key),
            RejectReason::NotConfigurable => JsError::not_configurable(key),
        }
    }
}

fn same_value_opt(new: &JsValue, current: &Option<JsValue>) -> bool {
    match current {
        Some(cur) => new.same_value(cur),
        None => new.is_undefined(),
    }
}

/// Negotiate `desc` against the `current` (complete) descriptor of a
/// property. Shared by ordinary storage and by exotic element stores, which
/// feed in their synthesized current descriptors.
pub(crate) fn validate_descriptor(
    current: Option<&PropertyDescriptor>,
    desc: &PropertyDescriptor,
    extensible: bool,
) -> Validation {
    let Some(current) = current else {
        if !extensible {
            return Validation::Rejected(RejectReason::NotExtensible);
        }
        return Validation::Apply(desc.clone().complete());
    };

    if desc.is_empty() {
        return Validation::Apply(current.clone());
    }

    if !current.configurable.unwrap_or(false) {
        if desc.configurable == Some(true) {
            return Validation::Rejected(RejectReason::NotConfigurable);
        }
        if let Some(enumerable) = desc.enumerable {
            if enumerable != current.enumerable.unwrap_or(false) {
                return Validation::Rejected(RejectReason::NotConfigurable);
            }
        }
        if !desc.is_generic_descriptor() {
            if desc.is_accessor_descriptor() != current.is_accessor_descriptor() {
                return Validation::Rejected(RejectReason::NotConfigurable);
            }
            if current.is_accessor_descriptor() {
                if let Some(get) = &desc.get {
                    if !same_value_opt(get, &current.get) {
                        return Validation::Rejected(RejectReason::NotConfigurable);
                    }
                }
                if let Some(set) = &desc.set {
                    if !same_value_opt(set, &current.set) {
                        return Validation::Rejected(RejectReason::NotConfigurable);
                    }
                }
            } else if !current.writable.unwrap_or(false) {
                if desc.writable == Some(true) {
                    return Validation::Rejected(RejectReason::NotConfigurable);
                }
                if let Some(value) = &desc.value {
                    if !same_value_opt(value, &current.value) {
                        return Validation::Rejected(RejectReason::NotConfigurable);
                    }
                }
            }
        }
    }

    // Compatible: merge desc over current, switching property kind if asked.
    let mut result = current.clone();
    if desc.is_accessor_descriptor() && !current.is_accessor_descriptor() {
        result.value = None;
        result.writable = None;
        result.get = Some(JsValue::Undefined);
        result.set = Some(JsValue::Undefined);
    } else if desc.is_data_descriptor() && current.is_accessor_descriptor() {
        result.get = None;
        result.set = None;
        result.value = Some(JsValue::Undefined);
        result.writable = Some(false);
    }
    if let Some(value) = &desc.value {
        result.value = Some(value.clone());
    }
    if let Some(writable) = desc.writable {
        result.writable = Some(writable);
    }
    if let Some(enumerable) = desc.enumerable {
        result.enumerable = Some(enumerable);
    }
    if let Some(configurable) = desc.configurable {
        result.configurable = Some(configurable);
    }
    if let Some(get) = &desc.get {
        result.get = Some(get.clone());
    }
    if let Some(set) = &desc.set {
        result.set = Some(set.clone());
    }
    Validation::Apply(result.complete())
}

/// Descriptor get/set fields must be callables or undefined.
fn check_accessor_fields(desc: &PropertyDescriptor) -> Result<(), JsError> {
    for (side, field) in [("Getter", &desc.get), ("Setter", &desc.set)] {
        if let Some(value) = field {
            if !value.is_undefined() && !value.is_callable() {
                return Err(JsError::type_error(format!("{} must be a function", side)));
            }
        }
    }
    Ok(())
}
