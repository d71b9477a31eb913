//! Array exotic behavior: dense/sparse element storage and the reified
//! `length` property.
//!
//! Arrays start dense (a contiguous vector with `None` holes) and migrate
//! one-way to sparse (an ordered index map with per-element attributes)
//! when an index lands far past the dense tail, past the dense ceiling, or
//! when an element acquires non-default attributes or an accessor. The
//! migration preserves every visible element and its attributes.

use std::collections::BTreeMap;

use crate::context::Context;
use crate::error::JsError;
use crate::object::{JsObject, SlotValue};
use crate::property::{PropertyDescriptor, PropertyFlags, PropertyKey};
use crate::protocol::{
    order_keys, reject, validate_descriptor, KindOps, RejectReason, Validation,
};
use crate::value::{JsObjectRef, JsString, JsValue};

/// Gap past the dense tail that forces the sparse representation.
pub const SPARSE_GAP_THRESHOLD: u32 = 1024;

/// Indices at or above this never use dense storage.
pub const MAX_DENSE_LENGTH: u32 = 1 << 26;

/// One element in sparse storage: contents plus attribute bits.
#[derive(Debug, Clone)]
pub struct ElementProperty {
    pub value: SlotValue,
    pub flags: PropertyFlags,
}

#[derive(Debug)]
enum Elements {
    /// Contiguous storage; holes are `None`, attributes are all default.
    Dense(Vec<Option<JsValue>>),
    /// Index-keyed storage with per-element attributes.
    Sparse(BTreeMap<u32, ElementProperty>),
}

/// Array extra storage: elements plus the reified `length` state.
#[derive(Debug)]
pub struct ArrayStorage {
    length: u32,
    length_writable: bool,
    elements: Elements,
}

impl ArrayStorage {
    pub fn from_values(values: Vec<JsValue>) -> ArrayStorage {
        let length = values.len() as u32;
        ArrayStorage {
            length,
            length_writable: true,
            elements: Elements::Dense(values.into_iter().map(Some).collect()),
        }
    }

    pub fn with_length(length: u32) -> ArrayStorage {
        let elements = if length >= MAX_DENSE_LENGTH {
            Elements::Sparse(BTreeMap::new())
        } else {
            Elements::Dense(Vec::new())
        };
        ArrayStorage {
            length,
            length_writable: true,
            elements,
        }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn length_writable(&self) -> bool {
        self.length_writable
    }

    pub fn is_dense(&self) -> bool {
        matches!(self.elements, Elements::Dense(_))
    }

    fn set_length_value(&mut self, length: u32) {
        self.length = length;
    }

    fn freeze_length(&mut self) {
        self.length_writable = false;
    }

    /// The element's complete descriptor, if present (holes report absent).
    pub fn element_descriptor(&self, index: u32) -> Option<PropertyDescriptor> {
        match &self.elements {
            Elements::Dense(values) => values
                .get(index as usize)
                .and_then(|slot| slot.as_ref())
                .map(|value| PropertyDescriptor::data(value.clone(), PropertyFlags::default())),
            Elements::Sparse(map) => map
                .get(&index)
                .map(|element| element.value.to_descriptor(element.flags)),
        }
    }

    pub fn has_element(&self, index: u32) -> bool {
        match &self.elements {
            Elements::Dense(values) => {
                matches!(values.get(index as usize), Some(Some(_)))
            }
            Elements::Sparse(map) => map.contains_key(&index),
        }
    }

    /// Present element indices, ascending.
    pub fn element_keys(&self) -> Vec<u32> {
        match &self.elements {
            Elements::Dense(values) => values
                .iter()
                .enumerate()
                .filter_map(|(i, slot)| slot.as_ref().map(|_| i as u32))
                .collect(),
            Elements::Sparse(map) => map.keys().copied().collect(),
        }
    }

    fn dense_can_hold(&self, index: u32) -> bool {
        match &self.elements {
            Elements::Dense(values) => {
                index < MAX_DENSE_LENGTH
                    && (index as usize) <= values.len() + SPARSE_GAP_THRESHOLD as usize
            }
            Elements::Sparse(_) => false,
        }
    }

    /// One-way dense → sparse migration, preserving elements and their
    /// (default) attributes.
    fn convert_to_sparse(&mut self) {
        if let Elements::Dense(values) = &mut self.elements {
            let mut map = BTreeMap::new();
            for (i, slot) in values.drain(..).enumerate() {
                if let Some(value) = slot {
                    map.insert(
                        i as u32,
                        ElementProperty {
                            value: SlotValue::Data(value),
                            flags: PropertyFlags::default(),
                        },
                    );
                }
            }
            self.elements = Elements::Sparse(map);
        }
    }

    /// Negotiate and store an element descriptor. Length bookkeeping is the
    /// caller's concern.
    fn define_element(
        &mut self,
        index: u32,
        desc: &PropertyDescriptor,
        extensible: bool,
    ) -> Result<(), RejectReason> {
        let current = self.element_descriptor(index);
        let resolved = match validate_descriptor(current.as_ref(), desc, extensible) {
            Validation::Rejected(reason) => return Err(reason),
            Validation::Apply(resolved) => resolved,
        };
        let flags = resolved.flags();
        let plain_data = flags == PropertyFlags::default();
        if plain_data && self.dense_can_hold(index) {
            if let Elements::Dense(values) = &mut self.elements {
                let slot = index as usize;
                if slot >= values.len() {
                    values.resize(slot + 1, None);
                }
                values[slot] = Some(resolved.value.unwrap_or(JsValue::Undefined));
                return Ok(());
            }
        }
        self.convert_to_sparse();
        if let Elements::Sparse(map) = &mut self.elements {
            map.insert(
                index,
                ElementProperty {
                    value: SlotValue::from_descriptor(&resolved),
                    flags,
                },
            );
        }
        Ok(())
    }

    /// Delete an element; `Err` means it exists but is non-configurable.
    fn remove_element(&mut self, index: u32) -> Result<(), ()> {
        match &mut self.elements {
            Elements::Dense(values) => {
                if let Some(slot) = values.get_mut(index as usize) {
                    *slot = None;
                }
                Ok(())
            }
            Elements::Sparse(map) => match map.get(&index) {
                Some(element) if !element.flags.is_configurable() => Err(()),
                _ => {
                    map.remove(&index);
                    Ok(())
                }
            },
        }
    }

    /// Delete elements at indices >= `new_length`, highest first. On a
    /// refused deletion returns the refusing index; the caller reports the
    /// failure and the surviving length is that index plus one.
    fn truncate_to(&mut self, new_length: u32) -> Result<(), u32> {
        match &mut self.elements {
            Elements::Dense(values) => {
                values.truncate(new_length as usize);
                Ok(())
            }
            Elements::Sparse(map) => {
                let doomed: Vec<u32> = map
                    .range(new_length..)
                    .rev()
                    .map(|(&index, _)| index)
                    .collect();
                for index in doomed {
                    let configurable = map
                        .get(&index)
                        .map(|element| element.flags.is_configurable())
                        .unwrap_or(true);
                    if !configurable {
                        return Err(index);
                    }
                    map.remove(&index);
                }
                Ok(())
            }
        }
    }
}

fn parse_array_length(value: &JsValue) -> Result<u32, JsError> {
    let n = match value {
        JsValue::Number(n) => *n,
        JsValue::String(s) => s.parse::<f64>().unwrap_or(f64::NAN),
        JsValue::Boolean(true) => 1.0,
        JsValue::Boolean(false) => 0.0,
        _ => f64::NAN,
    };
    if n.fract() == 0.0 && n >= 0.0 && n < u32::MAX as f64 + 1.0 {
        Ok(n as u32)
    } else {
        Err(JsError::range_error("Invalid array length"))
    }
}

fn length_key() -> PropertyKey {
    PropertyKey::String(JsString::from("length"))
}

/// The ArraySetLength algorithm: redefinitions of `length`, including the
/// delete-down loop with its non-configurable stop.
fn array_set_length(
    obj: &JsObjectRef,
    desc: &PropertyDescriptor,
    strict: bool,
) -> Result<bool, JsError> {
    let key = length_key();
    if desc.is_accessor_descriptor()
        || desc.configurable == Some(true)
        || desc.enumerable == Some(true)
    {
        return reject(strict, JsError::not_configurable(&key));
    }

    let new_length = match &desc.value {
        Some(value) => Some(parse_array_length(value)?),
        None => None,
    };

    let mut o = obj.borrow_mut();
    let storage = o
        .as_array_mut()
        .ok_or_else(|| JsError::internal_error("array object without array storage"))?;

    let old_length = storage.length();
    let new_length = new_length.unwrap_or(old_length);
    if !storage.length_writable() && (new_length != old_length || desc.writable == Some(true)) {
        return reject(strict, JsError::not_writable(&key));
    }

    if new_length >= old_length {
        storage.set_length_value(new_length);
        if desc.writable == Some(false) {
            storage.freeze_length();
        }
        return Ok(true);
    }

    match storage.truncate_to(new_length) {
        Ok(()) => {
            storage.set_length_value(new_length);
            if desc.writable == Some(false) {
                storage.freeze_length();
            }
            Ok(true)
        }
        Err(stop_index) => {
            // The refused element survives; length lands just above it.
            storage.set_length_value(stop_index + 1);
            if desc.writable == Some(false) {
                storage.freeze_length();
            }
            drop(o);
            reject(strict, JsError::not_deletable(&PropertyKey::Index(stop_index)))
        }
    }
}

pub struct ArrayOps;

impl KindOps for ArrayOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "Array"
    }

    fn get_own_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        _cx: &mut Context,
    ) -> Result<Option<PropertyDescriptor>, JsError> {
        let o = obj.borrow();
        if let Some(index) = key.as_index() {
            return Ok(o.as_array().and_then(|storage| storage.element_descriptor(index)));
        }
        if key.eq_str("length") {
            let storage = o
                .as_array()
                .ok_or_else(|| JsError::internal_error("array object without array storage"))?;
            let mut flags = PropertyFlags::empty();
            flags.set(PropertyFlags::WRITABLE, storage.length_writable());
            return Ok(Some(PropertyDescriptor::data(
                JsValue::from(storage.length()),
                flags,
            )));
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
        if key.eq_str("length") {
            return array_set_length(obj, &desc, strict);
        }
        if let Some(index) = key.as_index() {
            let mut o = obj.borrow_mut();
            let extensible = o.shape().is_extensible();
            let storage = o
                .as_array_mut()
                .ok_or_else(|| JsError::internal_error("array object without array storage"))?;
            // A non-writable length rejects indices past the end before any
            // element is installed.
            if index >= storage.length() && !storage.length_writable() {
                drop(o);
                return reject(strict, JsError::not_writable(&length_key()));
            }
            match storage.define_element(index, &desc, extensible) {
                Err(reason) => {
                    drop(o);
                    reject(strict, reason.into_error(key))
                }
                Ok(()) => {
                    if index >= storage.length() {
                        storage.set_length_value(index + 1);
                    }
                    Ok(true)
                }
            }
        } else {
            ordinary_define(obj, key, desc, strict)
        }
    }

    fn delete(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        strict: bool,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        let _ = cx;
        if key.eq_str("length") {
            return reject(strict, JsError::not_deletable(key));
        }
        if let Some(index) = key.as_index() {
            let mut o = obj.borrow_mut();
            let storage = o
                .as_array_mut()
                .ok_or_else(|| JsError::internal_error("array object without array storage"))?;
            return match storage.remove_element(index) {
                Ok(()) => Ok(true),
                Err(()) => {
                    drop(o);
                    reject(strict, JsError::not_deletable(key))
                }
            };
        }
        crate::protocol::ordinary_delete(obj, key, strict)
    }

    fn own_property_keys(&self, obj: &JsObjectRef) -> Vec<PropertyKey> {
        let o = obj.borrow();
        let mut keys: Vec<PropertyKey> = Vec::new();
        if let Some(storage) = o.as_array() {
            keys.extend(storage.element_keys().into_iter().map(PropertyKey::Index));
        }
        keys.push(length_key());
        keys.extend(order_keys(o.shape().keys().cloned()));
        keys
    }
}

fn ordinary_define(
    obj: &JsObjectRef,
    key: &PropertyKey,
    desc: PropertyDescriptor,
    strict: bool,
) -> Result<bool, JsError> {
    crate::protocol::ordinary_define_own_property(obj, key, desc, strict)
}
