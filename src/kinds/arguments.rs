//! Mapped arguments objects: the aliasing state machine.
//!
//! A mapped arguments object starts "fast": every declared-parameter index
//! is connected, and reading or writing it goes straight through to the
//! function frame's parameter binding. The object turns "slow", one way,
//! the first time an index is disconnected, a `delete` lands on an index,
//! or a `defineProperty` incompatible with aliasing is applied. Within the
//! slow state, disconnection stays per-index and one-way: the last aliased
//! value is captured into ordinary slot storage and the index behaves like
//! a plain data property from then on.
//!
//! Strict-mode arguments never alias; they are built as the
//! `UnmappedArguments` kind with ordinary storage and thrower accessors
//! (see `object::new_strict_arguments`).

use std::rc::Rc;

use crate::bindings::FrameRef;
use crate::context::Context;
use crate::error::JsError;
use crate::object::{JsObject, SlotValue};
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::protocol::{ordinary_define_own_property, ordinary_delete, ordinary_set, KindOps};
use crate::value::{CheapClone, JsObjectRef, JsValue};

/// Aliasing state carried by mapped arguments objects.
#[derive(Debug)]
pub struct ArgumentsData {
    frame: FrameRef,
    /// Per-index frame slot while connected; `None` once disconnected or
    /// for indices beyond the declared parameters.
    map: Vec<Option<u32>>,
    /// Count of still-connected indices.
    connected: u32,
    /// Cleared by the first disconnection, delete, or aliasing-incompatible
    /// define. Never set again.
    fast: bool,
}

impl ArgumentsData {
    pub fn new(frame: FrameRef, map: Vec<Option<u32>>) -> ArgumentsData {
        let connected = map.iter().filter(|slot| slot.is_some()).count() as u32;
        ArgumentsData {
            frame,
            map,
            connected,
            fast: true,
        }
    }

    pub fn frame(&self) -> &FrameRef {
        &self.frame
    }

    /// The frame slot `index` aliases, if still connected.
    pub fn connected_slot(&self, index: u32) -> Option<u32> {
        self.map.get(index as usize).copied().flatten()
    }

    pub fn connected_count(&self) -> u32 {
        self.connected
    }

    /// Whether no disconnection-tracking has been necessary yet.
    pub fn is_fast(&self) -> bool {
        self.fast
    }

    pub(crate) fn mark_slow(&mut self) {
        self.fast = false;
    }

    /// Drop the mapping for `index`. Returns the frame slot it aliased.
    pub(crate) fn unmap(&mut self, index: u32) -> Option<u32> {
        let entry = self.map.get_mut(index as usize)?;
        let slot = entry.take()?;
        self.connected -= 1;
        self.fast = false;
        Some(slot)
    }
}

fn connected_slot_of(obj: &JsObjectRef, index: u32) -> Option<u32> {
    obj.borrow()
        .as_arguments()
        .and_then(|args| args.connected_slot(index))
}

fn frame_of(obj: &JsObjectRef) -> Option<FrameRef> {
    obj.borrow()
        .as_arguments()
        .map(|args| args.frame().cheap_clone())
}

/// Disconnect `index`: capture its current aliased value as an independent
/// data value, then remove the mapping. One-way; a no-op on indices that
/// are not connected. This is the entry point builtin implementations call
/// directly; `defineOwnProperty` funnels through it as well.
///
/// Returns whether the index had been connected.
pub fn disconnect(obj: &JsObjectRef, index: u32) -> Result<bool, JsError> {
    let Some(slot) = connected_slot_of(obj, index) else {
        return Ok(false);
    };
    let frame = frame_of(obj)
        .ok_or_else(|| JsError::internal_error("mapped arguments without aliasing state"))?;
    let value = frame.borrow().read(slot)?;
    let key = PropertyKey::Index(index);
    {
        let mut o = obj.borrow_mut();
        if let Some(record) = o.shape().lookup(&key) {
            o.set_slot(record.slot, SlotValue::Data(value));
        }
        if let Some(args) = o.as_arguments_mut() {
            args.unmap(index);
        }
    }
    Ok(true)
}

/// Whether the object still tracks no disconnections at all.
pub fn is_fast(obj: &JsObjectRef) -> bool {
    obj.borrow()
        .as_arguments()
        .map(|args| args.is_fast())
        .unwrap_or(false)
}

/// Does this descriptor leave plain value-aliasing semantics intact?
/// Explicit `true` attributes only restate the defaults and stay
/// compatible; anything else is an aliasing-incompatible define.
fn compatible_with_aliasing(desc: &PropertyDescriptor) -> bool {
    desc.get.is_none()
        && desc.set.is_none()
        && desc.writable != Some(false)
        && desc.enumerable != Some(false)
        && desc.configurable != Some(false)
}

pub struct MappedArgumentsOps;

impl KindOps for MappedArgumentsOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "Arguments"
    }

    fn get_own_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        _cx: &mut Context,
    ) -> Result<Option<PropertyDescriptor>, JsError> {
        let mut desc = obj.borrow().ordinary_property(key);
        if let (Some(index), Some(out)) = (key.as_index(), desc.as_mut()) {
            if let Some(slot) = connected_slot_of(obj, index) {
                let frame = frame_of(obj)
                    .ok_or_else(|| JsError::internal_error("mapped arguments without aliasing state"))?;
                out.value = Some(frame.borrow().read(slot)?);
            }
        }
        Ok(desc)
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
        let index = key.as_index();
        let connected = index.and_then(|i| connected_slot_of(obj, i));
        let disconnects =
            desc.is_accessor_descriptor() || desc.writable == Some(false);

        if let (Some(i), Some(_)) = (index, connected) {
            if disconnects {
                // Capture the aliased value first so a descriptor without a
                // value keeps it as the independent value.
                disconnect(obj, i)?;
            }
        }

        let applied = ordinary_define_own_property(obj, key, desc.clone(), strict)?;
        if !applied {
            return Ok(false);
        }

        if let (Some(_), Some(slot)) = (index, connected) {
            if !disconnects {
                if let Some(value) = &desc.value {
                    // Still connected: keep the binding in sync.
                    let frame = frame_of(obj).ok_or_else(|| {
                        JsError::internal_error("mapped arguments without aliasing state")
                    })?;
                    frame.borrow_mut().write(slot, value.clone())?;
                }
            }
        }

        if index.is_some() && !compatible_with_aliasing(&desc) {
            if let Some(args) = obj.borrow_mut().as_arguments_mut() {
                args.mark_slow();
            }
        }
        Ok(true)
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
        if let Some(index) = key.as_index() {
            let same_receiver =
                matches!(receiver, JsValue::Object(r) if Rc::ptr_eq(r, obj));
            if same_receiver {
                if let Some(slot) = connected_slot_of(obj, index) {
                    let frame = frame_of(obj).ok_or_else(|| {
                        JsError::internal_error("mapped arguments without aliasing state")
                    })?;
                    frame.borrow_mut().write(slot, value.clone())?;
                }
            }
        }
        ordinary_set(self, obj, key, value, receiver, strict, cx)
    }

    fn delete(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        strict: bool,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        let _ = cx;
        let existed = obj.borrow().shape().contains(key);
        let deleted = ordinary_delete(obj, key, strict)?;
        if deleted && existed {
            if let Some(index) = key.as_index() {
                let mut o = obj.borrow_mut();
                if let Some(args) = o.as_arguments_mut() {
                    args.unmap(index);
                    args.mark_slow();
                }
            }
        }
        Ok(deleted)
    }
}
