//! Byte buffers and element-typed views: the attach/detach state machine.
//!
//! An `ArrayBuffer` owns a byte region until it is detached; detaching is a
//! single, global, one-way transition that invalidates every view over the
//! region at once. Any later access to length, offset, or bytes on the
//! buffer or any of its views fails with a TypeError rather than reading
//! stale or zeroed data. A second detach is a no-op, never a double-free.
//!
//! `SharedArrayBuffer` regions never detach; they carry the per-offset FIFO
//! waiter list agent-level wait/notify builds on. The list is plain data
//! here: enqueueing, dequeueing, and notification bookkeeping only. Any
//! actual blocking lives in the embedder.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;

use crate::context::Context;
use crate::error::JsError;
use crate::object::{ExoticData, JsObject};
use crate::property::{PropertyDescriptor, PropertyFlags, PropertyKey};
use crate::protocol::{order_keys, reject, KindOps};
use crate::value::{JsObjectRef, JsValue};

/// A detachable byte region.
#[derive(Debug)]
pub struct ArrayBufferData {
    bytes: Option<Vec<u8>>,
}

pub type BufferHandle = Rc<RefCell<ArrayBufferData>>;

impl ArrayBufferData {
    pub fn new(byte_length: usize) -> ArrayBufferData {
        ArrayBufferData {
            bytes: Some(vec![0; byte_length]),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn byte_length(&self) -> Result<usize, JsError> {
        match &self.bytes {
            Some(bytes) => Ok(bytes.len()),
            None => Err(JsError::detached_buffer()),
        }
    }

    /// One-way transition; returns whether the buffer had been attached.
    pub fn detach(&mut self) -> bool {
        self.bytes.take().is_some()
    }
}

/// Opaque identifier for an agent parked on a waiter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(pub u64);

/// Per-offset FIFO queues of waiting agents. Offsets must be 32-bit
/// aligned; everything else about waiting is the embedder's business.
#[derive(Debug, Default)]
pub struct WaiterList {
    queues: FxHashMap<u32, VecDeque<AgentId>>,
}

impl WaiterList {
    pub fn new() -> WaiterList {
        WaiterList::default()
    }

    fn check_alignment(offset: u32) -> Result<(), JsError> {
        if offset % 4 != 0 {
            return Err(JsError::range_error(format!(
                "waiter list offset {} is not 32-bit aligned",
                offset
            )));
        }
        Ok(())
    }

    pub fn add_waiter(&mut self, offset: u32, agent: AgentId) -> Result<(), JsError> {
        Self::check_alignment(offset)?;
        self.queues.entry(offset).or_default().push_back(agent);
        Ok(())
    }

    /// Remove a specific parked agent (timeout/interrupt on the embedder
    /// side). Returns whether it was present.
    pub fn remove_waiter(&mut self, offset: u32, agent: AgentId) -> bool {
        let Some(queue) = self.queues.get_mut(&offset) else {
            return false;
        };
        let before = queue.len();
        queue.retain(|waiter| *waiter != agent);
        queue.len() != before
    }

    /// Dequeue up to `count` agents in FIFO order for the embedder to wake.
    pub fn notify(&mut self, offset: u32, count: usize) -> Vec<AgentId> {
        let Some(queue) = self.queues.get_mut(&offset) else {
            return Vec::new();
        };
        let n = count.min(queue.len());
        queue.drain(..n).collect()
    }

    pub fn waiter_count(&self, offset: u32) -> usize {
        self.queues.get(&offset).map(VecDeque::len).unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A shared (cross-agent) byte region. Never detaches.
#[derive(Debug)]
pub struct SharedBufferData {
    bytes: Mutex<Vec<u8>>,
    waiters: Mutex<WaiterList>,
}

impl SharedBufferData {
    pub fn new(byte_length: usize) -> SharedBufferData {
        SharedBufferData {
            bytes: Mutex::new(vec![0; byte_length]),
            waiters: Mutex::new(WaiterList::new()),
        }
    }

    pub fn byte_length(&self) -> usize {
        lock(&self.bytes).len()
    }

    pub fn waiters(&self) -> MutexGuard<'_, WaiterList> {
        lock(&self.waiters)
    }

    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&lock(&self.bytes))
    }

    fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut lock(&self.bytes))
    }
}

/// The region a typed view reads through: detachable or shared.
#[derive(Debug, Clone)]
pub enum ViewBuffer {
    Plain(BufferHandle),
    Shared(Arc<SharedBufferData>),
}

impl ViewBuffer {
    pub fn is_detached(&self) -> bool {
        match self {
            ViewBuffer::Plain(handle) => handle.borrow().is_detached(),
            ViewBuffer::Shared(_) => false,
        }
    }

    pub fn byte_length(&self) -> Result<usize, JsError> {
        match self {
            ViewBuffer::Plain(handle) => handle.borrow().byte_length(),
            ViewBuffer::Shared(data) => Ok(data.byte_length()),
        }
    }

    fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, JsError> {
        match self {
            ViewBuffer::Plain(handle) => match &handle.borrow().bytes {
                Some(bytes) => Ok(f(bytes)),
                None => Err(JsError::detached_buffer()),
            },
            ViewBuffer::Shared(data) => Ok(data.with_bytes(f)),
        }
    }

    fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R, JsError> {
        match self {
            ViewBuffer::Plain(handle) => match &mut handle.borrow_mut().bytes {
                Some(bytes) => Ok(f(bytes)),
                None => Err(JsError::detached_buffer()),
            },
            ViewBuffer::Shared(data) => Ok(data.with_bytes_mut(f)),
        }
    }
}

/// Element type of a typed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl ElementType {
    pub fn byte_size(self) -> usize {
        match self {
            ElementType::Int8 | ElementType::Uint8 | ElementType::Uint8Clamped => 1,
            ElementType::Int16 | ElementType::Uint16 => 2,
            ElementType::Int32 | ElementType::Uint32 | ElementType::Float32 => 4,
            ElementType::Float64 => 8,
        }
    }

    pub fn view_name(self) -> &'static str {
        match self {
            ElementType::Int8 => "Int8Array",
            ElementType::Uint8 => "Uint8Array",
            ElementType::Uint8Clamped => "Uint8ClampedArray",
            ElementType::Int16 => "Int16Array",
            ElementType::Uint16 => "Uint16Array",
            ElementType::Int32 => "Int32Array",
            ElementType::Uint32 => "Uint32Array",
            ElementType::Float32 => "Float32Array",
            ElementType::Float64 => "Float64Array",
        }
    }

    fn decode(self, bytes: &[u8]) -> f64 {
        match self {
            ElementType::Int8 => bytes[0] as i8 as f64,
            ElementType::Uint8 | ElementType::Uint8Clamped => bytes[0] as f64,
            ElementType::Int16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            ElementType::Uint16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            ElementType::Int32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            ElementType::Uint32 => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            ElementType::Float32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            ElementType::Float64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }

    fn encode(self, value: f64, out: &mut [u8]) {
        match self {
            ElementType::Int8 => out[0] = to_int32(value) as i8 as u8,
            ElementType::Uint8 => out[0] = to_int32(value) as u8,
            ElementType::Uint8Clamped => {
                let clamped = if value.is_nan() {
                    0.0
                } else {
                    value.clamp(0.0, 255.0).round()
                };
                out[0] = clamped as u8;
            }
            ElementType::Int16 => {
                out.copy_from_slice(&(to_int32(value) as i16).to_le_bytes());
            }
            ElementType::Uint16 => {
                out.copy_from_slice(&(to_int32(value) as u16).to_le_bytes());
            }
            ElementType::Int32 => out.copy_from_slice(&to_int32(value).to_le_bytes()),
            ElementType::Uint32 => {
                out.copy_from_slice(&(to_int32(value) as u32).to_le_bytes());
            }
            ElementType::Float32 => out.copy_from_slice(&(value as f32).to_le_bytes()),
            ElementType::Float64 => out.copy_from_slice(&value.to_le_bytes()),
        }
    }
}

/// ToInt32 modular wrapping for integer element writes.
fn to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let modulus = 4294967296.0; // 2^32
    let mut n = value.trunc() % modulus;
    if n < 0.0 {
        n += modulus;
    }
    if n >= modulus / 2.0 {
        (n - modulus) as i32
    } else {
        n as i32
    }
}

/// An element-typed window over a byte region.
#[derive(Debug)]
pub struct TypedView {
    buffer: ViewBuffer,
    element: ElementType,
    byte_offset: usize,
    /// Length in elements.
    length: usize,
}

impl TypedView {
    /// Validate geometry against the (attached) buffer and build the view.
    /// `length` in elements; `None` runs to the end of the buffer.
    pub fn new(
        buffer: ViewBuffer,
        element: ElementType,
        byte_offset: usize,
        length: Option<usize>,
    ) -> Result<TypedView, JsError> {
        let size = element.byte_size();
        if byte_offset % size != 0 {
            return Err(JsError::range_error(format!(
                "start offset of {} should be a multiple of {}",
                element.view_name(),
                size
            )));
        }
        let buffer_length = buffer.byte_length()?;
        if byte_offset > buffer_length {
            return Err(JsError::range_error("start offset is outside the bounds of the buffer"));
        }
        let length = match length {
            Some(length) => {
                if byte_offset + length * size > buffer_length {
                    return Err(JsError::range_error("invalid typed array length"));
                }
                length
            }
            None => {
                let remaining = buffer_length - byte_offset;
                if remaining % size != 0 {
                    return Err(JsError::range_error(format!(
                        "byte length of {} should be a multiple of {}",
                        element.view_name(),
                        size
                    )));
                }
                remaining / size
            }
        };
        Ok(TypedView {
            buffer,
            element,
            byte_offset,
            length,
        })
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn is_detached(&self) -> bool {
        self.buffer.is_detached()
    }

    /// Length in elements; fails on a detached buffer.
    pub fn length(&self) -> Result<usize, JsError> {
        if self.buffer.is_detached() {
            return Err(JsError::detached_buffer());
        }
        Ok(self.length)
    }

    pub fn byte_length(&self) -> Result<usize, JsError> {
        Ok(self.length()? * self.element.byte_size())
    }

    pub fn byte_offset(&self) -> Result<usize, JsError> {
        if self.buffer.is_detached() {
            return Err(JsError::detached_buffer());
        }
        Ok(self.byte_offset)
    }

    /// Read element `index`; detached access fails, out-of-bounds reports
    /// absence.
    pub fn get(&self, index: usize) -> Result<Option<f64>, JsError> {
        if index >= self.length()? {
            return Ok(None);
        }
        let size = self.element.byte_size();
        let start = self.byte_offset + index * size;
        self.buffer
            .with_bytes(|bytes| self.element.decode(&bytes[start..start + size]))
            .map(Some)
    }

    /// Write element `index`; detached access fails, out-of-bounds reports
    /// `false`.
    pub fn set(&self, index: usize, value: f64) -> Result<bool, JsError> {
        if index >= self.length()? {
            return Ok(false);
        }
        let size = self.element.byte_size();
        let start = self.byte_offset + index * size;
        self.buffer.with_bytes_mut(|bytes| {
            self.element.encode(value, &mut bytes[start..start + size]);
        })?;
        Ok(true)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Entry points builtin implementations invoke directly
// ═══════════════════════════════════════════════════════════════════════════════

/// Detach a buffer object. One-way and global: every view over the region
/// is invalidated at once. A second call is a no-op; shared buffers refuse.
pub fn detach_array_buffer(obj: &JsObjectRef) -> Result<(), JsError> {
    let o = obj.borrow();
    match o.extra() {
        ExoticData::ArrayBuffer(handle) => {
            handle.borrow_mut().detach();
            Ok(())
        }
        ExoticData::SharedArrayBuffer(_) => {
            Err(JsError::type_error("Cannot detach a SharedArrayBuffer"))
        }
        _ => Err(JsError::type_error("detach requires an ArrayBuffer")),
    }
}

/// `byteLength` of a buffer object; detached access is a TypeError.
pub fn buffer_byte_length(obj: &JsObjectRef) -> Result<usize, JsError> {
    let o = obj.borrow();
    match o.extra() {
        ExoticData::ArrayBuffer(handle) => handle.borrow().byte_length(),
        ExoticData::SharedArrayBuffer(data) => Ok(data.byte_length()),
        _ => Err(JsError::type_error("byteLength requires an ArrayBuffer")),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Kind strategies
// ═══════════════════════════════════════════════════════════════════════════════

pub struct ArrayBufferOps;

impl KindOps for ArrayBufferOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "ArrayBuffer"
    }
}

pub struct SharedArrayBufferOps;

impl KindOps for SharedArrayBufferOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "SharedArrayBuffer"
    }
}

pub struct TypedViewOps;

fn with_view<R>(
    obj: &JsObjectRef,
    f: impl FnOnce(&TypedView) -> Result<R, JsError>,
) -> Result<R, JsError> {
    let o = obj.borrow();
    let view = o
        .as_typed_view()
        .ok_or_else(|| JsError::internal_error("typed view object without view state"))?;
    f(view)
}

impl KindOps for TypedViewOps {
    fn class_name(&self, obj: &JsObject) -> &'static str {
        obj.as_typed_view()
            .map(|view| view.element().view_name())
            .unwrap_or("Object")
    }

    fn get_own_property(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        _cx: &mut Context,
    ) -> Result<Option<PropertyDescriptor>, JsError> {
        if let Some(index) = key.as_index() {
            return with_view(obj, |view| {
                Ok(view.get(index as usize)?.map(|value| {
                    PropertyDescriptor::data(JsValue::Number(value), PropertyFlags::default())
                }))
            });
        }
        Ok(obj.borrow().ordinary_property(key))
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
        if let Some(index) = key.as_index() {
            let in_bounds = with_view(obj, |view| {
                Ok((index as usize) < view.length()?)
            })?;
            if !in_bounds {
                return reject(
                    strict,
                    JsError::type_error(format!("Invalid typed array index: {}", index)),
                );
            }
            if desc.is_accessor_descriptor()
                || desc.writable == Some(false)
                || desc.enumerable == Some(false)
                || desc.configurable == Some(false)
            {
                return reject(strict, JsError::not_configurable(key));
            }
            if let Some(value) = &desc.value {
                let number = match value {
                    JsValue::Number(n) => *n,
                    _ => f64::NAN,
                };
                with_view(obj, |view| view.set(index as usize, number))?;
            }
            return Ok(true);
        }
        crate::protocol::ordinary_define_own_property(obj, key, desc, strict)
    }

    fn delete(
        &self,
        obj: &JsObjectRef,
        key: &PropertyKey,
        strict: bool,
        cx: &mut Context,
    ) -> Result<bool, JsError> {
        let _ = cx;
        if let Some(index) = key.as_index() {
            let in_bounds = with_view(obj, |view| Ok((index as usize) < view.length()?))?;
            if in_bounds {
                return reject(strict, JsError::not_deletable(key));
            }
            return Ok(true);
        }
        crate::protocol::ordinary_delete(obj, key, strict)
    }

    fn own_property_keys(&self, obj: &JsObjectRef) -> Vec<PropertyKey> {
        let o = obj.borrow();
        let mut keys: Vec<PropertyKey> = Vec::new();
        if let Some(view) = o.as_typed_view() {
            // A detached view exposes no index keys (and throws only on
            // element access, not enumeration).
            if let Ok(length) = view.length() {
                keys.extend((0..length as u32).map(PropertyKey::Index));
            }
        }
        keys.extend(order_keys(o.shape().keys().cloned()));
        keys
    }
}
