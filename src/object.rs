//! Object instances and per-kind construction entry points.
//!
//! An object is a shape reference, a prototype link, a flat slot array laid
//! out by the shape, and kind-specific extra storage. The exotic behavior
//! itself lives in `kinds/`; this module owns the storage and the
//! constructors the embedding interpreter calls.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::bindings::{FrameRef, ModuleEnvRef};
use crate::context::{Context, NativeFn, NativeFunction};
use crate::error::JsError;
use crate::kinds::arguments::ArgumentsData;
use crate::kinds::array::ArrayStorage;
use crate::kinds::buffer::{
    ArrayBufferData, BufferHandle, ElementType, SharedBufferData, TypedView, ViewBuffer,
};
use crate::kinds::map::OrderedMap;
use crate::kinds::namespace::NamespaceData;
use crate::kinds::promise::PromiseState;
use crate::kinds::set::OrderedSet;
use crate::property::{PropertyDescriptor, PropertyFlags, PropertyKey};
use crate::protocol::kind_ops;
use crate::shape::{ObjectKind, Shape, ShapeBuilder};
use crate::value::{CheapClone, JsObjectRef, JsString, JsValue};

/// Contents of one property slot.
#[derive(Debug, Clone)]
pub enum SlotValue {
    Data(JsValue),
    Accessor {
        get: Option<JsObjectRef>,
        set: Option<JsObjectRef>,
    },
}

impl SlotValue {
    /// Render this slot as a (complete) property descriptor.
    pub fn to_descriptor(&self, flags: PropertyFlags) -> PropertyDescriptor {
        match self {
            SlotValue::Data(value) => PropertyDescriptor::data(value.clone(), flags),
            SlotValue::Accessor { get, set } => PropertyDescriptor::accessor(
                get.as_ref()
                    .map(|g| JsValue::Object(g.cheap_clone()))
                    .unwrap_or(JsValue::Undefined),
                set.as_ref()
                    .map(|s| JsValue::Object(s.cheap_clone()))
                    .unwrap_or(JsValue::Undefined),
                flags,
            ),
        }
    }

    /// Build slot contents from a resolved (complete) descriptor.
    pub fn from_descriptor(desc: &PropertyDescriptor) -> SlotValue {
        if desc.is_accessor_descriptor() {
            SlotValue::Accessor {
                get: as_function(desc.get.as_ref()),
                set: as_function(desc.set.as_ref()),
            }
        } else {
            SlotValue::Data(desc.value.clone().unwrap_or(JsValue::Undefined))
        }
    }
}

fn as_function(value: Option<&JsValue>) -> Option<JsObjectRef> {
    match value {
        Some(JsValue::Object(obj)) => Some(obj.cheap_clone()),
        _ => None,
    }
}

/// Kind-specific extra storage, selected by the shape's `ObjectKind` tag.
/// Strict/unmapped arguments carry no extra state and use `Ordinary`.
#[derive(Debug)]
pub enum ExoticData {
    Ordinary,
    Array(ArrayStorage),
    Arguments(ArgumentsData),
    Function(NativeFunction),
    /// Boxed Boolean/Number/Symbol
    Primitive(JsValue),
    /// Boxed String
    StringWrapper(JsString),
    ArrayBuffer(BufferHandle),
    SharedArrayBuffer(Arc<SharedBufferData>),
    TypedView(TypedView),
    Map(OrderedMap),
    Set(OrderedSet),
    Namespace(NamespaceData),
    Promise(PromiseState),
}

/// A JavaScript object
pub struct JsObject {
    shape: Arc<Shape>,
    prototype: Option<JsObjectRef>,
    slots: Vec<SlotValue>,
    extra: ExoticData,
}

impl JsObject {
    /// Create an instance of `shape`; slots start undefined.
    pub fn new(shape: Arc<Shape>, prototype: Option<JsObjectRef>, extra: ExoticData) -> JsObject {
        let slots = (0..shape.slot_count())
            .map(|_| SlotValue::Data(JsValue::Undefined))
            .collect();
        JsObject {
            shape,
            prototype,
            slots,
            extra,
        }
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub(crate) fn set_shape(&mut self, shape: Arc<Shape>) {
        self.shape = shape;
    }

    pub fn kind(&self) -> ObjectKind {
        self.shape.kind()
    }

    pub fn prototype(&self) -> Option<&JsObjectRef> {
        self.prototype.as_ref()
    }

    pub(crate) fn set_prototype_link(&mut self, prototype: Option<JsObjectRef>) {
        self.prototype = prototype;
    }

    pub fn class_name(&self) -> &'static str {
        kind_ops(self.kind()).class_name(self)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.extra, ExoticData::Function(_))
    }

    pub(crate) fn slot(&self, index: u32) -> Option<&SlotValue> {
        self.slots.get(index as usize)
    }

    pub(crate) fn set_slot(&mut self, index: u32, value: SlotValue) {
        if let Some(slot) = self.slots.get_mut(index as usize) {
            *slot = value;
        }
    }

    /// The property stored directly in shape/slot storage, if any.
    pub(crate) fn ordinary_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let record = self.shape.lookup(key)?;
        let slot = self.slot(record.slot)?;
        Some(slot.to_descriptor(record.flags))
    }

    /// Install or update a property in shape/slot storage, transitioning
    /// the shape as needed. Validation is the protocol layer's concern.
    pub(crate) fn define_ordinary(
        &mut self,
        key: &PropertyKey,
        content: SlotValue,
        flags: PropertyFlags,
    ) {
        match self.shape.lookup(key) {
            Some(record) => {
                if let Some(shape) = self.shape.replace_attributes(key, flags) {
                    self.shape = shape;
                }
                self.set_slot(record.slot, content);
            }
            None => {
                self.shape = self.shape.add_property(key.clone(), flags);
                self.slots.push(content);
            }
        }
    }

    /// Remove a property from shape/slot storage. Returns false if absent.
    pub(crate) fn remove_ordinary(&mut self, key: &PropertyKey) -> bool {
        let Some((shape, removed_slot)) = self.shape.remove_property(key) else {
            return false;
        };
        self.shape = shape;
        if (removed_slot as usize) < self.slots.len() {
            self.slots.remove(removed_slot as usize);
        }
        true
    }

    pub fn extra(&self) -> &ExoticData {
        &self.extra
    }

    pub fn as_array(&self) -> Option<&ArrayStorage> {
        match &self.extra {
            ExoticData::Array(storage) => Some(storage),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayStorage> {
        match &mut self.extra {
            ExoticData::Array(storage) => Some(storage),
            _ => None,
        }
    }

    pub fn as_arguments(&self) -> Option<&ArgumentsData> {
        match &self.extra {
            ExoticData::Arguments(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_arguments_mut(&mut self) -> Option<&mut ArgumentsData> {
        match &mut self.extra {
            ExoticData::Arguments(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&NativeFunction> {
        match &self.extra {
            ExoticData::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<&JsValue> {
        match &self.extra {
            ExoticData::Primitive(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_string_wrapper(&self) -> Option<&JsString> {
        match &self.extra {
            ExoticData::StringWrapper(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array_buffer(&self) -> Option<&BufferHandle> {
        match &self.extra {
            ExoticData::ArrayBuffer(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_shared_buffer(&self) -> Option<&Arc<SharedBufferData>> {
        match &self.extra {
            ExoticData::SharedArrayBuffer(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_typed_view(&self) -> Option<&TypedView> {
        match &self.extra {
            ExoticData::TypedView(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OrderedMap> {
        match &self.extra {
            ExoticData::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut OrderedMap> {
        match &mut self.extra {
            ExoticData::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&OrderedSet> {
        match &self.extra {
            ExoticData::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut OrderedSet> {
        match &mut self.extra {
            ExoticData::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&NamespaceData> {
        match &self.extra {
            ExoticData::Namespace(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_promise(&self) -> Option<&PromiseState> {
        match &self.extra {
            ExoticData::Promise(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_promise_mut(&mut self) -> Option<&mut PromiseState> {
        match &mut self.extra {
            ExoticData::Promise(state) => Some(state),
            _ => None,
        }
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsObject")
            .field("class", &self.class_name())
            .field("shape", &self.shape.id())
            .finish()
    }
}

fn wrap(obj: JsObject) -> JsObjectRef {
    Rc::new(RefCell::new(obj))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Construction entry points, one per kind
// ═══════════════════════════════════════════════════════════════════════════════

/// Create a new ordinary object with no prototype.
pub fn new_ordinary(cx: &mut Context) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::Ordinary);
    wrap(JsObject::new(shape, None, ExoticData::Ordinary))
}

/// Create a new ordinary object with a prototype.
pub fn new_ordinary_with_prototype(cx: &mut Context, prototype: JsObjectRef) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::Ordinary);
    wrap(JsObject::new(shape, Some(prototype), ExoticData::Ordinary))
}

/// Create an array from initial element values (dense).
pub fn new_array(cx: &mut Context, elements: Vec<JsValue>) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::Array);
    let storage = ArrayStorage::from_values(elements);
    wrap(JsObject::new(shape, None, ExoticData::Array(storage)))
}

/// Create an empty array with the given length (holes throughout).
pub fn new_array_with_length(cx: &mut Context, length: u32) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::Array);
    let storage = ArrayStorage::with_length(length);
    wrap(JsObject::new(shape, None, ExoticData::Array(storage)))
}

/// Create a mapped (non-strict) arguments object. `mapping[i]` is the frame
/// slot index argument `i` aliases, or `None` for arguments beyond the
/// declared parameters. Every mapped index starts connected.
pub fn new_mapped_arguments(
    cx: &mut Context,
    values: Vec<JsValue>,
    frame: FrameRef,
    mut mapping: Vec<Option<u32>>,
    callee: JsObjectRef,
) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::MappedArguments);
    mapping.resize(values.len(), None);
    let data = ArgumentsData::new(frame, mapping);
    let obj = wrap(JsObject::new(shape, None, ExoticData::Arguments(data)));
    {
        let mut o = obj.borrow_mut();
        for (i, value) in values.iter().enumerate() {
            o.define_ordinary(
                &PropertyKey::Index(i as u32),
                SlotValue::Data(value.clone()),
                PropertyFlags::default(),
            );
        }
        let length_key = PropertyKey::String(cx.intern("length"));
        o.define_ordinary(
            &length_key,
            SlotValue::Data(JsValue::from(values.len() as u32)),
            PropertyFlags::hidden(),
        );
        let callee_key = PropertyKey::String(cx.intern("callee"));
        o.define_ordinary(
            &callee_key,
            SlotValue::Data(JsValue::Object(callee)),
            PropertyFlags::hidden(),
        );
    }
    obj
}

/// Create a strict-mode arguments object: no aliasing at all, and thrower
/// accessors for the legacy `callee`/`caller` properties.
pub fn new_strict_arguments(cx: &mut Context, values: Vec<JsValue>) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::UnmappedArguments);
    let obj = wrap(JsObject::new(shape, None, ExoticData::Ordinary));
    let thrower = poisoned_accessor(cx);
    {
        let mut o = obj.borrow_mut();
        for (i, value) in values.iter().enumerate() {
            o.define_ordinary(
                &PropertyKey::Index(i as u32),
                SlotValue::Data(value.clone()),
                PropertyFlags::default(),
            );
        }
        let length_key = PropertyKey::String(cx.intern("length"));
        o.define_ordinary(
            &length_key,
            SlotValue::Data(JsValue::from(values.len() as u32)),
            PropertyFlags::hidden(),
        );
        for name in ["callee", "caller"] {
            let key = PropertyKey::String(cx.intern(name));
            o.define_ordinary(
                &key,
                SlotValue::Accessor {
                    get: Some(thrower.cheap_clone()),
                    set: Some(thrower.cheap_clone()),
                },
                PropertyFlags::ACCESSOR,
            );
        }
    }
    obj
}

fn poison_accessor_call(
    _cx: &mut Context,
    _this: &JsValue,
    _args: &[JsValue],
) -> Result<JsValue, JsError> {
    Err(JsError::type_error(
        "'caller', 'callee', and 'arguments' properties may not be accessed on strict mode \
         functions or the arguments objects for calls to them",
    ))
}

/// The %ThrowTypeError% accessor installed on strict arguments objects.
pub fn poisoned_accessor(cx: &mut Context) -> JsObjectRef {
    new_native_function(cx, "ThrowTypeError", poison_accessor_call, 0)
}

/// Create a detachable byte buffer of `byte_length` zeroed bytes.
pub fn new_array_buffer(cx: &mut Context, byte_length: usize) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::ArrayBuffer);
    let handle: BufferHandle = Rc::new(RefCell::new(ArrayBufferData::new(byte_length)));
    wrap(JsObject::new(shape, None, ExoticData::ArrayBuffer(handle)))
}

/// Create a shared (cross-agent, never-detaching) byte buffer.
pub fn new_shared_array_buffer(cx: &mut Context, byte_length: usize) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::SharedArrayBuffer);
    let data = Arc::new(SharedBufferData::new(byte_length));
    wrap(JsObject::new(
        shape,
        None,
        ExoticData::SharedArrayBuffer(data),
    ))
}

/// Create a typed view over a buffer object. `length` is in elements;
/// `None` means "to the end of the buffer".
pub fn new_typed_view(
    cx: &mut Context,
    buffer: &JsObjectRef,
    element: ElementType,
    byte_offset: usize,
    length: Option<usize>,
) -> Result<JsObjectRef, JsError> {
    let view_buffer = {
        let b = buffer.borrow();
        match b.extra() {
            ExoticData::ArrayBuffer(handle) => ViewBuffer::Plain(handle.cheap_clone()),
            ExoticData::SharedArrayBuffer(data) => ViewBuffer::Shared(data.cheap_clone()),
            _ => {
                return Err(JsError::type_error(
                    "TypedArray view requires an ArrayBuffer or SharedArrayBuffer",
                ));
            }
        }
    };
    let view = TypedView::new(view_buffer, element, byte_offset, length)?;
    let shape = cx.shapes().root(ObjectKind::TypedView);
    Ok(wrap(JsObject::new(shape, None, ExoticData::TypedView(view))))
}

/// Create an empty Map.
pub fn new_map(cx: &mut Context) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::Map);
    wrap(JsObject::new(shape, None, ExoticData::Map(OrderedMap::new())))
}

/// Create an empty Set.
pub fn new_set(cx: &mut Context) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::Set);
    wrap(JsObject::new(shape, None, ExoticData::Set(OrderedSet::new())))
}

/// Create a module namespace over `environment` exposing `exports`.
/// Export names are sorted once here; the view itself is live.
pub fn new_module_namespace(
    cx: &mut Context,
    environment: ModuleEnvRef,
    exports: Vec<JsString>,
) -> JsObjectRef {
    // Namespace objects are born non-extensible; their root shape is built
    // once and installed with at-most-one-winner semantics.
    let root = cx.shapes().install_root(
        ObjectKind::ModuleNamespace,
        ShapeBuilder::new(ObjectKind::ModuleNamespace)
            .extensible(false)
            .finish(),
    );
    let data = NamespaceData::new(environment, exports);
    wrap(JsObject::new(root, None, ExoticData::Namespace(data)))
}

/// Create a pending promise.
pub fn new_promise(cx: &mut Context) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::Promise);
    wrap(JsObject::new(
        shape,
        None,
        ExoticData::Promise(PromiseState::new()),
    ))
}

/// Box a primitive value. Strings get the exotic character-indexed wrapper;
/// booleans, numbers, and symbols get a plain `[[PrimitiveValue]]` box.
pub fn new_primitive_wrapper(cx: &mut Context, value: JsValue) -> Result<JsObjectRef, JsError> {
    match value {
        JsValue::String(s) => {
            let shape = cx.shapes().root(ObjectKind::StringWrapper);
            Ok(wrap(JsObject::new(
                shape,
                None,
                ExoticData::StringWrapper(s),
            )))
        }
        JsValue::Boolean(_) | JsValue::Number(_) | JsValue::Symbol(_) => {
            let shape = cx.shapes().root(ObjectKind::PrimitiveWrapper);
            Ok(wrap(JsObject::new(
                shape,
                None,
                ExoticData::Primitive(value),
            )))
        }
        _ => Err(JsError::type_error("Cannot box this value")),
    }
}

/// Create a native function object.
pub fn new_native_function(
    cx: &mut Context,
    name: &str,
    func: NativeFn,
    arity: usize,
) -> JsObjectRef {
    let shape = cx.shapes().root(ObjectKind::Function);
    let interned = cx.intern(name);
    let obj = wrap(JsObject::new(
        shape,
        None,
        ExoticData::Function(NativeFunction {
            name: interned.cheap_clone(),
            func,
            arity,
        }),
    ));
    {
        let mut o = obj.borrow_mut();
        let length_key = PropertyKey::String(cx.intern("length"));
        o.define_ordinary(
            &length_key,
            SlotValue::Data(JsValue::from(arity as u32)),
            PropertyFlags::CONFIGURABLE,
        );
        let name_key = PropertyKey::String(cx.intern("name"));
        o.define_ordinary(
            &name_key,
            SlotValue::Data(JsValue::String(interned)),
            PropertyFlags::CONFIGURABLE,
        );
    }
    obj
}
