//! Dynamic object model for a JavaScript-style runtime.
//!
//! This crate is the layer that gives every runtime value (plain objects,
//! arrays, boxed primitives, collections, buffers, promises, module
//! namespaces, argument lists) a uniform set of introspectable operations
//! (get/set/delete/define/enumerate a property, query/change the prototype,
//! query/seal extensibility), while letting each *kind* of value override
//! that behavior with its mandated exotic semantics.
//!
//! The storage representation is a hidden-class shape tree (`shape`):
//! objects with the same property history share one immutable layout node,
//! so "same shape" is an O(1) id comparison and property lookup is one hash
//! probe. Exotic behavior dispatches through a kind tag carried on the
//! shape (`protocol`, `kinds`), and the integrity-level and `toString`-tag
//! algorithms (`integrity`) are written purely against the protocol.
//!
//! # Example
//!
//! ```
//! use jsobj::{protocol, Context, JsValue, PropertyKey};
//! use jsobj::object::new_ordinary;
//!
//! let mut cx = Context::new();
//! let obj = new_ordinary(&mut cx);
//! let key = PropertyKey::from("answer");
//! protocol::set(&obj, &key, JsValue::Number(42.0), true, &mut cx).unwrap();
//! assert_eq!(protocol::get(&obj, &key, &mut cx).unwrap(), JsValue::Number(42.0));
//! ```

pub mod api;
pub mod bindings;
pub mod context;
pub mod error;
pub mod integrity;
pub mod kinds;
pub mod object;
pub mod property;
pub mod protocol;
pub mod shape;
pub mod string_dict;
pub mod value;

pub use context::{Context, NativeFn, NativeFunction, WellKnownSymbol};
pub use error::JsError;
pub use integrity::IntegrityLevel;
pub use object::{ExoticData, JsObject, SlotValue};
pub use property::{PropertyDescriptor, PropertyFlags, PropertyKey};
pub use shape::{ObjectKind, Shape, ShapeBuilder, ShapeId, ShapeRegistry};
pub use string_dict::StringDict;
pub use value::{CheapClone, JsObjectRef, JsString, JsSymbol, JsValue};
