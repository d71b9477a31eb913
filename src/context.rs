//! Agent-local execution context.
//!
//! A `Context` is what the embedding interpreter threads through every
//! object-model call: the string dictionary, the symbol registry, a handle
//! to the (possibly shared) shape registry, and the call hook used to
//! invoke accessor functions. Contexts are single-threaded; only the shape
//! registry behind the `Arc` is shared across agents.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::JsError;
use crate::shape::ShapeRegistry;
use crate::string_dict::StringDict;
use crate::value::{CheapClone, JsObjectRef, JsString, JsSymbol, JsValue};

/// Native function signature. This is the only call-target execution the
/// object model performs; interpreted call targets live in the embedder.
pub type NativeFn = fn(&mut Context, &JsValue, &[JsValue]) -> Result<JsValue, JsError>;

/// Native function wrapper
#[derive(Clone)]
pub struct NativeFunction {
    pub name: JsString,
    pub func: NativeFn,
    pub arity: usize,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Well-known symbols with fixed ids, shared by every context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownSymbol {
    ToStringTag,
    Iterator,
}

impl WellKnownSymbol {
    fn id(self) -> u64 {
        match self {
            WellKnownSymbol::ToStringTag => 1,
            WellKnownSymbol::Iterator => 2,
        }
    }

    fn description(self) -> &'static str {
        match self {
            WellKnownSymbol::ToStringTag => "Symbol.toStringTag",
            WellKnownSymbol::Iterator => "Symbol.iterator",
        }
    }

    /// The symbol value itself. Well-known ids are fixed, so this needs no
    /// context and always yields an equal symbol.
    pub fn to_symbol(self) -> JsSymbol {
        JsSymbol::new(self.id(), Some(JsString::from(self.description())))
    }
}

/// Fresh symbol ids start above the well-known range. The counter is
/// process-wide so symbols stay distinct even across contexts that share a
/// shape registry.
static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(64);

pub struct Context {
    shapes: Arc<ShapeRegistry>,
    strings: StringDict,
}

impl Context {
    /// Create a context with its own shape registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(ShapeRegistry::new()))
    }

    /// Create a context over a shared shape registry (multi-context
    /// embedding mode).
    pub fn with_registry(shapes: Arc<ShapeRegistry>) -> Self {
        Self {
            shapes,
            strings: StringDict::with_common_strings(),
        }
    }

    pub fn shapes(&self) -> &Arc<ShapeRegistry> {
        &self.shapes
    }

    /// Intern a property name.
    pub fn intern(&mut self, s: &str) -> JsString {
        self.strings.get_or_insert(s)
    }

    /// Create a fresh unique symbol.
    pub fn new_symbol(&mut self, description: Option<&str>) -> JsSymbol {
        let id = NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed);
        JsSymbol::new(id, description.map(|d| self.intern(d)))
    }

    /// Get a well-known symbol. These have fixed ids, so independently
    /// created contexts agree on them (required for shared shapes).
    pub fn well_known(&self, symbol: WellKnownSymbol) -> JsSymbol {
        symbol.to_symbol()
    }

    /// Invoke a callable object. This is the call hook accessor dispatch
    /// goes through; non-callables are a TypeError.
    pub fn call(
        &mut self,
        func: &JsObjectRef,
        this: &JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsError> {
        let native = {
            let f = func.borrow();
            match f.as_function() {
                Some(native) => native.clone(),
                None => {
                    return Err(JsError::type_error(format!(
                        "{} is not a function",
                        f.class_name()
                    )));
                }
            }
        };
        (native.func)(self, this, args)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

// NativeFunction clones are a JsString refcount bump and a fn pointer copy
impl CheapClone for NativeFunction {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::new_native_function;

    #[test]
    fn test_well_known_symbols_agree_across_contexts() {
        let mut cx1 = Context::new();
        let mut cx2 = Context::new();
        assert_eq!(
            cx1.well_known(WellKnownSymbol::ToStringTag),
            cx2.well_known(WellKnownSymbol::ToStringTag)
        );
    }

    #[test]
    fn test_fresh_symbols_are_unique() {
        let mut cx = Context::new();
        let a = cx.new_symbol(Some("a"));
        let b = cx.new_symbol(Some("a"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_call_native_function() {
        fn answer(_cx: &mut Context, _this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
            Ok(JsValue::Number(42.0))
        }
        let mut cx = Context::new();
        let func = new_native_function(&mut cx, "answer", answer, 0);
        let result = cx.call(&func, &JsValue::Undefined, &[]).unwrap();
        assert_eq!(result, JsValue::Number(42.0));
    }

    #[test]
    fn test_call_non_callable_is_type_error() {
        let mut cx = Context::new();
        let obj = crate::object::new_ordinary(&mut cx);
        let err = cx.call(&obj, &JsValue::Undefined, &[]).unwrap_err();
        assert!(err.is_type_error());
    }
}
