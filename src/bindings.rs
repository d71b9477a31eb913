//! Lexical frames and module environments.
//!
//! The interpreter owns variable bindings; the object model only needs two
//! narrow windows into them: the frame slots a mapped arguments object
//! aliases, and the named live bindings a module namespace re-exports.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::JsError;
use crate::value::{JsString, JsValue};

/// Variable binding
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: JsValue,
    pub mutable: bool,
    pub initialized: bool,
}

impl Binding {
    pub fn initialized(value: JsValue) -> Self {
        Self {
            value,
            mutable: true,
            initialized: true,
        }
    }

    /// A declared binding in its temporal dead zone.
    pub fn uninitialized() -> Self {
        Self {
            value: JsValue::Undefined,
            mutable: true,
            initialized: false,
        }
    }
}

/// A function activation's parameter slots, as seen by mapped arguments
/// objects. The interpreter creates one per non-strict call and keeps
/// writing parameter variables through it.
#[derive(Debug, Default)]
pub struct Frame {
    slots: Vec<Binding>,
}

pub type FrameRef = Rc<RefCell<Frame>>;

impl Frame {
    pub fn new(values: Vec<JsValue>) -> Frame {
        Frame {
            slots: values.into_iter().map(Binding::initialized).collect(),
        }
    }

    pub fn with_slots(slots: Vec<Binding>) -> Frame {
        Frame { slots }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Read a slot; a binding still in its dead zone is a reference error,
    /// never a sentinel value.
    pub fn read(&self, slot: u32) -> Result<JsValue, JsError> {
        let binding = self
            .slots
            .get(slot as usize)
            .ok_or_else(|| JsError::internal_error(format!("no frame slot {}", slot)))?;
        if !binding.initialized {
            return Err(JsError::reference_error(format!("argument {}", slot)));
        }
        Ok(binding.value.clone())
    }

    pub fn write(&mut self, slot: u32, value: JsValue) -> Result<(), JsError> {
        let binding = self
            .slots
            .get_mut(slot as usize)
            .ok_or_else(|| JsError::internal_error(format!("no frame slot {}", slot)))?;
        binding.value = value;
        binding.initialized = true;
        Ok(())
    }
}

/// Create a frame handle from argument values.
pub fn new_frame(values: Vec<JsValue>) -> FrameRef {
    Rc::new(RefCell::new(Frame::new(values)))
}

/// A module's lexical environment: named live bindings that namespace
/// objects read through. Bindings are declared before the module body runs
/// and initialized as execution reaches them.
#[derive(Debug, Default)]
pub struct ModuleEnvironment {
    bindings: FxHashMap<JsString, Binding>,
}

pub type ModuleEnvRef = Rc<RefCell<ModuleEnvironment>>;

impl ModuleEnvironment {
    pub fn new() -> Self {
        Self {
            bindings: FxHashMap::default(),
        }
    }

    /// Declare an export binding in its dead zone.
    pub fn declare(&mut self, name: JsString) {
        self.bindings.insert(name, Binding::uninitialized());
    }

    /// Initialize or overwrite a binding's value.
    pub fn initialize(&mut self, name: JsString, value: JsValue) {
        self.bindings.insert(name, Binding::initialized(value));
    }

    pub fn has(&self, name: &JsString) -> bool {
        self.bindings.contains_key(name)
    }

    /// Read a live binding. Reading an uninitialized binding is reported as
    /// a reference error.
    pub fn read(&self, name: &JsString) -> Result<JsValue, JsError> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| JsError::reference_error(name.as_str()))?;
        if !binding.initialized {
            return Err(JsError::reference_error(name.as_str()));
        }
        Ok(binding.value.clone())
    }
}

pub fn new_module_environment() -> ModuleEnvRef {
    Rc::new(RefCell::new(ModuleEnvironment::new()))
}
