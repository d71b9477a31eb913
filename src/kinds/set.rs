//! Set exotic storage: insertion-ordered unique values.
//!
//! Shares the SameValueZero key discipline and the tombstone/cursor design
//! with `OrderedMap` (see `kinds::map`).

use rustc_hash::FxHashMap;

use crate::kinds::map::{normalize_key, ValueKey};
use crate::object::JsObject;
use crate::protocol::KindOps;
use crate::value::JsValue;

/// Insertion-ordered value table with cursor-stable deletion.
#[derive(Debug, Default)]
pub struct OrderedSet {
    entries: Vec<Option<JsValue>>,
    index: FxHashMap<ValueKey, usize>,
}

impl OrderedSet {
    pub fn new() -> OrderedSet {
        OrderedSet::default()
    }

    /// Live entry count, derived from the index.
    pub fn size(&self) -> usize {
        self.index.len()
    }

    pub fn has(&self, value: &JsValue) -> bool {
        self.index.contains_key(&ValueKey::new(value))
    }

    /// Insert a value; re-inserting an existing value keeps its original
    /// insertion position. Returns whether the value was new.
    pub fn add(&mut self, value: JsValue) -> bool {
        let value = normalize_key(value);
        let key = ValueKey::new(&value);
        if self.index.contains_key(&key) {
            return false;
        }
        self.entries.push(Some(value));
        self.index.insert(key, self.entries.len() - 1);
        true
    }

    /// Delete a value, leaving a tombstone for cursor stability.
    pub fn delete(&mut self, value: &JsValue) -> bool {
        let Some(position) = self.index.remove(&ValueKey::new(value)) else {
            return false;
        };
        if let Some(entry) = self.entries.get_mut(position) {
            *entry = None;
        }
        true
    }

    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.index.clear();
    }

    pub fn cursor(&self) -> SetCursor {
        SetCursor { position: 0 }
    }

    /// Live values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &JsValue> {
        self.entries.iter().filter_map(|entry| entry.as_ref())
    }
}

/// A deletion-tolerant position into an `OrderedSet`.
#[derive(Debug, Clone, Copy)]
pub struct SetCursor {
    position: usize,
}

impl SetCursor {
    pub fn next(&mut self, set: &OrderedSet) -> Option<JsValue> {
        while self.position < set.entries.len() {
            let position = self.position;
            self.position += 1;
            if let Some(value) = set.entries.get(position).and_then(|entry| entry.as_ref()) {
                return Some(value.clone());
            }
        }
        None
    }
}

pub struct SetOps;

impl KindOps for SetOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "Set"
    }
}
