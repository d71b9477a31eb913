//! Map exotic storage: an insertion-ordered hash table keyed by value.
//!
//! Key equality is SameValueZero: `-0` and `+0` are one key (normalized to
//! `+0` on insert), `NaN` equals itself, everything else is strict
//! identity. The table is a tombstone vector plus a hash index, so live
//! cursors survive deletion of visited or unvisited entries without
//! skipping or resurrecting anything. `size` is derived from the table,
//! never an independently stored field.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::object::JsObject;
use crate::protocol::KindOps;
use crate::value::JsValue;

/// A JsValue wrapper hashing and comparing with SameValueZero.
#[derive(Debug, Clone)]
pub(crate) struct ValueKey(JsValue);

impl ValueKey {
    /// Normalize on construction so `-0` and `+0` collide.
    pub(crate) fn new(value: &JsValue) -> ValueKey {
        match value {
            JsValue::Number(n) if *n == 0.0 => ValueKey(JsValue::Number(0.0)),
            _ => ValueKey(value.clone()),
        }
    }
}

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.same_value_zero(&other.0)
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            JsValue::Undefined => 0u8.hash(state),
            JsValue::Null => 1u8.hash(state),
            JsValue::Boolean(b) => {
                2u8.hash(state);
                b.hash(state);
            }
            JsValue::Number(n) => {
                3u8.hash(state);
                // One bit pattern per SameValueZero equivalence class
                let canonical = if n.is_nan() { f64::NAN } else { *n };
                canonical.to_bits().hash(state);
            }
            JsValue::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            JsValue::Symbol(sym) => {
                5u8.hash(state);
                sym.hash(state);
            }
            JsValue::Object(obj) => {
                6u8.hash(state);
                (Rc::as_ptr(obj) as usize).hash(state);
            }
        }
    }
}

/// Normalize a key value for storage (`-0` becomes `+0`).
pub(crate) fn normalize_key(value: JsValue) -> JsValue {
    match value {
        JsValue::Number(n) if n == 0.0 => JsValue::Number(0.0),
        other => other,
    }
}

/// Insertion-ordered key/value table with cursor-stable deletion.
#[derive(Debug, Default)]
pub struct OrderedMap {
    /// Insertion order; `None` marks a deleted entry (tombstone).
    entries: Vec<Option<(JsValue, JsValue)>>,
    /// Hash index from key to entry position.
    index: FxHashMap<ValueKey, usize>,
}

impl OrderedMap {
    pub fn new() -> OrderedMap {
        OrderedMap::default()
    }

    /// The number of live entries. Derived by the index, not stored
    /// separately, so it cannot desynchronize from the entries.
    pub fn size(&self) -> usize {
        self.index.len()
    }

    pub fn get(&self, key: &JsValue) -> Option<JsValue> {
        let position = *self.index.get(&ValueKey::new(key))?;
        self.entries
            .get(position)
            .and_then(|entry| entry.as_ref())
            .map(|(_, value)| value.clone())
    }

    pub fn has(&self, key: &JsValue) -> bool {
        self.index.contains_key(&ValueKey::new(key))
    }

    /// Insert or update. Updates keep the original insertion position.
    pub fn set(&mut self, key: JsValue, value: JsValue) {
        let key = normalize_key(key);
        let value_key = ValueKey::new(&key);
        if let Some(&position) = self.index.get(&value_key) {
            if let Some(entry) = self.entries.get_mut(position) {
                *entry = Some((key, value));
            }
            return;
        }
        self.entries.push(Some((key, value)));
        self.index.insert(value_key, self.entries.len() - 1);
    }

    /// Delete a key, leaving a tombstone so outstanding cursors stay
    /// consistent. Returns whether the key was present.
    pub fn delete(&mut self, key: &JsValue) -> bool {
        let Some(position) = self.index.remove(&ValueKey::new(key)) else {
            return false;
        };
        if let Some(entry) = self.entries.get_mut(position) {
            *entry = None;
        }
        true
    }

    /// Remove every entry. Existing cursors see the end of the table.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.index.clear();
    }

    /// A live cursor from the start of insertion order.
    pub fn cursor(&self) -> MapCursor {
        MapCursor { position: 0 }
    }

    pub(crate) fn entry_at(&self, position: usize) -> Option<&(JsValue, JsValue)> {
        self.entries.get(position).and_then(|entry| entry.as_ref())
    }

    pub(crate) fn capacity_mark(&self) -> usize {
        self.entries.len()
    }

    /// Live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&JsValue, &JsValue)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.as_ref())
            .map(|(k, v)| (k, v))
    }
}

/// A position into an `OrderedMap`, tolerant of concurrent deletion:
/// already-visited and not-yet-visited deletions neither resurrect nor
/// skip live entries.
#[derive(Debug, Clone, Copy)]
pub struct MapCursor {
    position: usize,
}

impl MapCursor {
    /// Advance to the next live entry.
    pub fn next(&mut self, map: &OrderedMap) -> Option<(JsValue, JsValue)> {
        while self.position < map.capacity_mark() {
            let position = self.position;
            self.position += 1;
            if let Some((key, value)) = map.entry_at(position) {
                return Some((key.clone(), value.clone()));
            }
        }
        None
    }
}

pub struct MapOps;

impl KindOps for MapOps {
    fn class_name(&self, _obj: &JsObject) -> &'static str {
        "Map"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_zero_normalizes() {
        let mut map = OrderedMap::new();
        map.set(JsValue::Number(-0.0), JsValue::from("zero"));
        assert_eq!(map.get(&JsValue::Number(0.0)), Some(JsValue::from("zero")));
        assert_eq!(map.size(), 1);
        // The stored key itself is +0
        let (key, _) = map.iter().next().unwrap();
        assert!(matches!(key, JsValue::Number(n) if n.is_sign_positive()));
    }

    #[test]
    fn test_nan_is_one_key() {
        let mut map = OrderedMap::new();
        map.set(JsValue::Number(f64::NAN), JsValue::Number(1.0));
        map.set(JsValue::Number(f64::NAN), JsValue::Number(2.0));
        assert_eq!(map.size(), 1);
        assert_eq!(map.get(&JsValue::Number(f64::NAN)), Some(JsValue::Number(2.0)));
    }

    #[test]
    fn test_insertion_order_preserved_on_update() {
        let mut map = OrderedMap::new();
        map.set(JsValue::from("a"), JsValue::Number(1.0));
        map.set(JsValue::from("b"), JsValue::Number(2.0));
        map.set(JsValue::from("a"), JsValue::Number(3.0));

        let keys: Vec<JsValue> = map.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![JsValue::from("a"), JsValue::from("b")]);
    }

    #[test]
    fn test_cursor_tolerates_deletion() {
        let mut map = OrderedMap::new();
        for i in 0..5 {
            map.set(JsValue::Number(i as f64), JsValue::Number(i as f64));
        }
        let mut cursor = map.cursor();
        assert_eq!(cursor.next(&map).map(|(k, _)| k), Some(JsValue::Number(0.0)));

        // Delete one behind and one ahead of the cursor
        map.delete(&JsValue::Number(0.0));
        map.delete(&JsValue::Number(2.0));

        let rest: Vec<f64> = std::iter::from_fn(|| cursor.next(&map))
            .map(|(k, _)| match k {
                JsValue::Number(n) => n,
                _ => f64::NAN,
            })
            .collect();
        assert_eq!(rest, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_clear_exhausts_cursors() {
        let mut map = OrderedMap::new();
        map.set(JsValue::Number(1.0), JsValue::Number(1.0));
        map.set(JsValue::Number(2.0), JsValue::Number(2.0));
        let mut cursor = map.cursor();
        map.clear();
        assert_eq!(map.size(), 0);
        assert!(cursor.next(&map).is_none());
    }

    #[test]
    fn test_object_keys_by_identity() {
        use crate::context::Context;
        use crate::object::new_ordinary;

        let mut cx = Context::new();
        let a = new_ordinary(&mut cx);
        let b = new_ordinary(&mut cx);
        let mut map = OrderedMap::new();
        map.set(JsValue::Object(a.clone()), JsValue::Number(1.0));
        assert!(map.has(&JsValue::Object(a)));
        assert!(!map.has(&JsValue::Object(b)));
    }
}
