//! String dictionary for deduplicating JsString instances.
//!
//! Property names flow through the object model constantly; interning them
//! ensures identical names share one allocation and makes shape-table
//! hashing cheap.

use rustc_hash::FxHashMap;

use crate::value::{CheapClone, JsString};

/// A dictionary for deduplicating JsString instances.
///
/// Strings inserted into the dictionary are stored once and subsequent
/// requests for the same string return a cheap clone of the existing
/// instance.
pub struct StringDict {
    /// Map from string content to shared JsString instance.
    /// Using Box<str> as key to avoid double-indirection through Arc.
    strings: FxHashMap<Box<str>, JsString>,
}

impl StringDict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self {
            strings: FxHashMap::default(),
        }
    }

    /// Create a dictionary pre-populated with the names the object model
    /// itself installs and compares against.
    pub fn with_common_strings() -> Self {
        let mut dict = Self::new();
        for s in COMMON_STRINGS {
            dict.get_or_insert(s);
        }
        dict
    }

    /// Get an existing string or insert a new one.
    /// Returns a cheap clone of the shared JsString instance.
    pub fn get_or_insert(&mut self, s: &str) -> JsString {
        if let Some(existing) = self.strings.get(s) {
            return existing.cheap_clone();
        }
        let js_str = JsString::from(s);
        self.strings.insert(s.into(), js_str.cheap_clone());
        js_str
    }

    /// Get an existing string without inserting.
    /// Returns None if the string is not in the dictionary.
    pub fn get(&self, s: &str) -> Option<JsString> {
        self.strings.get(s).map(|s| s.cheap_clone())
    }

    /// Number of unique strings in the dictionary.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringDict {
    fn default() -> Self {
        Self::new()
    }
}

/// Names the object model reads or installs on its own: reified properties,
/// descriptor record fields, and the class names of the built-in kinds.
const COMMON_STRINGS: &[&str] = &[
    // Reified properties
    "length",
    "callee",
    "caller",
    "byteLength",
    "byteOffset",
    "size",
    // Property descriptor fields
    "value",
    "writable",
    "enumerable",
    "configurable",
    "get",
    "set",
    // Class names / toString tags
    "Object",
    "Array",
    "Arguments",
    "Function",
    "Boolean",
    "Number",
    "String",
    "Symbol",
    "ArrayBuffer",
    "SharedArrayBuffer",
    "Map",
    "Set",
    "Promise",
    "Module",
    "Uint8Array",
    "Float64Array",
    // Prototype plumbing the embedder touches constantly
    "prototype",
    "constructor",
    "__proto__",
    "toString",
    "valueOf",
    "name",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_dict_deduplication() {
        let mut dict = StringDict::new();
        let s1 = dict.get_or_insert("hello");
        let s2 = dict.get_or_insert("hello");

        // Should be the same string value
        assert_eq!(s1, s2);
        // Should point to the same memory (same Arc)
        assert!(std::ptr::eq(s1.as_str(), s2.as_str()));
    }

    #[test]
    fn test_string_dict_different_strings() {
        let mut dict = StringDict::new();
        let s1 = dict.get_or_insert("hello");
        let s2 = dict.get_or_insert("world");

        assert_ne!(s1, s2);
        assert!(!std::ptr::eq(s1.as_str(), s2.as_str()));
    }

    #[test]
    fn test_common_strings_preloaded() {
        let dict = StringDict::with_common_strings();
        assert!(dict.get("length").is_some());
        assert!(dict.get("callee").is_some());
        assert!(dict.get("configurable").is_some());
    }

    #[test]
    fn test_string_dict_len() {
        let mut dict = StringDict::new();
        assert_eq!(dict.len(), 0);
        assert!(dict.is_empty());

        dict.get_or_insert("hello");
        assert_eq!(dict.len(), 1);

        // Same string doesn't increase count
        dict.get_or_insert("hello");
        assert_eq!(dict.len(), 1);

        dict.get_or_insert("world");
        assert_eq!(dict.len(), 2);
    }
}
