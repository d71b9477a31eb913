//! Property keys, attribute bits, and transient property descriptor records

use std::fmt;

use bitflags::bitflags;

use crate::value::{JsString, JsSymbol, JsValue};

/// Property key (string, array index, or symbol).
///
/// Canonical numeric strings ("0", "42", but not "042" or "4294967295")
/// normalize to `Index` so that element access and named access agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Index(u32),
    Symbol(JsSymbol),
}

/// Largest valid array index (2^32 - 2); 2^32 - 1 is the length cap.
pub const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

impl PropertyKey {
    pub fn from_value(value: &JsValue) -> Self {
        match value {
            JsValue::Number(n) => {
                let idx = *n as u32;
                if idx as f64 == *n && *n >= 0.0 && idx <= MAX_ARRAY_INDEX {
                    PropertyKey::Index(idx)
                } else {
                    PropertyKey::String(value.to_js_string())
                }
            }
            JsValue::String(s) => PropertyKey::from(s.clone()),
            JsValue::Symbol(s) => PropertyKey::Symbol(s.clone()),
            _ => PropertyKey::String(value.to_js_string()),
        }
    }

    /// Check if this is a symbol key
    pub fn is_symbol(&self) -> bool {
        matches!(self, PropertyKey::Symbol(_))
    }

    /// Get the array index, if this key is one
    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            _ => None,
        }
    }

    /// Check if this key equals a string literal (avoids allocation)
    #[inline]
    pub fn eq_str(&self, s: &str) -> bool {
        match self {
            PropertyKey::String(js_str) => js_str.as_str() == s,
            PropertyKey::Index(_) | PropertyKey::Symbol(_) => false,
        }
    }
}

fn parse_canonical_index(s: &str) -> Option<u32> {
    // Fast path: check first char is a digit before parsing
    let first = s.bytes().next()?;
    if !first.is_ascii_digit() {
        return None;
    }
    let idx = s.parse::<u32>().ok()?;
    // Canonical (no leading zeros except "0") and within index range
    if idx <= MAX_ARRAY_INDEX && idx.to_string() == s {
        Some(idx)
    } else {
        None
    }
}

impl From<&str> for PropertyKey {
    #[inline]
    fn from(s: &str) -> Self {
        match parse_canonical_index(s) {
            Some(idx) => PropertyKey::Index(idx),
            None => PropertyKey::String(JsString::from(s)),
        }
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::from(s.as_str())
    }
}

impl From<JsString> for PropertyKey {
    #[inline]
    fn from(s: JsString) -> Self {
        match parse_canonical_index(s.as_str()) {
            Some(idx) => PropertyKey::Index(idx),
            None => PropertyKey::String(s),
        }
    }
}

impl From<u32> for PropertyKey {
    fn from(idx: u32) -> Self {
        PropertyKey::Index(idx)
    }
}

impl From<JsSymbol> for PropertyKey {
    fn from(sym: JsSymbol) -> Self {
        PropertyKey::Symbol(sym)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Index(i) => write!(f, "{}", i),
            PropertyKey::Symbol(s) => match &s.description {
                Some(desc) => write!(f, "Symbol({})", desc),
                None => write!(f, "Symbol()"),
            },
        }
    }
}

bitflags! {
    /// Property attribute bits stored in shape property records.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyFlags: u8 {
        /// Property value can be changed (data properties only).
        const WRITABLE = 1 << 0;
        /// Property appears in enumeration.
        const ENUMERABLE = 1 << 1;
        /// Property can be deleted or have attributes changed.
        const CONFIGURABLE = 1 << 2;
        /// Property is an accessor (getter/setter) rather than data.
        const ACCESSOR = 1 << 3;
    }
}

impl Default for PropertyFlags {
    /// Default data-property attributes: writable, enumerable, configurable.
    #[inline]
    fn default() -> Self {
        Self::WRITABLE | Self::ENUMERABLE | Self::CONFIGURABLE
    }
}

impl PropertyFlags {
    #[inline]
    pub const fn read_only() -> Self {
        Self::ENUMERABLE.union(Self::CONFIGURABLE)
    }

    /// Attributes for internal properties: writable and configurable, but
    /// hidden from enumeration (e.g. `callee`, `@@iterator`).
    #[inline]
    pub const fn hidden() -> Self {
        Self::WRITABLE.union(Self::CONFIGURABLE)
    }

    /// Attributes that can never be altered again.
    #[inline]
    pub const fn frozen_data() -> Self {
        Self::ENUMERABLE
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.contains(Self::WRITABLE)
    }

    #[inline]
    pub fn is_enumerable(&self) -> bool {
        self.contains(Self::ENUMERABLE)
    }

    #[inline]
    pub fn is_configurable(&self) -> bool {
        self.contains(Self::CONFIGURABLE)
    }

    #[inline]
    pub fn is_accessor(&self) -> bool {
        self.contains(Self::ACCESSOR)
    }

    fn set_to(mut self, flag: PropertyFlags, on: bool) -> Self {
        self.set(flag, on);
        self
    }
}

/// Transient partial property descriptor used during `defineOwnProperty`
/// negotiation and returned by `getOwnProperty`. Never stored on objects.
///
/// Absent fields (`None`) mean "leave unchanged" when applied against an
/// existing property, and take ECMAScript defaults when creating a new one.
#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
}

impl PropertyDescriptor {
    /// A full data descriptor with explicit attributes.
    pub fn data(value: JsValue, flags: PropertyFlags) -> Self {
        Self {
            value: Some(value),
            writable: Some(flags.is_writable()),
            enumerable: Some(flags.is_enumerable()),
            configurable: Some(flags.is_configurable()),
            get: None,
            set: None,
        }
    }

    /// A full data descriptor with default (writable/enumerable/configurable)
    /// attributes.
    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, PropertyFlags::default())
    }

    /// A full accessor descriptor. `get`/`set` hold function objects or
    /// `JsValue::Undefined` for an explicitly absent side.
    pub fn accessor(get: JsValue, set: JsValue, flags: PropertyFlags) -> Self {
        Self {
            value: None,
            writable: None,
            enumerable: Some(flags.is_enumerable()),
            configurable: Some(flags.is_configurable()),
            get: Some(get),
            set: Some(set),
        }
    }

    /// A descriptor carrying only a value (attributes left unchanged).
    pub fn value_only(value: JsValue) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// Has value or writable, i.e. describes (part of) a data property.
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// Has get or set, i.e. describes (part of) an accessor property.
    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// Neither data nor accessor: only attribute changes.
    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.writable.is_none()
            && self.enumerable.is_none()
            && self.configurable.is_none()
            && self.get.is_none()
            && self.set.is_none()
    }

    /// The attribute-defaulted ("effective") form: absent boolean fields
    /// become `false`, absent value/get/set become `undefined`.
    pub fn complete(mut self) -> Self {
        if self.is_accessor_descriptor() {
            self.get.get_or_insert(JsValue::Undefined);
            self.set.get_or_insert(JsValue::Undefined);
        } else {
            self.value.get_or_insert(JsValue::Undefined);
            self.writable.get_or_insert(false);
        }
        self.enumerable.get_or_insert(false);
        self.configurable.get_or_insert(false);
        self
    }

    /// Collapse the attribute fields into flag bits, using `false` defaults
    /// for absent attributes (only meaningful on completed descriptors).
    pub fn flags(&self) -> PropertyFlags {
        PropertyFlags::empty()
            .set_to(PropertyFlags::WRITABLE, self.writable.unwrap_or(false))
            .set_to(PropertyFlags::ENUMERABLE, self.enumerable.unwrap_or(false))
            .set_to(
                PropertyFlags::CONFIGURABLE,
                self.configurable.unwrap_or(false),
            )
            .set_to(PropertyFlags::ACCESSOR, self.is_accessor_descriptor())
    }

    /// Builder-style attribute setters, used heavily in tests and bootstrap.
    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = Some(writable);
        self
    }

    pub fn with_enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = Some(enumerable);
        self
    }

    pub fn with_configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_index_keys() {
        assert_eq!(PropertyKey::from("0"), PropertyKey::Index(0));
        assert_eq!(PropertyKey::from("42"), PropertyKey::Index(42));
        // Non-canonical numeric strings stay strings
        assert!(matches!(PropertyKey::from("042"), PropertyKey::String(_)));
        assert!(matches!(PropertyKey::from("-1"), PropertyKey::String(_)));
        // 2^32 - 1 is not a valid array index
        assert!(matches!(
            PropertyKey::from("4294967295"),
            PropertyKey::String(_)
        ));
    }

    #[test]
    fn test_key_from_number_value() {
        assert_eq!(
            PropertyKey::from_value(&JsValue::Number(3.0)),
            PropertyKey::Index(3)
        );
        assert!(matches!(
            PropertyKey::from_value(&JsValue::Number(3.5)),
            PropertyKey::String(_)
        ));
    }

    #[test]
    fn test_descriptor_classification() {
        let d = PropertyDescriptor::value_only(JsValue::Number(1.0));
        assert!(d.is_data_descriptor());
        assert!(!d.is_accessor_descriptor());

        let a = PropertyDescriptor::accessor(
            JsValue::Undefined,
            JsValue::Undefined,
            PropertyFlags::default(),
        );
        assert!(a.is_accessor_descriptor());

        let g = PropertyDescriptor {
            enumerable: Some(true),
            ..Default::default()
        };
        assert!(g.is_generic_descriptor());
    }

    #[test]
    fn test_descriptor_complete_defaults() {
        let d = PropertyDescriptor::value_only(JsValue::Number(1.0)).complete();
        assert_eq!(d.writable, Some(false));
        assert_eq!(d.enumerable, Some(false));
        assert_eq!(d.configurable, Some(false));
        assert_eq!(d.value, Some(JsValue::Number(1.0)));
    }

    #[test]
    fn test_flags_round_trip() {
        let flags = PropertyFlags::WRITABLE | PropertyFlags::CONFIGURABLE;
        let d = PropertyDescriptor::data(JsValue::Undefined, flags);
        assert_eq!(d.flags(), flags);
    }
}
