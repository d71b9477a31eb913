//! Error types for the object model

use thiserror::Error;

use crate::property::PropertyKey;

/// Main error type for object-model operations.
///
/// Low-level shape and slot storage never fails; errors originate only in
/// protocol operations, and mutating operations raise them only when called
/// with `strict = true` (otherwise they report failure as `Ok(false)`).
#[derive(Debug, Error)]
pub enum JsError {
    #[error("TypeError: {message}")]
    TypeError { message: String },

    #[error("RangeError: {message}")]
    RangeError { message: String },

    #[error("ReferenceError: {name} is not initialized")]
    ReferenceError { name: String },

    /// Invariant breakage that must not surface in correct usage
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JsError {
    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        JsError::RangeError {
            message: message.into(),
        }
    }

    pub fn reference_error(name: impl Into<String>) -> Self {
        JsError::ReferenceError { name: name.into() }
    }

    /// Create an internal error for unexpected object-model states.
    /// These should never happen in correctly-written code.
    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    pub fn not_writable(key: &PropertyKey) -> Self {
        JsError::type_error(format!(
            "Cannot assign to read only property '{}' of object",
            key
        ))
    }

    pub fn not_configurable(key: &PropertyKey) -> Self {
        JsError::type_error(format!("Cannot redefine property: {}", key))
    }

    pub fn not_deletable(key: &PropertyKey) -> Self {
        JsError::type_error(format!("Cannot delete property '{}' of object", key))
    }

    pub fn not_extensible(key: &PropertyKey) -> Self {
        JsError::type_error(format!(
            "Cannot add property {}, object is not extensible",
            key
        ))
    }

    pub fn detached_buffer() -> Self {
        JsError::type_error("Cannot perform operation on a detached ArrayBuffer")
    }

    /// Check whether this error is a TypeError (callers branch on the error
    /// taxonomy when converting to runtime exception objects)
    pub fn is_type_error(&self) -> bool {
        matches!(self, JsError::TypeError { .. })
    }

    pub fn is_range_error(&self) -> bool {
        matches!(self, JsError::RangeError { .. })
    }

    pub fn is_reference_error(&self) -> bool {
        matches!(self, JsError::ReferenceError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JsError::type_error("x is not an object");
        assert_eq!(err.to_string(), "TypeError: x is not an object");
        assert!(err.is_type_error());

        let err = JsError::range_error("invalid typed array length");
        assert_eq!(err.to_string(), "RangeError: invalid typed array length");
        assert!(err.is_range_error());
    }

    #[test]
    fn test_policy_helpers() {
        let key = PropertyKey::from("x");
        assert!(JsError::not_writable(&key).is_type_error());
        assert!(JsError::not_configurable(&key).is_type_error());
        assert!(JsError::not_extensible(&key).is_type_error());
        assert!(JsError::detached_buffer().is_type_error());
    }
}
