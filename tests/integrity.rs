//! Tests for the generic integrity-level algorithms and toString tags

use jsobj::integrity::{freeze, is_frozen, is_sealed, seal, to_string_tag};
use jsobj::object::{
    new_array, new_map, new_native_function, new_ordinary, new_primitive_wrapper, new_promise,
};
use jsobj::{protocol, Context, JsError, JsValue, PropertyDescriptor, PropertyKey};

fn key(s: &str) -> PropertyKey {
    PropertyKey::from(s)
}

#[test]
fn test_fresh_object_is_neither_sealed_nor_frozen() {
    let mut cx = Context::new();
    let obj = new_ordinary(&mut cx);
    assert!(!is_sealed(&obj, &mut cx).unwrap());
    assert!(!is_frozen(&obj, &mut cx).unwrap());
}

#[test]
fn test_seal_blocks_add_and_delete_but_not_write() {
    let mut cx = Context::new();
    let obj = new_ordinary(&mut cx);
    protocol::set(&obj, &key("x"), JsValue::Number(1.0), true, &mut cx).unwrap();

    assert!(seal(&obj, true, &mut cx).unwrap());
    assert!(is_sealed(&obj, &mut cx).unwrap());
    assert!(!is_frozen(&obj, &mut cx).unwrap());

    // No new properties, no deletion
    assert!(!protocol::set(&obj, &key("y"), JsValue::Number(2.0), false, &mut cx).unwrap());
    assert!(!protocol::delete(&obj, &key("x"), false, &mut cx).unwrap());
    // Existing data still writable
    assert!(protocol::set(&obj, &key("x"), JsValue::Number(3.0), true, &mut cx).unwrap());
}

#[test]
fn test_freeze_then_set_fails_both_ways_value_unchanged() {
    let mut cx = Context::new();
    let obj = new_ordinary(&mut cx);
    protocol::set(&obj, &key("x"), JsValue::Number(1.0), true, &mut cx).unwrap();
    assert!(freeze(&obj, true, &mut cx).unwrap());
    assert!(is_frozen(&obj, &mut cx).unwrap());
    assert!(is_sealed(&obj, &mut cx).unwrap());

    // Non-strict: false, value unchanged
    assert!(!protocol::set(&obj, &key("x"), JsValue::Number(9.0), false, &mut cx).unwrap());
    assert_eq!(
        protocol::get(&obj, &key("x"), &mut cx).unwrap(),
        JsValue::Number(1.0)
    );

    // Strict: TypeError, value unchanged
    let err = protocol::set(&obj, &key("x"), JsValue::Number(9.0), true, &mut cx).unwrap_err();
    assert!(err.is_type_error());
    assert_eq!(
        protocol::get(&obj, &key("x"), &mut cx).unwrap(),
        JsValue::Number(1.0)
    );
}

#[test]
fn test_freeze_preserves_accessors() {
    fn answer(_cx: &mut Context, _this: &JsValue, _args: &[JsValue]) -> Result<JsValue, JsError> {
        Ok(JsValue::Number(42.0))
    }

    let mut cx = Context::new();
    let obj = new_ordinary(&mut cx);
    let getter = new_native_function(&mut cx, "answer", answer, 0);
    protocol::define_own_property(
        &obj,
        &key("a"),
        PropertyDescriptor::accessor(
            JsValue::Object(getter),
            JsValue::Undefined,
            jsobj::PropertyFlags::ENUMERABLE | jsobj::PropertyFlags::CONFIGURABLE,
        ),
        true,
        &mut cx,
    )
    .unwrap();

    assert!(freeze(&obj, true, &mut cx).unwrap());
    // Accessors have no writable bit; the getter keeps working
    assert!(is_frozen(&obj, &mut cx).unwrap());
    assert_eq!(
        protocol::get(&obj, &key("a"), &mut cx).unwrap(),
        JsValue::Number(42.0)
    );
}

#[test]
fn test_freeze_array_pins_elements_and_length() {
    let mut cx = Context::new();
    let arr = new_array(
        &mut cx,
        vec![JsValue::Number(1.0), JsValue::Number(2.0)],
    );
    assert!(freeze(&arr, true, &mut cx).unwrap());
    assert!(is_frozen(&arr, &mut cx).unwrap());

    assert!(!protocol::set(&arr, &PropertyKey::Index(0), JsValue::Number(9.0), false, &mut cx).unwrap());
    assert!(!protocol::set(&arr, &key("length"), JsValue::Number(0.0), false, &mut cx).unwrap());
    assert!(!protocol::set(&arr, &PropertyKey::Index(5), JsValue::Number(9.0), false, &mut cx).unwrap());
    assert_eq!(
        protocol::get(&arr, &key("length"), &mut cx).unwrap(),
        JsValue::Number(2.0)
    );
}

#[test]
fn test_seal_array_keeps_elements_writable() {
    let mut cx = Context::new();
    let arr = new_array(&mut cx, vec![JsValue::Number(1.0)]);
    assert!(seal(&arr, true, &mut cx).unwrap());
    assert!(is_sealed(&arr, &mut cx).unwrap());
    assert!(!is_frozen(&arr, &mut cx).unwrap());

    assert!(protocol::set(&arr, &PropertyKey::Index(0), JsValue::Number(5.0), true, &mut cx).unwrap());
    assert!(!protocol::delete(&arr, &PropertyKey::Index(0), false, &mut cx).unwrap());
}

#[test]
fn test_integrity_generic_over_kinds() {
    let mut cx = Context::new();
    // Map and Promise carry extra state but seal like any object
    for obj in [new_map(&mut cx), new_promise(&mut cx)] {
        assert!(freeze(&obj, true, &mut cx).unwrap());
        assert!(is_frozen(&obj, &mut cx).unwrap());
    }
}

#[test]
fn test_to_string_tags() {
    let mut cx = Context::new();
    assert_eq!(
        to_string_tag(&JsValue::Undefined, &mut cx).unwrap(),
        "[object Undefined]"
    );
    assert_eq!(
        to_string_tag(&JsValue::Number(1.0), &mut cx).unwrap(),
        "[object Number]"
    );

    let obj = new_ordinary(&mut cx);
    assert_eq!(
        to_string_tag(&JsValue::Object(obj), &mut cx).unwrap(),
        "[object Object]"
    );
    let arr = new_array(&mut cx, vec![]);
    assert_eq!(
        to_string_tag(&JsValue::Object(arr), &mut cx).unwrap(),
        "[object Array]"
    );
    let boxed = new_primitive_wrapper(&mut cx, JsValue::Boolean(true)).unwrap();
    assert_eq!(
        to_string_tag(&JsValue::Object(boxed), &mut cx).unwrap(),
        "[object Boolean]"
    );
}

#[test]
fn test_custom_to_string_tag_overrides() {
    let mut cx = Context::new();
    let obj = new_ordinary(&mut cx);
    let tag_key = PropertyKey::Symbol(cx.well_known(jsobj::WellKnownSymbol::ToStringTag));
    protocol::set(&obj, &tag_key, JsValue::from("Custom"), true, &mut cx).unwrap();
    assert_eq!(
        to_string_tag(&JsValue::Object(obj), &mut cx).unwrap(),
        "[object Custom]"
    );
}

#[test]
fn test_string_wrapper_resists_freezing_checks() {
    let mut cx = Context::new();
    let boxed = new_primitive_wrapper(&mut cx, JsValue::from("ab")).unwrap();
    // Character slots are born non-writable/non-configurable, so freezing
    // succeeds and reports frozen once extensibility is revoked.
    assert!(freeze(&boxed, true, &mut cx).unwrap());
    assert!(is_frozen(&boxed, &mut cx).unwrap());
    assert_eq!(
        protocol::get(&boxed, &PropertyKey::Index(0), &mut cx).unwrap(),
        JsValue::from("a")
    );
}
