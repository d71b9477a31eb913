//! Tests for buffer detachment and typed views through the protocol

use jsobj::kinds::buffer::{
    buffer_byte_length, detach_array_buffer, AgentId, ElementType,
};
use jsobj::object::{new_array_buffer, new_shared_array_buffer, new_typed_view};
use jsobj::{protocol, Context, JsValue, PropertyKey};

#[test]
fn test_view_reads_and_writes_bytes() {
    let mut cx = Context::new();
    let buffer = new_array_buffer(&mut cx, 8);
    let view = new_typed_view(&mut cx, &buffer, ElementType::Int32, 0, None).unwrap();

    assert!(protocol::set(&view, &PropertyKey::Index(0), JsValue::Number(-7.0), true, &mut cx).unwrap());
    assert_eq!(
        protocol::get(&view, &PropertyKey::Index(0), &mut cx).unwrap(),
        JsValue::Number(-7.0)
    );
    assert_eq!(view.borrow().class_name(), "Int32Array");
}

#[test]
fn test_views_share_the_region() {
    let mut cx = Context::new();
    let buffer = new_array_buffer(&mut cx, 4);
    let bytes = new_typed_view(&mut cx, &buffer, ElementType::Uint8, 0, None).unwrap();
    let words = new_typed_view(&mut cx, &buffer, ElementType::Uint32, 0, None).unwrap();

    protocol::set(&words, &PropertyKey::Index(0), JsValue::Number(0x01020304 as f64), true, &mut cx)
        .unwrap();
    // Little-endian layout observable byte by byte
    assert_eq!(
        protocol::get(&bytes, &PropertyKey::Index(0), &mut cx).unwrap(),
        JsValue::Number(4.0)
    );
    assert_eq!(
        protocol::get(&bytes, &PropertyKey::Index(3), &mut cx).unwrap(),
        JsValue::Number(1.0)
    );
}

#[test]
fn test_detach_invalidates_every_view() {
    let mut cx = Context::new();
    let buffer = new_array_buffer(&mut cx, 16);
    let a = new_typed_view(&mut cx, &buffer, ElementType::Float64, 0, None).unwrap();
    let b = new_typed_view(&mut cx, &buffer, ElementType::Uint8, 8, Some(8)).unwrap();

    detach_array_buffer(&buffer).unwrap();

    assert!(buffer_byte_length(&buffer).unwrap_err().is_type_error());
    for view in [&a, &b] {
        let v = view.borrow();
        let view_state = v.as_typed_view().unwrap();
        assert!(view_state.byte_length().unwrap_err().is_type_error());
        assert!(view_state.byte_offset().unwrap_err().is_type_error());
    }
    // Element access through the protocol fails too
    assert!(protocol::get(&a, &PropertyKey::Index(0), &mut cx)
        .unwrap_err()
        .is_type_error());
    assert!(
        protocol::set(&b, &PropertyKey::Index(0), JsValue::Number(1.0), true, &mut cx)
            .unwrap_err()
            .is_type_error()
    );
}

#[test]
fn test_detach_twice_is_noop() {
    let mut cx = Context::new();
    let buffer = new_array_buffer(&mut cx, 4);
    detach_array_buffer(&buffer).unwrap();
    // Second detach neither errors nor double-frees
    detach_array_buffer(&buffer).unwrap();
    assert!(buffer_byte_length(&buffer).unwrap_err().is_type_error());
}

#[test]
fn test_shared_buffer_never_detaches() {
    let mut cx = Context::new();
    let shared = new_shared_array_buffer(&mut cx, 32);
    assert!(detach_array_buffer(&shared).unwrap_err().is_type_error());
    assert_eq!(buffer_byte_length(&shared).unwrap(), 32);
}

#[test]
fn test_shared_views_and_waiters() {
    let mut cx = Context::new();
    let shared = new_shared_array_buffer(&mut cx, 8);
    let view = new_typed_view(&mut cx, &shared, ElementType::Int32, 0, None).unwrap();
    protocol::set(&view, &PropertyKey::Index(1), JsValue::Number(11.0), true, &mut cx).unwrap();
    assert_eq!(
        protocol::get(&view, &PropertyKey::Index(1), &mut cx).unwrap(),
        JsValue::Number(11.0)
    );

    let o = shared.borrow();
    let data = o.as_shared_buffer().unwrap();
    {
        let mut waiters = data.waiters();
        waiters.add_waiter(4, AgentId(1)).unwrap();
        waiters.add_waiter(4, AgentId(2)).unwrap();
        assert_eq!(waiters.notify(4, 1), vec![AgentId(1)]);
        assert_eq!(waiters.waiter_count(4), 1);
    }
}

#[test]
fn test_view_geometry_errors() {
    let mut cx = Context::new();
    let buffer = new_array_buffer(&mut cx, 10);
    assert!(new_typed_view(&mut cx, &buffer, ElementType::Int32, 1, None)
        .unwrap_err()
        .is_range_error());
    assert!(new_typed_view(&mut cx, &buffer, ElementType::Int32, 0, Some(4))
        .unwrap_err()
        .is_range_error());
    // Views require buffer objects
    let plain = jsobj::object::new_ordinary(&mut cx);
    assert!(new_typed_view(&mut cx, &plain, ElementType::Int8, 0, None)
        .unwrap_err()
        .is_type_error());
}

#[test]
fn test_view_out_of_bounds_access() {
    let mut cx = Context::new();
    let buffer = new_array_buffer(&mut cx, 4);
    let view = new_typed_view(&mut cx, &buffer, ElementType::Uint16, 0, None).unwrap();

    assert_eq!(
        protocol::get(&view, &PropertyKey::Index(9), &mut cx).unwrap(),
        JsValue::Undefined
    );
    // Out-of-bounds defines are rejected
    assert!(!protocol::set(&view, &PropertyKey::Index(9), JsValue::Number(1.0), false, &mut cx).unwrap());
    // In-bounds indices never delete
    assert!(!protocol::delete(&view, &PropertyKey::Index(0), false, &mut cx).unwrap());
}

#[test]
fn test_view_own_keys() {
    let mut cx = Context::new();
    let buffer = new_array_buffer(&mut cx, 6);
    let view = new_typed_view(&mut cx, &buffer, ElementType::Uint16, 0, None).unwrap();
    protocol::set(&view, &PropertyKey::from("note"), JsValue::from("x"), true, &mut cx).unwrap();

    assert_eq!(
        protocol::own_property_keys(&view),
        vec![
            PropertyKey::Index(0),
            PropertyKey::Index(1),
            PropertyKey::Index(2),
            PropertyKey::from("note"),
        ]
    );

    detach_array_buffer(&buffer).unwrap();
    assert_eq!(
        protocol::own_property_keys(&view),
        vec![PropertyKey::from("note")]
    );
}
