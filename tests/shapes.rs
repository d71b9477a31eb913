//! Tests for hidden-class sharing observable through the protocol

use std::sync::Arc;

use jsobj::object::new_ordinary;
use jsobj::{protocol, Context, JsValue, PropertyKey, ShapeRegistry};

fn key(s: &str) -> PropertyKey {
    PropertyKey::from(s)
}

#[test]
fn test_same_history_same_shape() {
    let mut cx = Context::new();
    let a = new_ordinary(&mut cx);
    let b = new_ordinary(&mut cx);

    for obj in [&a, &b] {
        protocol::set(obj, &key("x"), JsValue::Number(1.0), true, &mut cx).unwrap();
        protocol::set(obj, &key("y"), JsValue::Number(2.0), true, &mut cx).unwrap();
    }

    assert_eq!(a.borrow().shape().id(), b.borrow().shape().id());
}

#[test]
fn test_same_shape_same_keys_and_attributes() {
    let mut cx = Context::new();
    let a = new_ordinary(&mut cx);
    let b = new_ordinary(&mut cx);

    for obj in [&a, &b] {
        protocol::set(obj, &key("first"), JsValue::Number(1.0), true, &mut cx).unwrap();
        protocol::set(obj, &key("second"), JsValue::Number(2.0), true, &mut cx).unwrap();
        protocol::set(obj, &PropertyKey::Index(0), JsValue::Number(0.0), true, &mut cx).unwrap();
    }
    assert_eq!(a.borrow().shape().id(), b.borrow().shape().id());

    // Identical key sets, order, and attributes
    let keys_a = protocol::own_property_keys(&a);
    let keys_b = protocol::own_property_keys(&b);
    assert_eq!(keys_a, keys_b);
    for k in &keys_a {
        let da = protocol::get_own_property(&a, k, &mut cx).unwrap().unwrap();
        let db = protocol::get_own_property(&b, k, &mut cx).unwrap().unwrap();
        assert_eq!(da.flags(), db.flags());
    }
}

#[test]
fn test_divergent_order_divergent_shape() {
    let mut cx = Context::new();
    let a = new_ordinary(&mut cx);
    let b = new_ordinary(&mut cx);

    protocol::set(&a, &key("x"), JsValue::Number(1.0), true, &mut cx).unwrap();
    protocol::set(&a, &key("y"), JsValue::Number(2.0), true, &mut cx).unwrap();
    protocol::set(&b, &key("y"), JsValue::Number(2.0), true, &mut cx).unwrap();
    protocol::set(&b, &key("x"), JsValue::Number(1.0), true, &mut cx).unwrap();

    assert_ne!(a.borrow().shape().id(), b.borrow().shape().id());
}

#[test]
fn test_delete_and_redefine_changes_shape() {
    let mut cx = Context::new();
    let obj = new_ordinary(&mut cx);
    protocol::set(&obj, &key("a"), JsValue::Number(1.0), true, &mut cx).unwrap();
    protocol::set(&obj, &key("b"), JsValue::Number(2.0), true, &mut cx).unwrap();
    let before = obj.borrow().shape().id();

    assert!(protocol::delete(&obj, &key("a"), true, &mut cx).unwrap());
    assert_ne!(obj.borrow().shape().id(), before);
    assert_eq!(
        protocol::get(&obj, &key("b"), &mut cx).unwrap(),
        JsValue::Number(2.0)
    );
    assert_eq!(
        protocol::get(&obj, &key("a"), &mut cx).unwrap(),
        JsValue::Undefined
    );
}

#[test]
fn test_shared_registry_across_contexts() {
    let registry = Arc::new(ShapeRegistry::new());
    let mut cx1 = Context::with_registry(registry.clone());
    let mut cx2 = Context::with_registry(registry);

    let a = new_ordinary(&mut cx1);
    let b = new_ordinary(&mut cx2);
    protocol::set(&a, &key("shared"), JsValue::Number(1.0), true, &mut cx1).unwrap();
    protocol::set(&b, &key("shared"), JsValue::Number(2.0), true, &mut cx2).unwrap();

    // Independent contexts over one registry converge on the same shape
    assert_eq!(a.borrow().shape().id(), b.borrow().shape().id());
}

#[test]
fn test_registry_roots_fill_concurrently() {
    let registry = Arc::new(ShapeRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || registry.root(jsobj::ObjectKind::Ordinary).id())
        })
        .collect();
    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]));
}
