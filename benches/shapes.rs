use criterion::{black_box, criterion_group, criterion_main, Criterion};

use jsobj::object::new_ordinary;
use jsobj::{protocol, Context, JsValue, PropertyKey};

fn bench_property_install(c: &mut Criterion) {
    let mut cx = Context::new();
    let keys: Vec<PropertyKey> = (0..8)
        .map(|i| PropertyKey::from(format!("prop{}", i)))
        .collect();

    // After the first object, every shape transition is a cache hit.
    c.bench_function("install_8_properties", |b| {
        b.iter(|| {
            let obj = new_ordinary(&mut cx);
            for (i, key) in keys.iter().enumerate() {
                protocol::set(&obj, key, JsValue::Number(i as f64), true, &mut cx)
                    .expect("set failed");
            }
            black_box(obj);
        })
    });
}

fn bench_property_get(c: &mut Criterion) {
    let mut cx = Context::new();
    let obj = new_ordinary(&mut cx);
    let keys: Vec<PropertyKey> = (0..8)
        .map(|i| PropertyKey::from(format!("prop{}", i)))
        .collect();
    for (i, key) in keys.iter().enumerate() {
        protocol::set(&obj, key, JsValue::Number(i as f64), true, &mut cx).expect("set failed");
    }

    c.bench_function("get_hot_property", |b| {
        b.iter(|| {
            let value = protocol::get(&obj, black_box(&keys[7]), &mut cx).expect("get failed");
            black_box(value);
        })
    });
}

fn bench_shape_identity(c: &mut Criterion) {
    let mut cx = Context::new();
    let a = new_ordinary(&mut cx);
    let b = new_ordinary(&mut cx);
    for obj in [&a, &b] {
        protocol::set(obj, &PropertyKey::from("x"), JsValue::Number(1.0), true, &mut cx)
            .expect("set failed");
    }

    c.bench_function("same_shape_check", |bencher| {
        bencher.iter(|| {
            let same = a.borrow().shape().id() == b.borrow().shape().id();
            black_box(same);
        })
    });
}

criterion_group!(
    benches,
    bench_property_install,
    bench_property_get,
    bench_shape_identity
);
criterion_main!(benches);
