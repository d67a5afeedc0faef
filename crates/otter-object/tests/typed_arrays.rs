//! Integer-indexed exotic objects over ArrayBuffer and SharedArrayBuffer

use std::sync::Arc;

use otter_object::array_buffer::allocate_array_buffer;
use otter_object::operations::call;
use otter_object::typed_array::{
    TypedArrayKind, typed_array_create_from_buffer, typed_array_create_from_list,
    typed_array_create_with_length, typed_array_slice,
};
use otter_object::{JsObject, PartialDescriptor, PropertyKey, Realm, RealmOptions, Value, VmError};

fn construct(realm: &Realm, name: &str, args: &[Value]) -> Arc<JsObject> {
    let ctor = realm.global().get(realm, &PropertyKey::string(name)).unwrap();
    match call(realm, &ctor, &Value::undefined(), args).unwrap() {
        Value::Object(obj) => obj,
        other => panic!("{} returned {:?}", name, other),
    }
}

fn buffer_of(realm: &Realm, view: &Arc<JsObject>) -> Value {
    view.get(realm, &PropertyKey::string("buffer")).unwrap()
}

#[test]
fn test_views_over_shared_buffer_keep_identity() {
    let realm = Realm::new();
    let sab = construct(&realm, "SharedArrayBuffer", &[Value::int32(16)]);
    let v1 = construct(&realm, "Int32Array", &[Value::Object(sab.clone())]);
    let v2 = construct(&realm, "Int32Array", &[Value::Object(sab.clone())]);

    assert_eq!(buffer_of(&realm, &v1), Value::Object(sab.clone()));
    assert_eq!(buffer_of(&realm, &v2), Value::Object(sab));
    assert_eq!(buffer_of(&realm, &v1), buffer_of(&realm, &v2));

    v1.set(&realm, PropertyKey::Index(3), Value::int32(-7)).unwrap();
    assert_eq!(v2.get(&realm, &PropertyKey::Index(3)).unwrap(), Value::int32(-7));
}

#[test]
fn test_views_of_different_kinds_alias_bytes() {
    let realm = Realm::new();
    let buffer = allocate_array_buffer(&realm, 4).unwrap();
    let bytes = typed_array_create_from_buffer(&realm, TypedArrayKind::Uint8, &buffer, 0, None).unwrap();
    let word = typed_array_create_from_buffer(&realm, TypedArrayKind::Uint32, &buffer, 0, None).unwrap();
    word.set(&realm, PropertyKey::Index(0), Value::number(0x0102_0304 as f64)).unwrap();
    // little-endian storage
    assert_eq!(bytes.get(&realm, &PropertyKey::Index(0)).unwrap(), Value::int32(4));
    assert_eq!(bytes.get(&realm, &PropertyKey::Index(3)).unwrap(), Value::int32(1));
}

#[test]
fn test_numeric_keys_never_reach_the_map() {
    let realm = Realm::new();
    let ta = typed_array_create_with_length(&realm, TypedArrayKind::Int8, 2).unwrap();

    assert!(ta.set(&realm, PropertyKey::Index(10), Value::int32(1)).unwrap());
    assert!(ta.set(&realm, PropertyKey::string("-0"), Value::int32(1)).unwrap());
    assert!(ta.set(&realm, PropertyKey::string("1.5"), Value::int32(1)).unwrap());
    assert!(ta.get_own_property(&PropertyKey::Index(10)).is_none());
    assert!(ta.get_own_property(&PropertyKey::string("-0")).is_none());
    assert_eq!(ta.get(&realm, &PropertyKey::string("1.5")).unwrap(), Value::undefined());

    // not canonical, so an ordinary property
    ta.set(&realm, PropertyKey::string("01"), Value::int32(5)).unwrap();
    assert_eq!(
        ta.own_property_keys(),
        vec![PropertyKey::Index(0), PropertyKey::Index(1), PropertyKey::string("01")]
    );
}

#[test]
fn test_element_descriptor_and_define_restrictions() {
    let realm = Realm::new();
    let ta = typed_array_create_from_list(&realm, TypedArrayKind::Float64, &[Value::number(0.5)]).unwrap();
    let desc = ta.get_own_property(&PropertyKey::Index(0)).unwrap();
    assert!(desc.is_writable() && desc.enumerable && desc.configurable);

    for bad in [
        PartialDescriptor::new().configurable(false),
        PartialDescriptor::new().enumerable(false),
        PartialDescriptor::new().writable(false),
    ] {
        assert!(!ta.define_own_property(&realm, PropertyKey::Index(0), &bad).unwrap());
    }
    assert!(ta
        .define_own_property(&realm, PropertyKey::Index(0), &PartialDescriptor::new().value(Value::int32(2)))
        .unwrap());
    assert_eq!(ta.get(&realm, &PropertyKey::Index(0)).unwrap(), Value::int32(2));
    assert!(!ta.delete(&PropertyKey::Index(0)));
    assert!(ta.delete(&PropertyKey::Index(1)));
}

#[test]
fn test_bigint_and_number_kinds_do_not_mix() {
    let realm = Realm::new();
    let big = typed_array_create_with_length(&realm, TypedArrayKind::BigInt64, 1).unwrap();
    let err = big.set(&realm, PropertyKey::Index(0), Value::int32(1)).unwrap_err();
    assert!(matches!(err, VmError::TypeError(_)));

    // the conversion runs even for an out-of-range index
    let err = big.set(&realm, PropertyKey::Index(9), Value::int32(1)).unwrap_err();
    assert!(matches!(err, VmError::TypeError(_)));

    big.set(&realm, PropertyKey::Index(0), Value::bigint(-1)).unwrap();
    assert_eq!(big.get(&realm, &PropertyKey::Index(0)).unwrap(), Value::bigint(-1));

    let small = typed_array_create_with_length(&realm, TypedArrayKind::Int16, 1).unwrap();
    let err = small.set(&realm, PropertyKey::Index(0), Value::bigint(1)).unwrap_err();
    assert!(matches!(err, VmError::TypeError(_)));
}

#[test]
fn test_modular_conversions() {
    let realm = Realm::new();
    let cases = [
        (TypedArrayKind::Int8, 128.0, -128.0),
        (TypedArrayKind::Uint8, 257.0, 1.0),
        (TypedArrayKind::Uint8Clamped, 300.0, 255.0),
        (TypedArrayKind::Uint8Clamped, 1.5, 2.0),
        (TypedArrayKind::Int16, 32768.0, -32768.0),
        (TypedArrayKind::Uint32, -1.0, 4294967295.0),
        (TypedArrayKind::Int32, f64::INFINITY, 0.0),
    ];
    for (kind, input, expected) in cases {
        let ta = typed_array_create_from_list(&realm, kind, &[Value::number(input)]).unwrap();
        assert_eq!(
            ta.get(&realm, &PropertyKey::Index(0)).unwrap(),
            Value::number(expected),
            "{:?} <- {}",
            kind,
            input
        );
    }
}

#[test]
fn test_slice_ignores_ordinary_properties() {
    let realm = Realm::new();
    let sample = typed_array_create_from_list(
        &realm,
        TypedArrayKind::Int8,
        &[Value::int32(40), Value::int32(41), Value::int32(42)],
    )
    .unwrap();
    sample.set(&realm, PropertyKey::string("foo"), Value::int32(42)).unwrap();

    let result = typed_array_slice(&realm, &Value::Object(sample.clone()), &Value::int32(1), &Value::undefined())
        .unwrap();
    assert_eq!(result.get(&realm, &PropertyKey::string("foo")).unwrap(), Value::undefined());
    assert_eq!(result.get(&realm, &PropertyKey::Index(0)).unwrap(), Value::int32(41));
    assert_ne!(buffer_of(&realm, &result), buffer_of(&realm, &sample));
}

#[test]
fn test_detached_buffer_views() {
    let realm = Realm::new();
    let buffer = allocate_array_buffer(&realm, 8).unwrap();
    let view = typed_array_create_from_buffer(&realm, TypedArrayKind::Uint16, &buffer, 0, None).unwrap();
    view.set(&realm, PropertyKey::Index(0), Value::int32(9)).unwrap();
    buffer.as_array_buffer().unwrap().detach();

    assert_eq!(view.get(&realm, &PropertyKey::Index(0)).unwrap(), Value::undefined());
    assert_eq!(view.get(&realm, &PropertyKey::string("length")).unwrap(), Value::int32(0));
    assert!(view.set(&realm, PropertyKey::Index(0), Value::int32(1)).unwrap());

    let err = typed_array_create_from_buffer(&realm, TypedArrayKind::Uint8, &buffer, 0, None).unwrap_err();
    assert!(matches!(err, VmError::TypeError(_)));
}

#[test]
fn test_out_of_bounds_view_is_range_error() {
    let realm = Realm::new();
    let buffer = allocate_array_buffer(&realm, 8).unwrap();
    let err = typed_array_create_from_buffer(&realm, TypedArrayKind::Float64, &buffer, 0, Some(2)).unwrap_err();
    assert!(matches!(err, VmError::RangeError(_)));
}

#[test]
fn test_shared_memory_disabled() {
    let realm = Realm::with_options(RealmOptions {
        shared_memory_enabled: false,
    });
    assert!(realm
        .global()
        .get_own_property(&PropertyKey::string("SharedArrayBuffer"))
        .is_none());
    assert!(realm
        .global()
        .get_own_property(&PropertyKey::string("Int32Array"))
        .is_some());
}

#[test]
fn test_huge_buffer_lengths_throw_range_error() {
    let realm = Realm::new();
    let max_index = Value::number(9007199254740991.0);
    for name in ["ArrayBuffer", "SharedArrayBuffer"] {
        let ctor = realm.global().get(&realm, &PropertyKey::string(name)).unwrap();
        let result = call(&realm, &ctor, &Value::undefined(), &[max_index.clone()]);
        assert!(matches!(result, Err(VmError::RangeError(_))), "{}", name);
    }

    let ctor = realm.global().get(&realm, &PropertyKey::string("Float64Array")).unwrap();
    let result = call(&realm, &ctor, &Value::undefined(), &[Value::number(2f64.powi(50))]);
    assert!(matches!(result, Err(VmError::RangeError(_))));

    // the realm keeps working afterwards
    let small = construct(&realm, "ArrayBuffer", &[Value::int32(8)]);
    assert_eq!(
        small.get(&realm, &PropertyKey::string("byteLength")).unwrap(),
        Value::int32(8)
    );
}
