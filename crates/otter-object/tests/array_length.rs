//! Array exotic `length` protocol

use otter_object::array::{array_create, create_array_from_list};
use otter_object::operations::{self, define_property_or_throw, length_of_array_like};
use otter_object::{PartialDescriptor, PropertyKey, Realm, Value, VmError};

fn length() -> PropertyKey {
    PropertyKey::string("length")
}

fn array_of(realm: &Realm, n: i32) -> std::sync::Arc<otter_object::JsObject> {
    create_array_from_list(realm, (0..n).map(Value::int32))
}

#[test]
fn test_shrinking_stops_at_non_configurable_element() {
    let realm = Realm::new();
    let arr = array_of(&realm, 5);
    define_property_or_throw(
        &realm,
        &arr,
        PropertyKey::Index(2),
        &PartialDescriptor::new().configurable(false),
    )
    .unwrap();

    let err = operations::set(&realm, &arr, length(), Value::int32(0), true).unwrap_err();
    assert!(matches!(err, VmError::TypeError(_)));
    assert_eq!(arr.get(&realm, &length()).unwrap(), Value::int32(3));
    assert!(arr.get_own_property(&PropertyKey::Index(2)).is_some());
    assert!(arr.get_own_property(&PropertyKey::Index(3)).is_none());
    assert!(arr.get_own_property(&PropertyKey::Index(4)).is_none());
}

#[test]
fn test_sloppy_shrink_reports_false_and_clamps() {
    let realm = Realm::new();
    let arr = array_of(&realm, 4);
    define_property_or_throw(
        &realm,
        &arr,
        PropertyKey::Index(1),
        &PartialDescriptor::new().configurable(false),
    )
    .unwrap();
    assert!(!arr.set(&realm, length(), Value::int32(0)).unwrap());
    assert_eq!(length_of_array_like(&realm, &arr).unwrap(), 2);
    assert!(arr.get_own_property(&PropertyKey::Index(0)).is_some());
}

#[test]
fn test_shrinking_removes_exactly_the_tail() {
    let realm = Realm::new();
    let arr = array_of(&realm, 6);
    arr.set(&realm, length(), Value::int32(2)).unwrap();
    assert_eq!(
        arr.own_property_keys(),
        vec![PropertyKey::Index(0), PropertyKey::Index(1), length()]
    );
}

#[test]
fn test_growing_length_adds_no_elements() {
    let realm = Realm::new();
    let arr = array_of(&realm, 1);
    arr.set(&realm, length(), Value::int32(10)).unwrap();
    assert_eq!(length_of_array_like(&realm, &arr).unwrap(), 10);
    assert!(arr.get_own_property(&PropertyKey::Index(5)).is_none());
}

#[test]
fn test_invalid_length_is_range_error() {
    let realm = Realm::new();
    let arr = array_of(&realm, 1);
    let err = arr.set(&realm, length(), Value::number(-1.0)).unwrap_err();
    assert!(matches!(err, VmError::RangeError(_)));
    let err = arr.set(&realm, length(), Value::number(1.5)).unwrap_err();
    assert!(matches!(err, VmError::RangeError(_)));
    assert!(matches!(array_create(&realm, u32::MAX as u64 + 1), Err(VmError::RangeError(_))));
}

#[test]
fn test_index_past_non_writable_length_rejected() {
    let realm = Realm::new();
    let arr = array_of(&realm, 2);
    define_property_or_throw(&realm, &arr, length(), &PartialDescriptor::new().writable(false)).unwrap();
    assert!(!arr
        .define_own_property(&realm, PropertyKey::Index(2), &PartialDescriptor::data(Value::int32(2)))
        .unwrap());
    assert!(arr
        .define_own_property(&realm, PropertyKey::Index(0), &PartialDescriptor::data(Value::int32(7)))
        .unwrap());
    assert_eq!(length_of_array_like(&realm, &arr).unwrap(), 2);
}

#[test]
fn test_index_define_grows_length() {
    let realm = Realm::new();
    let arr = array_of(&realm, 0);
    arr.set(&realm, PropertyKey::Index(4), Value::string("x")).unwrap();
    assert_eq!(arr.get(&realm, &length()).unwrap(), Value::int32(5));
}

#[test]
fn test_length_writable_false_applied_after_partial_shrink() {
    let realm = Realm::new();
    let arr = array_of(&realm, 3);
    define_property_or_throw(
        &realm,
        &arr,
        PropertyKey::Index(0),
        &PartialDescriptor::new().configurable(false),
    )
    .unwrap();
    let accepted = arr
        .define_own_property(
            &realm,
            length(),
            &PartialDescriptor::new().value(Value::int32(0)).writable(false),
        )
        .unwrap();
    assert!(!accepted);
    let desc = arr.get_own_property(&length()).unwrap();
    assert_eq!(desc.value(), Some(&Value::int32(1)));
    assert!(!desc.is_writable());
}
