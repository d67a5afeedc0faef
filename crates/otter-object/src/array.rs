//! Array exotic objects
//!
//! `length` lives in the ordinary map as a data property (writable,
//! non-enumerable, non-configurable). The array hook keeps it coupled with
//! the index keys: defining an index past the end grows `length`, shrinking
//! `length` deletes indices from the top down.

use std::sync::Arc;

use crate::convert::{to_number, to_uint32};
use crate::error::{VmError, VmResult};
use crate::object::{ExoticHooks, JsObject, ObjectKind};
use crate::property::{
    PartialDescriptor, PropertyAttributes, PropertyDescriptor, PropertyKey, PropertySlot,
};
use crate::realm::Realm;
use crate::value::Value;

/// Hook table for Array exotic objects
pub static ARRAY_HOOKS: ExoticHooks = ExoticHooks {
    define_own_property: Some(array_define_own_property),
    ..ExoticHooks::ORDINARY
};

fn length_key() -> PropertyKey {
    PropertyKey::string("length")
}

/// ArrayCreate; RangeError above `2^32 - 1`
pub fn array_create(realm: &Realm, length: u64) -> VmResult<Arc<JsObject>> {
    if length > u32::MAX as u64 {
        return Err(VmError::range_error("Invalid array length"));
    }
    let array = JsObject::with_kind(Some(realm.intrinsics().array_prototype.clone()), ObjectKind::Array);
    array.define_raw(
        length_key(),
        PropertyDescriptor::data_with_attrs(
            Value::number(length as f64),
            PropertyAttributes {
                writable: true,
                enumerable: false,
                configurable: false,
            },
        ),
    );
    Ok(Arc::new(array))
}

/// CreateArrayFromList
pub fn create_array_from_list(realm: &Realm, values: impl IntoIterator<Item = Value>) -> Arc<JsObject> {
    let values: Vec<Value> = values.into_iter().collect();
    let array = JsObject::with_kind(Some(realm.intrinsics().array_prototype.clone()), ObjectKind::Array);
    let len = values.len();
    for (i, value) in values.into_iter().enumerate() {
        array.define_raw(PropertyKey::from_u64(i as u64), PropertyDescriptor::data(value));
    }
    array.define_raw(
        length_key(),
        PropertyDescriptor::data_with_attrs(
            Value::number(len as f64),
            PropertyAttributes {
                writable: true,
                enumerable: false,
                configurable: false,
            },
        ),
    );
    Arc::new(array)
}

/// IsArray
pub fn is_array(value: &Value) -> bool {
    value.as_object().is_some_and(|o| o.is_array())
}

/// Current `length` and its writability
fn current_length(array: &JsObject) -> (u32, bool) {
    match array.ordinary_get_own_property(&length_key()) {
        Some(PropertyDescriptor {
            slot: PropertySlot::Data { value, writable },
            ..
        }) => (value.as_number().map_or(0, |n| n as u32), writable),
        _ => (0, false),
    }
}

fn array_define_own_property(
    realm: &Realm,
    array: &JsObject,
    key: PropertyKey,
    desc: &PartialDescriptor,
) -> VmResult<bool> {
    if key.is_string("length") {
        return array_set_length(realm, array, desc);
    }
    let Some(index) = key.as_index() else {
        return Ok(array.ordinary_define_own_property(key, desc));
    };

    let (old_len, length_writable) = current_length(array);
    if index >= old_len && !length_writable {
        return Ok(false);
    }
    if !array.ordinary_define_own_property(key, desc) {
        return Ok(false);
    }
    if index >= old_len {
        let grown = PartialDescriptor::new().value(Value::number(index as f64 + 1.0));
        array.ordinary_define_own_property(length_key(), &grown);
    }
    Ok(true)
}

/// ArraySetLength
///
/// On the first non-deletable index `k` (scanning down), `length` is left at
/// `k + 1` and the operation reports failure.
pub fn array_set_length(realm: &Realm, array: &JsObject, desc: &PartialDescriptor) -> VmResult<bool> {
    let Some(value) = &desc.value else {
        return Ok(array.ordinary_define_own_property(length_key(), desc));
    };
    let new_len = to_uint32(realm, value)?;
    let number_len = to_number(realm, value)?;
    if new_len as f64 != number_len {
        return Err(VmError::range_error("Invalid array length"));
    }

    let mut new_desc = desc.clone();
    new_desc.value = Some(Value::number(new_len as f64));
    let (old_len, old_writable) = current_length(array);
    if new_len >= old_len {
        return Ok(array.ordinary_define_own_property(length_key(), &new_desc));
    }
    if !old_writable {
        return Ok(false);
    }

    // Deletions may fail part-way, so keep `length` writable until they finish.
    let new_writable = new_desc.writable != Some(false);
    if !new_writable {
        new_desc.writable = Some(true);
    }
    if !array.ordinary_define_own_property(length_key(), &new_desc) {
        return Ok(false);
    }

    for index in array.index_keys_descending_from(new_len) {
        if !array.ordinary_delete(&PropertyKey::Index(index)) {
            let mut clamped = PartialDescriptor::new().value(Value::number(index as f64 + 1.0));
            if !new_writable {
                clamped = clamped.writable(false);
            }
            array.ordinary_define_own_property(length_key(), &clamped);
            tracing::debug!(
                target: "otter::object",
                requested = new_len,
                clamped = index + 1,
                "array length clamped at non-configurable element"
            );
            return Ok(false);
        }
    }

    if !new_writable {
        array.ordinary_define_own_property(length_key(), &PartialDescriptor::new().writable(false));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length_of(array: &Arc<JsObject>, realm: &Realm) -> Value {
        array.get(realm, &length_key()).unwrap()
    }

    #[test]
    fn test_index_define_grows_length() {
        let realm = Realm::new();
        let array = array_create(&realm, 0).unwrap();
        array
            .create_data_property(&realm, PropertyKey::Index(4), Value::int32(1))
            .unwrap();
        assert_eq!(length_of(&array, &realm), Value::int32(5));
    }

    #[test]
    fn test_shrink_deletes_tail() {
        let realm = Realm::new();
        let array = create_array_from_list(&realm, (0..5).map(Value::int32));
        assert!(array.set(&realm, length_key(), Value::int32(2)).unwrap());
        assert_eq!(length_of(&array, &realm), Value::int32(2));
        assert!(array.get_own_property(&PropertyKey::Index(2)).is_none());
        assert!(array.get_own_property(&PropertyKey::Index(1)).is_some());
    }

    #[test]
    fn test_shrink_stops_at_non_configurable() {
        let realm = Realm::new();
        let array = create_array_from_list(&realm, (0..5).map(Value::int32));
        array
            .define_own_property(
                &realm,
                PropertyKey::Index(2),
                &PartialDescriptor::new().configurable(false),
            )
            .unwrap();

        assert!(!array.set(&realm, length_key(), Value::int32(0)).unwrap());
        assert_eq!(length_of(&array, &realm), Value::int32(3));
        assert!(array.get_own_property(&PropertyKey::Index(3)).is_none());
        assert!(array.get_own_property(&PropertyKey::Index(1)).is_some());
    }

    #[test]
    fn test_invalid_length_is_range_error() {
        let realm = Realm::new();
        let array = array_create(&realm, 0).unwrap();
        let err = array
            .set(&realm, length_key(), Value::number(1.5))
            .unwrap_err();
        assert!(matches!(err, VmError::RangeError(_)));
        assert!(matches!(array_create(&realm, 1 << 32), Err(VmError::RangeError(_))));
    }

    #[test]
    fn test_read_only_length_blocks_append() {
        let realm = Realm::new();
        let array = create_array_from_list(&realm, [Value::int32(1)]);
        array
            .define_own_property(&realm, length_key(), &PartialDescriptor::new().writable(false))
            .unwrap();
        assert!(!array
            .create_data_property(&realm, PropertyKey::Index(1), Value::int32(2))
            .unwrap());
        assert_eq!(length_of(&array, &realm), Value::int32(1));
    }

    #[test]
    fn test_shrink_with_writable_false_applies_after_deletes() {
        let realm = Realm::new();
        let array = create_array_from_list(&realm, (0..3).map(Value::int32));
        let desc = PartialDescriptor::new().value(Value::int32(1)).writable(false);
        assert!(array.define_own_property(&realm, length_key(), &desc).unwrap());
        let stored = array.get_own_property(&length_key()).unwrap();
        assert!(!stored.is_writable());
        assert_eq!(stored.value(), Some(&Value::int32(1)));
    }
}
