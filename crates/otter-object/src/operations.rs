//! Abstract operations on objects (Call, GetV, CreateDataPropertyOrThrow, ...)

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::sync::Arc;

use crate::convert::{self, to_length};
use crate::error::{VmError, VmResult};
use crate::object::{JsObject, ObjectKind};
use crate::property::{PartialDescriptor, PropertyKey};
use crate::realm::Realm;
use crate::value::Value;

/// Call(F, V, argumentsList)
pub fn call(realm: &Realm, func: &Value, this: &Value, args: &[Value]) -> VmResult<Value> {
    let native = func.as_object().and_then(|o| match o.kind() {
        ObjectKind::Function(f) => Some(f.func.clone()),
        _ => None,
    });
    match native {
        Some(f) => f(realm, this, args),
        None => Err(VmError::type_error(format!(
            "{} is not a function",
            func.describe()
        ))),
    }
}

/// Invoke(V, P, argumentsList)
pub fn invoke(realm: &Realm, value: &Value, key: &PropertyKey, args: &[Value]) -> VmResult<Value> {
    let func = get_v(realm, value, key)?;
    call(realm, &func, value, args)
}

/// GetV: property read on any value; primitives read through their
/// prototype in the realm.
pub fn get_v(realm: &Realm, value: &Value, key: &PropertyKey) -> VmResult<Value> {
    match value {
        Value::Object(obj) => obj.get(realm, key),
        Value::Undefined | Value::Null => Err(VmError::type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            value.describe(),
            key
        ))),
        Value::String(s) => {
            if key.is_string("length") {
                return Ok(Value::number(s.utf16_len() as f64));
            }
            if let Some(i) = key.as_index()
                && let Some(unit) = s.code_unit_at(i as usize)
            {
                return Ok(Value::String(unit));
            }
            realm.primitive_prototype(value).get_with_receiver(realm, key, value)
        }
        _ => realm.primitive_prototype(value).get_with_receiver(realm, key, value),
    }
}

/// GetMethod: `None` for `undefined`/`null`, TypeError if not callable
pub fn get_method(realm: &Realm, value: &Value, key: &PropertyKey) -> VmResult<Option<Value>> {
    let func = get_v(realm, value, key)?;
    if func.is_nullish() {
        return Ok(None);
    }
    if !func.is_callable() {
        return Err(VmError::type_error(format!("{} is not a function", func.describe())));
    }
    Ok(Some(func))
}

/// Set(O, P, V, Throw)
pub fn set(
    realm: &Realm,
    obj: &Arc<JsObject>,
    key: PropertyKey,
    value: Value,
    throw: bool,
) -> VmResult<()> {
    let display = throw.then(|| key.to_string());
    let ok = obj.set(realm, key, value)?;
    if !ok && let Some(name) = display {
        return Err(VmError::type_error(format!(
            "Cannot assign to read only property '{}' of object",
            name
        )));
    }
    Ok(())
}

/// CreateDataPropertyOrThrow
pub fn create_data_property_or_throw(
    realm: &Realm,
    obj: &JsObject,
    key: PropertyKey,
    value: Value,
) -> VmResult<()> {
    let name = key.to_string();
    if !obj.create_data_property(realm, key, value)? {
        return Err(VmError::type_error(format!("Cannot define property {}", name)));
    }
    Ok(())
}

/// DefinePropertyOrThrow
pub fn define_property_or_throw(
    realm: &Realm,
    obj: &JsObject,
    key: PropertyKey,
    desc: &PartialDescriptor,
) -> VmResult<()> {
    let name = key.to_string();
    if !obj.define_own_property(realm, key, desc)? {
        return Err(VmError::type_error(format!("Cannot redefine property: {}", name)));
    }
    Ok(())
}

/// DeletePropertyOrThrow
pub fn delete_property_or_throw(obj: &JsObject, key: &PropertyKey) -> VmResult<()> {
    if !obj.delete(key) {
        return Err(VmError::type_error(format!("Cannot delete property '{}'", key)));
    }
    Ok(())
}

/// HasOwnProperty
pub fn has_own_property(obj: &JsObject, key: &PropertyKey) -> bool {
    obj.get_own_property(key).is_some()
}

/// CopyDataProperties: copy own enumerable properties of `source` onto
/// `target`, skipping `excluded`. Getters on the source run.
pub fn copy_data_properties(
    realm: &Realm,
    target: &JsObject,
    source: &Value,
    excluded: &[PropertyKey],
) -> VmResult<()> {
    if source.is_nullish() {
        return Ok(());
    }
    let from = convert::to_object(realm, source)?;
    for key in from.own_property_keys() {
        if excluded.contains(&key) {
            continue;
        }
        let Some(desc) = from.get_own_property(&key) else {
            continue;
        };
        if !desc.enumerable {
            continue;
        }
        let value = from.get_with_receiver(realm, &key, source)?;
        create_data_property_or_throw(realm, target, key, value)?;
    }
    Ok(())
}

/// EnumerateObjectProperties: the string keys a `for-in` over `obj` visits.
///
/// Own keys come first, then each prototype's. A key is reported once; a
/// non-enumerable property still shadows enumerable ones further up the
/// chain. Symbols are never visited.
pub fn enumerate_object_properties(obj: &Arc<JsObject>) -> Vec<PropertyKey> {
    let mut visited: FxHashSet<PropertyKey> = FxHashSet::default();
    let mut keys = Vec::new();
    let mut current = Some(obj.clone());
    while let Some(object) = current {
        for key in object.own_property_keys() {
            if key.is_symbol() || !visited.insert(key.clone()) {
                continue;
            }
            if object.get_own_property(&key).is_some_and(|desc| desc.enumerable) {
                keys.push(key);
            }
        }
        current = object.get_prototype_of();
    }
    keys
}

/// LengthOfArrayLike
pub fn length_of_array_like(realm: &Realm, obj: &Arc<JsObject>) -> VmResult<u64> {
    let len = obj.get(realm, &PropertyKey::string("length"))?;
    to_length(realm, &len)
}

/// Integrity level for [`set_integrity_level`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityLevel {
    /// Non-extensible, every property non-configurable
    Sealed,
    /// Sealed, and every data property non-writable
    Frozen,
}

/// SetIntegrityLevel
pub fn set_integrity_level(realm: &Realm, obj: &JsObject, level: IntegrityLevel) -> VmResult<bool> {
    if !obj.prevent_extensions() {
        return Ok(false);
    }
    let keys: SmallVec<[PropertyKey; 8]> = obj.own_property_keys().into_iter().collect();
    for key in keys {
        let desc = match level {
            IntegrityLevel::Sealed => PartialDescriptor::new().configurable(false),
            IntegrityLevel::Frozen => match obj.get_own_property(&key) {
                Some(current) if current.is_accessor() => {
                    PartialDescriptor::new().configurable(false)
                }
                Some(_) => PartialDescriptor::new().configurable(false).writable(false),
                None => continue,
            },
        };
        define_property_or_throw(realm, obj, key, &desc)?;
    }
    Ok(true)
}

/// TestIntegrityLevel
pub fn test_integrity_level(obj: &JsObject, level: IntegrityLevel) -> bool {
    if obj.is_extensible() {
        return false;
    }
    obj.own_property_keys().iter().all(|key| match obj.get_own_property(key) {
        Some(desc) => {
            !desc.configurable
                && (level == IntegrityLevel::Sealed || !desc.is_data() || !desc.is_writable())
        }
        None => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyDescriptor;

    #[test]
    fn test_call_non_callable() {
        let realm = Realm::new();
        let err = call(&realm, &Value::int32(1), &Value::undefined(), &[]).unwrap_err();
        assert!(matches!(err, VmError::TypeError(_)));
    }

    #[test]
    fn test_get_v_on_nullish_throws() {
        let realm = Realm::new();
        let err = get_v(&realm, &Value::null(), &PropertyKey::string("x")).unwrap_err();
        assert!(matches!(err, VmError::TypeError(_)));
    }

    #[test]
    fn test_get_v_string_length() {
        let realm = Realm::new();
        let len = get_v(&realm, &Value::string("abc"), &PropertyKey::string("length")).unwrap();
        assert_eq!(len, Value::int32(3));
        let ch = get_v(&realm, &Value::string("abc"), &PropertyKey::Index(1)).unwrap();
        assert_eq!(ch, Value::string("b"));
    }

    #[test]
    fn test_enumerate_skips_hidden_and_shadowed_keys() {
        let realm = Realm::new();
        let proto = realm.new_object();
        proto.define_raw(PropertyKey::string("inherited"), PropertyDescriptor::data(Value::int32(1)));
        proto.define_raw(PropertyKey::string("shadowed"), PropertyDescriptor::data(Value::int32(2)));
        let obj = Arc::new(JsObject::new(Some(proto)));
        obj.define_raw(PropertyKey::Index(0), PropertyDescriptor::data(Value::int32(3)));
        obj.define_raw(
            PropertyKey::string("shadowed"),
            PropertyDescriptor::data_with_attrs(Value::int32(4), crate::property::PropertyAttributes::builtin()),
        );
        obj.define_raw(
            PropertyKey::Symbol(crate::symbol::Symbol::new(Some("s"))),
            PropertyDescriptor::data(Value::int32(5)),
        );

        let keys = enumerate_object_properties(&obj);
        assert_eq!(keys, vec![PropertyKey::Index(0), PropertyKey::string("inherited")]);
    }

    #[test]
    fn test_global_functions_are_not_enumerated() {
        let realm = Realm::new();
        let keys = enumerate_object_properties(realm.global());
        for hidden in ["parseFloat", "NaN", "Array", "globalThis"] {
            assert!(!keys.contains(&PropertyKey::string(hidden)), "{} enumerated", hidden);
        }
    }

    #[test]
    fn test_copy_data_properties_respects_exclusions() {
        let realm = Realm::new();
        let source = realm.new_object();
        for (name, v) in [("a", 1), ("b", 2), ("c", 3)] {
            source.define_raw(PropertyKey::string(name), PropertyDescriptor::data(Value::int32(v)));
        }
        let target = realm.new_object();
        copy_data_properties(
            &realm,
            &target,
            &Value::Object(source),
            &[PropertyKey::string("b")],
        )
        .unwrap();
        assert_eq!(
            target.own_property_keys(),
            vec![PropertyKey::string("a"), PropertyKey::string("c")]
        );
    }

    #[test]
    fn test_freeze_and_test_integrity() {
        let realm = Realm::new();
        let obj = realm.new_object();
        obj.define_raw(PropertyKey::string("x"), PropertyDescriptor::data(Value::int32(1)));
        assert!(!test_integrity_level(&obj, IntegrityLevel::Sealed));
        assert!(set_integrity_level(&realm, &obj, IntegrityLevel::Frozen).unwrap());
        assert!(test_integrity_level(&obj, IntegrityLevel::Frozen));
        assert!(!obj.set(&realm, PropertyKey::string("x"), Value::int32(2)).unwrap());
    }
}
