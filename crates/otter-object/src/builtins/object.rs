//! `Object` constructor and `Object.prototype`
//!
//! Besides the built-ins this module exposes the descriptor reflection
//! helpers (`ToPropertyDescriptor`, `FromPropertyDescriptor`,
//! `ObjectDefineProperties`) so that hosts can drive them without going
//! through a function call.

use std::sync::Arc;

use super::{BuiltInBuilder, arg, install_global};
use crate::array::create_array_from_list;
use crate::convert::{to_object, to_property_key};
use crate::error::{VmError, VmResult};
use crate::intrinsics::Intrinsics;
use crate::object::{JsObject, ObjectKind};
use crate::operations::{
    IntegrityLevel, create_data_property_or_throw, define_property_or_throw, set_integrity_level,
    test_integrity_level,
};
use crate::property::{PartialDescriptor, PropertyDescriptor, PropertyKey, PropertySlot};
use crate::realm::Realm;
use crate::symbol::Symbol;
use crate::value::Value;

// ---------------------------------------------------------------------------
// Descriptor reflection
// ---------------------------------------------------------------------------

/// Read an optional descriptor field: present when `HasProperty` says so,
/// its value taken through `[[Get]]`.
fn descriptor_field(realm: &Realm, obj: &Arc<JsObject>, name: &str) -> VmResult<Option<Value>> {
    let key = PropertyKey::string(name);
    if !obj.has_property(realm, &key)? {
        return Ok(None);
    }
    Ok(Some(obj.get(realm, &key)?))
}

/// ToPropertyDescriptor
///
/// Fields are read in the order `enumerable`, `configurable`, `value`,
/// `writable`, `get`, `set`; inherited fields and accessor-provided fields
/// count.
pub fn to_property_descriptor(realm: &Realm, value: &Value) -> VmResult<PartialDescriptor> {
    let Some(obj) = value.as_object() else {
        return Err(VmError::type_error(format!(
            "Property description must be an object: {}",
            value.describe()
        )));
    };
    let mut desc = PartialDescriptor::new();
    if let Some(v) = descriptor_field(realm, obj, "enumerable")? {
        desc.enumerable = Some(v.to_boolean());
    }
    if let Some(v) = descriptor_field(realm, obj, "configurable")? {
        desc.configurable = Some(v.to_boolean());
    }
    if let Some(v) = descriptor_field(realm, obj, "value")? {
        desc.value = Some(v);
    }
    if let Some(v) = descriptor_field(realm, obj, "writable")? {
        desc.writable = Some(v.to_boolean());
    }
    if let Some(getter) = descriptor_field(realm, obj, "get")? {
        if !getter.is_undefined() && !getter.is_callable() {
            return Err(VmError::type_error(format!(
                "Getter must be a function: {}",
                getter.describe()
            )));
        }
        desc.get = Some(getter);
    }
    if let Some(setter) = descriptor_field(realm, obj, "set")? {
        if !setter.is_undefined() && !setter.is_callable() {
            return Err(VmError::type_error(format!(
                "Setter must be a function: {}",
                setter.describe()
            )));
        }
        desc.set = Some(setter);
    }
    if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
        return Err(VmError::type_error(
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
        ));
    }
    Ok(desc)
}

/// FromPropertyDescriptor
pub fn from_property_descriptor(realm: &Realm, desc: &PropertyDescriptor) -> VmResult<Value> {
    let obj = realm.new_object();
    match &desc.slot {
        PropertySlot::Data { value, writable } => {
            create_data_property_or_throw(realm, &obj, PropertyKey::string("value"), value.clone())?;
            create_data_property_or_throw(
                realm,
                &obj,
                PropertyKey::string("writable"),
                Value::boolean(*writable),
            )?;
        }
        PropertySlot::Accessor { get, set } => {
            create_data_property_or_throw(
                realm,
                &obj,
                PropertyKey::string("get"),
                get.clone().unwrap_or_default(),
            )?;
            create_data_property_or_throw(
                realm,
                &obj,
                PropertyKey::string("set"),
                set.clone().unwrap_or_default(),
            )?;
        }
    }
    create_data_property_or_throw(
        realm,
        &obj,
        PropertyKey::string("enumerable"),
        Value::boolean(desc.enumerable),
    )?;
    create_data_property_or_throw(
        realm,
        &obj,
        PropertyKey::string("configurable"),
        Value::boolean(desc.configurable),
    )?;
    Ok(Value::Object(obj))
}

/// ObjectDefineProperties
///
/// Every descriptor is converted before the first one is applied. The
/// first failing definition raises TypeError; earlier ones stay applied.
pub fn define_properties(realm: &Realm, target: &JsObject, properties: &Value) -> VmResult<()> {
    let props = to_object(realm, properties)?;
    let mut descriptors = Vec::new();
    for key in props.own_property_keys() {
        let Some(own) = props.get_own_property(&key) else {
            continue;
        };
        if !own.enumerable {
            continue;
        }
        let desc_obj = props.get(realm, &key)?;
        descriptors.push((key, to_property_descriptor(realm, &desc_obj)?));
    }
    tracing::trace!(target: "otter::object", count = descriptors.len(), "defineProperties");
    for (key, desc) in descriptors {
        define_property_or_throw(realm, target, key, &desc)?;
    }
    Ok(())
}

fn require_object<'a>(value: &'a Value, method: &str) -> VmResult<&'a Arc<JsObject>> {
    value
        .as_object()
        .ok_or_else(|| VmError::type_error(format!("{} called on non-object", method)))
}

// ---------------------------------------------------------------------------
// Object.prototype
// ---------------------------------------------------------------------------

fn object_proto_has_own_property(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let key = to_property_key(realm, &arg(args, 0))?;
    let obj = to_object(realm, this)?;
    Ok(Value::boolean(obj.get_own_property(&key).is_some()))
}

fn object_proto_is_prototype_of(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let Value::Object(candidate) = arg(args, 0) else {
        return Ok(Value::boolean(false));
    };
    let obj = to_object(realm, this)?;
    let mut cursor = candidate.get_prototype_of();
    while let Some(proto) = cursor {
        if Arc::ptr_eq(&proto, &obj) {
            return Ok(Value::boolean(true));
        }
        cursor = proto.get_prototype_of();
    }
    Ok(Value::boolean(false))
}

fn object_proto_property_is_enumerable(
    realm: &Realm,
    this: &Value,
    args: &[Value],
) -> VmResult<Value> {
    let key = to_property_key(realm, &arg(args, 0))?;
    let obj = to_object(realm, this)?;
    Ok(Value::boolean(
        obj.get_own_property(&key).is_some_and(|d| d.enumerable),
    ))
}

fn builtin_tag(obj: &JsObject) -> &'static str {
    match obj.kind() {
        ObjectKind::Array => "Array",
        ObjectKind::Function(_) => "Function",
        ObjectKind::Error(_) => "Error",
        ObjectKind::Primitive(Value::Boolean(_)) => "Boolean",
        ObjectKind::Primitive(Value::Number(_)) => "Number",
        ObjectKind::Primitive(Value::String(_)) => "String",
        _ => "Object",
    }
}

fn object_proto_to_string(realm: &Realm, this: &Value, _args: &[Value]) -> VmResult<Value> {
    match this {
        Value::Undefined => return Ok(Value::string("[object Undefined]")),
        Value::Null => return Ok(Value::string("[object Null]")),
        _ => {}
    }
    let obj = to_object(realm, this)?;
    let tag = obj.get(realm, &PropertyKey::Symbol(Symbol::to_string_tag()))?;
    let tag = match tag.as_string() {
        Some(s) => s.as_str().to_string(),
        None => builtin_tag(&obj).to_string(),
    };
    Ok(Value::String(format!("[object {}]", tag).into()))
}

fn object_proto_to_locale_string(realm: &Realm, this: &Value, _args: &[Value]) -> VmResult<Value> {
    crate::operations::invoke(realm, this, &PropertyKey::string("toString"), &[])
}

fn object_proto_value_of(realm: &Realm, this: &Value, _args: &[Value]) -> VmResult<Value> {
    Ok(Value::Object(to_object(realm, this)?))
}

/// Populate `Object.prototype`
pub fn init_prototype(intrinsics: &Intrinsics) {
    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.object_prototype,
        "Object",
    )
    .method("hasOwnProperty", object_proto_has_own_property, 1)
    .method("isPrototypeOf", object_proto_is_prototype_of, 1)
    .method("propertyIsEnumerable", object_proto_property_is_enumerable, 1)
    .method("toString", object_proto_to_string, 0)
    .method("toLocaleString", object_proto_to_locale_string, 0)
    .method("valueOf", object_proto_value_of, 0);
}

// ---------------------------------------------------------------------------
// Object constructor
// ---------------------------------------------------------------------------

fn object_constructor(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let value = arg(args, 0);
    if value.is_nullish() {
        return Ok(Value::Object(realm.new_object()));
    }
    Ok(Value::Object(to_object(realm, &value)?))
}

fn object_define_property(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let target = arg(args, 0);
    let obj = require_object(&target, "Object.defineProperty")?;
    let key = to_property_key(realm, &arg(args, 1))?;
    let desc = to_property_descriptor(realm, &arg(args, 2))?;
    define_property_or_throw(realm, obj, key, &desc)?;
    Ok(target)
}

fn object_define_properties(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let target = arg(args, 0);
    let obj = require_object(&target, "Object.defineProperties")?;
    define_properties(realm, obj, &arg(args, 1))?;
    Ok(target)
}

fn object_get_own_property_descriptor(
    realm: &Realm,
    _this: &Value,
    args: &[Value],
) -> VmResult<Value> {
    let obj = to_object(realm, &arg(args, 0))?;
    let key = to_property_key(realm, &arg(args, 1))?;
    match obj.get_own_property(&key) {
        Some(desc) => from_property_descriptor(realm, &desc),
        None => Ok(Value::undefined()),
    }
}

fn object_get_own_property_names(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = to_object(realm, &arg(args, 0))?;
    let names = obj
        .own_property_keys()
        .into_iter()
        .filter(|key| !key.is_symbol())
        .map(|key| key.to_value());
    Ok(Value::Object(create_array_from_list(realm, names)))
}

fn object_keys(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = to_object(realm, &arg(args, 0))?;
    let keys = obj.own_enumerable_keys().into_iter().map(|key| key.to_value());
    Ok(Value::Object(create_array_from_list(realm, keys)))
}

fn object_get_prototype_of(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = to_object(realm, &arg(args, 0))?;
    Ok(obj.get_prototype_of().map(Value::Object).unwrap_or(Value::Null))
}

fn object_set_prototype_of(_realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let target = arg(args, 0);
    if target.is_nullish() {
        return Err(VmError::type_error("Object.setPrototypeOf called on null or undefined"));
    }
    let proto = match arg(args, 1) {
        Value::Object(p) => Some(p),
        Value::Null => None,
        other => {
            return Err(VmError::type_error(format!(
                "Object prototype may only be an Object or null: {}",
                other.describe()
            )));
        }
    };
    let Some(obj) = target.as_object() else {
        return Ok(target);
    };
    if !obj.set_prototype_of(proto) {
        return Err(VmError::type_error("Cyclic __proto__ value or object is not extensible"));
    }
    Ok(target)
}

fn object_prevent_extensions(_realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let target = arg(args, 0);
    if let Some(obj) = target.as_object() {
        obj.prevent_extensions();
    }
    Ok(target)
}

fn object_is_extensible(_realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    Ok(Value::boolean(
        arg(args, 0).as_object().is_some_and(|o| o.is_extensible()),
    ))
}

fn apply_integrity(realm: &Realm, args: &[Value], level: IntegrityLevel) -> VmResult<Value> {
    let target = arg(args, 0);
    if let Some(obj) = target.as_object()
        && !set_integrity_level(realm, obj, level)?
    {
        return Err(VmError::type_error("Cannot change object integrity level"));
    }
    Ok(target)
}

fn test_integrity(args: &[Value], level: IntegrityLevel) -> Value {
    Value::boolean(match arg(args, 0).as_object() {
        Some(obj) => test_integrity_level(obj, level),
        None => true,
    })
}

fn object_create(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let proto = match arg(args, 0) {
        Value::Object(p) => Some(p),
        Value::Null => None,
        other => {
            return Err(VmError::type_error(format!(
                "Object prototype may only be an Object or null: {}",
                other.describe()
            )));
        }
    };
    let obj = Arc::new(JsObject::new(proto));
    let properties = arg(args, 1);
    if !properties.is_undefined() {
        define_properties(realm, &obj, &properties)?;
    }
    Ok(Value::Object(obj))
}

/// Install the `Object` constructor
pub fn install(intrinsics: &Intrinsics, global: &Arc<JsObject>) {
    let ctor = BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.object_prototype,
        "Object",
    )
    .constructor_fn(object_constructor, 1)
    .static_method("defineProperty", object_define_property, 3)
    .static_method("defineProperties", object_define_properties, 2)
    .static_method("getOwnPropertyDescriptor", object_get_own_property_descriptor, 2)
    .static_method("getOwnPropertyNames", object_get_own_property_names, 1)
    .static_method("keys", object_keys, 1)
    .static_method("getPrototypeOf", object_get_prototype_of, 1)
    .static_method("setPrototypeOf", object_set_prototype_of, 2)
    .static_method("preventExtensions", object_prevent_extensions, 1)
    .static_method("isExtensible", object_is_extensible, 1)
    .static_method("freeze", |realm, _, args| apply_integrity(realm, args, IntegrityLevel::Frozen), 1)
    .static_method("isFrozen", |_, _, args| Ok(test_integrity(args, IntegrityLevel::Frozen)), 1)
    .static_method("seal", |realm, _, args| apply_integrity(realm, args, IntegrityLevel::Sealed), 1)
    .static_method("isSealed", |_, _, args| Ok(test_integrity(args, IntegrityLevel::Sealed)), 1)
    .static_method("create", object_create, 2)
    .build();
    install_global(global, "Object", ctor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::call;

    fn object_ctor(realm: &Realm) -> Value {
        realm.global().get(realm, &PropertyKey::string("Object")).unwrap()
    }

    fn static_fn(realm: &Realm, name: &str) -> Value {
        let ctor = object_ctor(realm);
        ctor.as_object().unwrap().get(realm, &PropertyKey::string(name)).unwrap()
    }

    #[test]
    fn test_to_property_descriptor_rejects_mixed_fields() {
        let realm = Realm::new();
        let desc = realm.new_object();
        desc.set(&realm, PropertyKey::string("value"), Value::int32(1)).unwrap();
        let getter = realm.new_native_function("g", |_, _, _| Ok(Value::undefined()));
        desc.set(&realm, PropertyKey::string("get"), Value::Object(getter)).unwrap();
        let err = to_property_descriptor(&realm, &Value::Object(desc)).unwrap_err();
        assert!(matches!(err, VmError::TypeError(_)));
    }

    #[test]
    fn test_to_property_descriptor_non_callable_getter() {
        let realm = Realm::new();
        let desc = realm.new_object();
        desc.set(&realm, PropertyKey::string("get"), Value::int32(1)).unwrap();
        assert!(matches!(
            to_property_descriptor(&realm, &Value::Object(desc)),
            Err(VmError::TypeError(_))
        ));
        assert!(matches!(
            to_property_descriptor(&realm, &Value::int32(1)),
            Err(VmError::TypeError(_))
        ));
    }

    #[test]
    fn test_to_property_descriptor_reads_inherited_fields() {
        let realm = Realm::new();
        let proto = realm.new_object();
        proto.set(&realm, PropertyKey::string("enumerable"), Value::boolean(true)).unwrap();
        let desc = Arc::new(JsObject::new(Some(proto)));
        let partial = to_property_descriptor(&realm, &Value::Object(desc)).unwrap();
        assert_eq!(partial.enumerable, Some(true));
        assert!(partial.is_generic_descriptor());
    }

    #[test]
    fn test_get_own_property_descriptor_roundtrip() {
        let realm = Realm::new();
        let obj = realm.new_object();
        obj.set(&realm, PropertyKey::string("a"), Value::int32(7)).unwrap();
        let gopd = static_fn(&realm, "getOwnPropertyDescriptor");
        let desc = call(
            &realm,
            &gopd,
            &Value::undefined(),
            &[Value::Object(obj), Value::string("a")],
        )
        .unwrap();
        let desc = desc.as_object().unwrap();
        assert_eq!(desc.get(&realm, &PropertyKey::string("value")).unwrap(), Value::int32(7));
        assert_eq!(
            desc.get(&realm, &PropertyKey::string("writable")).unwrap(),
            Value::boolean(true)
        );
    }

    #[test]
    fn test_freeze_and_is_frozen() {
        let realm = Realm::new();
        let obj = realm.new_object();
        obj.set(&realm, PropertyKey::string("a"), Value::int32(1)).unwrap();
        let target = Value::Object(obj.clone());
        call(&realm, &static_fn(&realm, "freeze"), &Value::undefined(), &[target.clone()]).unwrap();
        let frozen = call(&realm, &static_fn(&realm, "isFrozen"), &Value::undefined(), &[target]).unwrap();
        assert_eq!(frozen, Value::boolean(true));
        assert!(!obj.set(&realm, PropertyKey::string("a"), Value::int32(2)).unwrap());
    }

    #[test]
    fn test_to_string_tags() {
        let realm = Realm::new();
        let to_string = realm
            .intrinsics()
            .object_prototype
            .get(&realm, &PropertyKey::string("toString"))
            .unwrap();
        let array = Value::Object(create_array_from_list(&realm, []));
        assert_eq!(
            call(&realm, &to_string, &array, &[]).unwrap(),
            Value::string("[object Array]")
        );
        assert_eq!(
            call(&realm, &to_string, &Value::null(), &[]).unwrap(),
            Value::string("[object Null]")
        );
    }

    #[test]
    fn test_create_with_null_prototype() {
        let realm = Realm::new();
        let created = call(&realm, &static_fn(&realm, "create"), &Value::undefined(), &[Value::null()]).unwrap();
        assert!(created.as_object().unwrap().get_prototype_of().is_none());
    }
}
