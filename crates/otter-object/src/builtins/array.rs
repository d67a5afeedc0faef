//! `Array` constructor and the `Array.prototype` methods the iteration and
//! length protocols are observed through

use std::sync::Arc;

use super::{BuiltInBuilder, arg, install_global};
use crate::array::{array_create, create_array_from_list, is_array};
use crate::convert::{relative_index, to_integer_or_infinity, to_object, to_uint32};
use crate::error::{VmError, VmResult};
use crate::intrinsics::Intrinsics;
use crate::iterator::{ArrayIterationKind, create_array_iterator};
use crate::object::JsObject;
use crate::operations::{self, create_data_property_or_throw, length_of_array_like};
use crate::property::PropertyKey;
use crate::realm::Realm;
use crate::symbol::Symbol;
use crate::value::{Value, strict_equals};

fn array_constructor(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    if let [Value::Number(len)] = args {
        let int_len = to_uint32(realm, &Value::Number(*len))?;
        if int_len as f64 != *len {
            return Err(VmError::range_error("Invalid array length"));
        }
        return Ok(Value::Object(array_create(realm, int_len as u64)?));
    }
    Ok(Value::Object(create_array_from_list(realm, args.iter().cloned())))
}

fn array_is_array(_realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    Ok(Value::boolean(is_array(&arg(args, 0))))
}

fn array_proto_push(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = to_object(realm, this)?;
    let len = length_of_array_like(realm, &obj)?;
    if len + args.len() as u64 > crate::convert::MAX_SAFE_INTEGER as u64 {
        return Err(VmError::type_error("Pushing elements past 2^53-1 length"));
    }
    let mut index = len;
    for value in args {
        operations::set(realm, &obj, PropertyKey::from_u64(index), value.clone(), true)?;
        index += 1;
    }
    let new_len = Value::number(index as f64);
    operations::set(realm, &obj, PropertyKey::string("length"), new_len.clone(), true)?;
    Ok(new_len)
}

fn array_proto_index_of(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = to_object(realm, this)?;
    let len = length_of_array_like(realm, &obj)?;
    if len == 0 {
        return Ok(Value::int32(-1));
    }
    let from = to_integer_or_infinity(realm, &arg(args, 1))?;
    if from == f64::INFINITY {
        return Ok(Value::int32(-1));
    }
    let start = if from >= 0.0 {
        from as u64
    } else {
        (len as f64 + from).max(0.0) as u64
    };
    let needle = arg(args, 0);
    for index in start..len {
        let key = PropertyKey::from_u64(index);
        if obj.has_property(realm, &key)? && strict_equals(&obj.get(realm, &key)?, &needle) {
            return Ok(Value::number(index as f64));
        }
    }
    Ok(Value::int32(-1))
}

fn array_proto_slice(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = to_object(realm, this)?;
    let len = length_of_array_like(realm, &obj)?;
    let start = relative_index(realm, &arg(args, 0), len, 0)?;
    let end = relative_index(realm, &arg(args, 1), len, len)?;
    let count = end.saturating_sub(start);
    let result = array_create(realm, count)?;
    let mut n = 0;
    for index in start..end {
        let key = PropertyKey::from_u64(index);
        if obj.has_property(realm, &key)? {
            let value = obj.get(realm, &key)?;
            create_data_property_or_throw(realm, &result, PropertyKey::from_u64(n), value)?;
        }
        n += 1;
    }
    operations::set(realm, &result, PropertyKey::string("length"), Value::number(n as f64), true)?;
    Ok(Value::Object(result))
}

fn array_proto_reduce(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = to_object(realm, this)?;
    let len = length_of_array_like(realm, &obj)?;
    let callback = arg(args, 0);
    if !callback.is_callable() {
        return Err(VmError::type_error(format!("{} is not a function", callback.describe())));
    }

    let mut index = 0;
    let mut accumulator = match args.get(1) {
        Some(initial) => initial.clone(),
        None => loop {
            if index >= len {
                return Err(VmError::type_error("Reduce of empty array with no initial value"));
            }
            let key = PropertyKey::from_u64(index);
            index += 1;
            if obj.has_property(realm, &key)? {
                break obj.get(realm, &key)?;
            }
        },
    };

    let receiver = Value::Object(obj.clone());
    while index < len {
        let key = PropertyKey::from_u64(index);
        if obj.has_property(realm, &key)? {
            let value = obj.get(realm, &key)?;
            accumulator = operations::call(
                realm,
                &callback,
                &Value::undefined(),
                &[accumulator, value, Value::number(index as f64), receiver.clone()],
            )?;
        }
        index += 1;
    }
    Ok(accumulator)
}

fn iterate(realm: &Realm, this: &Value, kind: ArrayIterationKind) -> VmResult<Value> {
    let obj = to_object(realm, this)?;
    Ok(Value::Object(create_array_iterator(realm, obj, kind)))
}

/// Populate `Array.prototype`
pub fn init_prototype(intrinsics: &Intrinsics) {
    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.array_prototype,
        "Array",
    )
    .method("push", array_proto_push, 1)
    .method("indexOf", array_proto_index_of, 1)
    .method("slice", array_proto_slice, 2)
    .method("reduce", array_proto_reduce, 1)
    .method("values", |realm, this, _| iterate(realm, this, ArrayIterationKind::Values), 0)
    .method("keys", |realm, this, _| iterate(realm, this, ArrayIterationKind::Keys), 0)
    .method("entries", |realm, this, _| iterate(realm, this, ArrayIterationKind::Entries), 0)
    .alias("values", PropertyKey::Symbol(Symbol::iterator()));
}

/// Install the `Array` constructor
pub fn install(intrinsics: &Intrinsics, global: &Arc<JsObject>) {
    let ctor = BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.array_prototype,
        "Array",
    )
    .constructor_fn(array_constructor, 1)
    .static_method("isArray", array_is_array, 1)
    .build();
    install_global(global, "Array", ctor);
}
