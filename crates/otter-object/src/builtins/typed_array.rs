//! `ArrayBuffer`, `SharedArrayBuffer`, `%TypedArray%.prototype` and the
//! eleven concrete typed array constructors

use std::sync::Arc;

use super::{BuiltInBuilder, arg, install_global};
use crate::array_buffer::{
    ByteStorage, allocate_array_buffer, allocate_resizable_array_buffer, array_buffer_slice,
    array_buffer_transfer,
};
use crate::convert::{relative_index, to_index};
use crate::error::{VmError, VmResult};
use crate::intrinsics::Intrinsics;
use crate::iterator::{ArrayIterationKind, create_array_iterator, get_iterator_from_method, iterate_to_list};
use crate::object::{JsObject, ObjectKind};
use crate::operations::{get_method, length_of_array_like};
use crate::property::{PropertyAttributes, PropertyKey};
use crate::realm::Realm;
use crate::symbol::Symbol;
use crate::typed_array::{
    TypedArrayKind, typed_array_create_from_buffer, typed_array_create_from_list,
    typed_array_create_with_length, typed_array_fill, typed_array_slice, typed_array_subarray,
    validate_typed_array,
};
use crate::value::Value;

fn to_usize(n: u64) -> VmResult<usize> {
    usize::try_from(n).map_err(|_| VmError::range_error("Array buffer allocation failed"))
}

// ---------------------------------------------------------------------------
// ArrayBuffer
// ---------------------------------------------------------------------------

fn this_array_buffer<'a>(this: &'a Value, method: &str) -> VmResult<&'a Arc<JsObject>> {
    match this.as_object() {
        Some(obj) if obj.as_array_buffer().is_some() => Ok(obj),
        _ => Err(VmError::type_error(format!(
            "Method ArrayBuffer.prototype.{} called on incompatible receiver {}",
            method,
            this.describe()
        ))),
    }
}

fn array_buffer_constructor(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let byte_length = to_usize(to_index(realm, &arg(args, 0))?)?;
    if let Value::Object(options) = arg(args, 1) {
        let max = options.get(realm, &PropertyKey::string("maxByteLength"))?;
        if !max.is_undefined() {
            let max = to_usize(to_index(realm, &max)?)?;
            return Ok(Value::Object(allocate_resizable_array_buffer(
                realm,
                byte_length,
                max,
            )?));
        }
    }
    Ok(Value::Object(allocate_array_buffer(realm, byte_length)?))
}

fn array_buffer_byte_length(_realm: &Realm, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_array_buffer(this, "byteLength")?;
    let len = obj.as_array_buffer().map_or(0, |b| b.byte_length());
    Ok(Value::number(len as f64))
}

fn array_buffer_detached(_realm: &Realm, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_array_buffer(this, "detached")?;
    Ok(Value::boolean(obj.as_array_buffer().is_some_and(|b| b.is_detached())))
}

fn array_buffer_resizable(_realm: &Realm, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_array_buffer(this, "resizable")?;
    Ok(Value::boolean(obj.as_array_buffer().is_some_and(|b| b.is_resizable())))
}

fn array_buffer_max_byte_length(_realm: &Realm, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let obj = this_array_buffer(this, "maxByteLength")?;
    let max = obj
        .as_array_buffer()
        .map_or(0, |b| b.max_byte_length().unwrap_or_else(|| b.byte_length()));
    Ok(Value::number(max as f64))
}

fn array_buffer_proto_slice(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_array_buffer(this, "slice")?;
    let len = obj.as_array_buffer().map_or(0, |b| b.byte_length()) as u64;
    let start = relative_index(realm, &arg(args, 0), len, 0)?;
    let end = relative_index(realm, &arg(args, 1), len, len)?;
    Ok(Value::Object(array_buffer_slice(
        realm,
        obj,
        to_usize(start)?,
        to_usize(end)?,
    )?))
}

fn transfer(realm: &Realm, this: &Value, args: &[Value], preserve: bool) -> VmResult<Value> {
    let obj = this_array_buffer(this, "transfer")?;
    let new_length = match arg(args, 0) {
        Value::Undefined => None,
        len => Some(to_usize(to_index(realm, &len)?)?),
    };
    Ok(Value::Object(array_buffer_transfer(realm, obj, new_length, preserve)?))
}

fn array_buffer_resize(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let obj = this_array_buffer(this, "resize")?;
    let new_length = to_usize(to_index(realm, &arg(args, 0))?)?;
    if let Some(buffer) = obj.as_array_buffer() {
        buffer.resize(new_length)?;
    }
    Ok(Value::undefined())
}

// ---------------------------------------------------------------------------
// SharedArrayBuffer
// ---------------------------------------------------------------------------

fn shared_array_buffer_constructor(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let byte_length = to_usize(to_index(realm, &arg(args, 0))?)?;
    Ok(Value::Object(realm.create_shared_array_buffer(byte_length)?))
}

fn shared_array_buffer_byte_length(_realm: &Realm, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let sab = this
        .as_object()
        .and_then(|o| o.as_shared_array_buffer())
        .ok_or_else(|| {
            VmError::type_error("Method SharedArrayBuffer.prototype.byteLength called on incompatible receiver")
        })?;
    Ok(Value::number(sab.byte_length() as f64))
}

// ---------------------------------------------------------------------------
// %TypedArray%.prototype
// ---------------------------------------------------------------------------

fn this_typed_array<'a>(this: &'a Value, name: &str) -> VmResult<&'a crate::typed_array::JsTypedArray> {
    this.as_object()
        .and_then(|o| o.as_typed_array())
        .ok_or_else(|| VmError::type_error(format!("{}: receiver is not a typed array", name)))
}

fn typed_array_iterate(realm: &Realm, this: &Value, kind: ArrayIterationKind) -> VmResult<Value> {
    validate_typed_array(this, "values")?;
    let Value::Object(obj) = this else {
        return Err(VmError::type_error("values: receiver is not a typed array"));
    };
    Ok(Value::Object(create_array_iterator(realm, obj.clone(), kind)))
}

fn bytes_per_element(kind: TypedArrayKind) -> Value {
    Value::number(kind.element_size() as f64)
}

// ---------------------------------------------------------------------------
// Concrete constructors
// ---------------------------------------------------------------------------

/// `new Int8Array(...)` .. `new BigUint64Array(...)`
///
/// Accepts a length, a buffer with optional offset and length, another
/// typed array, an iterable or an array-like.
fn typed_array_constructor(realm: &Realm, kind: TypedArrayKind, args: &[Value]) -> VmResult<Arc<JsObject>> {
    let first = arg(args, 0);
    let Value::Object(source) = &first else {
        let length = to_usize(to_index(realm, &first)?)?;
        return typed_array_create_with_length(realm, kind, length);
    };

    if matches!(source.kind(), ObjectKind::ArrayBuffer(_) | ObjectKind::SharedArrayBuffer(_)) {
        let offset = to_usize(to_index(realm, &arg(args, 1))?)?;
        let length = match arg(args, 2) {
            Value::Undefined => None,
            len => Some(to_usize(to_index(realm, &len)?)?),
        };
        return typed_array_create_from_buffer(realm, kind, source, offset, length);
    }

    if let Some(other) = source.as_typed_array() {
        if other.is_out_of_bounds() {
            return Err(VmError::type_error("Cannot construct from a detached typed array"));
        }
        if other.kind().is_bigint() != kind.is_bigint() {
            return Err(VmError::type_error(format!(
                "Cannot mix BigInt and other types when constructing {}",
                kind.name()
            )));
        }
        let values: Vec<Value> = (0..other.length())
            .map(|i| other.get_element(i).unwrap_or_default())
            .collect();
        return typed_array_create_from_list(realm, kind, &values);
    }

    let values = match get_method(realm, &first, &PropertyKey::Symbol(Symbol::iterator()))? {
        Some(method) => {
            let mut record = get_iterator_from_method(realm, &first, &method)?;
            iterate_to_list(realm, &mut record)?
        }
        None => {
            let len = length_of_array_like(realm, source)?;
            let mut values = Vec::with_capacity(len.min(1024) as usize);
            for index in 0..len {
                values.push(source.get(realm, &PropertyKey::from_u64(index))?);
            }
            values
        }
    };
    typed_array_create_from_list(realm, kind, &values)
}

/// Populate `ArrayBuffer.prototype`, `SharedArrayBuffer.prototype`,
/// `%TypedArray%.prototype` and the per-kind prototypes
pub fn init_prototypes(intrinsics: &Intrinsics) {
    let fn_proto = &intrinsics.function_prototype;

    BuiltInBuilder::new(fn_proto, &intrinsics.array_buffer_prototype, "ArrayBuffer")
        .getter("byteLength", array_buffer_byte_length)
        .getter("detached", array_buffer_detached)
        .getter("resizable", array_buffer_resizable)
        .getter("maxByteLength", array_buffer_max_byte_length)
        .method("slice", array_buffer_proto_slice, 2)
        .method("transfer", |realm, this, args| transfer(realm, this, args, true), 0)
        .method(
            "transferToFixedLength",
            |realm, this, args| transfer(realm, this, args, false),
            0,
        )
        .method("resize", array_buffer_resize, 1);

    BuiltInBuilder::new(
        fn_proto,
        &intrinsics.shared_array_buffer_prototype,
        "SharedArrayBuffer",
    )
    .getter("byteLength", shared_array_buffer_byte_length);

    BuiltInBuilder::new(fn_proto, &intrinsics.typed_array_prototype, "TypedArray")
        .getter("buffer", |_, this, _| {
            Ok(Value::Object(this_typed_array(this, "buffer")?.buffer().clone()))
        })
        .getter("byteLength", |_, this, _| {
            Ok(Value::number(this_typed_array(this, "byteLength")?.byte_length() as f64))
        })
        .getter("byteOffset", |_, this, _| {
            Ok(Value::number(this_typed_array(this, "byteOffset")?.byte_offset() as f64))
        })
        .getter("length", |_, this, _| {
            Ok(Value::number(this_typed_array(this, "length")?.length() as f64))
        })
        .method(
            "fill",
            |realm, this, args| {
                typed_array_fill(realm, this, &arg(args, 0), &arg(args, 1), &arg(args, 2))?;
                Ok(this.clone())
            },
            1,
        )
        .method(
            "slice",
            |realm, this, args| {
                Ok(Value::Object(typed_array_slice(realm, this, &arg(args, 0), &arg(args, 1))?))
            },
            2,
        )
        .method(
            "subarray",
            |realm, this, args| {
                Ok(Value::Object(typed_array_subarray(realm, this, &arg(args, 0), &arg(args, 1))?))
            },
            2,
        )
        .method(
            "values",
            |realm, this, _| typed_array_iterate(realm, this, ArrayIterationKind::Values),
            0,
        )
        .method(
            "keys",
            |realm, this, _| typed_array_iterate(realm, this, ArrayIterationKind::Keys),
            0,
        )
        .method(
            "entries",
            |realm, this, _| typed_array_iterate(realm, this, ArrayIterationKind::Entries),
            0,
        )
        .alias("values", PropertyKey::Symbol(Symbol::iterator()));

    for kind in TypedArrayKind::ALL {
        BuiltInBuilder::new(fn_proto, intrinsics.typed_array_prototype_for(kind), kind.name()).property(
            PropertyKey::string("BYTES_PER_ELEMENT"),
            bytes_per_element(kind),
            PropertyAttributes::frozen(),
        );
    }
}

/// Install the buffer and typed array constructors. `SharedArrayBuffer` is
/// left out when `shared_memory` is false.
pub fn install(intrinsics: &Intrinsics, global: &Arc<JsObject>, shared_memory: bool) {
    let fn_proto = &intrinsics.function_prototype;

    let array_buffer = BuiltInBuilder::new(fn_proto, &intrinsics.array_buffer_prototype, "ArrayBuffer")
        .constructor_fn(array_buffer_constructor, 1)
        .static_method(
            "isView",
            |_, _, args| {
                Ok(Value::boolean(
                    arg(args, 0).as_object().is_some_and(|o| o.as_typed_array().is_some()),
                ))
            },
            1,
        )
        .build();
    install_global(global, "ArrayBuffer", array_buffer);

    if shared_memory {
        let shared = BuiltInBuilder::new(
            fn_proto,
            &intrinsics.shared_array_buffer_prototype,
            "SharedArrayBuffer",
        )
        .constructor_fn(shared_array_buffer_constructor, 1)
        .build();
        install_global(global, "SharedArrayBuffer", shared);
    }

    for kind in TypedArrayKind::ALL {
        let ctor = BuiltInBuilder::new(fn_proto, intrinsics.typed_array_prototype_for(kind), kind.name())
            .constructor_fn(
                move |realm, _this, args| Ok(Value::Object(typed_array_constructor(realm, kind, args)?)),
                3,
            )
            .static_property("BYTES_PER_ELEMENT", bytes_per_element(kind), PropertyAttributes::frozen())
            .build();
        install_global(global, kind.name(), ctor);
    }
    tracing::trace!(target: "otter::object", shared_memory, "typed array constructors installed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{call, invoke};

    fn global_fn(realm: &Realm, name: &str) -> Value {
        realm.global().get(realm, &PropertyKey::string(name)).unwrap()
    }

    fn construct(realm: &Realm, name: &str, args: &[Value]) -> Value {
        call(realm, &global_fn(realm, name), &Value::undefined(), args).unwrap()
    }

    fn get(realm: &Realm, value: &Value, name: &str) -> Value {
        value.as_object().unwrap().get(realm, &PropertyKey::string(name)).unwrap()
    }

    #[test]
    fn test_views_share_buffer_object() {
        let realm = Realm::new();
        let buffer = construct(&realm, "ArrayBuffer", &[Value::int32(8)]);
        let a = construct(&realm, "Uint8Array", &[buffer.clone()]);
        let b = construct(&realm, "Int16Array", &[buffer.clone(), Value::int32(2), Value::int32(1)]);
        assert_eq!(get(&realm, &a, "buffer"), buffer);
        assert_eq!(get(&realm, &b, "buffer"), buffer);
        assert_eq!(get(&realm, &b, "byteOffset"), Value::int32(2));
        assert_eq!(get(&realm, &b, "length"), Value::int32(1));
    }

    #[test]
    fn test_misaligned_offset_is_range_error() {
        let realm = Realm::new();
        let buffer = construct(&realm, "ArrayBuffer", &[Value::int32(8)]);
        let err = call(
            &realm,
            &global_fn(&realm, "Int32Array"),
            &Value::undefined(),
            &[buffer, Value::int32(1)],
        )
        .unwrap_err();
        assert!(matches!(err, VmError::RangeError(_)));
    }

    #[test]
    fn test_from_array_like_and_iterable() {
        let realm = Realm::new();
        let list = Value::Object(crate::array::create_array_from_list(
            &realm,
            [Value::int32(300), Value::int32(-1)],
        ));
        let ta = construct(&realm, "Uint8Array", &[list]);
        let obj = ta.as_object().unwrap();
        assert_eq!(obj.get(&realm, &PropertyKey::Index(0)).unwrap(), Value::int32(44));
        assert_eq!(obj.get(&realm, &PropertyKey::Index(1)).unwrap(), Value::int32(255));

        let like = realm.new_object();
        like.set(&realm, PropertyKey::string("length"), Value::int32(1)).unwrap();
        like.set(&realm, PropertyKey::Index(0), Value::number(1.5)).unwrap();
        let ta = construct(&realm, "Float64Array", &[Value::Object(like)]);
        assert_eq!(
            ta.as_object().unwrap().get(&realm, &PropertyKey::Index(0)).unwrap(),
            Value::number(1.5)
        );
    }

    #[test]
    fn test_bigint_mixing_rejected() {
        let realm = Realm::new();
        let source = construct(&realm, "Int8Array", &[Value::int32(2)]);
        let err = call(
            &realm,
            &global_fn(&realm, "BigInt64Array"),
            &Value::undefined(),
            &[source],
        )
        .unwrap_err();
        assert!(matches!(err, VmError::TypeError(_)));
    }

    #[test]
    fn test_transfer_detaches_source() {
        let realm = Realm::new();
        let buffer = construct(&realm, "ArrayBuffer", &[Value::int32(4)]);
        let view = construct(&realm, "Uint8Array", &[buffer.clone()]);
        let moved = invoke(&realm, &buffer, &PropertyKey::string("transfer"), &[]).unwrap();
        assert_eq!(get(&realm, &buffer, "detached"), Value::boolean(true));
        assert_eq!(get(&realm, &buffer, "byteLength"), Value::int32(0));
        assert_eq!(get(&realm, &moved, "byteLength"), Value::int32(4));
        assert_eq!(get(&realm, &view, "length"), Value::int32(0));
    }

    #[test]
    fn test_bytes_per_element() {
        let realm = Realm::new();
        let ctor = global_fn(&realm, "Float32Array");
        assert_eq!(get(&realm, &ctor, "BYTES_PER_ELEMENT"), Value::int32(4));
        let desc = ctor
            .as_object()
            .unwrap()
            .get_own_property(&PropertyKey::string("BYTES_PER_ELEMENT"))
            .unwrap();
        assert!(!desc.configurable);
    }
}
