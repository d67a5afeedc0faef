//! `String` constructor and the code-unit accessors on `String.prototype`

use std::sync::Arc;

use super::{BuiltInBuilder, arg, install_global};
use crate::convert::{require_object_coercible, to_integer_or_infinity, to_string};
use crate::error::{VmError, VmResult};
use crate::intrinsics::Intrinsics;
use crate::object::{JsObject, ObjectKind};
use crate::realm::Realm;
use crate::string::JsString;
use crate::value::Value;

/// `String(value)` called as a function
fn string_constructor(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    match args.first() {
        None => Ok(Value::string("")),
        Some(Value::Symbol(sym)) => Ok(Value::String(sym.descriptive_string().into())),
        Some(value) => Ok(Value::String(to_string(realm, value)?)),
    }
}

/// thisStringValue
fn this_string_value(this: &Value, method: &str) -> VmResult<JsString> {
    match this {
        Value::String(s) => Ok(s.clone()),
        Value::Object(obj) => match obj.kind() {
            ObjectKind::Primitive(Value::String(s)) => Ok(s.clone()),
            _ => Err(incompatible(this, method)),
        },
        _ => Err(incompatible(this, method)),
    }
}

fn incompatible(this: &Value, method: &str) -> VmError {
    VmError::type_error(format!(
        "String.prototype.{} requires that 'this' be a String, got {}",
        method,
        this.describe()
    ))
}

/// RequireObjectCoercible(this) then ToString
fn coerce_this(realm: &Realm, this: &Value) -> VmResult<JsString> {
    to_string(realm, require_object_coercible(this)?)
}

/// Clamp an integer-or-infinity position into `[0, len]`
fn clamp_position(pos: f64, len: usize) -> usize {
    pos.clamp(0.0, len as f64) as usize
}

fn string_proto_char_at(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let s = coerce_this(realm, this)?;
    let position = to_integer_or_infinity(realm, &arg(args, 0))?;
    if position < 0.0 || position >= s.utf16_len() as f64 {
        return Ok(Value::string(""));
    }
    Ok(s.code_unit_at(position as usize)
        .map_or_else(|| Value::string(""), Value::String))
}

fn string_proto_substring(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let s = coerce_this(realm, this)?;
    let len = s.utf16_len();
    let start = clamp_position(to_integer_or_infinity(realm, &arg(args, 0))?, len);
    let end = match arg(args, 1) {
        Value::Undefined => len,
        end => clamp_position(to_integer_or_infinity(realm, &end)?, len),
    };
    Ok(Value::String(s.utf16_slice(start.min(end), start.max(end))))
}

/// Populate `String.prototype`
pub fn init_prototype(intrinsics: &Intrinsics) {
    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.string_prototype,
        "String",
    )
    .method("charAt", string_proto_char_at, 1)
    .method("substring", string_proto_substring, 2)
    .method(
        "toString",
        |_, this, _| this_string_value(this, "toString").map(Value::String),
        0,
    )
    .method(
        "valueOf",
        |_, this, _| this_string_value(this, "valueOf").map(Value::String),
        0,
    );
}

/// Install the `String` constructor
pub fn install(intrinsics: &Intrinsics, global: &Arc<JsObject>) {
    let ctor = BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.string_prototype,
        "String",
    )
    .constructor_fn(string_constructor, 1)
    .build();
    install_global(global, "String", ctor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::invoke;
    use crate::property::PropertyKey;

    fn call_method(realm: &Realm, receiver: Value, name: &str, args: &[Value]) -> VmResult<Value> {
        invoke(realm, &receiver, &PropertyKey::string(name), args)
    }

    #[test]
    fn test_char_at_matches_substring() {
        let realm = Realm::new();
        let left = Value::string("ABC\u{0041}\u{0042}\u{0043}");
        let right = Value::string("\u{0041}\u{0042}\u{0043}ABC");
        for i in 0..6 {
            let c = call_method(&realm, left.clone(), "charAt", &[Value::int32(i)]).unwrap();
            let sub = call_method(&realm, right.clone(), "substring", &[Value::int32(i), Value::int32(i + 1)])
                .unwrap();
            assert_eq!(c, sub, "position {}", i);
        }
    }

    #[test]
    fn test_char_at_out_of_range_is_empty() {
        let realm = Realm::new();
        for pos in [Value::int32(-1), Value::int32(3), Value::number(f64::INFINITY)] {
            let c = call_method(&realm, Value::string("abc"), "charAt", &[pos]).unwrap();
            assert_eq!(c, Value::string(""));
        }
        let first = call_method(&realm, Value::string("abc"), "charAt", &[]).unwrap();
        assert_eq!(first, Value::string("a"));
    }

    #[test]
    fn test_substring_swaps_and_clamps() {
        let realm = Realm::new();
        let s = Value::string("hello");
        let swapped = call_method(&realm, s.clone(), "substring", &[Value::int32(4), Value::int32(1)]).unwrap();
        assert_eq!(swapped, Value::string("ell"));
        let clamped = call_method(&realm, s.clone(), "substring", &[Value::int32(-3), Value::number(f64::NAN)])
            .unwrap();
        assert_eq!(clamped, Value::string(""));
        let tail = call_method(&realm, s, "substring", &[Value::int32(2)]).unwrap();
        assert_eq!(tail, Value::string("llo"));
    }

    #[test]
    fn test_nullish_receiver_is_type_error() {
        let realm = Realm::new();
        let char_at = realm
            .intrinsics()
            .string_prototype
            .get(&realm, &PropertyKey::string("charAt"))
            .unwrap();
        let err = crate::operations::call(&realm, &char_at, &Value::undefined(), &[]).unwrap_err();
        assert!(matches!(err, VmError::TypeError(_)));
    }

    #[test]
    fn test_wrapper_converts_through_to_string() {
        let realm = Realm::new();
        let wrapper = Value::Object(realm.wrap_primitive(Value::string("xyz")));
        let c = call_method(&realm, wrapper.clone(), "charAt", &[Value::int32(1)]).unwrap();
        assert_eq!(c, Value::string("y"));
        assert_eq!(call_method(&realm, wrapper, "valueOf", &[]).unwrap(), Value::string("xyz"));
    }
}
