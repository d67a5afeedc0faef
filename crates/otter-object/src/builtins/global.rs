//! Value properties and functions of the global object

use std::sync::Arc;

use super::{arg, native_function};
use crate::convert::{is_js_whitespace, to_string};
use crate::error::VmResult;
use crate::intrinsics::Intrinsics;
use crate::object::JsObject;
use crate::property::{PropertyAttributes, PropertyDescriptor, PropertyKey};
use crate::realm::Realm;
use crate::value::Value;

/// Longest prefix of `s` that is a StrDecimalLiteral, as a number
fn parse_decimal_prefix(s: &str) -> f64 {
    let bytes = s.as_bytes();
    let mut i = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    if s[i..].starts_with("Infinity") {
        return if bytes[0] == b'-' {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let scan_digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut digits = scan_digits(i);
    i += digits;
    if bytes.get(i) == Some(&b'.') {
        let fraction = scan_digits(i + 1);
        if digits + fraction > 0 {
            i += 1 + fraction;
            digits += fraction;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(i + 1), Some(b'+' | b'-')));
        let exponent = scan_digits(i + 1 + sign);
        if exponent > 0 {
            i += 1 + sign + exponent;
        }
    }
    s[..i].parse::<f64>().unwrap_or(f64::NAN)
}

/// `parseFloat(string)`
fn global_parse_float(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let input = to_string(realm, &arg(args, 0))?;
    let trimmed = input.as_str().trim_start_matches(is_js_whitespace);
    Ok(Value::number(parse_decimal_prefix(trimmed)))
}

/// Install `NaN`, `Infinity`, `undefined` and the global functions.
///
/// Functions are writable, configurable and not enumerable; the value
/// properties are frozen.
pub fn install(intrinsics: &Intrinsics, global: &Arc<JsObject>) {
    for (name, value) in [
        ("NaN", Value::number(f64::NAN)),
        ("Infinity", Value::number(f64::INFINITY)),
        ("undefined", Value::undefined()),
    ] {
        global.define_raw(
            PropertyKey::string(name),
            PropertyDescriptor::data_with_attrs(value, PropertyAttributes::frozen()),
        );
    }

    let parse_float = native_function(
        &intrinsics.function_prototype,
        "parseFloat",
        1,
        Arc::new(global_parse_float),
    );
    global.define_raw(
        PropertyKey::string("parseFloat"),
        PropertyDescriptor::data_with_attrs(Value::Object(parse_float), PropertyAttributes::builtin()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::call;

    fn parse_float(realm: &Realm, input: Value) -> f64 {
        let func = realm.global().get(realm, &PropertyKey::string("parseFloat")).unwrap();
        match call(realm, &func, &Value::undefined(), &[input]).unwrap() {
            Value::Number(n) => n,
            other => panic!("parseFloat returned {:?}", other),
        }
    }

    #[test]
    fn test_decimal_prefixes() {
        let realm = Realm::new();
        let cases = [
            ("  3.25abc", 3.25),
            ("-.5", -0.5),
            ("5.", 5.0),
            ("1e3x", 1000.0),
            ("1e", 1.0),
            ("1e+", 1.0),
            ("\u{00A0}\n+7E-1", 0.7),
            ("0x10", 0.0),
            ("-Infinityx", f64::NEG_INFINITY),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_float(&realm, Value::string(input)), expected, "{:?}", input);
        }
    }

    #[test]
    fn test_non_numeric_is_nan() {
        let realm = Realm::new();
        for input in ["", ".", "+", "abc", "inf", "nan", ".e1"] {
            assert!(parse_float(&realm, Value::string(input)).is_nan(), "{:?}", input);
        }
        assert!(parse_float(&realm, Value::undefined()).is_nan());
    }

    #[test]
    fn test_negative_zero_survives() {
        let realm = Realm::new();
        let n = parse_float(&realm, Value::string("-0"));
        assert!(n == 0.0 && n.is_sign_negative());
    }

    #[test]
    fn test_global_attributes() {
        let realm = Realm::new();
        let global = realm.global();
        let desc = global.get_own_property(&PropertyKey::string("parseFloat")).unwrap();
        assert!(!desc.enumerable && desc.configurable && desc.is_writable());

        let nan = global.get_own_property(&PropertyKey::string("NaN")).unwrap();
        assert!(!nan.enumerable && !nan.configurable && !nan.is_writable());
        assert!(!global.set(&realm, PropertyKey::string("undefined"), Value::int32(1)).unwrap());
    }
}
