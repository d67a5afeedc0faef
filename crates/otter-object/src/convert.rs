//! Abstract type conversions (ToPrimitive, ToNumber, ToString, ...)
//!
//! Conversions that may reach user code (`valueOf`, `toString`,
//! `@@toPrimitive`) take the realm; pure numeric helpers do not.

use num_bigint::BigInt;
use num_traits::{Num, ToPrimitive, Zero};
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::JsObject;
use crate::operations;
use crate::property::PropertyKey;
use crate::realm::Realm;
use crate::string::JsString;
use crate::symbol::Symbol;
use crate::value::Value;

/// Hint passed to ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    /// No preference
    Default,
    /// Prefer `valueOf`
    Number,
    /// Prefer `toString`
    String,
}

impl PreferredType {
    fn as_str(self) -> &'static str {
        match self {
            PreferredType::Default => "default",
            PreferredType::Number => "number",
            PreferredType::String => "string",
        }
    }
}

// ---------------------------------------------------------------------------
// Realm-aware conversions
// ---------------------------------------------------------------------------

/// ToPrimitive
pub fn to_primitive(realm: &Realm, value: &Value, hint: PreferredType) -> VmResult<Value> {
    let Value::Object(obj) = value else {
        return Ok(value.clone());
    };
    let exotic = operations::get_method(realm, value, &PropertyKey::Symbol(Symbol::to_primitive()))?;
    if let Some(exotic) = exotic {
        let result = operations::call(realm, &exotic, value, &[Value::string(hint.as_str())])?;
        if result.is_object() {
            return Err(VmError::type_error("Cannot convert object to primitive value"));
        }
        return Ok(result);
    }
    ordinary_to_primitive(realm, obj, hint)
}

/// OrdinaryToPrimitive
pub fn ordinary_to_primitive(
    realm: &Realm,
    obj: &Arc<JsObject>,
    hint: PreferredType,
) -> VmResult<Value> {
    let order = match hint {
        PreferredType::String => ["toString", "valueOf"],
        _ => ["valueOf", "toString"],
    };
    let this = Value::Object(obj.clone());
    for name in order {
        let method = obj.get(realm, &PropertyKey::string(name))?;
        if method.is_callable() {
            let result = operations::call(realm, &method, &this, &[])?;
            if !result.is_object() {
                return Ok(result);
            }
        }
    }
    Err(VmError::type_error("Cannot convert object to primitive value"))
}

/// ToNumber
pub fn to_number(realm: &Realm, value: &Value) -> VmResult<f64> {
    match value {
        Value::Undefined => Ok(f64::NAN),
        Value::Null => Ok(0.0),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Ok(*n),
        Value::String(s) => Ok(string_to_number(s.as_str())),
        Value::BigInt(_) => Err(VmError::type_error("Cannot convert a BigInt value to a number")),
        Value::Symbol(_) => Err(VmError::type_error("Cannot convert a Symbol value to a number")),
        Value::Object(_) => {
            let prim = to_primitive(realm, value, PreferredType::Number)?;
            to_number(realm, &prim)
        }
    }
}

/// ToBigInt
pub fn to_bigint(realm: &Realm, value: &Value) -> VmResult<BigInt> {
    match value {
        Value::Boolean(b) => Ok(BigInt::from(u8::from(*b))),
        Value::BigInt(b) => Ok(b.as_ref().clone()),
        Value::String(s) => string_to_bigint(s.as_str()).ok_or_else(|| {
            VmError::syntax_error(format!("Cannot convert {} to a BigInt", s))
        }),
        Value::Object(_) => {
            let prim = to_primitive(realm, value, PreferredType::Number)?;
            to_bigint(realm, &prim)
        }
        other => Err(VmError::type_error(format!(
            "Cannot convert {} to a BigInt",
            other.describe()
        ))),
    }
}

/// ToString
pub fn to_string(realm: &Realm, value: &Value) -> VmResult<JsString> {
    match value {
        Value::Undefined => Ok(JsString::intern("undefined")),
        Value::Null => Ok(JsString::intern("null")),
        Value::Boolean(b) => Ok(JsString::intern(if *b { "true" } else { "false" })),
        Value::Number(n) => Ok(JsString::new(number_to_string(*n))),
        Value::BigInt(b) => Ok(JsString::new(b.to_string())),
        Value::String(s) => Ok(s.clone()),
        Value::Symbol(_) => Err(VmError::type_error("Cannot convert a Symbol value to a string")),
        Value::Object(_) => {
            let prim = to_primitive(realm, value, PreferredType::String)?;
            to_string(realm, &prim)
        }
    }
}

/// ToPropertyKey
pub fn to_property_key(realm: &Realm, value: &Value) -> VmResult<PropertyKey> {
    let key = to_primitive(realm, value, PreferredType::String)?;
    match key {
        Value::Symbol(sym) => Ok(PropertyKey::Symbol(sym)),
        Value::Number(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 - 1.0 => {
            Ok(PropertyKey::Index(n as u32))
        }
        other => Ok(PropertyKey::from_js_string(to_string(realm, &other)?)),
    }
}

/// ToObject
pub fn to_object(realm: &Realm, value: &Value) -> VmResult<Arc<JsObject>> {
    match value {
        Value::Object(obj) => Ok(obj.clone()),
        Value::Undefined | Value::Null => Err(VmError::type_error(format!(
            "Cannot convert {} to object",
            value.describe()
        ))),
        primitive => Ok(realm.wrap_primitive(primitive.clone())),
    }
}

/// RequireObjectCoercible
pub fn require_object_coercible(value: &Value) -> VmResult<&Value> {
    if value.is_nullish() {
        return Err(VmError::type_error(format!(
            "Cannot destructure '{}' as it is {}.",
            value.describe(),
            value.describe()
        )));
    }
    Ok(value)
}

/// ToIntegerOrInfinity
pub fn to_integer_or_infinity(realm: &Realm, value: &Value) -> VmResult<f64> {
    Ok(integer_or_infinity(to_number(realm, value)?))
}

/// ToUint32
pub fn to_uint32(realm: &Realm, value: &Value) -> VmResult<u32> {
    Ok(f64_to_uint32(to_number(realm, value)?))
}

/// ToInt32
pub fn to_int32(realm: &Realm, value: &Value) -> VmResult<i32> {
    Ok(f64_to_int32(to_number(realm, value)?))
}

/// ToLength
pub fn to_length(realm: &Realm, value: &Value) -> VmResult<u64> {
    let len = to_integer_or_infinity(realm, value)?;
    if len <= 0.0 {
        return Ok(0);
    }
    Ok(len.min(MAX_SAFE_INTEGER) as u64)
}

/// ToIndex; RangeError outside `[0, 2^53 - 1]`
pub fn to_index(realm: &Realm, value: &Value) -> VmResult<u64> {
    if value.is_undefined() {
        return Ok(0);
    }
    let integer = to_integer_or_infinity(realm, value)?;
    if !(0.0..=MAX_SAFE_INTEGER).contains(&integer) {
        return Err(VmError::range_error("Invalid index"));
    }
    Ok(integer as u64)
}

/// Resolve a relative index argument (as used by `slice`, `fill`, ...)
/// against `len`, clamping into `[0, len]`.
pub fn relative_index(realm: &Realm, value: &Value, len: u64, default: u64) -> VmResult<u64> {
    if value.is_undefined() {
        return Ok(default);
    }
    let relative = to_integer_or_infinity(realm, value)?;
    let len_f = len as f64;
    let resolved = if relative < 0.0 {
        (len_f + relative).max(0.0)
    } else {
        relative.min(len_f)
    };
    Ok(resolved as u64)
}

// ---------------------------------------------------------------------------
// Pure numeric helpers
// ---------------------------------------------------------------------------

/// `2^53 - 1`
pub const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Truncate towards zero, mapping NaN and `-0` to `+0`
pub fn integer_or_infinity(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc()
    }
}

/// Reduce a number modulo `2^bits` (the shared step of ToInt8 .. ToUint32)
pub fn f64_to_modular(n: f64, bits: u32) -> u64 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let modulus = 2f64.powi(bits as i32);
    let mut m = n.trunc() % modulus;
    if m < 0.0 {
        m += modulus;
    }
    m as u64
}

/// ToUint32 on a number
pub fn f64_to_uint32(n: f64) -> u32 {
    f64_to_modular(n, 32) as u32
}

/// ToInt32 on a number
pub fn f64_to_int32(n: f64) -> i32 {
    f64_to_modular(n, 32) as u32 as i32
}

pub(crate) fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}' | '\u{000B}' | '\u{000C}' | '\u{0020}' | '\u{00A0}' | '\u{FEFF}'
            | '\u{000A}' | '\u{000D}' | '\u{2028}' | '\u{2029}'
    ) || (c.is_whitespace() && !c.is_ascii())
}

/// StringToNumber
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    let radix = match trimmed.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.is_empty() || digits.contains('_') {
            return f64::NAN;
        }
        return match BigInt::from_str_radix(digits, radix) {
            Ok(n) if !digits.starts_with(['+', '-']) => n.to_f64().unwrap_or(f64::NAN),
            _ => f64::NAN,
        };
    }
    let unsigned = trimmed.trim_start_matches(['+', '-']);
    if unsigned == "Infinity" && trimmed.len() - unsigned.len() <= 1 {
        return if trimmed.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    // Rust's parser also accepts "inf", "nan" and friends; JS does not.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// StringToBigInt; `None` when the text is not a valid integer literal
pub fn string_to_bigint(s: &str) -> Option<BigInt> {
    let trimmed = s.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return Some(BigInt::zero());
    }
    let (radix, digits) = match trimmed.get(..2) {
        Some("0x") | Some("0X") => (16, &trimmed[2..]),
        Some("0o") | Some("0O") => (8, &trimmed[2..]),
        Some("0b") | Some("0B") => (2, &trimmed[2..]),
        _ => (10, trimmed),
    };
    if digits.is_empty() || digits.contains('_') || (radix != 10 && digits.starts_with(['+', '-'])) {
        return None;
    }
    let body = digits.trim_start_matches(['+', '-']);
    if body.is_empty() || digits.len() - body.len() > 1 {
        return None;
    }
    BigInt::from_str_radix(digits, radix).ok()
}

/// Number::toString (radix 10)
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let mut buffer = ryu::Buffer::new();
    let formatted = buffer.format_finite(n.abs());
    let (mantissa, exponent) = match formatted.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (formatted, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    // Shortest digit string `digits` and decimal point position `point` such
    // that the value is 0.digits * 10^point.
    let mut digits: String = format!("{}{}", int_part, frac_part);
    let mut point = int_part.len() as i32 + exponent;
    let leading = digits.len() - digits.trim_start_matches('0').len();
    digits.drain(..leading);
    point -= leading as i32;
    let trimmed_len = digits.trim_end_matches('0').len();
    digits.truncate(trimmed_len);

    let k = digits.len() as i32;
    let mut out = String::new();
    if n < 0.0 {
        out.push('-');
    }
    if k <= point && point <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat_n('0', (point - k) as usize));
    } else if 0 < point && point <= 21 {
        out.push_str(&digits[..point as usize]);
        out.push('.');
        out.push_str(&digits[point as usize..]);
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', (-point) as usize));
        out.push_str(&digits);
    } else {
        let e = point - 1;
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if e < 0 { '-' } else { '+' });
        out.push_str(&e.abs().to_string());
    }
    out
}

/// CanonicalNumericIndexString
pub fn canonical_numeric_index_string(s: &str) -> Option<f64> {
    if s == "-0" {
        return Some(-0.0);
    }
    let n = string_to_number(s);
    (number_to_string(n) == s).then_some(n)
}
