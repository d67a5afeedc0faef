//! TypedArray implementation
//!
//! TypedArrays are integer-indexed exotic objects: numeric keys never reach
//! the ordinary property map, they read and write the backing buffer. All 11
//! element types share one implementation via `TypedArrayKind`.

use num_bigint::{BigInt, Sign};
use std::sync::Arc;

use crate::array_buffer::{ByteStorage, allocate_array_buffer, buffer_storage};
use crate::convert::{
    canonical_numeric_index_string, f64_to_modular, relative_index, to_bigint, to_number,
};
use crate::error::{VmError, VmResult};
use crate::object::{ExoticHooks, JsObject, ObjectKind};
use crate::property::{PartialDescriptor, PropertyDescriptor, PropertyKey};
use crate::realm::Realm;
use crate::value::Value;

/// The kind of TypedArray - determines element size and interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypedArrayKind {
    /// Int8Array - 8-bit signed integers
    Int8,
    /// Uint8Array - 8-bit unsigned integers
    Uint8,
    /// Uint8ClampedArray - 8-bit unsigned integers (clamped)
    Uint8Clamped,
    /// Int16Array - 16-bit signed integers
    Int16,
    /// Uint16Array - 16-bit unsigned integers
    Uint16,
    /// Int32Array - 32-bit signed integers
    Int32,
    /// Uint32Array - 32-bit unsigned integers
    Uint32,
    /// Float32Array - 32-bit floating point
    Float32,
    /// Float64Array - 64-bit floating point
    Float64,
    /// BigInt64Array - 64-bit signed integers (BigInt)
    BigInt64,
    /// BigUint64Array - 64-bit unsigned integers (BigInt)
    BigUint64,
}

impl TypedArrayKind {
    /// Every kind, in constructor table order
    pub const ALL: [TypedArrayKind; 11] = [
        TypedArrayKind::Int8,
        TypedArrayKind::Uint8,
        TypedArrayKind::Uint8Clamped,
        TypedArrayKind::Int16,
        TypedArrayKind::Uint16,
        TypedArrayKind::Int32,
        TypedArrayKind::Uint32,
        TypedArrayKind::Float32,
        TypedArrayKind::Float64,
        TypedArrayKind::BigInt64,
        TypedArrayKind::BigUint64,
    ];

    /// Position in [`TypedArrayKind::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Get the byte size of each element
    pub fn element_size(&self) -> usize {
        match self {
            TypedArrayKind::Int8 | TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => 1,
            TypedArrayKind::Int16 | TypedArrayKind::Uint16 => 2,
            TypedArrayKind::Int32 | TypedArrayKind::Uint32 | TypedArrayKind::Float32 => 4,
            TypedArrayKind::Float64 | TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64 => 8,
        }
    }

    /// Get the name of this TypedArray type
    pub fn name(&self) -> &'static str {
        match self {
            TypedArrayKind::Int8 => "Int8Array",
            TypedArrayKind::Uint8 => "Uint8Array",
            TypedArrayKind::Uint8Clamped => "Uint8ClampedArray",
            TypedArrayKind::Int16 => "Int16Array",
            TypedArrayKind::Uint16 => "Uint16Array",
            TypedArrayKind::Int32 => "Int32Array",
            TypedArrayKind::Uint32 => "Uint32Array",
            TypedArrayKind::Float32 => "Float32Array",
            TypedArrayKind::Float64 => "Float64Array",
            TypedArrayKind::BigInt64 => "BigInt64Array",
            TypedArrayKind::BigUint64 => "BigUint64Array",
        }
    }

    /// Check if this is a BigInt typed array
    pub fn is_bigint(&self) -> bool {
        matches!(self, TypedArrayKind::BigInt64 | TypedArrayKind::BigUint64)
    }

    /// Convert a JS value to this kind's numeric type.
    ///
    /// BigInt kinds go through ToBigInt (Numbers are a TypeError), the rest
    /// through ToNumber (BigInts are a TypeError).
    pub fn to_element(&self, realm: &Realm, value: &Value) -> VmResult<Element> {
        if self.is_bigint() {
            Ok(Element::BigInt(to_bigint(realm, value)?))
        } else {
            Ok(Element::Number(to_number(realm, value)?))
        }
    }

    /// Encode into little-endian bytes; returns the byte count used
    fn encode(&self, element: &Element, out: &mut [u8; 8]) -> usize {
        let size = self.element_size();
        match (self, element) {
            (TypedArrayKind::Uint8Clamped, Element::Number(n)) => out[0] = clamp_u8(*n),
            (TypedArrayKind::Float32, Element::Number(n)) => {
                out[..4].copy_from_slice(&(*n as f32).to_le_bytes())
            }
            (TypedArrayKind::Float64, Element::Number(n)) => out.copy_from_slice(&n.to_le_bytes()),
            (_, Element::Number(n)) => {
                let bits = f64_to_modular(*n, size as u32 * 8);
                out[..size].copy_from_slice(&bits.to_le_bytes()[..size]);
            }
            (_, Element::BigInt(b)) => out.copy_from_slice(&bigint_low_u64(b).to_le_bytes()),
        }
        size
    }

    fn decode(&self, bytes: &[u8]) -> Value {
        let mut raw = [0u8; 8];
        raw[..bytes.len()].copy_from_slice(bytes);
        match self {
            TypedArrayKind::Int8 => Value::number(bytes[0] as i8 as f64),
            TypedArrayKind::Uint8 | TypedArrayKind::Uint8Clamped => Value::number(bytes[0] as f64),
            TypedArrayKind::Int16 => Value::number(i16::from_le_bytes([raw[0], raw[1]]) as f64),
            TypedArrayKind::Uint16 => Value::number(u16::from_le_bytes([raw[0], raw[1]]) as f64),
            TypedArrayKind::Int32 => {
                Value::number(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64)
            }
            TypedArrayKind::Uint32 => {
                Value::number(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64)
            }
            TypedArrayKind::Float32 => {
                Value::number(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64)
            }
            TypedArrayKind::Float64 => Value::number(f64::from_le_bytes(raw)),
            TypedArrayKind::BigInt64 => Value::bigint(i64::from_le_bytes(raw)),
            TypedArrayKind::BigUint64 => Value::bigint(u64::from_le_bytes(raw)),
        }
    }
}

/// A value already converted for storage in a typed array
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// For Number kinds
    Number(f64),
    /// For BigInt kinds
    BigInt(BigInt),
}

/// ToUint8Clamp: clamp to `[0, 255]`, ties round to even
fn clamp_u8(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n >= 255.0 {
        return 255;
    }
    let f = n.floor();
    let rounded = if f + 0.5 < n {
        f + 1.0
    } else if n < f + 0.5 {
        f
    } else if f % 2.0 == 0.0 {
        f
    } else {
        f + 1.0
    };
    rounded as u8
}

/// The value modulo `2^64`, as raw bits
fn bigint_low_u64(b: &BigInt) -> u64 {
    let (sign, digits) = b.to_u64_digits();
    let low = digits.first().copied().unwrap_or(0);
    if sign == Sign::Minus {
        low.wrapping_neg()
    } else {
        low
    }
}

/// A JavaScript TypedArray
///
/// TypedArray is a view over a buffer object. It does not copy data; the
/// buffer object itself is shared, so two views over one buffer report the
/// same `buffer`.
#[derive(Debug)]
pub struct JsTypedArray {
    /// The underlying ArrayBuffer or SharedArrayBuffer object
    buffer: Arc<JsObject>,
    /// Byte offset into the buffer
    byte_offset: usize,
    /// Number of elements; `None` tracks the length of a resizable buffer
    length: Option<usize>,
    /// The kind of typed array
    kind: TypedArrayKind,
}

impl JsTypedArray {
    /// Get the kind of this TypedArray
    pub fn kind(&self) -> TypedArrayKind {
        self.kind
    }

    /// Get the underlying buffer object
    pub fn buffer(&self) -> &Arc<JsObject> {
        &self.buffer
    }

    fn storage(&self) -> Option<&dyn ByteStorage> {
        buffer_storage(&self.buffer)
    }

    /// Check if the underlying buffer is detached
    pub fn is_detached(&self) -> bool {
        self.storage().is_none_or(|s| s.is_detached())
    }

    /// IsTypedArrayOutOfBounds (detached counts as out of bounds)
    pub fn is_out_of_bounds(&self) -> bool {
        let Some(storage) = self.storage() else {
            return true;
        };
        if storage.is_detached() {
            return true;
        }
        let buffer_len = storage.byte_length();
        match self.length {
            Some(len) => view_end(self.byte_offset, len, self.kind.element_size())
                .is_none_or(|end| end > buffer_len),
            None => self.byte_offset > buffer_len,
        }
    }

    /// Get the number of elements (0 if out of bounds)
    pub fn length(&self) -> usize {
        if self.is_out_of_bounds() {
            return 0;
        }
        match self.length {
            Some(len) => len,
            None => {
                let buffer_len = self.storage().map_or(0, |s| s.byte_length());
                (buffer_len - self.byte_offset) / self.kind.element_size()
            }
        }
    }

    /// Get the byte length of the view
    pub fn byte_length(&self) -> usize {
        self.length() * self.kind.element_size()
    }

    /// Get the byte offset into the buffer (0 if out of bounds)
    pub fn byte_offset(&self) -> usize {
        if self.is_out_of_bounds() {
            0
        } else {
            self.byte_offset
        }
    }

    /// IsValidIntegerIndex
    pub fn is_valid_integer_index(&self, index: f64) -> bool {
        if index.fract() != 0.0 || (index == 0.0 && index.is_sign_negative()) {
            return false;
        }
        index >= 0.0 && index < self.length() as f64
    }

    /// TypedArrayGetElement; `None` for an invalid index
    pub fn get_element(&self, index: usize) -> Option<Value> {
        if index >= self.length() {
            return None;
        }
        let size = self.kind.element_size();
        let mut bytes = [0u8; 8];
        let storage = self.storage()?;
        if !storage.read_bytes(self.byte_offset + index * size, &mut bytes[..size]) {
            return None;
        }
        Some(self.kind.decode(&bytes[..size]))
    }

    /// Store an already-converted element; out-of-range writes are ignored
    pub fn store_element(&self, index: usize, element: &Element) {
        if index >= self.length() {
            return;
        }
        let mut bytes = [0u8; 8];
        let size = self.kind.encode(element, &mut bytes);
        if let Some(storage) = self.storage() {
            storage.write_bytes(self.byte_offset + index * size, &bytes[..size]);
        }
    }

    /// TypedArraySetElement: convert first, then write if the index is valid
    pub fn set_element(&self, realm: &Realm, index: f64, value: &Value) -> VmResult<()> {
        let element = self.kind.to_element(realm, value)?;
        if self.is_valid_integer_index(index) {
            self.store_element(index as usize, &element);
        }
        Ok(())
    }

    /// Copy `count` elements' bytes starting at element `start`
    fn copy_bytes(&self, start: usize, count: usize) -> Vec<u8> {
        let size = self.kind.element_size();
        let mut bytes = vec![0u8; count * size];
        if let Some(storage) = self.storage() {
            storage.read_bytes(self.byte_offset + start * size, &mut bytes);
        }
        bytes
    }
}

// ---------------------------------------------------------------------------
// Exotic hooks
// ---------------------------------------------------------------------------

/// Hook table for integer-indexed exotic objects
pub static TYPED_ARRAY_HOOKS: ExoticHooks = ExoticHooks {
    get_own_property: Some(ta_get_own_property),
    define_own_property: Some(ta_define_own_property),
    has_property: Some(ta_has_property),
    get: Some(ta_get),
    set: Some(ta_set),
    delete: Some(ta_delete),
    own_property_keys: Some(ta_own_property_keys),
};

/// The numeric index a key denotes, if it is a canonical numeric string
fn numeric_index(key: &PropertyKey) -> Option<f64> {
    match key {
        PropertyKey::Index(i) => Some(*i as f64),
        PropertyKey::String(s) => canonical_numeric_index_string(s.as_str()),
        PropertyKey::Symbol(_) => None,
    }
}

fn view(obj: &JsObject) -> &JsTypedArray {
    match obj.kind() {
        ObjectKind::TypedArray(ta) => ta,
        _ => unreachable!("typed array hooks installed on a non typed array"),
    }
}

fn element_at(ta: &JsTypedArray, index: f64) -> Option<Value> {
    if !ta.is_valid_integer_index(index) {
        return None;
    }
    ta.get_element(index as usize)
}

fn ta_get_own_property(obj: &JsObject, key: &PropertyKey) -> Option<PropertyDescriptor> {
    match numeric_index(key) {
        Some(index) => element_at(view(obj), index).map(PropertyDescriptor::data),
        None => obj.ordinary_get_own_property(key),
    }
}

fn ta_has_property(realm: &Realm, obj: &JsObject, key: &PropertyKey) -> VmResult<bool> {
    match numeric_index(key) {
        Some(index) => Ok(view(obj).is_valid_integer_index(index)),
        None => obj.ordinary_has_property(realm, key),
    }
}

fn ta_define_own_property(
    realm: &Realm,
    obj: &JsObject,
    key: PropertyKey,
    desc: &PartialDescriptor,
) -> VmResult<bool> {
    let Some(index) = numeric_index(&key) else {
        return Ok(obj.ordinary_define_own_property(key, desc));
    };
    let ta = view(obj);
    if !ta.is_valid_integer_index(index)
        || desc.configurable == Some(false)
        || desc.enumerable == Some(false)
        || desc.is_accessor_descriptor()
        || desc.writable == Some(false)
    {
        return Ok(false);
    }
    if let Some(value) = &desc.value {
        ta.set_element(realm, index, value)?;
    }
    Ok(true)
}

fn ta_get(realm: &Realm, obj: &JsObject, key: &PropertyKey, receiver: &Value) -> VmResult<Value> {
    match numeric_index(key) {
        Some(index) => Ok(element_at(view(obj), index).unwrap_or_default()),
        None => obj.ordinary_get(realm, key, receiver),
    }
}

fn ta_set(
    realm: &Realm,
    obj: &JsObject,
    key: PropertyKey,
    value: Value,
    receiver: &Value,
) -> VmResult<bool> {
    if let Some(index) = numeric_index(&key) {
        let ta = view(obj);
        if obj.is_same(receiver) {
            ta.set_element(realm, index, &value)?;
            return Ok(true);
        }
        if !ta.is_valid_integer_index(index) {
            return Ok(true);
        }
    }
    obj.ordinary_set(realm, key, value, receiver)
}

fn ta_delete(obj: &JsObject, key: &PropertyKey) -> bool {
    match numeric_index(key) {
        Some(index) => !view(obj).is_valid_integer_index(index),
        None => obj.ordinary_delete(key),
    }
}

fn ta_own_property_keys(obj: &JsObject) -> Vec<PropertyKey> {
    let len = view(obj).length();
    let mut keys: Vec<PropertyKey> = (0..len as u64).map(PropertyKey::from_u64).collect();
    keys.extend(obj.ordinary_own_property_keys());
    keys
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

fn wrap(realm: &Realm, view: JsTypedArray) -> Arc<JsObject> {
    let proto = realm.intrinsics().typed_array_prototypes[view.kind.index()].clone();
    Arc::new(JsObject::with_kind(Some(proto), ObjectKind::TypedArray(view)))
}

/// End byte of a fixed-length view; `None` when it overflows `usize`
fn view_end(byte_offset: usize, length: usize, element_size: usize) -> Option<usize> {
    length.checked_mul(element_size)?.checked_add(byte_offset)
}

/// Create a view over an existing buffer object.
///
/// The buffer object is reused, never copied. RangeError on a misaligned
/// offset or a view extending past the buffer, TypeError on a detached
/// buffer.
pub fn typed_array_create_from_buffer(
    realm: &Realm,
    kind: TypedArrayKind,
    buffer: &Arc<JsObject>,
    byte_offset: usize,
    length: Option<usize>,
) -> VmResult<Arc<JsObject>> {
    let storage = buffer_storage(buffer)
        .ok_or_else(|| VmError::type_error("argument is not an ArrayBuffer"))?;
    let size = kind.element_size();
    if byte_offset % size != 0 {
        return Err(VmError::range_error(format!(
            "start offset of {} should be a multiple of {}",
            kind.name(),
            size
        )));
    }
    if storage.is_detached() {
        return Err(VmError::type_error("Cannot perform construct on a detached ArrayBuffer"));
    }
    let buffer_len = storage.byte_length();
    let length = match length {
        Some(len) => {
            if view_end(byte_offset, len, size).is_none_or(|end| end > buffer_len) {
                return Err(VmError::range_error(format!("Invalid typed array length: {}", len)));
            }
            Some(len)
        }
        None if storage.is_resizable() => {
            if byte_offset > buffer_len {
                return Err(VmError::range_error("Start offset is outside the bounds of the buffer"));
            }
            None
        }
        None => {
            if buffer_len % size != 0 {
                return Err(VmError::range_error(format!(
                    "byte length of {} should be a multiple of {}",
                    kind.name(),
                    size
                )));
            }
            if byte_offset > buffer_len {
                return Err(VmError::range_error("Start offset is outside the bounds of the buffer"));
            }
            Some((buffer_len - byte_offset) / size)
        }
    };
    Ok(wrap(
        realm,
        JsTypedArray {
            buffer: buffer.clone(),
            byte_offset,
            length,
            kind,
        },
    ))
}

/// Create a zero-filled typed array with its own buffer
pub fn typed_array_create_with_length(
    realm: &Realm,
    kind: TypedArrayKind,
    length: usize,
) -> VmResult<Arc<JsObject>> {
    let byte_length = length
        .checked_mul(kind.element_size())
        .ok_or_else(|| VmError::range_error(format!("Invalid typed array length: {}", length)))?;
    let buffer = allocate_array_buffer(realm, byte_length)?;
    typed_array_create_from_buffer(realm, kind, &buffer, 0, Some(length))
}

/// Create a typed array holding `values`, converting each in order
pub fn typed_array_create_from_list(
    realm: &Realm,
    kind: TypedArrayKind,
    values: &[Value],
) -> VmResult<Arc<JsObject>> {
    let obj = typed_array_create_with_length(realm, kind, values.len())?;
    let ta = view(&obj);
    for (i, value) in values.iter().enumerate() {
        ta.set_element(realm, i as f64, value)?;
    }
    Ok(obj)
}

/// ValidateTypedArray: the typed array slots of `value`, TypeError if
/// `value` is not a typed array or is out of bounds
pub fn validate_typed_array<'a>(value: &'a Value, method: &str) -> VmResult<&'a JsTypedArray> {
    let ta = value
        .as_object()
        .and_then(|o| o.as_typed_array())
        .ok_or_else(|| VmError::type_error(format!("{}: receiver is not a typed array", method)))?;
    if ta.is_out_of_bounds() {
        return Err(VmError::type_error(format!(
            "{}: typed array is detached or out of bounds",
            method
        )));
    }
    Ok(ta)
}

/// %TypedArray%.prototype.slice
///
/// The result always gets a new buffer; only element data is copied, never
/// ordinary properties of the source.
pub fn typed_array_slice(
    realm: &Realm,
    source: &Value,
    start: &Value,
    end: &Value,
) -> VmResult<Arc<JsObject>> {
    let ta = validate_typed_array(source, "slice")?;
    let len = ta.length() as u64;
    let start = relative_index(realm, start, len, 0)?;
    let end = relative_index(realm, end, len, len)?;
    let count = end.saturating_sub(start) as usize;

    let result = typed_array_create_with_length(realm, ta.kind, count)?;
    if count > 0 {
        // Start/end conversion may have shrunk or detached the source.
        if ta.is_out_of_bounds() {
            return Err(VmError::type_error("slice: typed array is detached or out of bounds"));
        }
        let available = ta.length().saturating_sub(start as usize).min(count);
        let bytes = ta.copy_bytes(start as usize, available);
        if let Some(storage) = buffer_storage(view(&result).buffer()) {
            storage.write_bytes(0, &bytes);
        }
    }
    Ok(result)
}

/// %TypedArray%.prototype.subarray: a new view sharing the source buffer
pub fn typed_array_subarray(
    realm: &Realm,
    source: &Value,
    begin: &Value,
    end: &Value,
) -> VmResult<Arc<JsObject>> {
    let ta = source
        .as_object()
        .and_then(|o| o.as_typed_array())
        .ok_or_else(|| VmError::type_error("subarray: receiver is not a typed array"))?;
    let len = ta.length() as u64;
    let begin = relative_index(realm, begin, len, 0)?;
    let end = relative_index(realm, end, len, len)?;
    let count = end.saturating_sub(begin) as usize;
    let offset = ta.byte_offset + begin as usize * ta.kind.element_size();
    typed_array_create_from_buffer(realm, ta.kind, &ta.buffer, offset, Some(count))
}

/// %TypedArray%.prototype.fill
pub fn typed_array_fill(
    realm: &Realm,
    target: &Value,
    value: &Value,
    start: &Value,
    end: &Value,
) -> VmResult<()> {
    let ta = validate_typed_array(target, "fill")?;
    let element = ta.kind.to_element(realm, value)?;
    let len = ta.length() as u64;
    let start = relative_index(realm, start, len, 0)?;
    let end = relative_index(realm, end, len, len)?;
    if ta.is_out_of_bounds() {
        return Err(VmError::type_error("fill: typed array is detached or out of bounds"));
    }
    let end = end.min(ta.length() as u64);
    for index in start..end {
        ta.store_element(index as usize, &element);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modular_integer_conversions() {
        let realm = Realm::new();
        let i8s = typed_array_create_from_list(
            &realm,
            TypedArrayKind::Int8,
            &[Value::number(128.0), Value::number(-129.0), Value::number(300.7)],
        )
        .unwrap();
        let ta = i8s.as_typed_array().unwrap();
        assert_eq!(ta.get_element(0), Some(Value::number(-128.0)));
        assert_eq!(ta.get_element(1), Some(Value::number(127.0)));
        assert_eq!(ta.get_element(2), Some(Value::number(44.0)));

        let u32s = typed_array_create_from_list(&realm, TypedArrayKind::Uint32, &[Value::number(-1.0)])
            .unwrap();
        assert_eq!(
            u32s.as_typed_array().unwrap().get_element(0),
            Some(Value::number(4294967295.0))
        );
    }

    #[test]
    fn test_uint8_clamped_rounds_half_to_even() {
        assert_eq!(clamp_u8(0.5), 0);
        assert_eq!(clamp_u8(1.5), 2);
        assert_eq!(clamp_u8(2.5), 2);
        assert_eq!(clamp_u8(2.6), 3);
        assert_eq!(clamp_u8(-3.0), 0);
        assert_eq!(clamp_u8(300.0), 255);
        assert_eq!(clamp_u8(f64::NAN), 0);
    }

    #[test]
    fn test_bigint_wraps_to_64_bits() {
        assert_eq!(bigint_low_u64(&BigInt::from(-1)), u64::MAX);
        assert_eq!(bigint_low_u64(&(BigInt::from(1) << 64u32)), 0);
        assert_eq!(bigint_low_u64(&((BigInt::from(1) << 64u32) + 5)), 5);
    }

    #[test]
    fn test_bigint_kind_rejects_numbers() {
        let realm = Realm::new();
        let obj = typed_array_create_with_length(&realm, TypedArrayKind::BigInt64, 2).unwrap();
        let err = obj.set(&realm, PropertyKey::Index(0), Value::number(1.0)).unwrap_err();
        assert!(matches!(err, VmError::TypeError(_)));

        assert!(obj.set(&realm, PropertyKey::Index(0), Value::bigint(-2)).unwrap());
        assert_eq!(obj.get(&realm, &PropertyKey::Index(0)).unwrap(), Value::bigint(-2));
    }

    #[test]
    fn test_number_kind_rejects_bigint() {
        let realm = Realm::new();
        let obj = typed_array_create_with_length(&realm, TypedArrayKind::Float64, 1).unwrap();
        let err = obj.set(&realm, PropertyKey::Index(0), Value::bigint(1)).unwrap_err();
        assert!(matches!(err, VmError::TypeError(_)));
    }

    #[test]
    fn test_out_of_range_write_is_silent() {
        let realm = Realm::new();
        let obj = typed_array_create_with_length(&realm, TypedArrayKind::Uint8, 2).unwrap();
        assert!(obj.set(&realm, PropertyKey::Index(5), Value::int32(1)).unwrap());
        assert!(obj.set(&realm, PropertyKey::string("-0"), Value::int32(1)).unwrap());
        assert!(obj.set(&realm, PropertyKey::string("1.5"), Value::int32(1)).unwrap());
        assert_eq!(obj.own_property_keys(), vec![PropertyKey::Index(0), PropertyKey::Index(1)]);
        assert_eq!(obj.get(&realm, &PropertyKey::Index(5)).unwrap(), Value::undefined());
    }

    #[test]
    fn test_non_numeric_keys_are_ordinary() {
        let realm = Realm::new();
        let obj = typed_array_create_with_length(&realm, TypedArrayKind::Uint8, 1).unwrap();
        assert!(obj.set(&realm, PropertyKey::string("foo"), Value::int32(42)).unwrap());
        assert_eq!(
            obj.own_property_keys(),
            vec![PropertyKey::Index(0), PropertyKey::string("foo")]
        );
    }

    #[test]
    fn test_define_rejects_non_default_attributes() {
        let realm = Realm::new();
        let obj = typed_array_create_with_length(&realm, TypedArrayKind::Int16, 1).unwrap();
        let frozen = PartialDescriptor::new().value(Value::int32(1)).configurable(false);
        assert!(!obj.define_own_property(&realm, PropertyKey::Index(0), &frozen).unwrap());
        let plain = PartialDescriptor::data(Value::int32(7));
        assert!(obj.define_own_property(&realm, PropertyKey::Index(0), &plain).unwrap());
        assert_eq!(
            obj.get_own_property(&PropertyKey::Index(0)),
            Some(PropertyDescriptor::data(Value::int32(7)))
        );
        assert!(!obj.delete(&PropertyKey::Index(0)));
        assert!(obj.delete(&PropertyKey::Index(3)));
    }

    #[test]
    fn test_misaligned_offset_is_range_error() {
        let realm = Realm::new();
        let buffer = allocate_array_buffer(&realm, 8).unwrap();
        let err = typed_array_create_from_buffer(&realm, TypedArrayKind::Int32, &buffer, 2, None)
            .unwrap_err();
        assert!(matches!(err, VmError::RangeError(_)));
        let err = typed_array_create_from_buffer(&realm, TypedArrayKind::Int32, &buffer, 4, Some(2))
            .unwrap_err();
        assert!(matches!(err, VmError::RangeError(_)));
    }

    #[test]
    fn test_overflowing_view_length_is_range_error() {
        let realm = Realm::new();
        let buffer = allocate_array_buffer(&realm, 8).unwrap();
        for (offset, length) in [(0, usize::MAX), (8, usize::MAX / 4), (usize::MAX - 3, 1)] {
            let err = typed_array_create_from_buffer(&realm, TypedArrayKind::Int32, &buffer, offset, Some(length))
                .unwrap_err();
            assert!(matches!(err, VmError::RangeError(_)), "offset {} length {}", offset, length);
        }
    }

    #[test]
    fn test_detached_view_is_empty() {
        let realm = Realm::new();
        let obj = typed_array_create_with_length(&realm, TypedArrayKind::Uint8, 4).unwrap();
        let ta = obj.as_typed_array().unwrap();
        ta.buffer().as_array_buffer().unwrap().detach();
        assert_eq!(ta.length(), 0);
        assert_eq!(ta.byte_offset(), 0);
        assert_eq!(obj.get(&realm, &PropertyKey::Index(0)).unwrap(), Value::undefined());
        assert!(obj.set(&realm, PropertyKey::Index(0), Value::int32(1)).unwrap());
    }

    #[test]
    fn test_length_tracking_view_follows_resize() {
        let realm = Realm::new();
        let buffer = crate::array_buffer::allocate_resizable_array_buffer(&realm, 4, 16).unwrap();
        let obj = typed_array_create_from_buffer(&realm, TypedArrayKind::Uint16, &buffer, 0, None)
            .unwrap();
        assert_eq!(obj.as_typed_array().unwrap().length(), 2);
        buffer.as_array_buffer().unwrap().resize(10).unwrap();
        assert_eq!(obj.as_typed_array().unwrap().length(), 5);
    }
}
