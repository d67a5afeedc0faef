//! Property keys, descriptors and the ordered per-object descriptor store

use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

use crate::string::JsString;
use crate::symbol::Symbol;
use crate::value::{Value, same_value};

/// Largest valid array index (`2^32 - 2`)
pub const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

/// Property key (string or symbol)
///
/// Strings that are canonical array indices are always stored as `Index`, so
/// `"3"` and `3` name the same property.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String property key
    String(JsString),
    /// Canonical array index (`"0"` ..= `"4294967294"`)
    Index(u32),
    /// Symbol property key
    Symbol(Symbol),
}

impl PropertyKey {
    /// Create a string property key, canonicalising array indices
    pub fn string(s: &str) -> Self {
        match parse_array_index(s) {
            Some(i) => Self::Index(i),
            None => Self::String(JsString::intern(s)),
        }
    }

    /// Create from an existing JS string, canonicalising array indices
    pub fn from_js_string(s: JsString) -> Self {
        match parse_array_index(s.as_str()) {
            Some(i) => Self::Index(i),
            None => Self::String(s),
        }
    }

    /// Create an index property key
    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }

    /// Create a key from a non-negative integer, falling back to its string
    /// form above the array index range
    pub fn from_u64(i: u64) -> Self {
        if i <= MAX_ARRAY_INDEX as u64 {
            Self::Index(i as u32)
        } else {
            Self::String(JsString::new(i.to_string()))
        }
    }

    /// Check for a symbol key
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    /// Array index, if any
    pub fn as_index(&self) -> Option<u32> {
        match self {
            Self::Index(i) => Some(*i),
            _ => None,
        }
    }

    /// Check for the string key `name`
    pub fn is_string(&self, name: &str) -> bool {
        matches!(self, Self::String(s) if s.as_str() == name)
    }

    /// The string form of a string-valued key
    pub fn to_js_string(&self) -> Option<JsString> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Index(i) => Some(JsString::new(i.to_string())),
            Self::Symbol(_) => None,
        }
    }

    /// The key as a JS value (string or symbol)
    pub fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Index(i) => Value::String(JsString::new(i.to_string())),
            Self::Symbol(s) => Value::Symbol(s.clone()),
        }
    }
}

impl std::fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Index(i) => write!(f, "{}", i),
            Self::Symbol(s) => write!(f, "{}", s.descriptive_string()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(s: Symbol) -> Self {
        Self::Symbol(s)
    }
}

/// Parse a canonical array index string
fn parse_array_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    let n: u64 = s.parse().ok()?;
    (n <= MAX_ARRAY_INDEX as u64).then_some(n as u32)
}

/// Property attributes used when creating properties
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyAttributes {
    /// Property is writable (data properties only)
    pub writable: bool,
    /// Property is enumerable
    pub enumerable: bool,
    /// Property is configurable
    pub configurable: bool,
}

impl PropertyAttributes {
    /// Default data property attributes
    pub const fn data() -> Self {
        Self {
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Attributes of built-in methods: writable, configurable, not enumerable
    pub const fn builtin() -> Self {
        Self {
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable
    pub const fn frozen() -> Self {
        Self {
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }
}

/// The value or accessor pair held by a property
#[derive(Clone, Debug, PartialEq)]
pub enum PropertySlot {
    /// Data property
    Data {
        /// The value
        value: Value,
        /// Whether `[[Set]]` may change the value
        writable: bool,
    },
    /// Accessor property; `None` means the function is `undefined`
    Accessor {
        /// Getter function
        get: Option<Value>,
        /// Setter function
        set: Option<Value>,
    },
}

/// A complete property descriptor as stored on an object
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDescriptor {
    /// Data or accessor part
    pub slot: PropertySlot,
    /// Shows up in enumeration
    pub enumerable: bool,
    /// May be deleted or changed in kind and attributes
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// Create a data property (writable, enumerable, configurable)
    pub fn data(value: Value) -> Self {
        Self::data_with_attrs(value, PropertyAttributes::data())
    }

    /// Create a data property with specific attributes
    pub fn data_with_attrs(value: Value, attributes: PropertyAttributes) -> Self {
        Self {
            slot: PropertySlot::Data {
                value,
                writable: attributes.writable,
            },
            enumerable: attributes.enumerable,
            configurable: attributes.configurable,
        }
    }

    /// Create an accessor property
    pub fn accessor(get: Option<Value>, set: Option<Value>, enumerable: bool, configurable: bool) -> Self {
        Self {
            slot: PropertySlot::Accessor { get, set },
            enumerable,
            configurable,
        }
    }

    /// Get the value (for data properties)
    pub fn value(&self) -> Option<&Value> {
        match &self.slot {
            PropertySlot::Data { value, .. } => Some(value),
            PropertySlot::Accessor { .. } => None,
        }
    }

    /// Check if writable
    pub fn is_writable(&self) -> bool {
        matches!(self.slot, PropertySlot::Data { writable: true, .. })
    }

    /// Check for a data property
    pub fn is_data(&self) -> bool {
        matches!(self.slot, PropertySlot::Data { .. })
    }

    /// Check for an accessor property
    pub fn is_accessor(&self) -> bool {
        matches!(self.slot, PropertySlot::Accessor { .. })
    }

    /// Getter function, if any
    pub fn getter(&self) -> Option<&Value> {
        match &self.slot {
            PropertySlot::Accessor { get, .. } => get.as_ref(),
            PropertySlot::Data { .. } => None,
        }
    }

    /// Setter function, if any
    pub fn setter(&self) -> Option<&Value> {
        match &self.slot {
            PropertySlot::Accessor { set, .. } => set.as_ref(),
            PropertySlot::Data { .. } => None,
        }
    }
}

/// A property descriptor whose fields may each be absent.
///
/// This is the input of `[[DefineOwnProperty]]`. For `get`/`set`,
/// `Some(Value::Undefined)` means "present and undefined".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartialDescriptor {
    /// `[[Value]]`
    pub value: Option<Value>,
    /// `[[Writable]]`
    pub writable: Option<bool>,
    /// `[[Get]]`
    pub get: Option<Value>,
    /// `[[Set]]`
    pub set: Option<Value>,
    /// `[[Enumerable]]`
    pub enumerable: Option<bool>,
    /// `[[Configurable]]`
    pub configurable: Option<bool>,
}

impl PartialDescriptor {
    /// Descriptor with no fields
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `[[Value]]`
    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Set `[[Writable]]`
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = Some(writable);
        self
    }

    /// Set `[[Get]]`
    pub fn getter(mut self, get: Value) -> Self {
        self.get = Some(get);
        self
    }

    /// Set `[[Set]]`
    pub fn setter(mut self, set: Value) -> Self {
        self.set = Some(set);
        self
    }

    /// Set `[[Enumerable]]`
    pub fn enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = Some(enumerable);
        self
    }

    /// Set `[[Configurable]]`
    pub fn configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }

    /// Fully populated data descriptor (what `CreateDataProperty` uses)
    pub fn data(value: Value) -> Self {
        Self::new()
            .value(value)
            .writable(true)
            .enumerable(true)
            .configurable(true)
    }

    /// IsAccessorDescriptor
    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// IsDataDescriptor
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// IsGenericDescriptor
    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_accessor_descriptor() && !self.is_data_descriptor()
    }

    /// Whether any field is present
    pub fn has_fields(&self) -> bool {
        self.value.is_some()
            || self.writable.is_some()
            || self.get.is_some()
            || self.set.is_some()
            || self.enumerable.is_some()
            || self.configurable.is_some()
    }

    /// CompletePropertyDescriptor: fill absent fields with defaults
    pub fn to_complete(&self) -> PropertyDescriptor {
        let slot = if self.is_accessor_descriptor() {
            PropertySlot::Accessor {
                get: self.get.as_ref().and_then(defined),
                set: self.set.as_ref().and_then(defined),
            }
        } else {
            PropertySlot::Data {
                value: self.value.clone().unwrap_or_default(),
                writable: self.writable.unwrap_or(false),
            }
        };
        PropertyDescriptor {
            slot,
            enumerable: self.enumerable.unwrap_or(false),
            configurable: self.configurable.unwrap_or(false),
        }
    }
}

impl From<PropertyDescriptor> for PartialDescriptor {
    fn from(desc: PropertyDescriptor) -> Self {
        let base = Self::new()
            .enumerable(desc.enumerable)
            .configurable(desc.configurable);
        match desc.slot {
            PropertySlot::Data { value, writable } => base.value(value).writable(writable),
            PropertySlot::Accessor { get, set } => base
                .getter(get.unwrap_or_default())
                .setter(set.unwrap_or_default()),
        }
    }
}

fn defined(value: &Value) -> Option<Value> {
    (!value.is_undefined()).then(|| value.clone())
}

fn same_accessor(requested: &Value, current: &Option<Value>) -> bool {
    match current {
        Some(current) => same_value(requested, current),
        None => requested.is_undefined(),
    }
}

/// Outcome of reconciling a requested descriptor with the current one
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// The transition is not allowed; nothing may change
    Reject,
    /// The request has no fields; nothing changes
    Unchanged,
    /// Store this descriptor
    Write(PropertyDescriptor),
}

/// ValidateAndApplyPropertyDescriptor, split into a pure validation that
/// yields the descriptor to store.
pub fn reconcile_descriptor(
    current: Option<&PropertyDescriptor>,
    extensible: bool,
    desc: &PartialDescriptor,
) -> Reconciled {
    let Some(current) = current else {
        if !extensible {
            return Reconciled::Reject;
        }
        return Reconciled::Write(desc.to_complete());
    };

    if !desc.has_fields() {
        return Reconciled::Unchanged;
    }

    if !current.configurable {
        if desc.configurable == Some(true) {
            return Reconciled::Reject;
        }
        if let Some(enumerable) = desc.enumerable
            && enumerable != current.enumerable
        {
            return Reconciled::Reject;
        }
        if !desc.is_generic_descriptor() && desc.is_accessor_descriptor() != current.is_accessor() {
            return Reconciled::Reject;
        }
        match &current.slot {
            PropertySlot::Accessor { get, set } => {
                if let Some(requested) = &desc.get
                    && !same_accessor(requested, get)
                {
                    return Reconciled::Reject;
                }
                if let Some(requested) = &desc.set
                    && !same_accessor(requested, set)
                {
                    return Reconciled::Reject;
                }
            }
            PropertySlot::Data {
                value,
                writable: false,
            } => {
                if desc.writable == Some(true) {
                    return Reconciled::Reject;
                }
                if let Some(requested) = &desc.value
                    && !same_value(requested, value)
                {
                    return Reconciled::Reject;
                }
            }
            PropertySlot::Data { .. } => {}
        }
    }

    let slot = if desc.is_accessor_descriptor() {
        match &current.slot {
            PropertySlot::Accessor { get, set } => PropertySlot::Accessor {
                get: match &desc.get {
                    Some(g) => defined(g),
                    None => get.clone(),
                },
                set: match &desc.set {
                    Some(s) => defined(s),
                    None => set.clone(),
                },
            },
            PropertySlot::Data { .. } => PropertySlot::Accessor {
                get: desc.get.as_ref().and_then(defined),
                set: desc.set.as_ref().and_then(defined),
            },
        }
    } else if desc.is_data_descriptor() {
        match &current.slot {
            PropertySlot::Data { value, writable } => PropertySlot::Data {
                value: desc.value.clone().unwrap_or_else(|| value.clone()),
                writable: desc.writable.unwrap_or(*writable),
            },
            PropertySlot::Accessor { .. } => PropertySlot::Data {
                value: desc.value.clone().unwrap_or_default(),
                writable: desc.writable.unwrap_or(false),
            },
        }
    } else {
        current.slot.clone()
    };

    Reconciled::Write(PropertyDescriptor {
        slot,
        enumerable: desc.enumerable.unwrap_or(current.enumerable),
        configurable: desc.configurable.unwrap_or(current.configurable),
    })
}

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Ordered key → descriptor storage.
///
/// Insertion order is kept for string and symbol keys; `ordered_keys`
/// applies the enumeration order (indices ascending, then strings, then
/// symbols).
#[derive(Clone, Debug, Default)]
pub struct PropertyMap {
    entries: FxIndexMap<PropertyKey, PropertyDescriptor>,
}

impl PropertyMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a descriptor
    pub fn get(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        self.entries.get(key)
    }

    /// Look up a descriptor mutably
    pub fn get_mut(&mut self, key: &PropertyKey) -> Option<&mut PropertyDescriptor> {
        self.entries.get_mut(key)
    }

    /// Insert or replace; a replaced key keeps its creation position
    pub fn insert(&mut self, key: PropertyKey, desc: PropertyDescriptor) {
        self.entries.insert(key, desc);
    }

    /// Remove a key, preserving the order of the others
    pub fn remove(&mut self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.entries.shift_remove(key)
    }

    /// Check for a key
    pub fn contains_key(&self, key: &PropertyKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in raw insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &PropertyDescriptor)> {
        self.entries.iter()
    }

    /// Keys in enumeration order
    pub fn ordered_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<u32> = Vec::new();
        let mut strings = Vec::new();
        let mut symbols = Vec::new();
        for key in self.entries.keys() {
            match key {
                PropertyKey::Index(i) => indices.push(*i),
                PropertyKey::String(_) => strings.push(key.clone()),
                PropertyKey::Symbol(_) => symbols.push(key.clone()),
            }
        }
        indices.sort_unstable();
        let mut keys = Vec::with_capacity(self.entries.len());
        keys.extend(indices.into_iter().map(PropertyKey::Index));
        keys.extend(strings);
        keys.extend(symbols);
        keys
    }

    /// Index keys `>= start`, highest first
    pub fn index_keys_descending_from(&self, start: u32) -> Vec<u32> {
        let mut indices: Vec<u32> = self
            .entries
            .keys()
            .filter_map(PropertyKey::as_index)
            .filter(|i| *i >= start)
            .collect();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frozen_data(value: Value) -> PropertyDescriptor {
        PropertyDescriptor::data_with_attrs(value, PropertyAttributes::frozen())
    }

    #[test]
    fn test_index_canonicalisation() {
        assert_eq!(PropertyKey::string("7"), PropertyKey::Index(7));
        assert_eq!(PropertyKey::string("4294967294"), PropertyKey::Index(MAX_ARRAY_INDEX));
        assert!(matches!(PropertyKey::string("4294967295"), PropertyKey::String(_)));
        assert!(matches!(PropertyKey::string("07"), PropertyKey::String(_)));
        assert!(matches!(PropertyKey::string("-0"), PropertyKey::String(_)));
        assert!(matches!(PropertyKey::string(""), PropertyKey::String(_)));
    }

    #[test]
    fn test_create_defaults_absent_fields() {
        let desc = PartialDescriptor::new().value(Value::int32(1));
        let Reconciled::Write(stored) = reconcile_descriptor(None, true, &desc) else {
            panic!("expected write");
        };
        assert_eq!(stored, frozen_data(Value::int32(1)));
    }

    #[test]
    fn test_create_on_non_extensible_rejected() {
        let desc = PartialDescriptor::data(Value::int32(1));
        assert_eq!(reconcile_descriptor(None, false, &desc), Reconciled::Reject);
    }

    #[test]
    fn test_empty_request_is_unchanged() {
        let current = frozen_data(Value::int32(1));
        assert_eq!(
            reconcile_descriptor(Some(&current), true, &PartialDescriptor::new()),
            Reconciled::Unchanged
        );
    }

    #[test]
    fn test_frozen_value_change_rejected() {
        let current = frozen_data(Value::int32(12));
        let desc = PartialDescriptor::new().value(Value::int32(36));
        assert_eq!(reconcile_descriptor(Some(&current), true, &desc), Reconciled::Reject);
    }

    #[test]
    fn test_identical_redefinition_allowed_when_frozen() {
        let current = frozen_data(Value::int32(12));
        let desc: PartialDescriptor = current.clone().into();
        assert_eq!(
            reconcile_descriptor(Some(&current), true, &desc),
            Reconciled::Write(current.clone())
        );
    }

    #[test]
    fn test_non_configurable_cannot_become_configurable() {
        let current = frozen_data(Value::int32(1));
        let desc = PartialDescriptor::new().configurable(true);
        assert_eq!(reconcile_descriptor(Some(&current), true, &desc), Reconciled::Reject);
    }

    #[test]
    fn test_non_configurable_kind_conversion_rejected() {
        let current = frozen_data(Value::int32(1));
        let desc = PartialDescriptor::new().getter(Value::undefined());
        assert_eq!(reconcile_descriptor(Some(&current), true, &desc), Reconciled::Reject);
    }

    #[test]
    fn test_configurable_kind_conversion_resets_fields() {
        let current = PropertyDescriptor::data(Value::int32(1));
        let desc = PartialDescriptor::new().getter(Value::undefined());
        let Reconciled::Write(stored) = reconcile_descriptor(Some(&current), true, &desc) else {
            panic!("expected write");
        };
        assert_eq!(stored, PropertyDescriptor::accessor(None, None, true, true));
    }

    #[test]
    fn test_merge_keeps_omitted_fields() {
        let current = PropertyDescriptor::data(Value::int32(1));
        let desc = PartialDescriptor::new().writable(false);
        let Reconciled::Write(stored) = reconcile_descriptor(Some(&current), true, &desc) else {
            panic!("expected write");
        };
        assert_eq!(stored.value(), Some(&Value::int32(1)));
        assert!(!stored.is_writable());
        assert!(stored.enumerable);
        assert!(stored.configurable);
    }

    #[test]
    fn test_non_configurable_writable_may_become_read_only() {
        let current = PropertyDescriptor::data_with_attrs(
            Value::int32(1),
            PropertyAttributes {
                writable: true,
                enumerable: false,
                configurable: false,
            },
        );
        let desc = PartialDescriptor::new().value(Value::int32(2)).writable(false);
        assert!(matches!(
            reconcile_descriptor(Some(&current), true, &desc),
            Reconciled::Write(_)
        ));
    }

    #[test]
    fn test_ordered_keys() {
        let mut map = PropertyMap::new();
        let sym = Symbol::new(Some("s"));
        map.insert(PropertyKey::string("b"), PropertyDescriptor::data(Value::undefined()));
        map.insert(PropertyKey::Symbol(sym.clone()), PropertyDescriptor::data(Value::undefined()));
        map.insert(PropertyKey::string("10"), PropertyDescriptor::data(Value::undefined()));
        map.insert(PropertyKey::string("a"), PropertyDescriptor::data(Value::undefined()));
        map.insert(PropertyKey::string("2"), PropertyDescriptor::data(Value::undefined()));

        assert_eq!(
            map.ordered_keys(),
            vec![
                PropertyKey::Index(2),
                PropertyKey::Index(10),
                PropertyKey::string("b"),
                PropertyKey::string("a"),
                PropertyKey::Symbol(sym),
            ]
        );
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut map = PropertyMap::new();
        for name in ["x", "y", "z"] {
            map.insert(PropertyKey::string(name), PropertyDescriptor::data(Value::undefined()));
        }
        map.remove(&PropertyKey::string("y"));
        assert_eq!(
            map.ordered_keys(),
            vec![PropertyKey::string("x"), PropertyKey::string("z")]
        );
    }
}
