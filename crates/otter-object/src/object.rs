//! JavaScript objects
//!
//! An object is an ordered descriptor map, a prototype link, an extensible
//! flag and a class tag. The tag selects a table of exotic hooks; any hook
//! left empty falls back to the ordinary algorithm.
//!
//! Locks are never held across a call into user code: descriptors are cloned
//! out of the map before getters and setters run.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::array::ARRAY_HOOKS;
use crate::array_buffer::JsArrayBuffer;
use crate::async_generator::JsAsyncGenerator;
use crate::error::{ErrorKind, VmResult};
use crate::generator::JsGenerator;
use crate::iterator::{ArrayIteratorState, IteratorRecord};
use crate::operations;
use crate::promise::JsPromise;
use crate::property::{
    PartialDescriptor, PropertyDescriptor, PropertyKey, PropertyMap, PropertySlot, Reconciled,
    reconcile_descriptor,
};
use crate::realm::Realm;
use crate::shared_buffer::SharedArrayBuffer;
use crate::string::JsString;
use crate::typed_array::{JsTypedArray, TYPED_ARRAY_HOOKS};
use crate::value::Value;

/// Signature of a native function: `(realm, this, arguments)`
pub type NativeFn = Arc<dyn Fn(&Realm, &Value, &[Value]) -> VmResult<Value> + Send + Sync>;

/// A callable implemented in Rust
#[derive(Clone)]
pub struct NativeFunction {
    /// Function name (used for `name` and error messages)
    pub name: JsString,
    /// Implementation
    pub func: NativeFn,
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// Class tag of an object, selecting its internal slots and exotic hooks
#[derive(Debug)]
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Array exotic object
    Array,
    /// Native function
    Function(NativeFunction),
    /// Error instance (`[[ErrorData]]`)
    Error(ErrorKind),
    /// Wrapper around a primitive (`Object("abc")`, boxed `this`)
    Primitive(Value),
    /// ArrayBuffer
    ArrayBuffer(JsArrayBuffer),
    /// SharedArrayBuffer
    SharedArrayBuffer(SharedArrayBuffer),
    /// Integer-indexed exotic object
    TypedArray(JsTypedArray),
    /// `%ArrayIteratorPrototype%` instance
    ArrayIterator(Mutex<ArrayIteratorState>),
    /// `%AsyncFromSyncIteratorPrototype%` instance
    AsyncFromSyncIterator(Mutex<IteratorRecord>),
    /// Generator instance
    Generator(Arc<JsGenerator>),
    /// Async generator instance
    AsyncGenerator(Arc<JsAsyncGenerator>),
    /// Promise instance
    Promise(Arc<JsPromise>),
}

impl ObjectKind {
    /// Exotic hook table for this kind
    pub fn hooks(&self) -> &'static ExoticHooks {
        match self {
            ObjectKind::Array => &ARRAY_HOOKS,
            ObjectKind::TypedArray(_) => &TYPED_ARRAY_HOOKS,
            _ => &ExoticHooks::ORDINARY,
        }
    }
}

/// `[[GetOwnProperty]]` override
pub type GetOwnPropertyHook = fn(&JsObject, &PropertyKey) -> Option<PropertyDescriptor>;
/// `[[DefineOwnProperty]]` override
pub type DefineOwnPropertyHook =
    fn(&Realm, &JsObject, PropertyKey, &PartialDescriptor) -> VmResult<bool>;
/// `[[HasProperty]]` override
pub type HasPropertyHook = fn(&Realm, &JsObject, &PropertyKey) -> VmResult<bool>;
/// `[[Get]]` override
pub type GetHook = fn(&Realm, &JsObject, &PropertyKey, &Value) -> VmResult<Value>;
/// `[[Set]]` override
pub type SetHook = fn(&Realm, &JsObject, PropertyKey, Value, &Value) -> VmResult<bool>;
/// `[[Delete]]` override
pub type DeleteHook = fn(&JsObject, &PropertyKey) -> bool;
/// `[[OwnPropertyKeys]]` override
pub type OwnPropertyKeysHook = fn(&JsObject) -> Vec<PropertyKey>;

/// Exotic internal-method overrides. `None` selects the ordinary algorithm.
#[derive(Debug)]
pub struct ExoticHooks {
    /// `[[GetOwnProperty]]`
    pub get_own_property: Option<GetOwnPropertyHook>,
    /// `[[DefineOwnProperty]]`
    pub define_own_property: Option<DefineOwnPropertyHook>,
    /// `[[HasProperty]]`
    pub has_property: Option<HasPropertyHook>,
    /// `[[Get]]`
    pub get: Option<GetHook>,
    /// `[[Set]]`
    pub set: Option<SetHook>,
    /// `[[Delete]]`
    pub delete: Option<DeleteHook>,
    /// `[[OwnPropertyKeys]]`
    pub own_property_keys: Option<OwnPropertyKeysHook>,
}

impl ExoticHooks {
    /// No overrides
    pub const ORDINARY: ExoticHooks = ExoticHooks {
        get_own_property: None,
        define_own_property: None,
        has_property: None,
        get: None,
        set: None,
        delete: None,
        own_property_keys: None,
    };
}

/// A JavaScript object
///
/// Thread-safe with interior mutability.
pub struct JsObject {
    /// Properties storage
    properties: RwLock<PropertyMap>,
    /// Prototype (`None` is `null`)
    prototype: RwLock<Option<Arc<JsObject>>>,
    /// `[[Extensible]]`
    extensible: AtomicBool,
    /// Class tag
    kind: ObjectKind,
}

impl JsObject {
    /// Create a new ordinary object
    pub fn new(prototype: Option<Arc<JsObject>>) -> Self {
        Self::with_kind(prototype, ObjectKind::Ordinary)
    }

    /// Create an object of the given kind
    pub fn with_kind(prototype: Option<Arc<JsObject>>, kind: ObjectKind) -> Self {
        Self {
            properties: RwLock::new(PropertyMap::new()),
            prototype: RwLock::new(prototype),
            extensible: AtomicBool::new(true),
            kind,
        }
    }

    /// Class tag
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Check if this object is the one referenced by `value`
    pub fn is_same(&self, value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|o| std::ptr::eq(Arc::as_ptr(o), self))
    }

    /// Check if object is an Array exotic object
    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array)
    }

    /// Check whether the object has a `[[Call]]` internal method
    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    /// Native function slot
    pub fn as_function(&self) -> Option<&NativeFunction> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Error class, for error instances
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.kind {
            ObjectKind::Error(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Typed array slots
    pub fn as_typed_array(&self) -> Option<&JsTypedArray> {
        match &self.kind {
            ObjectKind::TypedArray(ta) => Some(ta),
            _ => None,
        }
    }

    /// ArrayBuffer slots
    pub fn as_array_buffer(&self) -> Option<&JsArrayBuffer> {
        match &self.kind {
            ObjectKind::ArrayBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    /// SharedArrayBuffer slots
    pub fn as_shared_array_buffer(&self) -> Option<&SharedArrayBuffer> {
        match &self.kind {
            ObjectKind::SharedArrayBuffer(buf) => Some(buf),
            _ => None,
        }
    }

    /// Promise slots
    pub fn as_promise(&self) -> Option<&Arc<JsPromise>> {
        match &self.kind {
            ObjectKind::Promise(p) => Some(p),
            _ => None,
        }
    }

    // === Internal methods (dispatched) ===

    /// `[[GetPrototypeOf]]`
    pub fn get_prototype_of(&self) -> Option<Arc<JsObject>> {
        self.prototype.read().clone()
    }

    /// `[[SetPrototypeOf]]`; false on cycles or when not extensible
    pub fn set_prototype_of(&self, proto: Option<Arc<JsObject>>) -> bool {
        let current = self.prototype.read().clone();
        let unchanged = match (&current, &proto) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return true;
        }
        if !self.is_extensible() {
            return false;
        }
        let mut cursor = proto.clone();
        while let Some(p) = cursor {
            if std::ptr::eq(Arc::as_ptr(&p), self) {
                return false;
            }
            cursor = p.get_prototype_of();
        }
        *self.prototype.write() = proto;
        true
    }

    /// `[[IsExtensible]]`
    pub fn is_extensible(&self) -> bool {
        self.extensible.load(Ordering::Acquire)
    }

    /// `[[PreventExtensions]]`
    pub fn prevent_extensions(&self) -> bool {
        self.extensible.store(false, Ordering::Release);
        true
    }

    /// `[[GetOwnProperty]]`
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        match self.kind.hooks().get_own_property {
            Some(hook) => hook(self, key),
            None => self.ordinary_get_own_property(key),
        }
    }

    /// `[[DefineOwnProperty]]`; `Ok(false)` on a rejected transition
    pub fn define_own_property(
        &self,
        realm: &Realm,
        key: PropertyKey,
        desc: &PartialDescriptor,
    ) -> VmResult<bool> {
        match self.kind.hooks().define_own_property {
            Some(hook) => {
                tracing::trace!(target: "otter::object", %key, "exotic define");
                hook(realm, self, key, desc)
            }
            None => Ok(self.ordinary_define_own_property(key, desc)),
        }
    }

    /// `[[HasProperty]]`
    pub fn has_property(&self, realm: &Realm, key: &PropertyKey) -> VmResult<bool> {
        match self.kind.hooks().has_property {
            Some(hook) => hook(realm, self, key),
            None => self.ordinary_has_property(realm, key),
        }
    }

    /// `[[Get]]` with the object itself as receiver
    pub fn get(self: &Arc<Self>, realm: &Realm, key: &PropertyKey) -> VmResult<Value> {
        self.get_with_receiver(realm, key, &Value::Object(self.clone()))
    }

    /// `[[Get]]`
    pub fn get_with_receiver(
        &self,
        realm: &Realm,
        key: &PropertyKey,
        receiver: &Value,
    ) -> VmResult<Value> {
        match self.kind.hooks().get {
            Some(hook) => hook(realm, self, key, receiver),
            None => self.ordinary_get(realm, key, receiver),
        }
    }

    /// `[[Set]]` with the object itself as receiver
    pub fn set(self: &Arc<Self>, realm: &Realm, key: PropertyKey, value: Value) -> VmResult<bool> {
        self.set_with_receiver(realm, key, value, &Value::Object(self.clone()))
    }

    /// `[[Set]]`
    pub fn set_with_receiver(
        &self,
        realm: &Realm,
        key: PropertyKey,
        value: Value,
        receiver: &Value,
    ) -> VmResult<bool> {
        match self.kind.hooks().set {
            Some(hook) => hook(realm, self, key, value, receiver),
            None => self.ordinary_set(realm, key, value, receiver),
        }
    }

    /// `[[Delete]]`; false when the property is non-configurable
    pub fn delete(&self, key: &PropertyKey) -> bool {
        match self.kind.hooks().delete {
            Some(hook) => hook(self, key),
            None => self.ordinary_delete(key),
        }
    }

    /// `[[OwnPropertyKeys]]`: indices ascending, then strings, then symbols
    pub fn own_property_keys(&self) -> Vec<PropertyKey> {
        match self.kind.hooks().own_property_keys {
            Some(hook) => hook(self),
            None => self.ordinary_own_property_keys(),
        }
    }

    /// Own enumerable string-valued keys, in enumeration order
    pub fn own_enumerable_keys(&self) -> Vec<PropertyKey> {
        self.own_property_keys()
            .into_iter()
            .filter(|key| !key.is_symbol())
            .filter(|key| self.get_own_property(key).is_some_and(|d| d.enumerable))
            .collect()
    }

    /// CreateDataProperty
    pub fn create_data_property(
        &self,
        realm: &Realm,
        key: PropertyKey,
        value: Value,
    ) -> VmResult<bool> {
        self.define_own_property(realm, key, &PartialDescriptor::data(value))
    }

    /// Define a property directly in the ordinary map, bypassing validation.
    ///
    /// Used while building intrinsics and fresh objects.
    pub fn define_raw(&self, key: PropertyKey, desc: PropertyDescriptor) {
        self.properties.write().insert(key, desc);
    }

    // === Ordinary algorithms ===

    /// OrdinaryGetOwnProperty
    pub fn ordinary_get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.properties.read().get(key).cloned()
    }

    /// OrdinaryDefineOwnProperty
    pub fn ordinary_define_own_property(&self, key: PropertyKey, desc: &PartialDescriptor) -> bool {
        let mut props = self.properties.write();
        match reconcile_descriptor(props.get(&key), self.is_extensible(), desc) {
            Reconciled::Reject => false,
            Reconciled::Unchanged => true,
            Reconciled::Write(stored) => {
                props.insert(key, stored);
                true
            }
        }
    }

    /// OrdinaryHasProperty
    pub fn ordinary_has_property(&self, realm: &Realm, key: &PropertyKey) -> VmResult<bool> {
        if self.get_own_property(key).is_some() {
            return Ok(true);
        }
        match self.get_prototype_of() {
            Some(proto) => proto.has_property(realm, key),
            None => Ok(false),
        }
    }

    /// OrdinaryGet
    pub fn ordinary_get(
        &self,
        realm: &Realm,
        key: &PropertyKey,
        receiver: &Value,
    ) -> VmResult<Value> {
        let Some(desc) = self.get_own_property(key) else {
            return match self.get_prototype_of() {
                Some(proto) => proto.get_with_receiver(realm, key, receiver),
                None => Ok(Value::undefined()),
            };
        };
        match desc.slot {
            PropertySlot::Data { value, .. } => Ok(value),
            PropertySlot::Accessor { get: Some(getter), .. } => {
                operations::call(realm, &getter, receiver, &[])
            }
            PropertySlot::Accessor { get: None, .. } => Ok(Value::undefined()),
        }
    }

    /// OrdinarySet
    pub fn ordinary_set(
        &self,
        realm: &Realm,
        key: PropertyKey,
        value: Value,
        receiver: &Value,
    ) -> VmResult<bool> {
        let desc = match self.get_own_property(&key) {
            Some(desc) => desc,
            None => match self.get_prototype_of() {
                Some(proto) => return proto.set_with_receiver(realm, key, value, receiver),
                None => PropertyDescriptor::data(Value::undefined()),
            },
        };
        match desc.slot {
            PropertySlot::Data { writable: false, .. } => Ok(false),
            PropertySlot::Data { .. } => {
                let Some(target) = receiver.as_object() else {
                    return Ok(false);
                };
                match target.get_own_property(&key) {
                    Some(existing) => {
                        if existing.is_accessor() || !existing.is_writable() {
                            return Ok(false);
                        }
                        target.define_own_property(realm, key, &PartialDescriptor::new().value(value))
                    }
                    None => target.create_data_property(realm, key, value),
                }
            }
            PropertySlot::Accessor { set: Some(setter), .. } => {
                operations::call(realm, &setter, receiver, &[value])?;
                Ok(true)
            }
            PropertySlot::Accessor { set: None, .. } => Ok(false),
        }
    }

    /// OrdinaryDelete
    pub fn ordinary_delete(&self, key: &PropertyKey) -> bool {
        let mut props = self.properties.write();
        match props.get(key) {
            Some(desc) if !desc.configurable => false,
            Some(_) => {
                props.remove(key);
                true
            }
            None => true,
        }
    }

    /// OrdinaryOwnPropertyKeys
    pub fn ordinary_own_property_keys(&self) -> Vec<PropertyKey> {
        self.properties.read().ordered_keys()
    }

    /// Index keys `>= start` in the ordinary map, highest first
    pub(crate) fn index_keys_descending_from(&self, start: u32) -> Vec<u32> {
        self.properties.read().index_keys_descending_from(start)
    }

    /// Number of properties in the ordinary map
    pub fn property_count(&self) -> usize {
        self.properties.read().len()
    }
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let props = self.properties.read();
        let kind = match &self.kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error(kind) => kind.name(),
            ObjectKind::Primitive(_) => "Primitive",
            ObjectKind::ArrayBuffer(_) => "ArrayBuffer",
            ObjectKind::SharedArrayBuffer(_) => "SharedArrayBuffer",
            ObjectKind::TypedArray(ta) => ta.kind().name(),
            ObjectKind::ArrayIterator(_) => "Array Iterator",
            ObjectKind::AsyncFromSyncIterator(_) => "Async-from-Sync Iterator",
            ObjectKind::Generator(_) => "Generator",
            ObjectKind::AsyncGenerator(_) => "AsyncGenerator",
            ObjectKind::Promise(_) => "Promise",
        };
        f.debug_struct("JsObject")
            .field("kind", &kind)
            .field("properties", &props.len())
            .field("extensible", &self.is_extensible())
            .finish()
    }
}
