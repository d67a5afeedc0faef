//! Built-in functions installed on the intrinsics
//!
//! Only the surface needed to observe and drive the object model from
//! outside: descriptor reflection on `Object`, array iteration, generator
//! and promise plumbing, buffers and typed arrays, plus the few string and
//! global functions the conformance scenarios call.

pub mod array;
pub mod error;
pub mod global;
pub mod iterator;
pub mod object;
pub mod promise;
pub mod string;
pub mod typed_array;

use std::sync::Arc;

use crate::error::VmResult;
use crate::object::{JsObject, NativeFn, NativeFunction, ObjectKind};
use crate::property::{PropertyAttributes, PropertyDescriptor, PropertyKey};
use crate::realm::Realm;
use crate::string::JsString;
use crate::symbol::Symbol;
use crate::value::Value;

/// Argument `i`, `undefined` when absent
#[inline]
pub(crate) fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Attributes of function `length` and `name`
const FUNCTION_META: PropertyAttributes = PropertyAttributes {
    writable: false,
    enumerable: false,
    configurable: true,
};

/// Create a native function object with `name` and `length` properties
pub fn native_function(fn_proto: &Arc<JsObject>, name: &str, length: u32, func: NativeFn) -> Arc<JsObject> {
    let name = JsString::intern(name);
    let obj = JsObject::with_kind(
        Some(fn_proto.clone()),
        ObjectKind::Function(NativeFunction {
            name: name.clone(),
            func,
        }),
    );
    obj.define_raw(
        PropertyKey::string("length"),
        PropertyDescriptor::data_with_attrs(Value::number(length as f64), FUNCTION_META),
    );
    obj.define_raw(
        PropertyKey::string("name"),
        PropertyDescriptor::data_with_attrs(Value::String(name), FUNCTION_META),
    );
    Arc::new(obj)
}

/// Builder for a built-in prototype (and optionally its constructor) with
/// built-in property attributes: methods are writable, configurable and
/// not enumerable, function objects get `length` and `name`.
///
/// ```ignore
/// let ctor = BuiltInBuilder::new(fn_proto, array_prototype, "Array")
///     .constructor_fn(array_constructor, 1)
///     .method("push", array_push, 1)
///     .static_method("isArray", array_is_array, 1)
///     .build();
/// ```
pub struct BuiltInBuilder {
    fn_proto: Arc<JsObject>,
    prototype: Arc<JsObject>,
    name: String,
    ctor_fn: Option<(NativeFn, u32)>,
    statics: Vec<(PropertyKey, PropertyDescriptor)>,
}

impl BuiltInBuilder {
    /// Start building `name` around an allocated prototype object
    pub fn new(fn_proto: &Arc<JsObject>, prototype: &Arc<JsObject>, name: &str) -> Self {
        Self {
            fn_proto: fn_proto.clone(),
            prototype: prototype.clone(),
            name: name.to_string(),
            ctor_fn: None,
            statics: Vec::new(),
        }
    }

    fn function<F>(&self, name: &str, f: F, length: u32) -> Value
    where
        F: Fn(&Realm, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        Value::Object(native_function(&self.fn_proto, name, length, Arc::new(f)))
    }

    /// Set the constructor function implementation and its arity
    pub fn constructor_fn<F>(mut self, f: F, length: u32) -> Self
    where
        F: Fn(&Realm, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        self.ctor_fn = Some((Arc::new(f), length));
        self
    }

    /// Add a method to the prototype
    pub fn method<F>(self, name: &str, f: F, length: u32) -> Self
    where
        F: Fn(&Realm, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        let func = self.function(name, f, length);
        self.prototype.define_raw(
            PropertyKey::string(name),
            PropertyDescriptor::data_with_attrs(func, PropertyAttributes::builtin()),
        );
        self
    }

    /// Add a symbol-keyed method to the prototype
    pub fn symbol_method<F>(self, symbol: Symbol, name: &str, f: F, length: u32) -> Self
    where
        F: Fn(&Realm, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        let func = self.function(name, f, length);
        self.prototype.define_raw(
            PropertyKey::Symbol(symbol),
            PropertyDescriptor::data_with_attrs(func, PropertyAttributes::builtin()),
        );
        self
    }

    /// Alias an existing prototype property under another key
    pub fn alias(self, from: &str, to: PropertyKey) -> Self {
        if let Some(desc) = self.prototype.get_own_property(&PropertyKey::string(from)) {
            self.prototype.define_raw(to, desc);
        }
        self
    }

    /// Add a getter-only accessor to the prototype
    pub fn getter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Realm, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        let getter = self.function(&format!("get {}", name), f, 0);
        self.prototype.define_raw(
            PropertyKey::string(name),
            PropertyDescriptor::accessor(Some(getter), None, false, true),
        );
        self
    }

    /// Add a data property to the prototype
    pub fn property(self, key: PropertyKey, value: Value, attrs: PropertyAttributes) -> Self {
        self.prototype
            .define_raw(key, PropertyDescriptor::data_with_attrs(value, attrs));
        self
    }

    /// Add a static method to the constructor
    pub fn static_method<F>(mut self, name: &str, f: F, length: u32) -> Self
    where
        F: Fn(&Realm, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        let func = self.function(name, f, length);
        self.statics.push((
            PropertyKey::string(name),
            PropertyDescriptor::data_with_attrs(func, PropertyAttributes::builtin()),
        ));
        self
    }

    /// Add a data property to the constructor
    pub fn static_property(mut self, name: &str, value: Value, attrs: PropertyAttributes) -> Self {
        self.statics.push((
            PropertyKey::string(name),
            PropertyDescriptor::data_with_attrs(value, attrs),
        ));
        self
    }

    /// Finish; returns the constructor if one was configured, linked to the
    /// prototype through `prototype` / `constructor`.
    pub fn build(self) -> Option<Arc<JsObject>> {
        let (func, length) = self.ctor_fn?;
        let ctor = native_function(&self.fn_proto, &self.name, length, func);
        ctor.define_raw(
            PropertyKey::string("prototype"),
            PropertyDescriptor::data_with_attrs(
                Value::Object(self.prototype.clone()),
                PropertyAttributes::frozen(),
            ),
        );
        self.prototype.define_raw(
            PropertyKey::string("constructor"),
            PropertyDescriptor::data_with_attrs(Value::Object(ctor.clone()), PropertyAttributes::builtin()),
        );
        for (key, desc) in self.statics {
            ctor.define_raw(key, desc);
        }
        Some(ctor)
    }
}

/// Install a constructor as a non-enumerable global
pub(crate) fn install_global(global: &Arc<JsObject>, name: &str, ctor: Option<Arc<JsObject>>) {
    if let Some(ctor) = ctor {
        global.define_raw(
            PropertyKey::string(name),
            PropertyDescriptor::data_with_attrs(Value::Object(ctor), PropertyAttributes::builtin()),
        );
    }
}

/// `globalThis`
pub(crate) fn install_global_this(global: &Arc<JsObject>) {
    global.define_raw(
        PropertyKey::string("globalThis"),
        PropertyDescriptor::data_with_attrs(Value::Object(global.clone()), PropertyAttributes::builtin()),
    );
}
