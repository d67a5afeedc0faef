//! Intrinsics registry for the built-in prototypes of one realm.
//!
//! Initialization follows a staged pattern:
//! 1. **allocate**: create every prototype object with its `[[Prototype]]`
//!    already wired, so later stages can reference any of them
//! 2. **init_core**: populate prototypes with their built-in methods
//! 3. **install_on_global**: create constructors and expose them on the
//!    global object

use std::sync::Arc;

use crate::builtins;
use crate::error::ErrorKind;
use crate::object::JsObject;
use crate::realm::RealmOptions;
use crate::typed_array::TypedArrayKind;

/// Prototype objects of a realm
#[derive(Clone)]
pub struct Intrinsics {
    // ========================================================================
    // Core prototypes
    // ========================================================================
    /// `Object.prototype`, `[[Prototype]]` is `null`
    pub object_prototype: Arc<JsObject>,
    /// `Function.prototype`
    pub function_prototype: Arc<JsObject>,

    // ========================================================================
    // Primitive wrapper prototypes
    // ========================================================================
    /// `String.prototype`
    pub string_prototype: Arc<JsObject>,
    /// `Number.prototype`
    pub number_prototype: Arc<JsObject>,
    /// `Boolean.prototype`
    pub boolean_prototype: Arc<JsObject>,
    /// `Symbol.prototype`
    pub symbol_prototype: Arc<JsObject>,
    /// `BigInt.prototype`
    pub bigint_prototype: Arc<JsObject>,

    // ========================================================================
    // Collections and buffers
    // ========================================================================
    /// `Array.prototype`
    pub array_prototype: Arc<JsObject>,
    /// `ArrayBuffer.prototype`
    pub array_buffer_prototype: Arc<JsObject>,
    /// `SharedArrayBuffer.prototype`
    pub shared_array_buffer_prototype: Arc<JsObject>,
    /// `%TypedArray%.prototype`
    pub typed_array_prototype: Arc<JsObject>,
    /// `Int8Array.prototype` .. `BigUint64Array.prototype`, by [`TypedArrayKind::index`]
    pub typed_array_prototypes: [Arc<JsObject>; 11],

    // ========================================================================
    // Error prototypes
    // ========================================================================
    /// `Error.prototype`
    pub error_prototype: Arc<JsObject>,
    /// `TypeError.prototype`
    pub type_error_prototype: Arc<JsObject>,
    /// `RangeError.prototype`
    pub range_error_prototype: Arc<JsObject>,
    /// `ReferenceError.prototype`
    pub reference_error_prototype: Arc<JsObject>,
    /// `SyntaxError.prototype`
    pub syntax_error_prototype: Arc<JsObject>,

    // ========================================================================
    // Iteration and async
    // ========================================================================
    /// `%IteratorPrototype%`
    pub iterator_prototype: Arc<JsObject>,
    /// `%AsyncIteratorPrototype%`
    pub async_iterator_prototype: Arc<JsObject>,
    /// `%ArrayIteratorPrototype%`
    pub array_iterator_prototype: Arc<JsObject>,
    /// `%AsyncFromSyncIteratorPrototype%`
    pub async_from_sync_iterator_prototype: Arc<JsObject>,
    /// `%GeneratorPrototype%`
    pub generator_prototype: Arc<JsObject>,
    /// `%AsyncGeneratorPrototype%`
    pub async_generator_prototype: Arc<JsObject>,
    /// `Promise.prototype`
    pub promise_prototype: Arc<JsObject>,
}

impl Intrinsics {
    /// Allocate every prototype with its prototype chain wired; no
    /// properties yet.
    pub fn allocate() -> Self {
        let object_prototype = Arc::new(JsObject::new(None));
        let child = |parent: &Arc<JsObject>| Arc::new(JsObject::new(Some(parent.clone())));

        let error_prototype = child(&object_prototype);
        let iterator_prototype = child(&object_prototype);
        let async_iterator_prototype = child(&object_prototype);
        let typed_array_prototype = child(&object_prototype);

        Self {
            function_prototype: child(&object_prototype),
            string_prototype: child(&object_prototype),
            number_prototype: child(&object_prototype),
            boolean_prototype: child(&object_prototype),
            symbol_prototype: child(&object_prototype),
            bigint_prototype: child(&object_prototype),
            array_prototype: child(&object_prototype),
            array_buffer_prototype: child(&object_prototype),
            shared_array_buffer_prototype: child(&object_prototype),
            typed_array_prototypes: std::array::from_fn(|_| child(&typed_array_prototype)),
            type_error_prototype: child(&error_prototype),
            range_error_prototype: child(&error_prototype),
            reference_error_prototype: child(&error_prototype),
            syntax_error_prototype: child(&error_prototype),
            array_iterator_prototype: child(&iterator_prototype),
            generator_prototype: child(&iterator_prototype),
            async_from_sync_iterator_prototype: child(&async_iterator_prototype),
            async_generator_prototype: child(&async_iterator_prototype),
            promise_prototype: child(&object_prototype),
            typed_array_prototype,
            iterator_prototype,
            async_iterator_prototype,
            error_prototype,
            object_prototype,
        }
    }

    /// Prototype of error objects of `kind`
    pub fn error_prototype_for(&self, kind: ErrorKind) -> &Arc<JsObject> {
        match kind {
            ErrorKind::Error => &self.error_prototype,
            ErrorKind::TypeError => &self.type_error_prototype,
            ErrorKind::RangeError => &self.range_error_prototype,
            ErrorKind::ReferenceError => &self.reference_error_prototype,
            ErrorKind::SyntaxError => &self.syntax_error_prototype,
        }
    }

    /// Prototype of typed arrays of `kind`
    pub fn typed_array_prototype_for(&self, kind: TypedArrayKind) -> &Arc<JsObject> {
        &self.typed_array_prototypes[kind.index()]
    }

    /// Populate prototypes with their built-in methods and accessors
    pub fn init_core(&self) {
        builtins::object::init_prototype(self);
        builtins::error::init_prototypes(self);
        builtins::array::init_prototype(self);
        builtins::string::init_prototype(self);
        builtins::iterator::init_prototypes(self);
        builtins::promise::init_prototype(self);
        builtins::typed_array::init_prototypes(self);
        tracing::trace!(target: "otter::object", "intrinsics initialized");
    }

    /// Create constructors and install them on `global`.
    ///
    /// `SharedArrayBuffer` is only exposed when shared memory is enabled.
    pub fn install_on_global(&self, global: &Arc<JsObject>, options: &RealmOptions) {
        builtins::object::install(self, global);
        builtins::error::install(self, global);
        builtins::array::install(self, global);
        builtins::string::install(self, global);
        builtins::promise::install(self, global);
        builtins::typed_array::install(self, global, options.shared_memory_enabled);
        builtins::global::install(self, global);
        builtins::install_global_this(global);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyKey;

    fn proto_of(obj: &Arc<JsObject>) -> Arc<JsObject> {
        obj.get_prototype_of().unwrap()
    }

    #[test]
    fn test_prototype_chain_wiring() {
        let intrinsics = Intrinsics::allocate();
        assert!(intrinsics.object_prototype.get_prototype_of().is_none());
        assert!(Arc::ptr_eq(
            &proto_of(&intrinsics.array_prototype),
            &intrinsics.object_prototype
        ));
        assert!(Arc::ptr_eq(
            &proto_of(&intrinsics.type_error_prototype),
            &intrinsics.error_prototype
        ));
        assert!(Arc::ptr_eq(
            &proto_of(&intrinsics.generator_prototype),
            &intrinsics.iterator_prototype
        ));
        assert!(Arc::ptr_eq(
            &proto_of(&intrinsics.typed_array_prototype_for(TypedArrayKind::Float64)),
            &intrinsics.typed_array_prototype
        ));
    }

    #[test]
    fn test_init_core_builtin_methods() {
        let intrinsics = Intrinsics::allocate();
        intrinsics.init_core();

        for name in ["hasOwnProperty", "toLocaleString", "propertyIsEnumerable"] {
            let desc = intrinsics
                .object_prototype
                .get_own_property(&PropertyKey::string(name))
                .unwrap_or_else(|| panic!("Object.prototype.{} missing", name));
            assert!(!desc.enumerable, "{} should be non-enumerable", name);
            assert!(desc.configurable);
            assert!(desc.is_writable());
        }
        assert!(intrinsics
            .array_prototype
            .get_own_property(&PropertyKey::string("values"))
            .is_some());
    }
}
