//! Realm record
//!
//! A Realm owns its intrinsics, its global object and its job queue. It is
//! passed by reference to every operation that needs prototype lookup or
//! has to schedule work; there is no implicit global realm.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::builtins::native_function;
use crate::error::{ErrorKind, VmError, VmResult};
use crate::intrinsics::Intrinsics;
use crate::job_queue::{Job, JobQueue};
use crate::object::{JsObject, ObjectKind};
use crate::property::{PropertyAttributes, PropertyDescriptor, PropertyKey};
use crate::shared_buffer::allocate_shared_array_buffer;
use crate::string::JsString;
use crate::value::Value;

/// Unique realm identifier.
pub type RealmId = u32;

static NEXT_REALM_ID: AtomicU32 = AtomicU32::new(0);

/// Per-realm configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmOptions {
    /// Expose `SharedArrayBuffer` and allow allocating shared memory
    pub shared_memory_enabled: bool,
}

impl Default for RealmOptions {
    fn default() -> Self {
        Self {
            shared_memory_enabled: true,
        }
    }
}

/// A realm: intrinsics, global object, job queue
pub struct Realm {
    id: RealmId,
    intrinsics: Intrinsics,
    global: Arc<JsObject>,
    options: RealmOptions,
    jobs: JobQueue,
}

impl Realm {
    /// Create a realm with default options
    pub fn new() -> Self {
        Self::with_options(RealmOptions::default())
    }

    /// Create a realm with the given options
    pub fn with_options(options: RealmOptions) -> Self {
        let id = NEXT_REALM_ID.fetch_add(1, Ordering::Relaxed);
        let intrinsics = Intrinsics::allocate();
        intrinsics.init_core();
        let global = Arc::new(JsObject::new(Some(intrinsics.object_prototype.clone())));
        intrinsics.install_on_global(&global, &options);
        tracing::debug!(
            target: "otter::object",
            id,
            shared_memory = options.shared_memory_enabled,
            "realm created"
        );
        Self {
            id,
            intrinsics,
            global,
            options,
            jobs: JobQueue::new(),
        }
    }

    /// Realm id
    pub fn id(&self) -> RealmId {
        self.id
    }

    /// Intrinsic objects of this realm
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// The global object
    pub fn global(&self) -> &Arc<JsObject> {
        &self.global
    }

    /// Options this realm was created with
    pub fn options(&self) -> &RealmOptions {
        &self.options
    }

    /// OrdinaryObjectCreate(%Object.prototype%)
    pub fn new_object(&self) -> Arc<JsObject> {
        Arc::new(JsObject::new(Some(self.intrinsics.object_prototype.clone())))
    }

    /// A native function object with `Function.prototype` as prototype
    pub fn new_native_function<F>(&self, name: &str, f: F) -> Arc<JsObject>
    where
        F: Fn(&Realm, &Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        native_function(&self.intrinsics.function_prototype, name, 0, Arc::new(f))
    }

    /// The prototype primitives of this type read through
    pub fn primitive_prototype(&self, value: &Value) -> &Arc<JsObject> {
        let i = &self.intrinsics;
        match value {
            Value::Boolean(_) => &i.boolean_prototype,
            Value::Number(_) => &i.number_prototype,
            Value::BigInt(_) => &i.bigint_prototype,
            Value::String(_) => &i.string_prototype,
            Value::Symbol(_) => &i.symbol_prototype,
            Value::Undefined | Value::Null | Value::Object(_) => &i.object_prototype,
        }
    }

    /// Wrapper object for a primitive (the ToObject result)
    pub fn wrap_primitive(&self, value: Value) -> Arc<JsObject> {
        let proto = self.primitive_prototype(&value).clone();
        let length = value.as_string().map(|s| s.utf16_len());
        let obj = JsObject::with_kind(Some(proto), ObjectKind::Primitive(value));
        if let Some(len) = length {
            obj.define_raw(
                PropertyKey::string("length"),
                PropertyDescriptor::data_with_attrs(Value::number(len as f64), PropertyAttributes::frozen()),
            );
        }
        Arc::new(obj)
    }

    /// A native error object of `kind`
    pub fn create_error(&self, kind: ErrorKind, message: &str) -> Arc<JsObject> {
        let obj = JsObject::with_kind(
            Some(self.intrinsics.error_prototype_for(kind).clone()),
            ObjectKind::Error(kind),
        );
        if !message.is_empty() {
            obj.define_raw(
                PropertyKey::string("message"),
                PropertyDescriptor::data_with_attrs(
                    Value::String(JsString::new(message)),
                    PropertyAttributes::builtin(),
                ),
            );
        }
        Arc::new(obj)
    }

    /// [`Realm::create_error`] as a value
    pub fn create_error_value(&self, kind: ErrorKind, message: &str) -> Value {
        Value::Object(self.create_error(kind, message))
    }

    /// The JS value an error becomes when caught: thrown values keep their
    /// identity, native errors are materialized as error objects.
    pub fn error_to_value(&self, err: VmError) -> Value {
        match err {
            VmError::Exception(thrown) => thrown.value,
            VmError::TypeError(msg) => self.create_error_value(ErrorKind::TypeError, &msg),
            VmError::ReferenceError(msg) => self.create_error_value(ErrorKind::ReferenceError, &msg),
            VmError::RangeError(msg) => self.create_error_value(ErrorKind::RangeError, &msg),
            VmError::SyntaxError(msg) => self.create_error_value(ErrorKind::SyntaxError, &msg),
            VmError::InternalError(msg) => self.create_error_value(ErrorKind::Error, &msg),
        }
    }

    /// AllocateSharedArrayBuffer in this realm
    pub fn create_shared_array_buffer(&self, byte_length: usize) -> VmResult<Arc<JsObject>> {
        allocate_shared_array_buffer(self, byte_length)
    }

    /// Queue a job
    pub fn enqueue_job(&self, job: Job) {
        self.jobs.enqueue(job);
    }

    /// Number of queued jobs
    pub fn pending_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Run queued jobs until none are left; returns how many ran
    pub fn run_jobs(&self) -> usize {
        self.jobs.drain(self)
    }

    /// Messages of jobs that failed
    pub fn job_failures(&self) -> Vec<String> {
        self.jobs.failures()
    }

    /// Messages of jobs that failed since the last call, clearing the record
    pub fn take_job_failures(&self) -> Vec<String> {
        self.jobs.take_failures()
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("jobs", &self.jobs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realms_have_distinct_intrinsics() {
        let a = Realm::new();
        let b = Realm::new();
        assert_ne!(a.id(), b.id());
        assert!(!Arc::ptr_eq(
            &a.intrinsics().object_prototype,
            &b.intrinsics().object_prototype
        ));
    }

    #[test]
    fn test_error_to_value_keeps_thrown_identity() {
        let realm = Realm::new();
        let thrown = Value::Object(realm.new_object());
        assert_eq!(realm.error_to_value(VmError::exception(thrown.clone())), thrown);

        let err = realm.error_to_value(VmError::type_error("bad"));
        let err = err.as_object().unwrap();
        assert_eq!(err.error_kind(), Some(ErrorKind::TypeError));
        assert_eq!(
            err.get(&realm, &PropertyKey::string("message")).unwrap(),
            Value::string("bad")
        );
        assert_eq!(
            err.get(&realm, &PropertyKey::string("name")).unwrap(),
            Value::string("TypeError")
        );
    }

    #[test]
    fn test_primitive_wrapper() {
        let realm = Realm::new();
        let wrapped = realm.wrap_primitive(Value::string("abc"));
        assert!(Arc::ptr_eq(
            &wrapped.get_prototype_of().unwrap(),
            &realm.intrinsics().string_prototype
        ));
        assert_eq!(
            wrapped.get(&realm, &PropertyKey::string("length")).unwrap(),
            Value::int32(3)
        );
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: RealmOptions = serde_json::from_str("{}").unwrap();
        assert!(options.shared_memory_enabled);
    }

    #[test]
    fn test_shared_memory_gates_global() {
        let key = PropertyKey::string("SharedArrayBuffer");
        let enabled = Realm::new();
        assert!(enabled.global().get_own_property(&key).is_some());

        let disabled = Realm::with_options(RealmOptions {
            shared_memory_enabled: false,
        });
        assert!(disabled.global().get_own_property(&key).is_none());
        assert!(matches!(
            disabled.create_shared_array_buffer(8),
            Err(VmError::TypeError(_))
        ));
    }
}
