//! Declarative environment records
//!
//! Bindings are kept in declaration order. A lexical binding is created
//! uninitialized (`None`) and reading it before initialization raises a
//! ReferenceError.

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::property::PropertyKey;
use crate::realm::Realm;
use crate::string::JsString;
use crate::value::Value;

#[derive(Debug, Clone)]
struct Binding {
    value: Option<Value>,
    mutable: bool,
    /// Assignment to an immutable strict binding throws
    strict: bool,
}

/// A declarative environment record with an optional outer environment
#[derive(Debug, Default)]
pub struct Environment {
    bindings: RwLock<IndexMap<JsString, Binding, FxBuildHasher>>,
    outer: Option<Arc<Environment>>,
}

impl Environment {
    /// Create an outermost environment
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create an environment nested in `outer`
    pub fn with_outer(outer: Arc<Environment>) -> Arc<Self> {
        Arc::new(Self {
            bindings: RwLock::default(),
            outer: Some(outer),
        })
    }

    /// Outer environment
    pub fn outer(&self) -> Option<&Arc<Environment>> {
        self.outer.as_ref()
    }

    /// HasBinding (this record only)
    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.read().contains_key(&JsString::intern(name))
    }

    /// CreateMutableBinding; the binding starts uninitialized
    pub fn create_mutable_binding(&self, name: &str) {
        self.bindings.write().insert(
            JsString::intern(name),
            Binding {
                value: None,
                mutable: true,
                strict: false,
            },
        );
    }

    /// CreateImmutableBinding; the binding starts uninitialized
    pub fn create_immutable_binding(&self, name: &str, strict: bool) {
        self.bindings.write().insert(
            JsString::intern(name),
            Binding {
                value: None,
                mutable: false,
                strict,
            },
        );
    }

    /// `var`-style binding, created initialized to `undefined`
    pub fn create_var_binding(&self, name: &str) {
        self.bindings
            .write()
            .entry(JsString::intern(name))
            .or_insert(Binding {
                value: Some(Value::undefined()),
                mutable: true,
                strict: false,
            });
    }

    /// InitializeBinding
    pub fn initialize_binding(&self, name: &str, value: Value) -> VmResult<()> {
        let mut bindings = self.bindings.write();
        let binding = bindings
            .get_mut(&JsString::intern(name))
            .ok_or_else(|| VmError::internal(format!("no binding for '{}' to initialize", name)))?;
        binding.value = Some(value);
        Ok(())
    }

    /// SetMutableBinding on this record
    pub fn set_mutable_binding(&self, name: &str, value: Value, strict: bool) -> VmResult<()> {
        let mut bindings = self.bindings.write();
        let Some(binding) = bindings.get_mut(&JsString::intern(name)) else {
            if strict {
                return Err(not_defined(name));
            }
            bindings.insert(
                JsString::intern(name),
                Binding {
                    value: Some(value),
                    mutable: true,
                    strict: false,
                },
            );
            return Ok(());
        };
        if binding.value.is_none() {
            return Err(uninitialized(name));
        }
        if binding.mutable {
            binding.value = Some(value);
        } else if strict || binding.strict {
            return Err(VmError::type_error(format!("Assignment to constant variable '{}'", name)));
        }
        Ok(())
    }

    /// GetBindingValue on this record
    pub fn get_binding_value(&self, name: &str) -> VmResult<Value> {
        match self.bindings.read().get(&JsString::intern(name)) {
            Some(Binding { value: Some(v), .. }) => Ok(v.clone()),
            Some(Binding { value: None, .. }) => Err(uninitialized(name)),
            None => Err(not_defined(name)),
        }
    }

    /// Whether the binding exists and is initialized
    pub fn is_initialized(&self, name: &str) -> bool {
        self.bindings
            .read()
            .get(&JsString::intern(name))
            .is_some_and(|b| b.value.is_some())
    }

    /// Names declared in this record, in declaration order
    pub fn binding_names(&self) -> Vec<JsString> {
        self.bindings.read().keys().cloned().collect()
    }

    /// Nearest environment in the chain that declares `name`
    pub fn resolve(self: &Arc<Self>, name: &str) -> Option<Arc<Environment>> {
        let mut env = Some(self.clone());
        while let Some(current) = env {
            if current.has_binding(name) {
                return Some(current);
            }
            env = current.outer.clone();
        }
        None
    }

    /// Read an identifier through the chain, falling back to the realm's
    /// global object
    pub fn lookup(self: &Arc<Self>, realm: &Realm, name: &str) -> VmResult<Value> {
        if let Some(env) = self.resolve(name) {
            return env.get_binding_value(name);
        }
        let global = realm.global();
        let key = PropertyKey::string(name);
        if global.has_property(realm, &key)? {
            return global.get(realm, &key);
        }
        Err(not_defined(name))
    }

    /// PutValue on an identifier reference. Unresolvable names throw in
    /// strict code and become global properties otherwise.
    pub fn assign(self: &Arc<Self>, realm: &Realm, name: &str, value: Value, strict: bool) -> VmResult<()> {
        if let Some(env) = self.resolve(name) {
            return env.set_mutable_binding(name, value, strict);
        }
        let global = realm.global();
        let key = PropertyKey::string(name);
        if strict && !global.has_property(realm, &key)? {
            return Err(not_defined(name));
        }
        let ok = global.set(realm, key, value)?;
        if !ok && strict {
            return Err(VmError::type_error(format!("Cannot assign to read only property '{}'", name)));
        }
        Ok(())
    }
}

fn not_defined(name: &str) -> VmError {
    VmError::reference_error(format!("{} is not defined", name))
}

fn uninitialized(name: &str) -> VmError {
    VmError::reference_error(format!("Cannot access '{}' before initialization", name))
}
