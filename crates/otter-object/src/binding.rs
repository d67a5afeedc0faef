//! Binding initialization for destructuring patterns
//!
//! Patterns arrive already parsed. Default values and computed keys are
//! thunks evaluated against the environment being bound into. Bindings made
//! before an error are kept.
//!
//! ```ignore
//! // let { a, b: [c = 1], ...rest } = value;
//! let pattern = BindingPattern::object(
//!     ObjectPattern::new()
//!         .property("a", BindingPattern::identifier("a"), None)
//!         .property(
//!             "b",
//!             BindingPattern::array(ArrayPattern::new().element(BindingPattern::identifier("c"), Some(one))),
//!             None,
//!         )
//!         .rest("rest"),
//! );
//! bind_pattern(&realm, &pattern, value, &env, BindingMode::Initialize)?;
//! ```

use smallvec::SmallVec;
use std::sync::Arc;

use crate::array::create_array_from_list;
use crate::convert::{require_object_coercible, to_property_key};
use crate::environment::Environment;
use crate::error::{VmError, VmResult};
use crate::iterator::{IteratorHint, IteratorRecord, get_iterator, iterator_close, iterator_step, iterator_step_value};
use crate::operations::{copy_data_properties, get_v};
use crate::property::PropertyKey;
use crate::realm::Realm;
use crate::string::JsString;
use crate::value::Value;

/// Deferred expression: a default value initializer or a computed key
pub type Thunk = Arc<dyn Fn(&Realm, &Arc<Environment>) -> VmResult<Value> + Send + Sync>;

/// Wrap a closure as a [`Thunk`]
pub fn thunk<F>(f: F) -> Thunk
where
    F: Fn(&Realm, &Arc<Environment>) -> VmResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A thunk that always produces `value`
pub fn constant(value: Value) -> Thunk {
    Arc::new(move |_, _| Ok(value.clone()))
}

/// How bound names receive their values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Initialize fresh lexical or parameter bindings
    Initialize,
    /// PutValue on existing references (`var` declarations and assignment patterns)
    Assign {
        /// Strict mode code
        strict: bool,
    },
}

/// Property name in an object pattern
#[derive(Clone)]
pub enum PatternKey {
    /// `{ a: ... }`, `{ "a b": ... }`, `{ 0: ... }`
    Static(PropertyKey),
    /// `{ [expr]: ... }`
    Computed(Thunk),
}

impl std::fmt::Debug for PatternKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKey::Static(key) => write!(f, "{}", key),
            PatternKey::Computed(_) => f.write_str("[computed]"),
        }
    }
}

/// One `key: target = default` entry of an object pattern
#[derive(Clone)]
pub struct PropertyEntry {
    /// Property name
    pub key: PatternKey,
    /// Where the value goes
    pub target: BindingPattern,
    /// Initializer used when the value is `undefined`
    pub default: Option<Thunk>,
}

/// One `target = default` element of an array pattern
#[derive(Clone)]
pub struct BindingElement {
    /// Where the value goes
    pub target: BindingPattern,
    /// Initializer used when the value is `undefined`
    pub default: Option<Thunk>,
}

impl std::fmt::Debug for PropertyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyEntry")
            .field("key", &self.key)
            .field("target", &self.target)
            .field("default", &self.default.as_ref().map(|_| "<thunk>"))
            .finish()
    }
}

impl std::fmt::Debug for BindingElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingElement")
            .field("target", &self.target)
            .field("default", &self.default.as_ref().map(|_| "<thunk>"))
            .finish()
    }
}

/// `{ ... }`
#[derive(Clone, Debug, Default)]
pub struct ObjectPattern {
    /// Entries in source order
    pub entries: Vec<PropertyEntry>,
    /// `...rest` identifier
    pub rest: Option<JsString>,
}

impl ObjectPattern {
    /// Empty pattern `{}`
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `key: target = default`
    pub fn property(mut self, key: impl Into<PropertyKey>, target: BindingPattern, default: Option<Thunk>) -> Self {
        self.entries.push(PropertyEntry {
            key: PatternKey::Static(key.into()),
            target,
            default,
        });
        self
    }

    /// Append the shorthand `name = default`
    pub fn shorthand(self, name: &str, default: Option<Thunk>) -> Self {
        self.property(PropertyKey::string(name), BindingPattern::identifier(name), default)
    }

    /// Append `[key]: target = default`
    pub fn computed(mut self, key: Thunk, target: BindingPattern, default: Option<Thunk>) -> Self {
        self.entries.push(PropertyEntry {
            key: PatternKey::Computed(key),
            target,
            default,
        });
        self
    }

    /// Set `...name`
    pub fn rest(mut self, name: &str) -> Self {
        self.rest = Some(JsString::intern(name));
        self
    }
}

/// `[ ... ]`
#[derive(Clone, Debug, Default)]
pub struct ArrayPattern {
    /// Elements in source order; `None` is an elision
    pub elements: Vec<Option<BindingElement>>,
    /// `...rest` target
    pub rest: Option<Box<BindingPattern>>,
}

impl ArrayPattern {
    /// Empty pattern `[]`
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `target = default`
    pub fn element(mut self, target: BindingPattern, default: Option<Thunk>) -> Self {
        self.elements.push(Some(BindingElement { target, default }));
        self
    }

    /// Append a hole
    pub fn elision(mut self) -> Self {
        self.elements.push(None);
        self
    }

    /// Set `...target`
    pub fn rest(mut self, target: BindingPattern) -> Self {
        self.rest = Some(Box::new(target));
        self
    }
}

/// A binding target
#[derive(Clone, Debug)]
pub enum BindingPattern {
    /// A single name
    Identifier(JsString),
    /// Object destructuring
    Object(ObjectPattern),
    /// Array destructuring
    Array(ArrayPattern),
}

impl BindingPattern {
    /// Identifier target
    pub fn identifier(name: &str) -> Self {
        BindingPattern::Identifier(JsString::intern(name))
    }

    /// Object pattern target
    pub fn object(pattern: ObjectPattern) -> Self {
        BindingPattern::Object(pattern)
    }

    /// Array pattern target
    pub fn array(pattern: ArrayPattern) -> Self {
        BindingPattern::Array(pattern)
    }

    /// Every identifier bound by this pattern, in source order
    pub fn bound_names(&self) -> Vec<JsString> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<JsString>) {
        match self {
            BindingPattern::Identifier(name) => names.push(name.clone()),
            BindingPattern::Object(pattern) => {
                for entry in &pattern.entries {
                    entry.target.collect_names(names);
                }
                if let Some(rest) = &pattern.rest {
                    names.push(rest.clone());
                }
            }
            BindingPattern::Array(pattern) => {
                for element in pattern.elements.iter().flatten() {
                    element.target.collect_names(names);
                }
                if let Some(rest) = &pattern.rest {
                    rest.collect_names(names);
                }
            }
        }
    }
}

/// BindingInitialization: bind `value` to `pattern` in `env`.
///
/// In [`BindingMode::Initialize`] names missing from `env` are created as
/// mutable bindings. Errors abort the remaining work without undoing
/// bindings already made.
pub fn bind_pattern(
    realm: &Realm,
    pattern: &BindingPattern,
    value: Value,
    env: &Arc<Environment>,
    mode: BindingMode,
) -> VmResult<()> {
    match pattern {
        BindingPattern::Identifier(name) => bind_identifier(realm, name, value, env, mode),
        BindingPattern::Object(pattern) => bind_object(realm, pattern, value, env, mode),
        BindingPattern::Array(pattern) => bind_array(realm, pattern, value, env, mode),
    }
}

fn bind_identifier(
    realm: &Realm,
    name: &JsString,
    value: Value,
    env: &Arc<Environment>,
    mode: BindingMode,
) -> VmResult<()> {
    tracing::trace!(target: "otter::binding", name = %name, ?mode, "bind identifier");
    match mode {
        BindingMode::Initialize => {
            if !env.has_binding(name.as_str()) {
                env.create_mutable_binding(name.as_str());
            }
            env.initialize_binding(name.as_str(), value)
        }
        BindingMode::Assign { strict } => env.assign(realm, name.as_str(), value, strict),
    }
}

/// Apply `default` when `value` is `undefined`
fn with_default(
    realm: &Realm,
    value: Value,
    default: Option<&Thunk>,
    env: &Arc<Environment>,
) -> VmResult<Value> {
    match default {
        Some(init) if value.is_undefined() => init(realm, env),
        _ => Ok(value),
    }
}

fn bind_object(
    realm: &Realm,
    pattern: &ObjectPattern,
    value: Value,
    env: &Arc<Environment>,
    mode: BindingMode,
) -> VmResult<()> {
    if let Err(err) = require_object_coercible(&value) {
        tracing::trace!(target: "otter::binding", "object pattern on nullish value");
        return Err(match err {
            VmError::TypeError(_) => VmError::type_error(format!(
                "Cannot destructure '{}' as it is {}",
                value.describe(),
                value.describe()
            )),
            other => other,
        });
    }

    let mut excluded: SmallVec<[PropertyKey; 8]> = SmallVec::new();
    for entry in &pattern.entries {
        let key = match &entry.key {
            PatternKey::Static(key) => key.clone(),
            PatternKey::Computed(expr) => {
                let raw = expr(realm, env)?;
                to_property_key(realm, &raw)?
            }
        };
        tracing::trace!(target: "otter::binding", %key, "object pattern entry");
        let property = get_v(realm, &value, &key)?;
        let property = with_default(realm, property, entry.default.as_ref(), env)?;
        bind_pattern(realm, &entry.target, property, env, mode)?;
        excluded.push(key);
    }

    if let Some(rest) = &pattern.rest {
        let rest_obj = realm.new_object();
        copy_data_properties(realm, &rest_obj, &value, &excluded)?;
        bind_identifier(realm, rest, Value::Object(rest_obj), env, mode)?;
    }
    Ok(())
}

fn bind_array(
    realm: &Realm,
    pattern: &ArrayPattern,
    value: Value,
    env: &Arc<Environment>,
    mode: BindingMode,
) -> VmResult<()> {
    let mut record = get_iterator(realm, &value, IteratorHint::Sync)?;
    let result = bind_array_elements(realm, pattern, &mut record, env, mode);
    if record.done {
        return result;
    }
    iterator_close(realm, &record, result)
}

fn bind_array_elements(
    realm: &Realm,
    pattern: &ArrayPattern,
    record: &mut IteratorRecord,
    env: &Arc<Environment>,
    mode: BindingMode,
) -> VmResult<()> {
    for (index, element) in pattern.elements.iter().enumerate() {
        let Some(element) = element else {
            if !record.done {
                iterator_step(realm, record)?;
            }
            continue;
        };
        let next = if record.done {
            Value::undefined()
        } else {
            iterator_step_value(realm, record)?.unwrap_or_default()
        };
        tracing::trace!(target: "otter::binding", index, done = record.done, "array pattern element");
        let next = with_default(realm, next, element.default.as_ref(), env)?;
        bind_pattern(realm, &element.target, next, env, mode)?;
    }

    if let Some(rest) = &pattern.rest {
        let mut remaining = Vec::new();
        while !record.done {
            if let Some(next) = iterator_step_value(realm, record)? {
                remaining.push(next);
            }
        }
        let array = create_array_from_list(realm, remaining);
        bind_pattern(realm, rest, Value::Object(array), env, mode)?;
    }
    Ok(())
}
