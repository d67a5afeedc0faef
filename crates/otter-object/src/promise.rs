//! JavaScript Promise implementation
//!
//! Promises back async generator requests and `await`. Reactions are Rust
//! closures; settling a promise schedules each reaction as a job on the
//! realm's queue, so reactions never run synchronously inside `resolve`.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{VmError, VmResult};
use crate::object::{JsObject, ObjectKind};
use crate::operations;
use crate::property::PropertyKey;
use crate::realm::Realm;
use crate::value::Value;

/// Promise state
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    /// Not yet settled
    Pending,
    /// Resolved with value
    Fulfilled(Value),
    /// Rejected with error
    Rejected(Value),
}

impl PromiseState {
    /// Check if settled (fulfilled or rejected)
    pub fn is_settled(&self) -> bool {
        !matches!(self, PromiseState::Pending)
    }
}

/// Settlement outcome handed to a reaction: `Ok` fulfilled, `Err` rejected
pub type Settlement = Result<Value, Value>;

/// Callback run (as a job) once the promise settles
pub type PromiseReaction = Box<dyn FnOnce(&Realm, Settlement) -> VmResult<()> + Send>;

struct PromiseInner {
    state: PromiseState,
    reactions: Vec<PromiseReaction>,
}

/// A JavaScript Promise
pub struct JsPromise {
    inner: Mutex<PromiseInner>,
}

impl std::fmt::Debug for JsPromise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner.lock().state {
            PromiseState::Pending => write!(f, "Promise {{ <pending> }}"),
            PromiseState::Fulfilled(v) => write!(f, "Promise {{ <fulfilled>: {:?} }}", v),
            PromiseState::Rejected(v) => write!(f, "Promise {{ <rejected>: {:?} }}", v),
        }
    }
}

impl JsPromise {
    /// Create a new pending promise
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(PromiseInner {
                state: PromiseState::Pending,
                reactions: Vec::new(),
            }),
        })
    }

    /// Get current state
    pub fn state(&self) -> PromiseState {
        self.inner.lock().state.clone()
    }

    /// Check if pending
    pub fn is_pending(&self) -> bool {
        !self.inner.lock().state.is_settled()
    }

    /// Check if fulfilled
    pub fn is_fulfilled(&self) -> bool {
        matches!(self.inner.lock().state, PromiseState::Fulfilled(_))
    }

    /// Check if rejected
    pub fn is_rejected(&self) -> bool {
        matches!(self.inner.lock().state, PromiseState::Rejected(_))
    }

    /// Settle a pending promise and schedule its reactions. No-op when
    /// already settled.
    fn settle(&self, realm: &Realm, outcome: Settlement) {
        let reactions = {
            let mut inner = self.inner.lock();
            if inner.state.is_settled() {
                return;
            }
            inner.state = match &outcome {
                Ok(v) => PromiseState::Fulfilled(v.clone()),
                Err(e) => PromiseState::Rejected(e.clone()),
            };
            std::mem::take(&mut inner.reactions)
        };
        for reaction in reactions {
            let outcome = outcome.clone();
            realm.enqueue_job(Box::new(move |realm: &Realm| reaction(realm, outcome)));
        }
    }

    /// Register a reaction; if already settled it is scheduled right away
    pub fn on_settled(&self, realm: &Realm, reaction: PromiseReaction) {
        let outcome = {
            let mut inner = self.inner.lock();
            match &inner.state {
                PromiseState::Pending => {
                    inner.reactions.push(reaction);
                    return;
                }
                PromiseState::Fulfilled(v) => Ok(v.clone()),
                PromiseState::Rejected(e) => Err(e.clone()),
            }
        };
        realm.enqueue_job(Box::new(move |realm: &Realm| reaction(realm, outcome)));
    }
}

/// Create a pending promise object
pub fn new_promise(realm: &Realm) -> Arc<JsObject> {
    Arc::new(JsObject::with_kind(
        Some(realm.intrinsics().promise_prototype.clone()),
        ObjectKind::Promise(JsPromise::new()),
    ))
}

fn promise_slots(obj: &JsObject) -> VmResult<&Arc<JsPromise>> {
    obj.as_promise()
        .ok_or_else(|| VmError::type_error("receiver is not a Promise"))
}

/// FulfillPromise
pub fn fulfill_promise(realm: &Realm, promise: &JsObject, value: Value) -> VmResult<()> {
    promise_slots(promise)?.settle(realm, Ok(value));
    Ok(())
}

/// RejectPromise
pub fn reject_promise(realm: &Realm, promise: &JsObject, reason: Value) -> VmResult<()> {
    promise_slots(promise)?.settle(realm, Err(reason));
    Ok(())
}

/// The promise resolve function: fulfill with a plain value, or adopt the
/// state of a thenable through a job.
pub fn resolve_promise(realm: &Realm, promise: &Arc<JsObject>, resolution: Value) -> VmResult<()> {
    let Value::Object(thenable) = &resolution else {
        return fulfill_promise(realm, promise, resolution);
    };
    if Arc::ptr_eq(thenable, promise) {
        let err = realm.create_error_value(
            crate::error::ErrorKind::TypeError,
            "Chaining cycle detected for promise",
        );
        return reject_promise(realm, promise, err);
    }
    let then = match thenable.get(realm, &PropertyKey::string("then")) {
        Ok(then) => then,
        Err(err) => return reject_promise(realm, promise, realm.error_to_value(err)),
    };
    if !then.is_callable() {
        return fulfill_promise(realm, promise, resolution);
    }

    let promise = promise.clone();
    realm.enqueue_job(Box::new(move |realm: &Realm| {
        let (resolve, reject) = create_resolving_functions(realm, &promise);
        if let Err(err) = operations::call(realm, &then, &resolution, &[resolve, reject.clone()]) {
            operations::call(realm, &reject, &Value::undefined(), &[realm.error_to_value(err)])?;
        }
        Ok(())
    }));
    Ok(())
}

/// CreateResolvingFunctions: JS-callable `resolve`/`reject` sharing one
/// "already resolved" flag
pub fn create_resolving_functions(realm: &Realm, promise: &Arc<JsObject>) -> (Value, Value) {
    let already_resolved = Arc::new(AtomicBool::new(false));

    let resolve = {
        let promise = promise.clone();
        let already_resolved = already_resolved.clone();
        realm.new_native_function("", move |realm, _this, args| {
            if already_resolved.swap(true, Ordering::SeqCst) {
                return Ok(Value::undefined());
            }
            let value = args.first().cloned().unwrap_or_default();
            resolve_promise(realm, &promise, value)?;
            Ok(Value::undefined())
        })
    };
    let reject = {
        let promise = promise.clone();
        realm.new_native_function("", move |realm, _this, args| {
            if already_resolved.swap(true, Ordering::SeqCst) {
                return Ok(Value::undefined());
            }
            let reason = args.first().cloned().unwrap_or_default();
            reject_promise(realm, &promise, reason)?;
            Ok(Value::undefined())
        })
    };
    (Value::Object(resolve), Value::Object(reject))
}

/// PromiseResolve(%Promise%, value): promises pass through unchanged
pub fn promise_resolve(realm: &Realm, value: Value) -> VmResult<Arc<JsObject>> {
    if let Value::Object(obj) = &value
        && obj.as_promise().is_some()
    {
        return Ok(obj.clone());
    }
    let promise = new_promise(realm);
    resolve_promise(realm, &promise, value)?;
    Ok(promise)
}

/// A new promise already rejected with `reason`
pub fn promise_rejected(realm: &Realm, reason: Value) -> Arc<JsObject> {
    let promise = new_promise(realm);
    if let Some(slots) = promise.as_promise() {
        slots.settle(realm, Err(reason));
    }
    promise
}

/// Attach a Rust reaction to a promise object
pub fn then_native(realm: &Realm, promise: &JsObject, reaction: PromiseReaction) -> VmResult<()> {
    promise_slots(promise)?.on_settled(realm, reaction);
    Ok(())
}

/// PerformPromiseThen with JS handlers; returns the derived promise
pub fn perform_then(
    realm: &Realm,
    promise: &JsObject,
    on_fulfilled: Value,
    on_rejected: Value,
) -> VmResult<Arc<JsObject>> {
    let derived = new_promise(realm);
    let target = derived.clone();
    then_native(
        realm,
        promise,
        Box::new(move |realm: &Realm, outcome: Settlement| {
            let (handler, argument, rejected) = match outcome {
                Ok(v) => (on_fulfilled, v, false),
                Err(e) => (on_rejected, e, true),
            };
            if !handler.is_callable() {
                return if rejected {
                    reject_promise(realm, &target, argument)
                } else {
                    resolve_promise(realm, &target, argument)
                };
            }
            match operations::call(realm, &handler, &Value::undefined(), &[argument]) {
                Ok(result) => resolve_promise(realm, &target, result),
                Err(err) => reject_promise(realm, &target, realm.error_to_value(err)),
            }
        }),
    )?;
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_of(obj: &JsObject) -> PromiseState {
        obj.as_promise().unwrap().state()
    }

    #[test]
    fn test_reactions_run_as_jobs() {
        let realm = Realm::new();
        let promise = new_promise(&realm);
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        then_native(
            &realm,
            &promise,
            Box::new(move |_: &Realm, outcome: Settlement| {
                *sink.lock() = Some(outcome);
                Ok(())
            }),
        )
        .unwrap();

        resolve_promise(&realm, &promise, Value::int32(1)).unwrap();
        assert!(seen.lock().is_none());
        realm.run_jobs();
        assert_eq!(*seen.lock(), Some(Ok(Value::int32(1))));
    }

    #[test]
    fn test_settles_once() {
        let realm = Realm::new();
        let promise = new_promise(&realm);
        reject_promise(&realm, &promise, Value::string("first")).unwrap();
        fulfill_promise(&realm, &promise, Value::int32(2)).unwrap();
        assert_eq!(state_of(&promise), PromiseState::Rejected(Value::string("first")));
    }

    #[test]
    fn test_adopts_other_promise() {
        let realm = Realm::new();
        let inner = new_promise(&realm);
        let outer = promise_resolve(&realm, Value::int32(0)).unwrap();
        let adopting = new_promise(&realm);
        resolve_promise(&realm, &adopting, Value::Object(inner.clone())).unwrap();
        realm.run_jobs();
        assert!(state_of(&adopting) == PromiseState::Pending);

        fulfill_promise(&realm, &inner, Value::int32(9)).unwrap();
        realm.run_jobs();
        assert_eq!(state_of(&adopting), PromiseState::Fulfilled(Value::int32(9)));
        assert_eq!(state_of(&outer), PromiseState::Fulfilled(Value::int32(0)));
    }

    #[test]
    fn test_promise_resolve_passes_promises_through() {
        let realm = Realm::new();
        let promise = new_promise(&realm);
        let same = promise_resolve(&realm, Value::Object(promise.clone())).unwrap();
        assert!(Arc::ptr_eq(&promise, &same));
    }

    #[test]
    fn test_self_resolution_rejects() {
        let realm = Realm::new();
        let promise = new_promise(&realm);
        resolve_promise(&realm, &promise, Value::Object(promise.clone())).unwrap();
        match state_of(&promise) {
            PromiseState::Rejected(reason) => {
                let err = reason.as_object().unwrap();
                assert_eq!(err.error_kind(), Some(crate::error::ErrorKind::TypeError));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
