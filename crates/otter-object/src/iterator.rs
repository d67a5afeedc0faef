//! Iterator protocol
//!
//! `IteratorRecord` plus the abstract operations over it, the built-in array
//! iterator, and the async-from-sync adapter used by `for await` over sync
//! iterables.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::array::create_array_from_list;
use crate::error::{VmError, VmResult};
use crate::object::{JsObject, ObjectKind};
use crate::operations::{self, call, get_method, get_v};
use crate::promise::{self, Settlement};
use crate::property::{PropertyDescriptor, PropertyKey};
use crate::realm::Realm;
use crate::symbol::Symbol;
use crate::value::Value;

/// Which `@@iterator` method `get_iterator` looks up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorHint {
    /// `Symbol.iterator`
    Sync,
    /// `Symbol.asyncIterator`, falling back to an adapted `Symbol.iterator`
    Async,
}

/// Running state of one iteration
#[derive(Debug, Clone)]
pub struct IteratorRecord {
    /// The iterator object
    pub iterator: Value,
    /// Its `next` method, read once up front
    pub next_method: Value,
    /// Set once the iterator reported completion or threw
    pub done: bool,
}

/// GetIteratorFromMethod
pub fn get_iterator_from_method(realm: &Realm, value: &Value, method: &Value) -> VmResult<IteratorRecord> {
    let iterator = call(realm, method, value, &[])?;
    if !iterator.is_object() {
        return Err(VmError::type_error("Result of the Symbol.iterator method is not an object"));
    }
    let next_method = get_v(realm, &iterator, &PropertyKey::string("next"))?;
    Ok(IteratorRecord {
        iterator,
        next_method,
        done: false,
    })
}

/// GetIterator
pub fn get_iterator(realm: &Realm, value: &Value, hint: IteratorHint) -> VmResult<IteratorRecord> {
    if hint == IteratorHint::Async {
        if let Some(method) = get_method(realm, value, &PropertyKey::from(Symbol::async_iterator()))? {
            return get_iterator_from_method(realm, value, &method);
        }
        let Some(sync_method) = get_method(realm, value, &PropertyKey::from(Symbol::iterator()))? else {
            return Err(VmError::type_error(format!("{} is not async iterable", value.describe())));
        };
        let sync_record = get_iterator_from_method(realm, value, &sync_method)?;
        return create_async_from_sync_iterator(realm, sync_record);
    }
    match get_method(realm, value, &PropertyKey::from(Symbol::iterator()))? {
        Some(method) => get_iterator_from_method(realm, value, &method),
        None => Err(VmError::type_error(format!("{} is not iterable", value.describe()))),
    }
}

/// IteratorNext
pub fn iterator_next(realm: &Realm, record: &IteratorRecord, value: Option<Value>) -> VmResult<Arc<JsObject>> {
    let args: &[Value] = match &value {
        Some(v) => std::slice::from_ref(v),
        None => &[],
    };
    let result = call(realm, &record.next_method, &record.iterator, args)?;
    match result {
        Value::Object(obj) => Ok(obj),
        other => Err(VmError::type_error(format!(
            "Iterator result {} is not an object",
            other.describe()
        ))),
    }
}

/// IteratorComplete
pub fn iterator_complete(realm: &Realm, result: &Arc<JsObject>) -> VmResult<bool> {
    Ok(result.get(realm, &PropertyKey::string("done"))?.to_boolean())
}

/// IteratorValue
pub fn iterator_value(realm: &Realm, result: &Arc<JsObject>) -> VmResult<Value> {
    result.get(realm, &PropertyKey::string("value"))
}

/// IteratorStep: the next result, or `None` once done. Any error marks the
/// record done so it is never closed afterwards.
pub fn iterator_step(realm: &Realm, record: &mut IteratorRecord) -> VmResult<Option<Arc<JsObject>>> {
    let result = match iterator_next(realm, record, None) {
        Ok(result) => result,
        Err(err) => {
            record.done = true;
            return Err(err);
        }
    };
    match iterator_complete(realm, &result) {
        Ok(true) => {
            record.done = true;
            Ok(None)
        }
        Ok(false) => Ok(Some(result)),
        Err(err) => {
            record.done = true;
            Err(err)
        }
    }
}

/// IteratorStepValue
pub fn iterator_step_value(realm: &Realm, record: &mut IteratorRecord) -> VmResult<Option<Value>> {
    let Some(result) = iterator_step(realm, record)? else {
        return Ok(None);
    };
    match iterator_value(realm, &result) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            record.done = true;
            Err(err)
        }
    }
}

/// IteratorClose: call `return` on the iterator. An error in `completion`
/// wins over anything `return` does.
pub fn iterator_close<T>(realm: &Realm, record: &IteratorRecord, completion: VmResult<T>) -> VmResult<T> {
    tracing::trace!(target: "otter::binding", abrupt = completion.is_err(), "closing iterator");
    let inner = match get_method(realm, &record.iterator, &PropertyKey::string("return")) {
        Ok(None) => return completion,
        Ok(Some(method)) => call(realm, &method, &record.iterator, &[]),
        Err(err) => Err(err),
    };
    let value = completion?;
    match inner? {
        Value::Object(_) => Ok(value),
        other => Err(VmError::type_error(format!(
            "Iterator result {} is not an object",
            other.describe()
        ))),
    }
}

/// CreateIterResultObject
pub fn create_iter_result_object(realm: &Realm, value: Value, done: bool) -> Value {
    let obj = realm.new_object();
    obj.define_raw(PropertyKey::string("value"), PropertyDescriptor::data(value));
    obj.define_raw(PropertyKey::string("done"), PropertyDescriptor::data(Value::boolean(done)));
    Value::Object(obj)
}

/// IteratorToList
pub fn iterate_to_list(realm: &Realm, record: &mut IteratorRecord) -> VmResult<Vec<Value>> {
    let mut values = Vec::new();
    while let Some(value) = iterator_step_value(realm, record)? {
        values.push(value);
    }
    Ok(values)
}

// === Array iterator ===

/// What an array iterator produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayIterationKind {
    /// Indices
    Keys,
    /// Elements
    Values,
    /// `[index, element]` pairs
    Entries,
}

/// Slots of an `%ArrayIteratorPrototype%` instance
#[derive(Debug)]
pub struct ArrayIteratorState {
    /// The array-like being walked; `None` once exhausted
    pub iterated: Option<Arc<JsObject>>,
    /// Next index to visit
    pub next_index: u64,
    /// What each step produces
    pub kind: ArrayIterationKind,
}

/// CreateArrayIterator
pub fn create_array_iterator(realm: &Realm, iterated: Arc<JsObject>, kind: ArrayIterationKind) -> Arc<JsObject> {
    Arc::new(JsObject::with_kind(
        Some(realm.intrinsics().array_iterator_prototype.clone()),
        ObjectKind::ArrayIterator(Mutex::new(ArrayIteratorState {
            iterated: Some(iterated),
            next_index: 0,
            kind,
        })),
    ))
}

/// `%ArrayIteratorPrototype%.next`
pub fn array_iterator_next(realm: &Realm, this: &Value) -> VmResult<Value> {
    let Some(ObjectKind::ArrayIterator(state)) = this.as_object().map(|o| o.kind()) else {
        return Err(VmError::type_error("next method called on incompatible receiver"));
    };
    let (iterated, index, kind) = {
        let state = state.lock();
        match &state.iterated {
            Some(iterated) => (iterated.clone(), state.next_index, state.kind),
            None => return Ok(create_iter_result_object(realm, Value::undefined(), true)),
        }
    };

    let len = match iterated.as_typed_array() {
        Some(ta) if ta.is_out_of_bounds() => {
            return Err(VmError::type_error("Cannot iterate a detached or out-of-bounds TypedArray"));
        }
        Some(ta) => ta.length() as u64,
        None => operations::length_of_array_like(realm, &iterated)?,
    };

    if index >= len {
        state.lock().iterated = None;
        return Ok(create_iter_result_object(realm, Value::undefined(), true));
    }
    state.lock().next_index = index + 1;

    let key = PropertyKey::from_u64(index);
    let result = match kind {
        ArrayIterationKind::Keys => Value::number(index as f64),
        ArrayIterationKind::Values => iterated.get(realm, &key)?,
        ArrayIterationKind::Entries => {
            let element = iterated.get(realm, &key)?;
            Value::Object(create_array_from_list(realm, [Value::number(index as f64), element]))
        }
    };
    Ok(create_iter_result_object(realm, result, false))
}

// === Async-from-sync iterator ===

/// CreateAsyncFromSyncIterator
pub fn create_async_from_sync_iterator(realm: &Realm, sync_record: IteratorRecord) -> VmResult<IteratorRecord> {
    let iterator = Arc::new(JsObject::with_kind(
        Some(realm.intrinsics().async_from_sync_iterator_prototype.clone()),
        ObjectKind::AsyncFromSyncIterator(Mutex::new(sync_record)),
    ));
    let next_method = iterator.get(realm, &PropertyKey::string("next"))?;
    Ok(IteratorRecord {
        iterator: Value::Object(iterator),
        next_method,
        done: false,
    })
}

fn sync_record_of(this: &Value) -> VmResult<IteratorRecord> {
    match this.as_object().map(|o| o.kind()) {
        Some(ObjectKind::AsyncFromSyncIterator(record)) => Ok(record.lock().clone()),
        _ => Err(VmError::type_error("receiver is not an Async-from-Sync Iterator")),
    }
}

/// Reject `promise` with the value of `err`
fn reject_with(realm: &Realm, promise: &Arc<JsObject>, err: VmError) -> VmResult<Value> {
    promise::reject_promise(realm, promise, realm.error_to_value(err))?;
    Ok(Value::Object(promise.clone()))
}

/// `%AsyncFromSyncIteratorPrototype%.next`
pub fn async_from_sync_next(realm: &Realm, this: &Value, value: Option<Value>) -> VmResult<Value> {
    let promise = promise::new_promise(realm);
    let record = sync_record_of(this)?;
    match iterator_next(realm, &record, value) {
        Ok(result) => async_from_sync_continuation(realm, &result, &promise, record, true),
        Err(err) => reject_with(realm, &promise, err),
    }
}

/// `%AsyncFromSyncIteratorPrototype%.return`
pub fn async_from_sync_return(realm: &Realm, this: &Value, value: Option<Value>) -> VmResult<Value> {
    let promise = promise::new_promise(realm);
    let record = sync_record_of(this)?;
    let method = match get_method(realm, &record.iterator, &PropertyKey::string("return")) {
        Ok(Some(method)) => method,
        Ok(None) => {
            let done = create_iter_result_object(realm, value.unwrap_or_default(), true);
            promise::resolve_promise(realm, &promise, done)?;
            return Ok(Value::Object(promise));
        }
        Err(err) => return reject_with(realm, &promise, err),
    };
    let args: Vec<Value> = value.into_iter().collect();
    match call(realm, &method, &record.iterator, &args) {
        Ok(Value::Object(result)) => async_from_sync_continuation(realm, &result, &promise, record, false),
        Ok(_) => reject_with(
            realm,
            &promise,
            VmError::type_error("iterator.return() did not return an object"),
        ),
        Err(err) => reject_with(realm, &promise, err),
    }
}

/// `%AsyncFromSyncIteratorPrototype%.throw`
pub fn async_from_sync_throw(realm: &Realm, this: &Value, value: Option<Value>) -> VmResult<Value> {
    let promise = promise::new_promise(realm);
    let record = sync_record_of(this)?;
    let method = match get_method(realm, &record.iterator, &PropertyKey::string("throw")) {
        Ok(Some(method)) => method,
        Ok(None) => {
            // The protocol was violated; close the sync iterator first.
            if let Err(err) = iterator_close(realm, &record, Ok(())) {
                return reject_with(realm, &promise, err);
            }
            return reject_with(
                realm,
                &promise,
                VmError::type_error("The iterator does not provide a 'throw' method"),
            );
        }
        Err(err) => return reject_with(realm, &promise, err),
    };
    let args: Vec<Value> = value.into_iter().collect();
    match call(realm, &method, &record.iterator, &args) {
        Ok(Value::Object(result)) => async_from_sync_continuation(realm, &result, &promise, record, true),
        Ok(_) => reject_with(
            realm,
            &promise,
            VmError::type_error("iterator.throw() did not return an object"),
        ),
        Err(err) => reject_with(realm, &promise, err),
    }
}

/// AsyncFromSyncIteratorContinuation: await the step's value, then settle
/// `promise` with an iterator result. A rejected value closes the sync
/// iterator when `close_on_rejection` is set and the step was not final.
fn async_from_sync_continuation(
    realm: &Realm,
    result: &Arc<JsObject>,
    promise: &Arc<JsObject>,
    record: IteratorRecord,
    close_on_rejection: bool,
) -> VmResult<Value> {
    let done = match iterator_complete(realm, result) {
        Ok(done) => done,
        Err(err) => return reject_with(realm, promise, err),
    };
    let value = match iterator_value(realm, result) {
        Ok(value) => value,
        Err(err) => return reject_with(realm, promise, err),
    };
    let close = close_on_rejection && !done;
    let wrapper = match promise::promise_resolve(realm, value) {
        Ok(wrapper) => wrapper,
        Err(err) if close => {
            let err = match iterator_close(realm, &record, Err::<(), _>(err)) {
                Err(err) => err,
                Ok(()) => VmError::internal("iterator close swallowed an error"),
            };
            return reject_with(realm, promise, err);
        }
        Err(err) => return reject_with(realm, promise, err),
    };

    let target = promise.clone();
    promise::then_native(
        realm,
        &wrapper,
        Box::new(move |realm: &Realm, outcome: Settlement| match outcome {
            Ok(value) => {
                let result = create_iter_result_object(realm, value, done);
                promise::resolve_promise(realm, &target, result)
            }
            Err(reason) => {
                if close {
                    let _ = iterator_close(realm, &record, Err::<(), _>(VmError::exception(reason.clone())));
                }
                promise::reject_promise(realm, &target, reason)
            }
        }),
    )?;
    Ok(Value::Object(promise.clone()))
}
