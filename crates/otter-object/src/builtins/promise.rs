//! `Promise` constructor, `Promise.resolve`, `Promise.reject` and
//! `Promise.prototype.then`

use std::sync::Arc;

use super::{BuiltInBuilder, arg, install_global};
use crate::error::{VmError, VmResult};
use crate::intrinsics::Intrinsics;
use crate::object::JsObject;
use crate::operations::call;
use crate::promise::{
    create_resolving_functions, new_promise, perform_then, promise_rejected, promise_resolve,
};
use crate::property::{PropertyAttributes, PropertyKey};
use crate::realm::Realm;
use crate::symbol::Symbol;
use crate::value::Value;

fn promise_constructor(realm: &Realm, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let executor = arg(args, 0);
    if !executor.is_callable() {
        return Err(VmError::type_error(format!(
            "Promise resolver {} is not a function",
            executor.describe()
        )));
    }
    let promise = new_promise(realm);
    let (resolve, reject) = create_resolving_functions(realm, &promise);
    if let Err(err) = call(realm, &executor, &Value::undefined(), &[resolve, reject.clone()]) {
        call(realm, &reject, &Value::undefined(), &[realm.error_to_value(err)])?;
    }
    Ok(Value::Object(promise))
}

fn promise_proto_then(realm: &Realm, this: &Value, args: &[Value]) -> VmResult<Value> {
    let promise = match this.as_object() {
        Some(obj) if obj.as_promise().is_some() => obj,
        _ => {
            return Err(VmError::type_error(format!(
                "Method Promise.prototype.then called on incompatible receiver {}",
                this.describe()
            )));
        }
    };
    let derived = perform_then(realm, promise, arg(args, 0), arg(args, 1))?;
    Ok(Value::Object(derived))
}

/// Populate `Promise.prototype`
pub fn init_prototype(intrinsics: &Intrinsics) {
    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.promise_prototype,
        "Promise",
    )
    .method("then", promise_proto_then, 2)
    .property(
        PropertyKey::Symbol(Symbol::to_string_tag()),
        Value::string("Promise"),
        PropertyAttributes {
            writable: false,
            enumerable: false,
            configurable: true,
        },
    );
}

/// Install the `Promise` constructor
pub fn install(intrinsics: &Intrinsics, global: &Arc<JsObject>) {
    let ctor = BuiltInBuilder::new(
        &intrinsics.function_prototype,
        &intrinsics.promise_prototype,
        "Promise",
    )
    .constructor_fn(promise_constructor, 1)
    .static_method(
        "resolve",
        |realm, _, args| Ok(Value::Object(promise_resolve(realm, arg(args, 0))?)),
        1,
    )
    .static_method(
        "reject",
        |realm, _, args| Ok(Value::Object(promise_rejected(realm, arg(args, 0)))),
        1,
    )
    .build();
    install_global(global, "Promise", ctor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::invoke;
    use crate::promise::PromiseState;

    fn promise_ctor(realm: &Realm) -> Value {
        realm.global().get(realm, &PropertyKey::string("Promise")).unwrap()
    }

    #[test]
    fn test_executor_throw_rejects() {
        let realm = Realm::new();
        let executor = realm.new_native_function("executor", |_, _, _| {
            Err(VmError::exception(Value::string("boom")))
        });
        let promise = call(&realm, &promise_ctor(&realm), &Value::undefined(), &[Value::Object(executor)]).unwrap();
        let state = promise.as_object().unwrap().as_promise().unwrap().state();
        assert_eq!(state, PromiseState::Rejected(Value::string("boom")));
    }

    #[test]
    fn test_non_callable_executor() {
        let realm = Realm::new();
        let err = call(&realm, &promise_ctor(&realm), &Value::undefined(), &[Value::int32(1)]).unwrap_err();
        assert!(matches!(err, VmError::TypeError(_)));
    }

    #[test]
    fn test_then_chains_value() {
        let realm = Realm::new();
        let resolve = invoke(
            &realm,
            &promise_ctor(&realm),
            &PropertyKey::string("resolve"),
            &[Value::int32(2)],
        )
        .unwrap();
        let double = realm.new_native_function("double", |_, _, args| {
            Ok(Value::number(args[0].as_number().unwrap_or(0.0) * 2.0))
        });
        let derived = invoke(&realm, &resolve, &PropertyKey::string("then"), &[Value::Object(double)]).unwrap();
        realm.run_jobs();
        let state = derived.as_object().unwrap().as_promise().unwrap().state();
        assert_eq!(state, PromiseState::Fulfilled(Value::int32(4)));
    }
}
