//! Iteration prototypes: `%IteratorPrototype%`, `%AsyncIteratorPrototype%`,
//! `%ArrayIteratorPrototype%`, `%AsyncFromSyncIteratorPrototype%`,
//! `%GeneratorPrototype%` and `%AsyncGeneratorPrototype%`

use std::sync::Arc;

use super::{BuiltInBuilder, arg};
use crate::async_generator::JsAsyncGenerator;
use crate::error::{VmError, VmResult};
use crate::generator::{JsGenerator, Resumption};
use crate::intrinsics::Intrinsics;
use crate::iterator::{
    array_iterator_next, async_from_sync_next, async_from_sync_return, async_from_sync_throw,
    create_iter_result_object,
};
use crate::object::ObjectKind;
use crate::promise;
use crate::property::{PropertyAttributes, PropertyKey};
use crate::realm::Realm;
use crate::symbol::Symbol;
use crate::value::Value;

fn this_generator(this: &Value, method: &str) -> VmResult<Arc<JsGenerator>> {
    match this.as_object().map(|o| o.kind()) {
        Some(ObjectKind::Generator(generator)) => Ok(generator.clone()),
        _ => Err(VmError::type_error(format!(
            "Generator.prototype.{} called on incompatible receiver {}",
            method,
            this.describe()
        ))),
    }
}

fn generator_resume(realm: &Realm, this: &Value, method: &str, resumption: Resumption) -> VmResult<Value> {
    let generator = this_generator(this, method)?;
    let result = generator.resume(realm, resumption)?;
    Ok(create_iter_result_object(realm, result.value, result.done))
}

/// Resume an async generator; a bad receiver yields a rejected promise
/// rather than a synchronous throw.
fn async_generator_enqueue(realm: &Realm, this: &Value, method: &str, resumption: Resumption) -> VmResult<Value> {
    let generator: Option<Arc<JsAsyncGenerator>> = match this.as_object().map(|o| o.kind()) {
        Some(ObjectKind::AsyncGenerator(generator)) => Some(generator.clone()),
        _ => None,
    };
    match generator {
        Some(generator) => Ok(Value::Object(generator.enqueue(realm, resumption)?)),
        None => {
            let reason = realm.error_to_value(VmError::type_error(format!(
                "AsyncGenerator.prototype.{} called on incompatible receiver {}",
                method,
                this.describe()
            )));
            Ok(Value::Object(promise::promise_rejected(realm, reason)))
        }
    }
}

fn to_string_tag(tag: &str) -> (PropertyKey, Value, PropertyAttributes) {
    (
        PropertyKey::Symbol(Symbol::to_string_tag()),
        Value::string(tag),
        PropertyAttributes {
            writable: false,
            enumerable: false,
            configurable: true,
        },
    )
}

/// Populate the iteration prototypes
pub fn init_prototypes(intrinsics: &Intrinsics) {
    let fn_proto = &intrinsics.function_prototype;

    BuiltInBuilder::new(fn_proto, &intrinsics.iterator_prototype, "Iterator").symbol_method(
        Symbol::iterator(),
        "[Symbol.iterator]",
        |_, this, _| Ok(this.clone()),
        0,
    );
    BuiltInBuilder::new(fn_proto, &intrinsics.async_iterator_prototype, "AsyncIterator").symbol_method(
        Symbol::async_iterator(),
        "[Symbol.asyncIterator]",
        |_, this, _| Ok(this.clone()),
        0,
    );

    let (key, value, attrs) = to_string_tag("Array Iterator");
    BuiltInBuilder::new(fn_proto, &intrinsics.array_iterator_prototype, "Array Iterator")
        .method("next", |realm, this, _| array_iterator_next(realm, this), 0)
        .property(key, value, attrs);

    BuiltInBuilder::new(
        fn_proto,
        &intrinsics.async_from_sync_iterator_prototype,
        "AsyncFromSyncIterator",
    )
    .method("next", |realm, this, args| async_from_sync_next(realm, this, args.first().cloned()), 1)
    .method("return", |realm, this, args| async_from_sync_return(realm, this, args.first().cloned()), 1)
    .method("throw", |realm, this, args| async_from_sync_throw(realm, this, args.first().cloned()), 1);

    let (key, value, attrs) = to_string_tag("Generator");
    BuiltInBuilder::new(fn_proto, &intrinsics.generator_prototype, "Generator")
        .method(
            "next",
            |realm, this, args| generator_resume(realm, this, "next", Resumption::Next(arg(args, 0))),
            1,
        )
        .method(
            "return",
            |realm, this, args| generator_resume(realm, this, "return", Resumption::Return(arg(args, 0))),
            1,
        )
        .method(
            "throw",
            |realm, this, args| generator_resume(realm, this, "throw", Resumption::Throw(arg(args, 0))),
            1,
        )
        .property(key, value, attrs);

    let (key, value, attrs) = to_string_tag("AsyncGenerator");
    BuiltInBuilder::new(fn_proto, &intrinsics.async_generator_prototype, "AsyncGenerator")
        .method(
            "next",
            |realm, this, args| async_generator_enqueue(realm, this, "next", Resumption::Next(arg(args, 0))),
            1,
        )
        .method(
            "return",
            |realm, this, args| {
                async_generator_enqueue(realm, this, "return", Resumption::Return(arg(args, 0)))
            },
            1,
        )
        .method(
            "throw",
            |realm, this, args| async_generator_enqueue(realm, this, "throw", Resumption::Throw(arg(args, 0))),
            1,
        )
        .property(key, value, attrs);
}
