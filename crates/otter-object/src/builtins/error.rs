//! Native error constructors and prototypes

use std::sync::Arc;

use super::{BuiltInBuilder, arg, install_global};
use crate::convert::to_string;
use crate::error::{ErrorKind, VmError, VmResult};
use crate::intrinsics::Intrinsics;
use crate::object::JsObject;
use crate::property::{PropertyAttributes, PropertyKey};
use crate::realm::Realm;
use crate::value::Value;

const KINDS: [ErrorKind; 5] = [
    ErrorKind::Error,
    ErrorKind::TypeError,
    ErrorKind::RangeError,
    ErrorKind::ReferenceError,
    ErrorKind::SyntaxError,
];

/// `Error.prototype.toString`
fn error_proto_to_string(realm: &Realm, this: &Value, _args: &[Value]) -> VmResult<Value> {
    let Some(obj) = this.as_object() else {
        return Err(VmError::type_error(
            "Error.prototype.toString called on non-object",
        ));
    };
    let name = obj.get(realm, &PropertyKey::string("name"))?;
    let name = if name.is_undefined() {
        "Error".to_string()
    } else {
        to_string(realm, &name)?.as_str().to_string()
    };
    let message = obj.get(realm, &PropertyKey::string("message"))?;
    let message = if message.is_undefined() {
        String::new()
    } else {
        to_string(realm, &message)?.as_str().to_string()
    };
    let text = match (name.is_empty(), message.is_empty()) {
        (true, _) => message,
        (_, true) => name,
        _ => format!("{}: {}", name, message),
    };
    Ok(Value::String(text.into()))
}

fn builder(intrinsics: &Intrinsics, kind: ErrorKind) -> BuiltInBuilder {
    BuiltInBuilder::new(
        &intrinsics.function_prototype,
        intrinsics.error_prototype_for(kind),
        kind.name(),
    )
}

/// Populate `Error.prototype` and the native error prototypes
pub fn init_prototypes(intrinsics: &Intrinsics) {
    for kind in KINDS {
        let b = builder(intrinsics, kind)
            .property(
                PropertyKey::string("name"),
                Value::string(kind.name()),
                PropertyAttributes::builtin(),
            )
            .property(
                PropertyKey::string("message"),
                Value::string(""),
                PropertyAttributes::builtin(),
            );
        if kind == ErrorKind::Error {
            b.method("toString", error_proto_to_string, 0);
        }
    }
}

fn construct_error(realm: &Realm, kind: ErrorKind, args: &[Value]) -> VmResult<Value> {
    let message = arg(args, 0);
    let message = if message.is_undefined() {
        String::new()
    } else {
        to_string(realm, &message)?.as_str().to_string()
    };
    let error = realm.create_error(kind, &message);
    if let Value::Object(options) = arg(args, 1) {
        let cause_key = PropertyKey::string("cause");
        if options.has_property(realm, &cause_key)? {
            let cause = options.get(realm, &cause_key)?;
            error.define_raw(
                cause_key,
                crate::property::PropertyDescriptor::data_with_attrs(cause, PropertyAttributes::builtin()),
            );
        }
    }
    Ok(Value::Object(error))
}

/// Install `Error`, `TypeError`, `RangeError`, `ReferenceError` and
/// `SyntaxError`
pub fn install(intrinsics: &Intrinsics, global: &Arc<JsObject>) {
    for kind in KINDS {
        let ctor = builder(intrinsics, kind)
            .constructor_fn(move |realm, _this, args| construct_error(realm, kind, args), 1)
            .build();
        install_global(global, kind.name(), ctor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::call;

    #[test]
    fn test_error_constructor_and_to_string() {
        let realm = Realm::new();
        let ctor = realm
            .global()
            .get(&realm, &PropertyKey::string("RangeError"))
            .unwrap();
        let err = call(&realm, &ctor, &Value::undefined(), &[Value::string("out")]).unwrap();
        assert_eq!(err.as_object().unwrap().error_kind(), Some(ErrorKind::RangeError));
        let text = crate::operations::invoke(&realm, &err, &PropertyKey::string("toString"), &[]).unwrap();
        assert_eq!(text, Value::string("RangeError: out"));
    }

    #[test]
    fn test_error_cause_option() {
        let realm = Realm::new();
        let ctor = realm.global().get(&realm, &PropertyKey::string("Error")).unwrap();
        let options = realm.new_object();
        options.set(&realm, PropertyKey::string("cause"), Value::int32(3)).unwrap();
        let err = call(
            &realm,
            &ctor,
            &Value::undefined(),
            &[Value::string("m"), Value::Object(options)],
        )
        .unwrap();
        let err = err.as_object().unwrap();
        assert_eq!(err.get(&realm, &PropertyKey::string("cause")).unwrap(), Value::int32(3));
    }
}
