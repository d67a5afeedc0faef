//! Assertion helpers in the shape of the test262 harness
//!
//! `assert.sameValue`, `assert.throws` and `verifyProperty` become plain
//! functions returning [`HarnessResult`], so scenarios can use `?`.

use std::sync::Arc;

use otter_object::{ErrorKind, JsObject, PropertyKey, Realm, Value, VmError, VmResult};
use thiserror::Error;

/// A failed scenario assertion
#[derive(Debug, Error)]
pub enum HarnessError {
    /// `assert.sameValue` mismatch
    #[error("{message}: expected SameValue({actual}, {expected}) to be true")]
    NotSameValue {
        /// Assertion label
        message: String,
        /// Rendered actual value
        actual: String,
        /// Rendered expected value
        expected: String,
    },

    /// `assert.throws` saw no error
    #[error("{message}: expected a {expected} to be thrown but no exception was thrown at all")]
    DidNotThrow {
        /// Assertion label
        message: String,
        /// Expected error constructor name
        expected: &'static str,
    },

    /// `assert.throws` saw the wrong error
    #[error("{message}: expected a {expected} but got {actual}")]
    WrongError {
        /// Assertion label
        message: String,
        /// Expected error constructor name
        expected: &'static str,
        /// The error that was raised
        actual: String,
    },

    /// Any other failed check
    #[error("{0}")]
    Assertion(String),

    /// The engine raised an error the scenario did not expect
    #[error("unexpected error: {0}")]
    Vm(#[from] VmError),
}

/// Result of a scenario or a single assertion
pub type HarnessResult = Result<(), HarnessError>;

/// `assert(condition, message)`
pub fn assert_true(condition: bool, message: &str) -> HarnessResult {
    if condition {
        Ok(())
    } else {
        Err(HarnessError::Assertion(message.to_string()))
    }
}

/// `assert.sameValue(actual, expected, message)`
pub fn assert_same_value(actual: &Value, expected: &Value, message: &str) -> HarnessResult {
    if actual == expected {
        return Ok(());
    }
    Err(HarnessError::NotSameValue {
        message: message.to_string(),
        actual: format!("{:?}", actual),
        expected: format!("{:?}", expected),
    })
}

/// `assert.throws(kind, fn, message)`, for an operation already performed.
///
/// A thrown error object is matched by its class, so a `TypeError` raised
/// natively and one constructed by user code both satisfy `TypeError`.
pub fn assert_throws<T>(expected: ErrorKind, result: VmResult<T>, message: &str) -> HarnessResult {
    match result {
        Ok(_) => Err(HarnessError::DidNotThrow {
            message: message.to_string(),
            expected: expected.name(),
        }),
        Err(err) if err.kind() == Some(expected) => Ok(()),
        Err(err) => Err(HarnessError::WrongError {
            message: message.to_string(),
            expected: expected.name(),
            actual: err.to_string(),
        }),
    }
}

/// Expected shape of a property for [`verify_property`]. Unset fields are
/// not checked.
#[derive(Debug, Clone, Default)]
pub struct PropertyExpectation {
    value: Option<Value>,
    writable: Option<bool>,
    enumerable: Option<bool>,
    configurable: Option<bool>,
}

impl PropertyExpectation {
    /// Expect nothing in particular
    pub fn new() -> Self {
        Self::default()
    }

    /// Expected `[[Value]]`
    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Expected `[[Writable]]`
    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = Some(writable);
        self
    }

    /// Expected `[[Enumerable]]`
    pub fn enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = Some(enumerable);
        self
    }

    /// Expected `[[Configurable]]`
    pub fn configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }

    /// `{writable, enumerable, configurable}` all true
    pub fn plain(value: Value) -> Self {
        Self::new().value(value).writable(true).enumerable(true).configurable(true)
    }
}

/// `verifyProperty(obj, key, expected)`.
///
/// Checks the descriptor and then the observable behavior: a non-writable
/// property rejects a write, enumerability shows in the own enumerable keys,
/// and a configurable property is deleted at the end (as test262 does).
pub fn verify_property(
    realm: &Realm,
    obj: &Arc<JsObject>,
    key: &PropertyKey,
    expected: &PropertyExpectation,
) -> HarnessResult {
    let Some(desc) = obj.get_own_property(key) else {
        return Err(HarnessError::Assertion(format!("obj should have an own property {}", key)));
    };

    if let Some(value) = &expected.value {
        let actual = desc.value().cloned().unwrap_or_default();
        assert_same_value(&actual, value, &format!("descriptor value of {}", key))?;
    }

    if let Some(writable) = expected.writable {
        assert_true(
            desc.is_writable() == writable,
            &format!("descriptor should {}be writable: {}", if writable { "" } else { "not " }, key),
        )?;
        if !writable && desc.is_data() {
            let before = obj.get(realm, key)?;
            let accepted = obj.set(realm, key.clone(), Value::string("unlikelyValue"))?;
            let after = obj.get(realm, key)?;
            assert_true(!accepted && after == before, &format!("{} should not be writable", key))?;
        }
    }

    if let Some(enumerable) = expected.enumerable {
        assert_true(
            desc.enumerable == enumerable,
            &format!("descriptor should {}be enumerable: {}", if enumerable { "" } else { "not " }, key),
        )?;
        let listed = obj.own_enumerable_keys().contains(key);
        assert_true(listed == enumerable, &format!("enumeration of {} disagrees with its descriptor", key))?;
    }

    if let Some(configurable) = expected.configurable {
        assert_true(
            desc.configurable == configurable,
            &format!("descriptor should {}be configurable: {}", if configurable { "" } else { "not " }, key),
        )?;
        let deleted = obj.delete(key);
        assert_true(deleted == configurable, &format!("delete of {} disagrees with its descriptor", key))?;
        if configurable {
            assert_true(obj.get_own_property(key).is_none(), &format!("{} should be deleted", key))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use otter_object::PartialDescriptor;

    #[test]
    fn test_same_value_distinguishes_zeroes() {
        assert!(assert_same_value(&Value::number(f64::NAN), &Value::number(f64::NAN), "nan").is_ok());
        let err = assert_same_value(&Value::number(0.0), &Value::number(-0.0), "zero").unwrap_err();
        assert!(matches!(err, HarnessError::NotSameValue { .. }));
    }

    #[test]
    fn test_assert_throws_checks_kind() {
        let ok: VmResult<()> = Err(VmError::type_error("x"));
        assert!(assert_throws(ErrorKind::TypeError, ok, "t").is_ok());

        let wrong: VmResult<()> = Err(VmError::range_error("x"));
        assert!(matches!(
            assert_throws(ErrorKind::TypeError, wrong, "t"),
            Err(HarnessError::WrongError { .. })
        ));
        assert!(matches!(
            assert_throws(ErrorKind::TypeError, Ok(1), "t"),
            Err(HarnessError::DidNotThrow { .. })
        ));
    }

    #[test]
    fn test_verify_property_deletes_configurable() {
        let realm = Realm::new();
        let obj = realm.new_object();
        obj.set(&realm, PropertyKey::string("x"), Value::int32(1)).unwrap();
        verify_property(&realm, &obj, &PropertyKey::string("x"), &PropertyExpectation::plain(Value::int32(1)))
            .unwrap();
        assert!(obj.get_own_property(&PropertyKey::string("x")).is_none());
    }

    #[test]
    fn test_verify_property_detects_writable_mismatch() {
        let realm = Realm::new();
        let obj = realm.new_object();
        obj.define_own_property(&realm, PropertyKey::string("x"), &PartialDescriptor::new().value(Value::int32(1)))
            .unwrap();
        let expected = PropertyExpectation::new().writable(true);
        assert!(verify_property(&realm, &obj, &PropertyKey::string("x"), &expected).is_err());

        let frozen = PropertyExpectation::new().value(Value::int32(1)).writable(false).configurable(false);
        verify_property(&realm, &obj, &PropertyKey::string("x"), &frozen).unwrap();
    }
}
