//! Scenario catalog
//!
//! Each scenario mirrors one test from the conformance corpus and is keyed
//! by that test's path. The body drives the object model directly instead of
//! evaluating source text.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use otter_object::array::create_array_from_list;
use otter_object::async_generator::create_async_generator;
use otter_object::binding::{ArrayPattern, ObjectPattern, constant, thunk};
use otter_object::generator::create_generator;
use otter_object::iterator::{IteratorHint, get_iterator, iterator_next, iterator_value};
use otter_object::operations::{call, enumerate_object_properties, invoke};
use otter_object::promise::{self, PromiseState};
use otter_object::{
    BindingMode, BindingPattern, Environment, ErrorKind, GeneratorBody, GeneratorStep, JsObject,
    PartialDescriptor, PropertyDescriptor, PropertyKey, Realm, Resumption, Value, VmError,
    VmResult, bind_pattern,
};

use crate::harness::{
    HarnessError, HarnessResult, PropertyExpectation, assert_same_value, assert_throws, assert_true,
    verify_property,
};

/// Scenario entry point
pub type ScenarioFn = fn(&Realm) -> HarnessResult;

/// One catalogued scenario
#[derive(Clone, Copy)]
pub struct Scenario {
    /// Corpus path the scenario mirrors
    pub path: &'static str,
    /// Feature tags, used for skipping and per-feature reporting
    pub features: &'static [&'static str],
    /// Settles through the job queue
    pub is_async: bool,
    /// Scenario body
    pub run: ScenarioFn,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("path", &self.path)
            .field("features", &self.features)
            .field("is_async", &self.is_async)
            .finish()
    }
}

const fn scenario(path: &'static str, features: &'static [&'static str], run: ScenarioFn) -> Scenario {
    Scenario {
        path,
        features,
        is_async: false,
        run,
    }
}

const fn async_scenario(path: &'static str, features: &'static [&'static str], run: ScenarioFn) -> Scenario {
    Scenario {
        path,
        features,
        is_async: true,
        run,
    }
}

/// Every known scenario, in corpus order
pub static SCENARIOS: &[Scenario] = &[
    scenario("built-ins/Array/length/S15.4.5.2_A3_T4.js", &[], array_length_range_error),
    scenario("built-ins/Array/length/define-own-prop-length-no-value-order.js", &[], array_length_truncation_stops),
    scenario("built-ins/Array/prototype/indexOf/15.4.4.14-5-16.js", &[], array_index_of_infinity),
    scenario("built-ins/Array/prototype/reduce/15.4.4.21-4-15.js", &[], array_reduce_missing_callback),
    scenario("built-ins/Array/prototype/reduce/15.4.4.21-4-5.js", &[], array_reduce_number_callback),
    scenario("built-ins/Array/prototype/slice/S15.4.4.10_A2.1_T1.js", &[], array_slice_fractional_start),
    scenario("built-ins/AsyncFromSyncIteratorPrototype/next/yield-promise-fulfilled.js", &["async-iteration"], async_from_sync_unwraps),
    async_scenario("built-ins/AsyncGeneratorPrototype/next/request-queue-order.js", &["async-iteration"], async_generator_queue_order),
    async_scenario("built-ins/AsyncGeneratorPrototype/return/return-state-completed.js", &["async-iteration"], async_generator_return_completed),
    scenario("built-ins/GeneratorPrototype/return/from-state-completed.js", &["generators"], generator_return_completed),
    scenario("built-ins/GeneratorPrototype/throw/from-state-suspended-start.js", &["generators"], generator_throw_suspended_start),
    scenario("built-ins/Object/defineProperties/15.2.3.7-6-a-270.js", &[], define_properties_non_writable_array_prop),
    scenario("built-ins/Object/defineProperty/15.2.3.6-3-247.js", &[], define_property_inherited_set_field),
    scenario("built-ins/Object/defineProperty/15.2.3.6-4-45.js", &[], define_property_same_nan),
    scenario("built-ins/Object/getOwnPropertyDescriptor/15.2.3.3-4-33.js", &[], to_locale_string_descriptor),
    scenario("built-ins/Object/keys/order-after-define-property.js", &[], own_keys_order),
    scenario("built-ins/String/prototype/charAt/S15.5.4.4_A4_T1.js", &[], string_char_at_is_substring),
    scenario("built-ins/TypedArray/prototype/slice/BigInt/result-does-not-copy-ordinary-properties.js", &["BigInt", "TypedArray"], bigint_slice_skips_ordinary_props),
    scenario("built-ins/TypedArrayConstructors/ctors-bigint/buffer-arg/is-referenced-sab.js", &["BigInt", "SharedArrayBuffer", "TypedArray"], bigint_views_share_sab),
    scenario("built-ins/TypedArrayConstructors/internals/DefineOwnProperty/key-is-numericindex-desc-not-writable.js", &["TypedArray"], typed_array_define_not_writable),
    scenario("built-ins/TypedArrayConstructors/internals/Set/key-is-minus-zero.js", &["TypedArray"], typed_array_minus_zero_key),
    scenario("built-ins/parseFloat/S15.1.2.3_A7.5.js", &[], parse_float_dont_enum),
    scenario("jit-test/sharedbuf/sab-gating.js", &["SharedArrayBuffer"], shared_memory_gating),
    scenario("language/expressions/arrow-function/dstr/obj-ptrn-prop-id-init.js", &["destructuring-binding"], obj_ptrn_prop_id_init),
    scenario("language/expressions/assignment/dstr/array-elision-val-num.js", &["destructuring-assignment"], array_elision_val_num),
    scenario("language/expressions/function/dstr/dflt-obj-ptrn-rest-val-obj.js", &["destructuring-binding", "object-rest"], obj_ptrn_rest_val_obj),
    async_scenario("language/statements/for-await-of/async-gen-dstr-const-obj-ptrn-prop-id-init-throws.js", &["async-iteration", "destructuring-binding"], for_await_dstr_init_throws),
    scenario("language/statements/function/dstr-ary-ptrn-elem-id-iter-done.js", &["destructuring-binding"], ary_ptrn_elem_id_iter_done),
];

/// Look a scenario up by path
pub fn find(path: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.path == path)
}

// === Helpers ===

fn key(name: &str) -> PropertyKey {
    PropertyKey::string(name)
}

fn global(realm: &Realm, name: &str) -> VmResult<Value> {
    realm.global().get(realm, &key(name))
}

/// Call a global constructor function with `args`
fn construct(realm: &Realm, name: &str, args: &[Value]) -> Result<Arc<JsObject>, HarnessError> {
    let ctor = global(realm, name)?;
    match call(realm, &ctor, &Value::undefined(), args)? {
        Value::Object(obj) => Ok(obj),
        other => Err(HarnessError::Assertion(format!("{} produced {:?}", name, other))),
    }
}

fn object_static(realm: &Realm, name: &str) -> VmResult<Value> {
    global(realm, "Object")?
        .as_object()
        .map(|ctor| ctor.get(realm, &key(name)))
        .unwrap_or_else(|| Ok(Value::undefined()))
}

fn promise_state(value: &Value) -> Result<PromiseState, HarnessError> {
    value
        .as_object()
        .and_then(|obj| obj.as_promise())
        .map(|p| p.state())
        .ok_or_else(|| HarnessError::Assertion(format!("{:?} is not a promise", value)))
}

/// `{value, done}` of a fulfilled iterator-result promise
fn fulfilled_step(realm: &Realm, value: &Value) -> Result<(Value, bool), HarnessError> {
    match promise_state(value)? {
        PromiseState::Fulfilled(Value::Object(result)) => Ok((
            result.get(realm, &key("value"))?,
            result.get(realm, &key("done"))?.to_boolean(),
        )),
        other => Err(HarnessError::Assertion(format!("expected a fulfilled iterator result, got {:?}", other))),
    }
}

fn sync_step(realm: &Realm, value: &Value) -> Result<(Value, bool), HarnessError> {
    let result = value
        .as_object()
        .ok_or_else(|| HarnessError::Assertion("iterator result is not an object".into()))?;
    Ok((result.get(realm, &key("value"))?, result.get(realm, &key("done"))?.to_boolean()))
}

fn test262_error(realm: &Realm) -> Value {
    let error = realm.new_object();
    error.define_raw(
        key("name"),
        PropertyDescriptor::data(Value::string("Test262Error")),
    );
    Value::Object(error)
}

// === Object ===

fn to_locale_string_descriptor(realm: &Realm) -> HarnessResult {
    let proto = Value::Object(realm.intrinsics().object_prototype.clone());
    let gopd = object_static(realm, "getOwnPropertyDescriptor")?;
    let desc = call(realm, &gopd, &Value::undefined(), &[proto.clone(), Value::string("toLocaleString")])?;
    let desc = desc
        .as_object()
        .ok_or_else(|| HarnessError::Assertion("descriptor is undefined".into()))?;
    let method = realm.intrinsics().object_prototype.get(realm, &key("toLocaleString"))?;

    assert_same_value(&desc.get(realm, &key("value"))?, &method, "desc.value")?;
    assert_same_value(&desc.get(realm, &key("writable"))?, &Value::boolean(true), "desc.writable")?;
    assert_same_value(&desc.get(realm, &key("enumerable"))?, &Value::boolean(false), "desc.enumerable")?;
    assert_same_value(&desc.get(realm, &key("configurable"))?, &Value::boolean(true), "desc.configurable")
}

fn define_property_inherited_set_field(realm: &Realm) -> HarnessResult {
    let obj = realm.new_object();
    let proto = realm.new_object();
    let setter = realm.new_native_function("set", |_, _, _| Ok(Value::undefined()));
    proto.define_raw(
        key("set"),
        PropertyDescriptor::accessor(None, Some(Value::Object(setter)), false, false),
    );
    let child = Arc::new(JsObject::new(Some(proto)));

    let define = object_static(realm, "defineProperty")?;
    call(
        realm,
        &define,
        &Value::undefined(),
        &[Value::Object(obj.clone()), Value::string("property"), Value::Object(child)],
    )?;

    let has_own = invoke(realm, &Value::Object(obj.clone()), &key("hasOwnProperty"), &[Value::string("property")])?;
    assert_true(has_own.to_boolean(), "obj.hasOwnProperty(\"property\")")?;
    let accepted = obj.set(realm, key("property"), Value::string("unlikelyValue"))?;
    assert_true(!accepted, "property should not be writable")?;
    assert_same_value(&obj.get(realm, &key("property"))?, &Value::undefined(), "obj.property")
}

fn define_properties_non_writable_array_prop(realm: &Realm) -> HarnessResult {
    let arr = create_array_from_list(realm, []);
    let define = object_static(realm, "defineProperty")?;
    let desc = realm.new_object();
    desc.set(realm, key("value"), Value::int32(12))?;
    call(
        realm,
        &define,
        &Value::undefined(),
        &[Value::Object(arr.clone()), Value::string("property"), Value::Object(desc)],
    )?;

    let inner = realm.new_object();
    inner.set(realm, key("value"), Value::int32(36))?;
    let props = realm.new_object();
    props.set(realm, key("property"), Value::Object(inner))?;
    let define_all = object_static(realm, "defineProperties")?;
    let result = call(
        realm,
        &define_all,
        &Value::undefined(),
        &[Value::Object(arr.clone()), Value::Object(props)],
    );
    assert_throws(ErrorKind::TypeError, result, "Object.defineProperties")?;

    let expected = PropertyExpectation::new()
        .value(Value::int32(12))
        .writable(false)
        .enumerable(false)
        .configurable(false);
    verify_property(realm, &arr, &key("property"), &expected)
}

fn define_property_same_nan(realm: &Realm) -> HarnessResult {
    let obj = realm.new_object();
    let desc = PartialDescriptor::new()
        .value(Value::number(f64::NAN))
        .writable(false)
        .enumerable(false)
        .configurable(false);
    assert_true(obj.define_own_property(realm, key("foo"), &desc)?, "first definition")?;
    assert_true(obj.define_own_property(realm, key("foo"), &desc)?, "identical redefinition")?;
    verify_property(
        realm,
        &obj,
        &key("foo"),
        &PropertyExpectation::new()
            .value(Value::number(f64::NAN))
            .writable(false)
            .enumerable(false)
            .configurable(false),
    )
}

fn own_keys_order(realm: &Realm) -> HarnessResult {
    let obj = realm.new_object();
    for name in ["b", "1", "a", "0"] {
        obj.set(realm, key(name), Value::boolean(true))?;
    }
    let keys = call(realm, &object_static(realm, "keys")?, &Value::undefined(), &[Value::Object(obj)])?;
    let keys = keys
        .as_object()
        .ok_or_else(|| HarnessError::Assertion("Object.keys returned a non-object".into()))?;
    for (i, expected) in ["0", "1", "b", "a"].iter().enumerate() {
        assert_same_value(
            &keys.get(realm, &PropertyKey::Index(i as u32))?,
            &Value::string(expected),
            &format!("keys[{}]", i),
        )?;
    }
    Ok(())
}

// === Array ===

fn array_length_truncation_stops(realm: &Realm) -> HarnessResult {
    let arr = create_array_from_list(realm, (0..4).map(Value::int32));
    arr.define_own_property(realm, PropertyKey::Index(1), &PartialDescriptor::new().configurable(false))?;
    let accepted = arr.set(realm, key("length"), Value::int32(0))?;
    assert_true(!accepted, "length shrink should be rejected")?;
    assert_same_value(&arr.get(realm, &key("length"))?, &Value::int32(2), "arr.length")?;
    assert_true(arr.get_own_property(&PropertyKey::Index(2)).is_none(), "arr[2] was deleted")
}

fn array_length_range_error(realm: &Realm) -> HarnessResult {
    let arr = create_array_from_list(realm, []);
    assert_throws(ErrorKind::RangeError, arr.set(realm, key("length"), Value::number(-1.0)), "length = -1")?;
    assert_throws(
        ErrorKind::RangeError,
        arr.set(realm, key("length"), Value::number(4294967296.0)),
        "length = 2^32",
    )
}

fn array_index_of_infinity(realm: &Realm) -> HarnessResult {
    let arr = create_array_from_list(realm, []);
    arr.set(realm, PropertyKey::from_u64(4294967294), Value::boolean(true))?;
    let found = invoke(
        realm,
        &Value::Object(arr),
        &key("indexOf"),
        &[Value::boolean(true), Value::string("Infinity")],
    )?;
    assert_same_value(&found, &Value::int32(-1), "arr.indexOf(true, \"Infinity\")")
}

fn array_slice_fractional_start(realm: &Realm) -> HarnessResult {
    let x = Value::Object(create_array_from_list(realm, (0..5).map(Value::int32)));
    let arr = invoke(realm, &x, &key("slice"), &[Value::number(2.5), Value::int32(4)])?;
    let tag = invoke(realm, &Value::Object(realm.intrinsics().object_prototype.clone()), &key("toString"), &[])?;
    assert_same_value(&tag, &Value::string("[object Object]"), "Object.prototype.toString()")?;
    let to_string = realm.intrinsics().object_prototype.get(realm, &key("toString"))?;
    assert_same_value(&call(realm, &to_string, &arr, &[])?, &Value::string("[object Array]"), "#1")?;

    let arr = arr
        .as_object()
        .ok_or_else(|| HarnessError::Assertion("slice returned a non-object".into()))?;
    assert_same_value(&arr.get(realm, &key("length"))?, &Value::int32(2), "#2")?;
    assert_same_value(&arr.get(realm, &PropertyKey::Index(0))?, &Value::int32(2), "#3")?;
    assert_same_value(&arr.get(realm, &PropertyKey::Index(1))?, &Value::int32(3), "#4")?;
    assert_same_value(&arr.get(realm, &PropertyKey::Index(3))?, &Value::undefined(), "#5")
}

fn array_reduce_missing_callback(realm: &Realm) -> HarnessResult {
    let length_accessed = Arc::new(AtomicBool::new(false));
    let loop_accessed = Arc::new(AtomicBool::new(false));
    let obj = realm.new_object();
    obj.set(realm, PropertyKey::Index(10), Value::int32(10))?;

    let flag = length_accessed.clone();
    let length = realm.new_native_function("get length", move |_, _, _| {
        flag.store(true, Ordering::SeqCst);
        Ok(Value::int32(20))
    });
    let flag = loop_accessed.clone();
    let element = realm.new_native_function("get 0", move |_, _, _| {
        flag.store(true, Ordering::SeqCst);
        Ok(Value::int32(10))
    });
    let define = object_static(realm, "defineProperty")?;
    for (name, getter) in [("length", length), ("0", element)] {
        let desc = realm.new_object();
        desc.set(realm, key("get"), Value::Object(getter))?;
        desc.set(realm, key("configurable"), Value::boolean(true))?;
        call(
            realm,
            &define,
            &Value::undefined(),
            &[Value::Object(obj.clone()), Value::string(name), Value::Object(desc)],
        )?;
    }

    let reduce = realm.intrinsics().array_prototype.get(realm, &key("reduce"))?;
    assert_throws(
        ErrorKind::TypeError,
        call(realm, &reduce, &Value::Object(obj), &[]),
        "Array.prototype.reduce.call(obj)",
    )?;
    assert_true(length_accessed.load(Ordering::SeqCst), "lengthAccessed !== true")?;
    assert_same_value(
        &Value::boolean(loop_accessed.load(Ordering::SeqCst)),
        &Value::boolean(false),
        "loopAccessed",
    )
}

fn array_reduce_number_callback(realm: &Realm) -> HarnessResult {
    let arr = construct(realm, "Array", &[Value::int32(10)])?;
    assert_throws(
        ErrorKind::TypeError,
        invoke(realm, &Value::Object(arr), &key("reduce"), &[Value::int32(5)]),
        "arr.reduce(5)",
    )
}

// === Strings and globals ===

fn string_char_at_is_substring(realm: &Realm) -> HarnessResult {
    let left = Value::string("ABC\u{0041}\u{0042}\u{0043}");
    let right = Value::string("\u{0041}\u{0042}\u{0043}ABC");
    for i in 0..6 {
        let c = invoke(realm, &left, &key("charAt"), &[Value::int32(i)])?;
        let sub = invoke(realm, &right, &key("substring"), &[Value::int32(i), Value::int32(i + 1)])?;
        assert_same_value(&c, &sub, &format!("#{}", i))?;
    }
    Ok(())
}

fn parse_float_dont_enum(realm: &Realm) -> HarnessResult {
    let this = Value::Object(realm.global().clone());
    let enumerable = invoke(realm, &this, &key("propertyIsEnumerable"), &[Value::string("parseFloat")])?;
    assert_same_value(&enumerable, &Value::boolean(false), "#1: this.propertyIsEnumerable('parseFloat')")?;
    let visited = enumerate_object_properties(realm.global());
    assert_true(
        !visited.contains(&key("parseFloat")),
        "#2: for (p in this) should not visit parseFloat",
    )
}

// === Typed arrays ===

const BIGINT_CONSTRUCTORS: [&str; 2] = ["BigInt64Array", "BigUint64Array"];

fn bigint_views_share_sab(realm: &Realm) -> HarnessResult {
    for name in BIGINT_CONSTRUCTORS {
        let ctor = global(realm, name)?;
        let bpe = ctor
            .as_object()
            .map(|c| c.get(realm, &key("BYTES_PER_ELEMENT")))
            .unwrap_or_else(|| Ok(Value::undefined()))?;
        let buffer = Value::Object(construct(realm, "SharedArrayBuffer", &[bpe])?);
        let ta1 = construct(realm, name, &[buffer.clone()])?;
        let ta2 = construct(realm, name, &[buffer.clone()])?;
        assert_same_value(&ta1.get(realm, &key("buffer"))?, &buffer, "ta1.buffer")?;
        assert_same_value(&ta2.get(realm, &key("buffer"))?, &buffer, "ta2.buffer")?;
        assert_same_value(&ta1.get(realm, &key("buffer"))?, &ta2.get(realm, &key("buffer"))?, "ta1.buffer === ta2.buffer")?;
    }
    Ok(())
}

fn bigint_slice_skips_ordinary_props(realm: &Realm) -> HarnessResult {
    for name in BIGINT_CONSTRUCTORS {
        let source = create_array_from_list(realm, (41..45).map(Value::bigint));
        let sample = construct(realm, name, &[Value::Object(source)])?;
        sample.set(realm, key("foo"), Value::int32(42))?;

        let result = invoke(realm, &Value::Object(sample), &key("slice"), &[])?;
        let has_foo = invoke(realm, &result, &key("hasOwnProperty"), &[Value::string("foo")])?;
        assert_same_value(&has_foo, &Value::boolean(false), "does not import own property")?;
    }
    Ok(())
}

fn typed_array_minus_zero_key(realm: &Realm) -> HarnessResult {
    let sample = construct(realm, "Int8Array", &[Value::Object(create_array_from_list(realm, [Value::int32(42)]))])?;
    let accepted = sample.set(realm, key("-0"), Value::int32(1))?;
    assert_true(accepted, "sample[\"-0\"] = 1 reports success")?;
    assert_same_value(&sample.get(realm, &key("-0"))?, &Value::undefined(), "sample[\"-0\"]")?;
    assert_true(sample.get_own_property(&key("-0")).is_none(), "no own \"-0\" property")?;
    assert_same_value(&sample.get(realm, &PropertyKey::Index(0))?, &Value::int32(42), "sample[0]")
}

fn typed_array_define_not_writable(realm: &Realm) -> HarnessResult {
    let sample = construct(realm, "Float32Array", &[Value::int32(2)])?;
    let desc = PartialDescriptor::new()
        .value(Value::int32(42))
        .writable(false)
        .enumerable(true)
        .configurable(true);
    let accepted = sample.define_own_property(realm, PropertyKey::Index(0), &desc)?;
    assert_same_value(&Value::boolean(accepted), &Value::boolean(false), "defineProperty returns false")?;
    assert_same_value(&sample.get(realm, &PropertyKey::Index(0))?, &Value::int32(0), "value is not set")
}

fn shared_memory_gating(realm: &Realm) -> HarnessResult {
    let enabled = realm.options().shared_memory_enabled;
    let exposed = realm.global().get_own_property(&key("SharedArrayBuffer")).is_some();
    assert_same_value(&Value::boolean(enabled), &Value::boolean(exposed), "sharedMemoryEnabled() === !!SharedArrayBuffer")
}

// === Destructuring ===

fn obj_ptrn_prop_id_init(realm: &Realm) -> HarnessResult {
    let env = Environment::new();
    let pattern = BindingPattern::object(ObjectPattern::new().property(
        "x",
        BindingPattern::identifier("y"),
        Some(constant(Value::int32(33))),
    ));
    bind_pattern(realm, &pattern, Value::Object(realm.new_object()), &env, BindingMode::Initialize)?;
    assert_same_value(&env.lookup(realm, "y")?, &Value::int32(33), "y")?;
    assert_throws(ErrorKind::ReferenceError, env.lookup(realm, "x"), "x")
}

fn array_elision_val_num(realm: &Realm) -> HarnessResult {
    let env = Environment::new();
    let pattern = BindingPattern::array(ArrayPattern::new().elision());
    let result = bind_pattern(realm, &pattern, Value::int32(1), &env, BindingMode::Assign { strict: false });
    assert_throws(ErrorKind::TypeError, result, "[,] = 1")
}

fn obj_ptrn_rest_val_obj(realm: &Realm) -> HarnessResult {
    let env = Environment::new();
    let pattern = BindingPattern::object(
        ObjectPattern::new()
            .shorthand("a", None)
            .shorthand("b", None)
            .rest("rest"),
    );
    let source = realm.new_object();
    for (name, value) in [("x", 1), ("y", 2), ("a", 5), ("b", 3)] {
        source.set(realm, key(name), Value::int32(value))?;
    }
    bind_pattern(realm, &pattern, Value::Object(source), &env, BindingMode::Initialize)?;

    let rest = env.lookup(realm, "rest")?;
    let rest = rest
        .as_object()
        .ok_or_else(|| HarnessError::Assertion("rest is not an object".into()))?;
    assert_same_value(&rest.get(realm, &key("a"))?, &Value::undefined(), "rest.a")?;
    assert_same_value(&rest.get(realm, &key("b"))?, &Value::undefined(), "rest.b")?;
    verify_property(realm, rest, &key("x"), &PropertyExpectation::plain(Value::int32(1)))?;
    verify_property(realm, rest, &key("y"), &PropertyExpectation::plain(Value::int32(2)))
}

fn ary_ptrn_elem_id_iter_done(realm: &Realm) -> HarnessResult {
    let env = Environment::new();
    let pattern = BindingPattern::array(
        ArrayPattern::new()
            .element(BindingPattern::identifier("_"), None)
            .element(BindingPattern::identifier("x"), None),
    );
    bind_pattern(realm, &pattern, Value::Object(create_array_from_list(realm, [])), &env, BindingMode::Initialize)?;
    assert_same_value(&env.lookup(realm, "x")?, &Value::undefined(), "x")
}

fn for_await_dstr_init_throws(realm: &Realm) -> HarnessResult {
    let thrown = test262_error(realm);
    let error = thrown.clone();
    let pattern = BindingPattern::object(ObjectPattern::new().property(
        "x",
        BindingPattern::identifier("y"),
        Some(thunk(move |_, _| Err(VmError::exception(error.clone())))),
    ));
    let source = Value::Object(create_array_from_list(realm, [Value::Object(realm.new_object())]));
    let env = Environment::new();

    // for await (const { x: y = thrower() } of [{}]) { return; }
    let body = GeneratorBody::new(move |realm, frame, resumption| {
        frame.pc += 1;
        match (frame.pc, resumption) {
            (_, Resumption::Throw(e)) => Err(VmError::exception(e)),
            (1, _) => {
                let record = get_iterator(realm, &source, IteratorHint::Async)?;
                let next = iterator_next(realm, &record, None)?;
                Ok(GeneratorStep::Await(Value::Object(next)))
            }
            (2, Resumption::Next(Value::Object(result))) => {
                let value = iterator_value(realm, &result)?;
                bind_pattern(realm, &pattern, value, &env, BindingMode::Initialize)?;
                Ok(GeneratorStep::Return(Value::undefined()))
            }
            (_, _) => Ok(GeneratorStep::Return(Value::undefined())),
        }
    });
    let generator = Value::Object(create_async_generator(realm, body));

    let promise = invoke(realm, &generator, &key("next"), &[])?;
    realm.run_jobs();
    match promise_state(&promise)? {
        PromiseState::Rejected(reason) => assert_same_value(&reason, &thrown, "rejection reason"),
        PromiseState::Fulfilled(_) => Err(HarnessError::Assertion(
            "Expected async function to reject, but resolved.".into(),
        )),
        PromiseState::Pending => Err(HarnessError::Assertion("next() never settled".into())),
    }
}

// === Generators ===

fn generator_return_completed(realm: &Realm) -> HarnessResult {
    let generator = Value::Object(create_generator(realm, GeneratorBody::from_values(vec![])));
    let first = invoke(realm, &generator, &key("next"), &[])?;
    assert_true(sync_step(realm, &first)? == (Value::undefined(), true), "first next() completes")?;

    let result = invoke(realm, &generator, &key("return"), &[Value::int32(33)])?;
    let (value, done) = sync_step(realm, &result)?;
    assert_same_value(&value, &Value::int32(33), "result.value")?;
    assert_same_value(&Value::boolean(done), &Value::boolean(true), "result.done")
}

fn generator_throw_suspended_start(realm: &Realm) -> HarnessResult {
    let generator = Value::Object(create_generator(
        realm,
        GeneratorBody::new(|_, _, _| Err(VmError::internal("body must not run"))),
    ));
    let thrown = test262_error(realm);
    match invoke(realm, &generator, &key("throw"), &[thrown.clone()]) {
        Err(err) => assert_same_value(err.thrown_value().unwrap_or(&Value::undefined()), &thrown, "thrown value")?,
        Ok(_) => return Err(HarnessError::Assertion("throw() did not throw".into())),
    }
    let after = invoke(realm, &generator, &key("next"), &[])?;
    assert_true(sync_step(realm, &after)? == (Value::undefined(), true), "generator is completed")
}

fn async_from_sync_unwraps(realm: &Realm) -> HarnessResult {
    let inner = Value::Object(promise::promise_resolve(realm, Value::string("unwrapped"))?);
    let source = Value::Object(create_array_from_list(realm, [inner]));
    let record = get_iterator(realm, &source, IteratorHint::Async)?;
    let next = Value::Object(iterator_next(realm, &record, None)?);
    realm.run_jobs();
    let (value, done) = fulfilled_step(realm, &next)?;
    assert_same_value(&value, &Value::string("unwrapped"), "result.value")?;
    assert_same_value(&Value::boolean(done), &Value::boolean(false), "result.done")
}

fn async_generator_queue_order(realm: &Realm) -> HarnessResult {
    let generator = Value::Object(create_async_generator(
        realm,
        GeneratorBody::from_values(vec![Value::int32(1), Value::int32(2)]),
    ));
    let counter = Arc::new(AtomicUsize::new(0));
    let mut order = Vec::new();
    let mut promises = Vec::new();
    for _ in 0..3 {
        let promise = invoke(realm, &generator, &key("next"), &[])?;
        let slot = Arc::new(AtomicUsize::new(usize::MAX));
        let (seen, counter) = (slot.clone(), counter.clone());
        let target = promise
            .as_object()
            .ok_or_else(|| HarnessError::Assertion("next() returned a non-object".into()))?;
        promise::then_native(
            realm,
            target,
            Box::new(move |_: &Realm, _: promise::Settlement| {
                seen.store(counter.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
                Ok(())
            }),
        )?;
        order.push(slot);
        promises.push(promise);
    }
    realm.run_jobs();

    for (i, slot) in order.iter().enumerate() {
        assert_true(slot.load(Ordering::SeqCst) == i, &format!("request {} settled out of order", i))?;
    }
    let expected = [(Value::int32(1), false), (Value::int32(2), false), (Value::undefined(), true)];
    for (promise, expected) in promises.iter().zip(expected) {
        assert_true(fulfilled_step(realm, promise)? == expected, "iterator result")?;
    }
    Ok(())
}

fn async_generator_return_completed(realm: &Realm) -> HarnessResult {
    let generator = Value::Object(create_async_generator(realm, GeneratorBody::from_values(vec![])));
    invoke(realm, &generator, &key("next"), &[])?;
    realm.run_jobs();

    let pending = promise::new_promise(realm);
    let result = invoke(realm, &generator, &key("return"), &[Value::Object(pending.clone())])?;
    realm.run_jobs();
    assert_true(matches!(promise_state(&result)?, PromiseState::Pending), "return awaits its operand")?;

    promise::fulfill_promise(realm, &pending, Value::string("later"))?;
    realm.run_jobs();
    let (value, done) = fulfilled_step(realm, &result)?;
    assert_same_value(&value, &Value::string("later"), "result.value")?;
    assert_same_value(&Value::boolean(done), &Value::boolean(true), "result.done")
}
