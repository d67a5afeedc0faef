//! Destructuring binding initialization

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use otter_object::array::create_array_from_list;
use otter_object::binding::{ArrayPattern, ObjectPattern, constant, thunk};
use otter_object::iterator::create_iter_result_object;
use otter_object::property::PropertyDescriptor;
use otter_object::{
    BindingMode, BindingPattern, Environment, PropertyKey, Realm, Symbol, Value, VmError,
    bind_pattern,
};

/// Counters observed on a hand-made iterator
#[derive(Default)]
struct IterationCounts {
    next_calls: AtomicUsize,
    return_calls: AtomicUsize,
}

/// An iterable producing `0, 1, .., len - 1`, counting `next` and `return`
fn counting_iterable(realm: &Realm, len: usize, counts: Arc<IterationCounts>) -> Value {
    let iterator = realm.new_object();
    let counter = counts.clone();
    let next = realm.new_native_function("next", move |realm, _, _| {
        let n = counter.next_calls.fetch_add(1, Ordering::SeqCst);
        Ok(if n < len {
            create_iter_result_object(realm, Value::number(n as f64), false)
        } else {
            create_iter_result_object(realm, Value::undefined(), true)
        })
    });
    let ret = realm.new_native_function("return", move |realm, _, _| {
        counts.return_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Object(realm.new_object()))
    });
    iterator.set(realm, PropertyKey::string("next"), Value::Object(next)).unwrap();
    iterator.set(realm, PropertyKey::string("return"), Value::Object(ret)).unwrap();

    let this_iterator = Value::Object(iterator);
    let get_iterator = realm.new_native_function("[Symbol.iterator]", move |_, _, _| Ok(this_iterator.clone()));
    let iterable = realm.new_object();
    iterable
        .set(realm, PropertyKey::Symbol(Symbol::iterator()), Value::Object(get_iterator))
        .unwrap();
    Value::Object(iterable)
}

fn init(realm: &Realm, pattern: &BindingPattern, value: Value) -> (Arc<Environment>, Result<(), VmError>) {
    let env = Environment::new();
    let result = bind_pattern(realm, pattern, value, &env, BindingMode::Initialize);
    (env, result)
}

#[test]
fn test_elision_against_number_is_not_iterable() {
    let realm = Realm::new();
    let pattern = BindingPattern::array(ArrayPattern::new().elision());
    let (_, result) = init(&realm, &pattern, Value::int32(1));
    match result {
        Err(VmError::TypeError(msg)) => assert!(msg.contains("not iterable"), "{}", msg),
        other => panic!("expected TypeError, got {:?}", other),
    }
}

#[test]
fn test_renamed_default_leaves_key_unbound() {
    let realm = Realm::new();
    let pattern = BindingPattern::object(ObjectPattern::new().property(
        "x",
        BindingPattern::identifier("y"),
        Some(constant(Value::int32(33))),
    ));
    let (env, result) = init(&realm, &pattern, Value::Object(realm.new_object()));
    result.unwrap();
    assert_eq!(env.lookup(&realm, "y").unwrap(), Value::int32(33));
    assert!(matches!(env.lookup(&realm, "x"), Err(VmError::ReferenceError(_))));
}

#[test]
fn test_exhausted_array_binds_undefined() {
    let realm = Realm::new();
    let pattern = BindingPattern::array(
        ArrayPattern::new()
            .element(BindingPattern::identifier("_"), None)
            .element(BindingPattern::identifier("x"), None),
    );
    let (env, result) = init(&realm, &pattern, Value::Object(create_array_from_list(&realm, [])));
    result.unwrap();
    assert_eq!(env.get_binding_value("x").unwrap(), Value::undefined());
}

#[test]
fn test_no_steps_after_done_and_no_close() {
    let realm = Realm::new();
    let counts = Arc::new(IterationCounts::default());
    let iterable = counting_iterable(&realm, 1, counts.clone());
    let pattern = BindingPattern::array(
        ArrayPattern::new()
            .element(BindingPattern::identifier("a"), None)
            .element(BindingPattern::identifier("b"), Some(constant(Value::string("dflt"))))
            .elision()
            .element(BindingPattern::identifier("c"), None),
    );
    let (env, result) = init(&realm, &pattern, iterable);
    result.unwrap();

    // one value, one step observing done, nothing after that
    assert_eq!(counts.next_calls.load(Ordering::SeqCst), 2);
    assert_eq!(counts.return_calls.load(Ordering::SeqCst), 0);
    assert_eq!(env.get_binding_value("a").unwrap(), Value::int32(0));
    assert_eq!(env.get_binding_value("b").unwrap(), Value::string("dflt"));
    assert_eq!(env.get_binding_value("c").unwrap(), Value::undefined());
}

#[test]
fn test_unfinished_iterator_is_closed() {
    let realm = Realm::new();
    let counts = Arc::new(IterationCounts::default());
    let iterable = counting_iterable(&realm, 5, counts.clone());
    let pattern = BindingPattern::array(ArrayPattern::new().element(BindingPattern::identifier("a"), None));
    let (_, result) = init(&realm, &pattern, iterable);
    result.unwrap();
    assert_eq!(counts.next_calls.load(Ordering::SeqCst), 1);
    assert_eq!(counts.return_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_nested_error_closes_iterator_and_wins() {
    let realm = Realm::new();
    let counts = Arc::new(IterationCounts::default());
    let iterable = counting_iterable(&realm, 5, counts.clone());
    // `{p}` reads `p` from the number 0 and falls back to a throwing default
    let failing = BindingPattern::array(ArrayPattern::new().element(
        BindingPattern::object(
            ObjectPattern::new().shorthand("p", Some(thunk(|_, _| Err(VmError::exception(Value::string("inner")))))),
        ),
        None,
    ));
    let (_, result) = init(&realm, &failing, iterable);
    let err = result.unwrap_err();
    assert_eq!(err.thrown_value(), Some(&Value::string("inner")));
    assert_eq!(counts.return_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rest_order_and_exclusions() {
    let realm = Realm::new();
    let source = realm.new_object();
    for name in ["z", "a", "m", "b"] {
        source.set(&realm, PropertyKey::string(name), Value::string(name)).unwrap();
    }
    source.define_raw(
        PropertyKey::string("hidden"),
        PropertyDescriptor::data_with_attrs(
            Value::int32(0),
            otter_object::property::PropertyAttributes::builtin(),
        ),
    );
    let pattern = BindingPattern::object(
        ObjectPattern::new()
            .shorthand("a", None)
            .shorthand("b", None)
            .rest("rest"),
    );
    let (env, result) = init(&realm, &pattern, Value::Object(source));
    result.unwrap();
    let rest = env.get_binding_value("rest").unwrap();
    let rest = rest.as_object().unwrap();
    assert_eq!(
        rest.own_property_keys(),
        vec![PropertyKey::string("z"), PropertyKey::string("m")]
    );
    assert!(Arc::ptr_eq(
        &rest.get_prototype_of().unwrap(),
        &realm.intrinsics().object_prototype
    ));
}

#[test]
fn test_rest_runs_source_getters() {
    let realm = Realm::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let getter = realm.new_native_function("get v", move |_, _, _| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(Value::int32(5))
    });
    let source = realm.new_object();
    source.define_raw(
        PropertyKey::string("v"),
        PropertyDescriptor::accessor(Some(Value::Object(getter)), None, true, true),
    );
    let pattern = BindingPattern::object(ObjectPattern::new().rest("rest"));
    let (env, result) = init(&realm, &pattern, Value::Object(source));
    result.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let rest = env.get_binding_value("rest").unwrap();
    let desc = rest.as_object().unwrap().get_own_property(&PropertyKey::string("v")).unwrap();
    assert_eq!(desc.value(), Some(&Value::int32(5)));
}

#[test]
fn test_computed_key_and_primitive_source() {
    let realm = Realm::new();
    let pattern = BindingPattern::object(ObjectPattern::new().computed(
        thunk(|_, _| Ok(Value::string("length"))),
        BindingPattern::identifier("len"),
        None,
    ));
    let (env, result) = init(&realm, &pattern, Value::string("four"));
    result.unwrap();
    assert_eq!(env.get_binding_value("len").unwrap(), Value::int32(4));
}

#[test]
fn test_default_thunk_sees_earlier_bindings() {
    let realm = Realm::new();
    let pattern = BindingPattern::array(
        ArrayPattern::new()
            .element(BindingPattern::identifier("a"), None)
            .element(
                BindingPattern::identifier("b"),
                Some(thunk(|realm, env| env.lookup(realm, "a"))),
            ),
    );
    let (env, result) = init(&realm, &pattern, Value::Object(create_array_from_list(&realm, [Value::int32(8)])));
    result.unwrap();
    assert_eq!(env.get_binding_value("b").unwrap(), Value::int32(8));
}

#[test]
fn test_assignment_mode_strict_unresolvable() {
    let realm = Realm::new();
    let env = Environment::new();
    let pattern = BindingPattern::object(ObjectPattern::new().shorthand("nowhere", None));
    let source = Value::Object(realm.new_object());

    let err = bind_pattern(&realm, &pattern, source.clone(), &env, BindingMode::Assign { strict: true }).unwrap_err();
    assert!(matches!(err, VmError::ReferenceError(_)));

    bind_pattern(&realm, &pattern, source, &env, BindingMode::Assign { strict: false }).unwrap();
    assert!(realm
        .global()
        .get_own_property(&PropertyKey::string("nowhere"))
        .is_some());
}

#[test]
fn test_assignment_to_const_in_strict_mode() {
    let realm = Realm::new();
    let env = Environment::new();
    env.create_immutable_binding("c", true);
    env.initialize_binding("c", Value::int32(1)).unwrap();
    let pattern = BindingPattern::array(ArrayPattern::new().element(BindingPattern::identifier("c"), None));
    let value = Value::Object(create_array_from_list(&realm, [Value::int32(2)]));
    let err = bind_pattern(&realm, &pattern, value, &env, BindingMode::Assign { strict: true }).unwrap_err();
    assert!(matches!(err, VmError::TypeError(_)));
}

#[test]
fn test_null_source_throws_before_any_read() {
    let realm = Realm::new();
    let read = Arc::new(AtomicUsize::new(0));
    let counter = read.clone();
    let pattern = BindingPattern::object(ObjectPattern::new().computed(
        thunk(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::string("k"))
        }),
        BindingPattern::identifier("k"),
        None,
    ));
    let (_, result) = init(&realm, &pattern, Value::null());
    assert!(matches!(result, Err(VmError::TypeError(_))));
    assert_eq!(read.load(Ordering::SeqCst), 0);
}
