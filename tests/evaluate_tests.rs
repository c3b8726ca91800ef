// tests/evaluate_tests.rs

mod common;

use bexpr::coerce::Coerced;
use bexpr::pointer::PointerErrorKind;
use bexpr::schema::{FieldConfiguration, FieldConfigurations, IntWidth, TypeDescriptor};
use bexpr::{
    CustomMatcher, Error, EvalContext, EvalError, Evaluator, EvaluatorOptions, MatchOperator,
    MatcherError, Selectable, Transformed, ValidationError, Value,
};
use common::{Top, point, top};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn eval_json(expression: &str, datum: serde_json::Value) -> Result<bool, EvalError> {
    let evaluator = Evaluator::new(expression, EvaluatorOptions::new()).unwrap();
    evaluator.evaluate_value(&datum.into())
}

fn eval_with(
    expression: &str,
    options: EvaluatorOptions,
    datum: serde_json::Value,
) -> Result<bool, EvalError> {
    let evaluator = Evaluator::new(expression, options).unwrap();
    evaluator.evaluate_value(&datum.into())
}

fn eval_top(expression: &str) -> bool {
    Evaluator::for_type::<Top>(expression, EvaluatorOptions::new())
        .unwrap()
        .evaluate(&top())
        .unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_integer_equality() {
    assert!(eval_json("foo == 3", json!({"foo": 3})).unwrap());

    let typed = Evaluator::for_type::<HashMap<String, i32>>("foo == 3", EvaluatorOptions::new())
        .unwrap();
    assert!(typed.evaluate(&HashMap::from([("foo".to_string(), 3)])).unwrap());
    assert!(!typed.evaluate(&HashMap::from([("foo".to_string(), 4)])).unwrap());
}

#[test]
fn test_list_emptiness() {
    assert!(eval_json("list is empty", json!({"list": []})).unwrap());
    assert!(!eval_json("list is empty", json!({"list": [1]})).unwrap());
    assert!(eval_json("list is not empty", json!({"list": [1]})).unwrap());
}

#[test]
fn test_string_list_membership() {
    assert!(eval_json("foo in bar", json!({"bar": ["foo", "baz"]})).unwrap());
    assert!(!eval_json("foo in bar", json!({"bar": ["x"]})).unwrap());
    assert!(eval_json("foo not in bar", json!({"bar": ["x"]})).unwrap());
}

#[test]
fn test_precedence_scenario() {
    let datum = json!({"foo": ["x"], "str": "other", "list": []});
    assert!(eval_json("x in foo and not str == something or list is empty", datum).unwrap());

    let datum = json!({"foo": ["y"], "str": "something", "list": [1]});
    assert!(!eval_json("x in foo and not str == something or list is empty", datum).unwrap());
}

#[test]
fn test_implicit_any_over_record_list() {
    assert!(eval_top("Nested.SliceOfStructs.X == 1"));
    assert!(eval_top("Nested.SliceOfStructs.Y == 5"));
    assert!(!eval_top("Nested.SliceOfStructs.X == 2"));
}

#[test]
fn test_unterminated_string_is_a_parse_error() {
    let err = Evaluator::new("foo == \"12x", EvaluatorOptions::new()).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    assert_eq!(
        err.to_string(),
        "1:12 (11): rule \"string\": Unterminated string literal"
    );
}

// ============================================================================
// Typed Records
// ============================================================================

#[test]
fn test_record_primitives() {
    assert!(eval_top("TopInt == 5"));
    assert!(eval_top("TopInt != 6"));
    assert!(eval_top("TopUint8 > 6"));
    assert!(eval_top("TopFloat >= 1.5"));
    assert!(!eval_top("TopFloat < 1.5"));
    assert!(eval_top("TopBool == true"));
    assert!(eval_top("TopBool != f"));
    assert!(eval_top("TopString == \"hello world\""));
    assert!(eval_top("TopString matches \"^hello\""));
    assert!(eval_top("TopString not matches \"^world\""));
    assert!(eval_top("world in TopString"));
    assert!(eval_top("TopString contains \"o w\""));
}

#[test]
fn test_record_collections() {
    assert!(eval_top("prod in Tags"));
    assert!(!eval_top("dev in Tags"));
    assert!(eval_top("Tags is not empty"));
    assert!(eval_top("2 in Nested.SliceOfInts"));
    assert!(eval_top("4 not in Nested.SliceOfInts"));
    assert!(eval_top("key in Nested.Map"));
    assert!(eval_top("Nested.Map.key == value"));
    assert!(eval_top("Nested.MapOfStructs.a.Y == 2"));
}

#[test]
fn test_record_aliases() {
    assert!(eval_top("renamed == r"));
    assert!(eval_top("alias == r"));
}

#[test]
fn test_absent_optional_uses_default_policy() {
    assert!(!eval_top("Optional == x"));
    assert!(eval_top("Optional != x"));
}

#[test]
fn test_present_optional() {
    let mut datum = top();
    datum.optional = Some("here".to_string());
    let evaluator = Evaluator::for_type::<Top>("Optional == here", EvaluatorOptions::new()).unwrap();
    assert!(evaluator.evaluate(&datum).unwrap());
}

#[test]
fn test_missing_map_key_in_record() {
    assert!(!eval_top("Nested.Map.nope == value"));
    assert!(eval_top("Nested.Map.nope != value"));
}

#[test]
fn test_type_mismatch() {
    let evaluator = Evaluator::for_type::<Top>("TopInt == 5", EvaluatorOptions::new()).unwrap();
    let err = evaluator.evaluate(&point(1, 2)).unwrap_err();
    assert!(matches!(err, EvalError::TypeMismatch { .. }));
}

#[test]
fn test_dynamic_type_binds_without_schema() {
    let evaluator =
        Evaluator::for_type::<serde_json::Value>("anything == 1", EvaluatorOptions::new()).unwrap();
    assert!(evaluator.fields().is_none());
    assert!(evaluator.evaluate(&json!({"anything": 1})).unwrap());
    assert!(matches!(
        evaluator.evaluate(&top()),
        Err(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn test_untyped_evaluator_accepts_records() {
    let evaluator = Evaluator::new("TopInt == 5 and Bogus == 1", EvaluatorOptions::new()).unwrap();
    assert!(!evaluator.evaluate(&top()).unwrap());

    let evaluator = Evaluator::new("TopInt == 5 and Bogus != 1", EvaluatorOptions::new()).unwrap();
    assert!(evaluator.evaluate(&top()).unwrap());
}

#[test]
fn test_ignored_field_is_an_error_without_schema() {
    let evaluator = Evaluator::new("Hidden == true", EvaluatorOptions::new()).unwrap();
    let err = evaluator.evaluate(&top()).unwrap_err();
    assert!(matches!(
        err,
        EvalError::Resolve(ref e) if matches!(e.kind, PointerErrorKind::FieldIgnored(_))
    ));
}

#[test]
fn test_compile_errors_are_typed() {
    let err = Evaluator::for_type::<Top>("Bogus == 1", EvaluatorOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidSelector { .. })
    ));

    let err = Evaluator::for_type::<i32>("a == 1", EvaluatorOptions::new()).unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
}

// ============================================================================
// Not Found Policies
// ============================================================================

#[test]
fn test_default_policy_results() {
    let cases = [
        ("missing == 1", false),
        ("missing != 1", true),
        ("x in missing", false),
        ("x not in missing", true),
        ("missing is empty", true),
        ("missing is not empty", false),
        ("missing matches x", false),
        ("missing not matches x", true),
        ("missing > 1", false),
        ("all missing as v { v == 1 }", true),
        ("any missing as v { v == 1 }", false),
    ];
    for (expression, expected) in cases {
        assert_eq!(
            eval_json(expression, json!({"present": 1})).unwrap(),
            expected,
            "Failed for expression: {}",
            expression
        );
    }
}

#[test]
fn test_null_counts_as_missing() {
    assert!(!eval_json("a == 1", json!({"a": null})).unwrap());
    assert!(eval_json("a != 1", json!({"a": null})).unwrap());
}

#[test]
fn test_missing_list_index() {
    assert!(!eval_json("items[\"3\"] == x", json!({"items": ["x"]})).unwrap());
    assert!(eval_json("\"/items/0\" == x", json!({"items": ["x"]})).unwrap());
}

#[test]
fn test_unknown_value_policy() {
    let options = || EvaluatorOptions::new().with_unknown_value(Value::from(""));
    assert!(eval_with("missing == \"\"", options(), json!({})).unwrap());
    assert!(eval_with("missing is empty", options(), json!({})).unwrap());
    assert!(!eval_with("missing != \"\"", options(), json!({})).unwrap());

    let options = EvaluatorOptions::new().with_unknown_value(Value::Int(7));
    assert!(eval_with("missing == 7", options, json!({})).unwrap());
}

#[test]
fn test_error_on_missing_policy() {
    let options = || EvaluatorOptions::new().with_error_on_missing();

    let err = eval_with("missing == 1", options(), json!({})).unwrap_err();
    assert!(matches!(
        err,
        EvalError::Resolve(ref e) if e.kind == PointerErrorKind::KeyNotFound("missing".to_string())
    ));
    assert_eq!(
        err.to_string(),
        "error finding value in datum: /missing at part 0: couldn't find key \"missing\""
    );

    let err = eval_with("a == 1", options(), json!({"a": null})).unwrap_err();
    assert!(matches!(err, EvalError::MissingValue { ref selector } if selector == "a"));

    assert!(eval_with("a == 1", options(), json!({"a": 1})).unwrap());
}

#[test]
fn test_conflicting_policies_are_rejected() {
    let options = EvaluatorOptions::new()
        .with_unknown_value(Value::Null)
        .with_error_on_missing();
    let err = Evaluator::new("a == 1", options).unwrap_err();
    assert!(matches!(err, Error::Options(_)));
}

// ============================================================================
// Mixed Numbers
// ============================================================================

#[test]
fn test_decimal_literal_against_integer() {
    let datum = json!({"price": 3});
    assert!(eval_json("price > 2.5", datum.clone()).unwrap());
    assert!(eval_json("price == 3.0", datum.clone()).unwrap());
    assert!(!eval_json("price != 3.0", datum.clone()).unwrap());
    assert!(!eval_json("price >= 3.5", datum.clone()).unwrap());
    assert!(eval_json("price < 3.01", datum).unwrap());
}

#[test]
fn test_decimal_literal_against_unsigned_and_lists() {
    let evaluator = Evaluator::new("n > 0.5", EvaluatorOptions::new()).unwrap();
    let datum = Value::Map([("n".to_string(), Value::Uint(1))].into());
    assert!(evaluator.evaluate_value(&datum).unwrap());

    assert!(eval_json("2.0 in xs", json!({"xs": [1, 2, 3]})).unwrap());
    assert!(!eval_json("2.5 in xs", json!({"xs": [1, 2, 3]})).unwrap());
}

#[test]
fn test_integer_literal_against_decimal() {
    assert!(eval_json("price >= 3", json!({"price": 3.5})).unwrap());
}

// ============================================================================
// Evaluation Errors
// ============================================================================

#[test]
fn test_traversal_through_scalar() {
    let err = eval_json("a.b == 1", json!({"a": 5})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "error finding value in datum: /a/b at part 1: invalid value kind: int"
    );
}

#[test]
fn test_ordering_on_bool() {
    let err = eval_json("a > 1", json!({"a": true})).unwrap_err();
    assert!(matches!(err, EvalError::NoComparison { .. }));
}

#[test]
fn test_equality_on_list() {
    let err = eval_json("a == 1", json!({"a": [1]})).unwrap_err();
    assert!(matches!(err, EvalError::NoComparison { .. }));
}

#[test]
fn test_runtime_coercion_failure() {
    let err = eval_json("a == abc", json!({"a": 1})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to coerce value \"abc\" for selector \"a\": parsing \"abc\" as int64: invalid syntax"
    );
}

#[test]
fn test_kind_errors() {
    assert!(matches!(
        eval_json("a is empty", json!({"a": 1})),
        Err(EvalError::EmptinessUnsupported { .. })
    ));
    assert!(matches!(
        eval_json("a matches x", json!({"a": 1})),
        Err(EvalError::NotMatchable { .. })
    ));
    assert!(matches!(
        eval_json("x in a", json!({"a": 1})),
        Err(EvalError::MembershipUnsupported { .. })
    ));
    assert!(matches!(
        eval_json("any a as v { v == 1 }", json!({"a": 1})),
        Err(EvalError::NotACollection { .. })
    ));
}

#[test]
fn test_regex_compiles_lazily_without_schema() {
    let evaluator = Evaluator::new("s matches \"[\"", EvaluatorOptions::new()).unwrap();
    let err = evaluator.evaluate_value(&json!({"s": "x"}).into()).unwrap_err();
    assert!(matches!(err, EvalError::Regex { .. }));
    // Never reached, so never compiled
    assert!(!evaluator.evaluate_value(&json!({}).into()).unwrap());
}

#[test]
fn test_bound_scalar_is_not_traversable() {
    let err = eval_json("any a as v { v.x == 1 }", json!({"a": [1]})).unwrap_err();
    assert!(matches!(err, EvalError::BoundValueNotTraversable { .. }));
}

#[test]
fn test_errors_do_not_poison_evaluator() {
    let evaluator = Evaluator::new("a == 1", EvaluatorOptions::new()).unwrap();
    assert!(evaluator.evaluate_value(&json!({"a": [1]}).into()).is_err());
    assert!(evaluator.evaluate_value(&json!({"a": 1}).into()).unwrap());
}

// ============================================================================
// Short Circuit
// ============================================================================

fn counting_options(counter: &Arc<AtomicUsize>) -> EvaluatorOptions {
    let counter = Arc::clone(counter);
    EvaluatorOptions::new().with_hook(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Transformed::Keep
    })
}

#[test]
fn test_and_skips_right_when_left_is_false() {
    let counter = Arc::new(AtomicUsize::new(0));
    let result = eval_with("a == 1 and b == 2", counting_options(&counter), json!({"a": 0, "b": 2}));
    assert!(!result.unwrap());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_or_skips_right_when_left_is_true() {
    let counter = Arc::new(AtomicUsize::new(0));
    let result = eval_with("a == 1 or b == 2", counting_options(&counter), json!({"a": 1, "b": 2}));
    assert!(result.unwrap());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_error_skips_right() {
    let counter = Arc::new(AtomicUsize::new(0));
    let result = eval_with("a > 1 or b == 2", counting_options(&counter), json!({"a": true, "b": 2}));
    assert!(result.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_both_sides_run_when_needed() {
    let counter = Arc::new(AtomicUsize::new(0));
    let result = eval_with("a == 1 and b == 2", counting_options(&counter), json!({"a": 1, "b": 2}));
    assert!(result.unwrap());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Value Transformation Hook
// ============================================================================

#[test]
fn test_hook_replaces_values() {
    let options = EvaluatorOptions::new().with_hook(|value| match value {
        Value::String(s) if s == "secret" => Transformed::Replace(Value::from("***")),
        _ => Transformed::Keep,
    });
    assert!(eval_with("password == \"***\"", options, json!({"password": "secret"})).unwrap());
}

#[test]
fn test_hook_nil_is_an_error() {
    let options = EvaluatorOptions::new().with_hook(|_| Transformed::Nil);
    let err = eval_with("a == 1", options, json!({"a": 1})).unwrap_err();
    assert!(matches!(
        err,
        EvalError::Resolve(ref e) if e.kind == PointerErrorKind::HookReturnedNil
    ));
}

fn unwrap_inner(value: &Value) -> Transformed {
    match value {
        Value::Map(map) => match map.get("inner") {
            Some(inner) => Transformed::Replace(inner.clone()),
            None => Transformed::Keep,
        },
        _ => Transformed::Keep,
    }
}

#[test]
fn test_hook_sees_looked_up_values_only() {
    // The root has an "inner" key too; it must not be unwrapped
    let datum = json!({
        "s": {"inner": "foo"},
        "i": {"inner": {"i": "bar"}},
        "inner": "root"
    });
    let options = || EvaluatorOptions::new().with_hook(unwrap_inner);
    assert!(eval_with("s == foo", options(), datum.clone()).unwrap());
    assert!(eval_with("i.i == bar", options(), datum.clone()).unwrap());

    let err = eval_with("s.inner == foo", options(), datum).unwrap_err();
    assert_eq!(
        err.to_string(),
        "error finding value in datum: /s/inner at part 1: invalid value kind: string"
    );
}

#[test]
fn test_hook_runs_once_per_segment() {
    let counter = Arc::new(AtomicUsize::new(0));
    let datum = json!({"a": {"b": 1}});
    assert!(eval_with("a.b == 1", counting_options(&counter), datum).unwrap());
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    // A bound value is already resolved; only the segments after it count
    let counter = Arc::new(AtomicUsize::new(0));
    let datum = json!({"xs": [{"b": 1}]});
    assert!(eval_with("any xs as x { x.b == 1 }", counting_options(&counter), datum).unwrap());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_any_and_all_over_lists() {
    let datum = || json!({"tags": ["prod", "web"]});
    assert!(eval_json("any tags as t { t == prod }", datum()).unwrap());
    assert!(!eval_json("all tags as t { t == prod }", datum()).unwrap());
    assert!(eval_json("all tags as t { t != dev }", datum()).unwrap());
}

#[test]
fn test_vacuous_truth() {
    let datum = || json!({"tags": []});
    assert!(eval_json("all tags as t { t == prod }", datum()).unwrap());
    assert!(!eval_json("any tags as t { t == prod }", datum()).unwrap());
}

#[test]
fn test_list_index_binding() {
    let datum = || json!({"items": ["a", "b"]});
    assert!(eval_json("any items as i, _ { i == 1 }", datum()).unwrap());
    assert!(eval_json("any items as i, v { i == 1 and v == b }", datum()).unwrap());
    assert!(!eval_json("any items as i, v { i == 0 and v == b }", datum()).unwrap());
}

#[test]
fn test_map_bindings() {
    let datum = || json!({"labels": {"env": "prod", "team": "core"}});
    assert!(eval_json("any labels as k { k == env }", datum()).unwrap());
    assert!(eval_json("any labels as _, v { v == core }", datum()).unwrap());
    assert!(eval_json("any labels as k, v { k == team and v == core }", datum()).unwrap());
    assert!(!eval_json("all labels as _, v { v == prod }", datum()).unwrap());
}

#[test]
fn test_nested_collections_see_outer_bindings() {
    let datum = json!({
        "groups": [
            {"name": "a", "members": [{"group": "a"}, {"group": "a"}]},
            {"name": "b", "members": [{"group": "a"}]}
        ]
    });
    let expression = "all groups as g { all g.members as m { m.group == a } }";
    assert!(eval_json(expression, datum.clone()).unwrap());

    let expression = "any groups as g { any g.members as m { m.group == b } }";
    assert!(!eval_json(expression, datum).unwrap());
}

#[test]
fn test_inner_binding_shadows_outer() {
    let datum = json!({"outer": [[1, 2]]});
    assert!(eval_json("any outer as x { any x as x { x == 2 } }", datum).unwrap());
}

#[test]
fn test_pairs_collections() {
    let datum = Value::Map(
        [(
            "codes".to_string(),
            Value::Pairs(vec![
                (Value::Int(200), Value::from("ok")),
                (Value::Int(404), Value::from("missing")),
            ]),
        )]
        .into(),
    );
    let run = |expression: &str| {
        Evaluator::new(expression, EvaluatorOptions::new())
            .unwrap()
            .evaluate_value(&datum)
            .unwrap()
    };
    assert!(run("200 in codes"));
    assert!(!run("500 in codes"));
    assert!(run("codes is not empty"));
    assert!(run("any codes as k { k == 404 }"));
    assert!(run("any codes as _, v { v == ok }"));
    assert!(run("codes[`404`] == missing"));
}

#[test]
fn test_collection_over_missing_with_unknown_list() {
    let options = EvaluatorOptions::new().with_unknown_value(Value::List(vec![Value::Int(1)]));
    assert!(eval_with("any missing as v { v == 1 }", options, json!({})).unwrap());
}

// ============================================================================
// Custom Matchers
// ============================================================================

#[derive(Debug)]
struct Version {
    major: u64,
}

impl CustomMatcher for Version {
    fn evaluate_match(
        &self,
        path: &[String],
        operator: MatchOperator,
        value: Option<&Coerced>,
    ) -> Result<bool, MatcherError> {
        let expected = match value {
            Some(Coerced::Uint(n)) => *n,
            Some(Coerced::String(s)) => s.parse().map_err(|_| MatcherError::new("not a number"))?,
            _ => return Err(MatcherError::new("missing value")),
        };
        match (path, operator) {
            ([], MatchOperator::Equal) => Ok(self.major == expected),
            ([field], MatchOperator::Equal) if field == "major" => Ok(self.major == expected),
            _ => Err(MatcherError::new("unsupported")),
        }
    }
}

impl Selectable for Version {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::Custom {
            name: "Version".to_string(),
            fields: FieldConfigurations::new().with(
                "major",
                FieldConfiguration::primitive(&TypeDescriptor::Uint(IntWidth::W32)).unwrap(),
            ),
        }
    }

    fn to_value(&self) -> Value {
        Value::Custom(Arc::new(Version { major: self.major }))
    }
}

fn with_version() -> Value {
    Value::Map([("version".to_string(), Version { major: 3 }.to_value())].into())
}

#[test]
fn test_custom_value_answers_matches() {
    let run = |expression: &str| {
        Evaluator::new(expression, EvaluatorOptions::new())
            .unwrap()
            .evaluate_value(&with_version())
    };
    assert!(run("version == 3").unwrap());
    assert!(run("version.major == 3").unwrap());
    assert!(!run("version.major == 4").unwrap());
}

#[test]
fn test_custom_matcher_errors() {
    let evaluator = Evaluator::new("version.minor == 1", EvaluatorOptions::new()).unwrap();
    let err = evaluator.evaluate_value(&with_version()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "custom matcher for selector \"version.minor\" failed: unsupported"
    );

    let evaluator = Evaluator::new("any version as v { v == 1 }", EvaluatorOptions::new()).unwrap();
    assert!(matches!(
        evaluator.evaluate_value(&with_version()),
        Err(EvalError::CustomCollection { .. })
    ));
}

#[test]
fn test_custom_type_schema() {
    let evaluator = Evaluator::for_type::<Version>("major == 3", EvaluatorOptions::new()).unwrap();
    assert!(evaluator.evaluate(&Version { major: 3 }).unwrap());

    let err = Evaluator::for_type::<Version>("minor == 3", EvaluatorOptions::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidSelector { .. })
    ));
}

// ============================================================================
// Evaluator API
// ============================================================================

#[test]
fn test_evaluate_in_bound_context() {
    let root = Value::Null;
    let three = Value::Int(3);
    let ctx = EvalContext::new(&root);
    let bound = ctx.bind("x", &three);

    let evaluator = Evaluator::new("x == 3", EvaluatorOptions::new()).unwrap();
    assert!(evaluator.evaluate_in(&bound).unwrap());
    assert!(!evaluator.evaluate_in(&ctx).unwrap());
}

#[test]
fn test_dump_shows_expansion() {
    let evaluator =
        Evaluator::for_type::<Top>("Nested.SliceOfStructs.X == 1", EvaluatorOptions::new())
            .unwrap();
    assert!(evaluator.dump().starts_with("Any {\n   Selector: Nested.SliceOfStructs\n"));
    assert!(matches!(evaluator.expression(), bexpr::Expression::Match(_)));
    assert_eq!(evaluator.source(), "Nested.SliceOfStructs.X == 1");
    assert_eq!(evaluator.match_count(), 1);
}

#[test]
fn test_validate_against_another_schema() {
    let evaluator = Evaluator::new("TopInt == abc", EvaluatorOptions::new()).unwrap();
    let fields = bexpr::schema::generate(&Top::describe()).unwrap();
    assert!(matches!(
        evaluator.validate_against(&fields),
        Err(ValidationError::Coercion { .. })
    ));
}

#[test]
fn test_max_expressions_option() {
    let options = EvaluatorOptions::new().with_max_expressions(1);
    let err = Evaluator::new("a == 1 and b == 2", options).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn test_tag_name_option() {
    let options = EvaluatorOptions::new().with_tag_name("json");
    let evaluator = Evaluator::for_type::<Top>("Renamed == r and Hidden == true", options).unwrap();
    assert!(evaluator.evaluate(&top()).unwrap());
}

#[test]
fn test_shared_across_threads() {
    let evaluator =
        Evaluator::for_type::<Top>("TopString matches \"o w\"", EvaluatorOptions::new()).unwrap();
    let datum = top();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert!(evaluator.evaluate(&datum).unwrap()));
        }
    });
}
