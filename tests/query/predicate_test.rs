use lumbung::{column, eval, Expression, ExpressionBuilder};
use serde_json::{json, Map, Value};

fn sample() -> Map<String, Value> {
    let value = json!({
        "key1": "value",
        "key2": 100,
        "key3": { "key4": 10.25 }
    });
    value.as_object().unwrap().clone()
}

#[test]
fn comparisons_resolve_columns() {
    let data = sample();

    assert!(eval(&data, &column("key1").eq("value")));
    assert!(eval(&data, &column("key2").gt(1)));
    assert!(eval(&data, &column("key2").lt(1_000_000)));
    assert!(eval(&data, &column("key3.key4").gt(5.12)));

    assert!(!eval(&data, &column("key1").eq("another-value")));
    assert!(!eval(&data, &column("key2").gt(100)));
    assert!(eval(&data, &column("key2").gte(100)));
    assert!(eval(&data, &column("key2").lte(100)));
    assert!(eval(&data, &column("key2").neq(99)));
    assert!(!eval(&data, &column("key1").neq("value")));
}

#[test]
fn disjunctions_and_conjunctions() {
    let data = sample();

    assert!(eval(
        &data,
        &Expression::Or(vec![
            column("key1").eq("another-value"),
            column("key2").lt(120),
        ])
    ));
    assert!(eval(
        &data,
        &Expression::And(vec![
            column("key1").eq("value"),
            column("key2").gt(80),
        ])
    ));
    assert!(!eval(
        &data,
        &Expression::And(vec![
            column("key1").eq("value"),
            column("key2").gt(100),
        ])
    ));
    assert!(!eval(
        &data,
        &Expression::Or(vec![
            column("key1").eq("x"),
            column("key2").gt(100),
        ])
    ));
}

#[test]
fn empty_and_and_or_are_vacuously_true() {
    let data = sample();
    assert!(eval(&data, &Expression::And(vec![])));
    assert!(eval(&data, &Expression::Or(vec![])));
}

#[test]
fn single_element_and_equals_its_inner_expression() {
    let data = sample();
    for expr in [column("key2").gt(1), column("key2").gt(100)] {
        assert_eq!(
            eval(&data, &Expression::And(vec![expr.clone()])),
            eval(&data, &expr)
        );
    }
}

#[test]
fn nested_expressions_compose() {
    let data = sample();
    let expr = Expression::And(vec![
        Expression::Or(vec![
            column("key1").eq("x"),
            column("key3.key4").lte(10.25),
        ]),
        column("key2").gte(100),
    ]);
    assert!(eval(&data, &expr));
}

#[test]
fn builder_chains_comparisons_with_and() {
    let data = sample();

    let expr = ExpressionBuilder::new()
        .eq("key1", "value")
        .gt("key2", 80)
        .lte("key3.key4", 10.25)
        .build();
    assert!(eval(&data, &expr));

    let expr = ExpressionBuilder::new()
        .eq("key1", "value")
        .gt("key2", 100)
        .build();
    assert!(!eval(&data, &expr));

    // an empty builder matches everything
    assert!(eval(&data, &ExpressionBuilder::new().build()));

    let expr = ExpressionBuilder::new()
        .eq("key1", "x")
        .or(column("key2").gte(100))
        .build();
    assert!(eval(&data, &expr));
}

#[test]
fn unresolved_columns_never_match() {
    let data = sample();

    // missing column
    assert!(!eval(&data, &column("missing").eq(1)));
    assert!(!eval(&data, &column("missing").neq(1)));
    // path descends through a primitive
    assert!(!eval(&data, &column("key1.sub").eq(1)));
    // path stops at an object
    assert!(!eval(&data, &column("key3").eq(1)));
    // path runs past the leaf
    assert!(!eval(&data, &column("key3.key4.deeper").eq(1)));
}

#[test]
fn cross_variant_comparisons_are_false() {
    let data = sample();

    assert!(!eval(&data, &column("key2").eq("100")));
    assert!(!eval(&data, &column("key2").neq("100")));
    assert!(!eval(&data, &column("key1").gt(1)));
    assert!(!eval(&data, &column("key3.key4").eq(10)));
}

#[test]
fn unsupported_json_leaves_stay_unresolved() {
    let value = json!({
        "flag": true,
        "nothing": null,
        "list": [1, 2, 3]
    });
    let data = value.as_object().unwrap().clone();

    assert!(!eval(&data, &column("flag").eq(1)));
    assert!(!eval(&data, &column("nothing").eq(0)));
    assert!(!eval(&data, &column("list").eq(1)));
}

#[test]
fn large_integers_resolve_as_int64() {
    let value = json!({ "big": 5_000_000_000i64 });
    let data = value.as_object().unwrap().clone();

    assert!(eval(&data, &column("big").gt(4_000_000_000i64)));
    // an Int32 constant never matches an Int64 column value
    assert!(!eval(&data, &column("big").gt(1)));
}
