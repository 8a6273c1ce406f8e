//! Tests for runtime error propagation

use super::helpers::{root, run, store_with, value_of};
use crate::elements::{BinaryOp, Element, Expr};
use crate::errors::{
    ExecError, RuntimeError, DIVISION_BY_ZERO, EFFECT_FAILED, NO_RETURN_VALUE, UNDEFINED_VARIABLE,
    UNKNOWN_EFFECT,
};
use crate::executor::StatementExecutor;
use crate::types::Value;
use crate::variables::VariableStore;

fn runtime(err: ExecError) -> RuntimeError {
    match err {
        ExecError::Runtime(err) => err,
        other => panic!("Expected runtime error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_carries_innermost_element() {
    let failing = Element::print(Expr::var("missing"));
    let failing_id = failing.id;
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![Element::block(vec![Element::if_else(
        Expr::lit(true),
        vec![failing],
        vec![],
    )])]);
    let mut vars = store_with(&[]);

    let err = runtime(run(&mut ctx, &mut elements, &mut vars).await.unwrap_err());

    assert_eq!(err.code, UNDEFINED_VARIABLE);
    assert_eq!(err.element, Some(failing_id));

    let recorded = elements.find(failing_id).unwrap().errors();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].rule_id, UNDEFINED_VARIABLE);
    // Enclosing statements are not blamed
    let others = elements
        .walk()
        .filter(|e| e.id != failing_id)
        .all(|e| e.errors().is_empty());
    assert!(others);
}

#[tokio::test]
async fn test_statements_after_error_do_not_run() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![
        Element::print(Expr::lit("before")),
        Element::assign(
            "x",
            Expr::binary(BinaryOp::Div, Expr::lit(1), Expr::lit(0)),
        ),
        Element::print(Expr::lit("after")),
        Element::assign("x", Expr::lit(99)),
    ]);
    let mut vars = store_with(&[("x", Value::Int(0))]);

    let err = runtime(run(&mut ctx, &mut elements, &mut vars).await.unwrap_err());

    assert_eq!(err.code, DIVISION_BY_ZERO);
    assert_eq!(ctx.output(), ["before"]);
    assert_eq!(value_of(&vars, "x"), Value::Int(0));
}

#[tokio::test]
async fn test_failing_condition_is_blamed_on_the_if() {
    let branch = Element::if_else(
        Expr::add(Expr::lit(true), Expr::lit(1)),
        vec![Element::print(Expr::lit("then"))],
        vec![],
    );
    let branch_id = branch.id;
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![branch]);
    let mut vars = store_with(&[]);

    let err = runtime(run(&mut ctx, &mut elements, &mut vars).await.unwrap_err());

    assert_eq!(err.element, Some(branch_id));
    assert_eq!(elements.find(branch_id).unwrap().errors().len(), 1);
}

#[tokio::test]
async fn test_unknown_effect() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![Element::invoke("nope", vec![], None)]);
    let mut vars = store_with(&[]);

    let err = runtime(run(&mut ctx, &mut elements, &mut vars).await.unwrap_err());

    assert_eq!(err.code, UNKNOWN_EFFECT);
    assert!(err.message.contains("nope"));
}

#[tokio::test]
async fn test_effect_failure_propagates() {
    let mut ctx = StatementExecutor::new();
    ctx.register_effect("flaky", |_| async {
        Err(RuntimeError::new(EFFECT_FAILED, "upstream unavailable"))
    });
    let invoke = Element::invoke("flaky", vec![], None);
    let invoke_id = invoke.id;
    let mut elements = root(vec![invoke]);
    let mut vars = store_with(&[]);

    let err = runtime(run(&mut ctx, &mut elements, &mut vars).await.unwrap_err());

    assert_eq!(err.code, EFFECT_FAILED);
    assert_eq!(err.element, Some(invoke_id));
}

#[tokio::test]
async fn test_return_value_without_return_variable() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![Element::return_value(Expr::lit(1))]);
    let mut vars = VariableStore::new();

    let err = runtime(run(&mut ctx, &mut elements, &mut vars).await.unwrap_err());

    assert_eq!(err.code, NO_RETURN_VALUE);
}

#[tokio::test]
async fn test_errors_accumulate_until_cleared() {
    let failing = Element::print(Expr::var("missing"));
    let failing_id = failing.id;
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![failing]);
    let mut vars = store_with(&[]);

    let _ = run(&mut ctx, &mut elements, &mut vars).await;
    let _ = run(&mut ctx, &mut elements, &mut vars).await;
    assert_eq!(elements.find(failing_id).unwrap().errors().len(), 2);

    elements.find_mut(failing_id).unwrap().clear_errors();
    assert!(elements.find(failing_id).unwrap().errors().is_empty());
}
