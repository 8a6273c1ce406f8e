//! Tests for sequential and nested execution

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::helpers::{root, run, store_with, value_of, RET};
use crate::elements::{BinaryOp, Element, Elements, Expr};
use crate::errors::ExecError;
use crate::executor::{run_statements, Control, ExecutionContext, StatementExecutor};
use crate::types::{Value, VariableId};
use crate::variables::VariableStore;

#[tokio::test]
async fn test_statements_run_in_order() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![
        Element::print(Expr::lit("one")),
        Element::print(Expr::lit("two")),
        Element::print(Expr::lit("three")),
    ]);
    let mut vars = store_with(&[]);

    let control = run(&mut ctx, &mut elements, &mut vars).await.unwrap();

    assert_eq!(control, Control::Continue);
    assert_eq!(ctx.output(), ["one", "two", "three"]);
}

#[tokio::test]
async fn test_nested_blocks_run_depth_first() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![
        Element::print(Expr::lit(1)),
        Element::block(vec![
            Element::print(Expr::lit(2)),
            Element::block(vec![Element::print(Expr::lit(3))]),
            Element::print(Expr::lit(4)),
        ]),
        Element::print(Expr::lit(5)),
    ]);
    let mut vars = store_with(&[]);

    run(&mut ctx, &mut elements, &mut vars).await.unwrap();

    assert_eq!(ctx.output(), ["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn test_assign_updates_variable() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![
        Element::assign("x", Expr::lit(2)),
        Element::assign("x", Expr::binary(BinaryOp::Mul, Expr::var("x"), Expr::lit(21))),
    ]);
    let mut vars = store_with(&[("x", Value::Int(0))]);

    run(&mut ctx, &mut elements, &mut vars).await.unwrap();

    assert_eq!(value_of(&vars, "x"), Value::Int(42));
}

#[tokio::test]
async fn test_if_picks_branch() {
    for (flag, expected) in [(true, "then"), (false, "else")] {
        let mut ctx = StatementExecutor::new();
        let mut elements = root(vec![Element::if_else(
            Expr::var("flag"),
            vec![Element::print(Expr::lit("then"))],
            vec![Element::print(Expr::lit("else"))],
        )]);
        let mut vars = store_with(&[("flag", Value::Bool(flag))]);

        run(&mut ctx, &mut elements, &mut vars).await.unwrap();

        assert_eq!(ctx.output(), [expected]);
    }
}

#[tokio::test]
async fn test_while_loop_counts() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![Element::while_loop(
        Expr::binary(BinaryOp::Lt, Expr::var("i"), Expr::lit(3)),
        vec![
            Element::print(Expr::var("i")),
            Element::assign("i", Expr::add(Expr::var("i"), Expr::lit(1))),
        ],
    )]);
    let mut vars = store_with(&[("i", Value::Int(0))]);

    run(&mut ctx, &mut elements, &mut vars).await.unwrap();

    assert_eq!(ctx.output(), ["0", "1", "2"]);
    assert_eq!(value_of(&vars, "i"), Value::Int(3));
}

#[tokio::test]
async fn test_return_stops_enclosing_sequences() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![
        Element::block(vec![
            Element::if_else(
                Expr::lit(true),
                vec![Element::return_value(Expr::lit(10))],
                vec![],
            ),
            Element::print(Expr::lit("inner after return")),
        ]),
        Element::print(Expr::lit("outer after return")),
    ]);
    let mut vars = store_with(&[]);

    let control = run(&mut ctx, &mut elements, &mut vars).await.unwrap();

    assert_eq!(control, Control::Return);
    assert!(ctx.output().is_empty());
    assert_eq!(value_of(&vars, RET), Value::Int(10));
}

#[tokio::test]
async fn test_return_inside_loop_exits_loop() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![Element::while_loop(
        Expr::lit(true),
        vec![
            Element::assign("i", Expr::add(Expr::var("i"), Expr::lit(1))),
            Element::if_else(
                Expr::binary(BinaryOp::Eq, Expr::var("i"), Expr::lit(5)),
                vec![Element::return_value(Expr::var("i"))],
                vec![],
            ),
        ],
    )]);
    let mut vars = store_with(&[("i", Value::Int(0))]);

    run(&mut ctx, &mut elements, &mut vars).await.unwrap();

    assert_eq!(value_of(&vars, RET), Value::Int(5));
}

#[tokio::test]
async fn test_return_without_value_keeps_return_variable() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![
        Element::return_none(),
        Element::assign(RET, Expr::lit("unreachable")),
    ]);
    let mut vars = store_with(&[]);

    let control = run(&mut ctx, &mut elements, &mut vars).await.unwrap();

    assert_eq!(control, Control::Return);
    assert_eq!(value_of(&vars, RET), Value::Null);
}

#[tokio::test]
async fn test_comment_is_noop() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![Element::comment("nothing to see")]);
    let mut vars = store_with(&[]);

    assert_eq!(
        run(&mut ctx, &mut elements, &mut vars).await,
        Ok(Control::Continue)
    );
    assert!(ctx.output().is_empty());
}

#[tokio::test]
async fn test_wait_completes() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![Element::wait(1), Element::print(Expr::lit("done"))]);
    let mut vars = store_with(&[]);

    run(&mut ctx, &mut elements, &mut vars).await.unwrap();

    assert_eq!(ctx.output(), ["done"]);
}

#[tokio::test]
async fn test_invoke_passes_args_and_stores_result() {
    let mut ctx = StatementExecutor::new();
    ctx.register_effect("sum", |args: Vec<Value>| async move {
        let total = args
            .iter()
            .map(|v| match v {
                Value::Int(n) => *n,
                _ => 0,
            })
            .sum::<i64>();
        Ok(Value::Int(total))
    });
    let mut elements = root(vec![Element::invoke(
        "sum",
        vec![Expr::lit(1), Expr::var("x"), Expr::lit(3)],
        Some(VariableId::from("out")),
    )]);
    let mut vars = store_with(&[("x", Value::Int(2)), ("out", Value::Null)]);

    run(&mut ctx, &mut elements, &mut vars).await.unwrap();

    assert_eq!(value_of(&vars, "out"), Value::Int(6));
}

/* ===================== Custom Contexts ===================== */

/// Context that counts how many sequences it was asked to run
struct CountingContext {
    sequences: usize,
    lines: Vec<String>,
}

impl ExecutionContext for CountingContext {
    fn execute_statements<'a>(
        &'a mut self,
        elements: &'a mut Elements,
        variables: &'a mut VariableStore,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Control, ExecError>> {
        self.sequences += 1;
        run_statements(self, elements, variables, cancel)
    }

    fn write_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

#[tokio::test]
async fn test_nested_sequences_go_through_the_context() {
    let mut ctx = CountingContext {
        sequences: 0,
        lines: Vec::new(),
    };
    let mut elements = root(vec![
        Element::block(vec![Element::block(vec![Element::print(Expr::lit("deep"))])]),
        Element::if_else(Expr::lit(false), vec![], vec![Element::comment("else")]),
    ]);
    let mut vars = store_with(&[]);
    let cancel = CancellationToken::new();

    ctx.execute_statements(&mut elements, &mut vars, &cancel)
        .await
        .unwrap();

    // root, outer block, inner block, else branch
    assert_eq!(ctx.sequences, 4);
    assert_eq!(ctx.lines, ["deep"]);
}

#[tokio::test]
async fn test_default_context_has_no_effects() {
    let mut ctx = CountingContext {
        sequences: 0,
        lines: Vec::new(),
    };
    let mut elements = root(vec![Element::invoke("anything", vec![], None)]);
    let mut vars = store_with(&[]);
    let cancel = CancellationToken::new();

    let err = ctx
        .execute_statements(&mut elements, &mut vars, &cancel)
        .await
        .unwrap_err();

    match err {
        ExecError::Runtime(err) => assert_eq!(err.code, crate::errors::UNKNOWN_EFFECT),
        other => panic!("Expected runtime error, got {:?}", other),
    }
}
