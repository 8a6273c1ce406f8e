//! Tests for cooperative cancellation

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::helpers::{root, store_with, value_of};
use crate::elements::{Element, Expr};
use crate::errors::{ExecError, RuntimeError};
use crate::executor::{ExecutionContext, StatementExecutor};
use crate::types::Value;

/// Cancel `token` after `delay` from a separate task
fn cancel_after(token: &CancellationToken, delay: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        token.cancel();
    });
}

#[tokio::test]
async fn test_cancelled_token_runs_nothing() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![
        Element::print(Expr::lit("first")),
        Element::assign("x", Expr::lit(1)),
    ]);
    let mut vars = store_with(&[("x", Value::Int(0))]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = ctx.execute_statements(&mut elements, &mut vars, &cancel).await;

    assert_eq!(result, Err(ExecError::Cancelled));
    assert!(ctx.output().is_empty());
    assert_eq!(value_of(&vars, "x"), Value::Int(0));
}

#[tokio::test]
async fn test_cancel_interrupts_wait() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![
        Element::print(Expr::lit("before")),
        Element::wait(60_000),
        Element::print(Expr::lit("after")),
    ]);
    let mut vars = store_with(&[]);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(20));

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        ctx.execute_statements(&mut elements, &mut vars, &cancel),
    )
    .await
    .expect("wait was not interrupted");

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(ctx.output(), ["before"]);
}

#[tokio::test]
async fn test_cancel_from_effect_stops_next_statement() {
    let cancel = CancellationToken::new();
    let mut ctx = StatementExecutor::new();
    let token = cancel.clone();
    ctx.register_effect("stop", move |_| {
        let token = token.clone();
        async move {
            token.cancel();
            Ok(Value::Null)
        }
    });
    let mut elements = root(vec![
        Element::invoke("stop", vec![], None),
        Element::print(Expr::lit("never")),
    ]);
    let mut vars = store_with(&[]);

    let result = ctx.execute_statements(&mut elements, &mut vars, &cancel).await;

    assert_eq!(result, Err(ExecError::Cancelled));
    assert!(ctx.output().is_empty());
}

#[tokio::test]
async fn test_cancel_interrupts_pending_effect() {
    let mut ctx = StatementExecutor::new();
    ctx.register_effect("hang", |_| {
        futures::future::pending::<Result<Value, RuntimeError>>()
    });
    let mut elements = root(vec![Element::invoke("hang", vec![], None)]);
    let mut vars = store_with(&[]);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(20));

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        ctx.execute_statements(&mut elements, &mut vars, &cancel),
    )
    .await
    .expect("effect was not interrupted");

    assert_eq!(result, Err(ExecError::Cancelled));
}

#[tokio::test]
async fn test_cancel_stops_infinite_loop() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![Element::while_loop(
        Expr::lit(true),
        vec![Element::assign("n", Expr::add(Expr::var("n"), Expr::lit(1)))],
    )]);
    let mut vars = store_with(&[("n", Value::Int(0))]);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(20));

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        ctx.execute_statements(&mut elements, &mut vars, &cancel),
    )
    .await
    .expect("loop was not interrupted");

    assert_eq!(result, Err(ExecError::Cancelled));
    assert!(matches!(value_of(&vars, "n"), Value::Int(n) if n > 0));
}

#[tokio::test]
async fn test_cancellation_is_not_recorded_as_element_error() {
    let mut ctx = StatementExecutor::new();
    let mut elements = root(vec![Element::wait(60_000)]);
    let mut vars = store_with(&[]);
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(10));

    let _ = ctx.execute_statements(&mut elements, &mut vars, &cancel).await;

    assert!(elements.walk().all(|e| e.errors().is_empty()));
}
