//! # Statement Executor
//!
//! Async tree-walking interpreter for element sequences.
//!
//! ## Execution model
//!
//! 1. **Strictly sequential**: statements of one sequence run one after the
//!    other; nothing runs concurrently with anything else in the same run.
//! 2. **Recursive through the context**: a statement that owns nested
//!    sequences (`Block`, `If`, `While`) runs them by calling
//!    [`ExecutionContext::execute_statements`] again, so execution order is
//!    depth-first and matches the tree.
//! 3. **Cooperative cancellation**: the token is checked before every
//!    statement. Suspending statements (`Wait`, `Invoke`) race their work
//!    against the same token.
//! 4. **No masking**: errors propagate unchanged. A [`RuntimeError`] only gets
//!    the id of the statement that raised it filled in, and is recorded on
//!    that statement when it is an error source.

mod context;

#[cfg(test)]
mod tests;

use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub use context::{EffectHandler, StatementExecutor};

use crate::elements::{Element, ElementKind, Elements};
use crate::errors::{ExecError, RuntimeError, NO_RETURN_VALUE, UNKNOWN_EFFECT};
use crate::types::Value;
use crate::variables::VariableStore;

/* ===================== Control Flow ===================== */

/// How a sequence finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Ran to the end
    Continue,
    /// A `Return` statement ran; enclosing sequences stop as well
    Return,
}

/* ===================== Execution Context ===================== */

/// Collaborator that carries out statement execution.
///
/// Supplied by the caller of [`crate::function::Function::execute`].
/// `execute_statements` must keep the sequential, cancellable contract; the
/// default implementation is [`run_statements`].
pub trait ExecutionContext: Send {
    /// Execute `elements` in order against `variables`
    fn execute_statements<'a>(
        &'a mut self,
        elements: &'a mut Elements,
        variables: &'a mut VariableStore,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Control, ExecError>> {
        run_statements(self, elements, variables, cancel)
    }

    /// Receive one line of program output
    fn write_line(&mut self, line: &str);

    /// Run a named external effect
    fn invoke<'a>(
        &'a mut self,
        effect: &'a str,
        _args: Vec<Value>,
        _cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Value, ExecError>> {
        Box::pin(async move {
            let error = RuntimeError::new(
                UNKNOWN_EFFECT,
                format!("Effect '{}' is not registered", effect),
            );
            Err(ExecError::Runtime(error))
        })
    }

    /// Whether loops hand control back to the scheduler between iterations
    fn yield_in_loops(&self) -> bool {
        true
    }
}

/* ===================== Core Loop ===================== */

/// Execute `elements` in order.
///
/// Checks `cancel` before each statement; once cancellation is observed no
/// further statement starts and the call fails with [`ExecError::Cancelled`].
pub fn run_statements<'a, C>(
    ctx: &'a mut C,
    elements: &'a mut Elements,
    variables: &'a mut VariableStore,
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, Result<Control, ExecError>>
where
    C: ExecutionContext + ?Sized,
{
    Box::pin(async move {
        for element in elements.iter_mut() {
            if cancel.is_cancelled() {
                debug!(element = %element.id, "cancellation observed at statement boundary");
                return Err(ExecError::Cancelled);
            }

            match execute_statement(ctx, element, variables, cancel).await {
                Ok(Control::Continue) => {}
                Ok(Control::Return) => return Ok(Control::Return),
                Err(ExecError::Runtime(mut error)) if error.element.is_none() => {
                    error.element = Some(element.id);
                    element.record_error(&error);
                    return Err(ExecError::Runtime(error));
                }
                Err(error) => return Err(error),
            }
        }
        Ok(Control::Continue)
    })
}

/// Execute a single statement
async fn execute_statement<C>(
    ctx: &mut C,
    element: &mut Element,
    variables: &mut VariableStore,
    cancel: &CancellationToken,
) -> Result<Control, ExecError>
where
    C: ExecutionContext + ?Sized,
{
    trace!(element = %element.id, kind = element.kind.name(), "executing statement");

    match &mut element.kind {
        ElementKind::Block { body } => ctx.execute_statements(body, variables, cancel).await,

        ElementKind::Assign { variable, value } => {
            let value = value.eval(variables)?;
            variables.assign(variable, value)?;
            Ok(Control::Continue)
        }

        ElementKind::Return { value } => {
            if let Some(expr) = value {
                let value = expr.eval(variables)?;
                let target = variables
                    .return_variable()
                    .map(|v| v.id.clone())
                    .ok_or_else(|| {
                        RuntimeError::new(
                            NO_RETURN_VALUE,
                            "Function has no return type, so it cannot return a value",
                        )
                    })?;
                variables.assign(&target, value)?;
            }
            Ok(Control::Return)
        }

        ElementKind::If {
            condition,
            then_body,
            else_body,
        } => {
            let branch = if condition.eval(variables)?.is_truthy() {
                then_body
            } else {
                else_body
            };
            ctx.execute_statements(branch, variables, cancel).await
        }

        ElementKind::While { condition, body } => loop {
            if cancel.is_cancelled() {
                debug!("cancellation observed between loop iterations");
                return Err(ExecError::Cancelled);
            }
            if !condition.eval(variables)?.is_truthy() {
                return Ok(Control::Continue);
            }
            if ctx.execute_statements(body, variables, cancel).await? == Control::Return {
                return Ok(Control::Return);
            }
            if ctx.yield_in_loops() {
                tokio::task::yield_now().await;
            }
        },

        ElementKind::Print { value } => {
            let value = value.eval(variables)?;
            ctx.write_line(&value.to_string());
            Ok(Control::Continue)
        }

        ElementKind::Wait { millis } => {
            let duration = Duration::from_millis(*millis);
            tokio::select! {
                _ = cancel.cancelled() => Err(ExecError::Cancelled),
                _ = tokio::time::sleep(duration) => Ok(Control::Continue),
            }
        }

        ElementKind::Invoke {
            effect,
            args,
            result,
        } => {
            let args = args
                .iter()
                .map(|arg| arg.eval(variables))
                .collect::<Result<Vec<_>, _>>()?;
            let value = ctx.invoke(effect, args, cancel).await?;
            if let Some(target) = result {
                variables.assign(target, value)?;
            }
            Ok(Control::Continue)
        }

        ElementKind::Comment { .. } => Ok(Control::Continue),

        ElementKind::Expression { .. } => Err(RuntimeError::type_error(
            "Expression fragments cannot be executed as statements",
        )
        .into()),
    }
}
