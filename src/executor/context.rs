//! Default execution context

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ExecutionContext;
use crate::config::ExecutionConfig;
use crate::errors::{ExecError, RuntimeError, UNKNOWN_EFFECT};
use crate::types::Value;

/// Async handler for a named external effect
pub type EffectHandler =
    Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, RuntimeError>> + Send + Sync>;

/// Execution context that collects program output and dispatches `Invoke`
/// statements to registered effect handlers
pub struct StatementExecutor {
    effects: HashMap<String, EffectHandler>,
    output: Vec<String>,
    echo: bool,
    yield_in_loops: bool,
}

impl StatementExecutor {
    pub fn new() -> Self {
        Self {
            effects: HashMap::new(),
            output: Vec::new(),
            echo: false,
            yield_in_loops: true,
        }
    }

    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            yield_in_loops: config.yield_in_loops,
            ..Self::new()
        }
    }

    /// Also print every output line to stdout
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Register (or replace) the handler for `name`
    pub fn register_effect<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RuntimeError>> + Send + 'static,
    {
        let handler: EffectHandler = Arc::new(move |args| handler(args).boxed());
        self.effects.insert(name.into(), handler);
    }

    /// Output lines written so far
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }
}

impl Default for StatementExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext for StatementExecutor {
    fn write_line(&mut self, line: &str) {
        if self.echo {
            println!("{}", line);
        }
        self.output.push(line.to_string());
    }

    fn invoke<'a>(
        &'a mut self,
        effect: &'a str,
        args: Vec<Value>,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<Value, ExecError>> {
        let handler = self.effects.get(effect).cloned();
        Box::pin(async move {
            let Some(handler) = handler else {
                return Err(RuntimeError::new(
                    UNKNOWN_EFFECT,
                    format!("Effect '{}' is not registered", effect),
                )
                .into());
            };

            debug!(effect, args = args.len(), "invoking effect");
            tokio::select! {
                _ = cancel.cancelled() => Err(ExecError::Cancelled),
                result = handler(args) => result.map_err(ExecError::from),
            }
        })
    }

    fn yield_in_loops(&self) -> bool {
        self.yield_in_loops
    }
}
