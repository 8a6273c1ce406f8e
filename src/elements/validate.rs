//! Per-element validation
//!
//! Error-source elements report two kinds of findings:
//! - runtime errors recorded during the last run (kept until cleared)
//! - validation findings computed from the element and the variable store

use std::fmt;

use super::{Element, ElementKind};
use crate::errors::RuntimeError;
use crate::types::{ElementId, VariableId};
use crate::variables::VariableStore;

/// Severity levels for element findings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Must be fixed - the element cannot run correctly
    Error,
    /// Should probably be fixed
    Warning,
}

/// A finding reported by an error-source element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementError {
    /// The element the finding belongs to
    pub element: ElementId,
    /// Human-readable message
    pub message: String,
    pub severity: Severity,
    /// Validation rule id, or the runtime error code
    pub rule_id: &'static str,
}

impl ElementError {
    pub fn error(element: ElementId, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            element,
            message: message.into(),
            severity: Severity::Error,
            rule_id,
        }
    }

    pub fn warning(element: ElementId, message: impl Into<String>, rule_id: &'static str) -> Self {
        Self {
            element,
            message: message.into(),
            severity: Severity::Warning,
            rule_id,
        }
    }

    pub fn from_runtime(element: ElementId, error: &RuntimeError) -> Self {
        Self::error(element, error.message.clone(), error.code)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for ElementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{} in element {}: {} [{}]",
            severity, self.element, self.message, self.rule_id
        )
    }
}

/// What validation needs to know about the enclosing function
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub variables: &'a VariableStore,
    /// Whether the function declares a return type
    pub returns_value: bool,
}

pub(crate) fn validate(element: &Element, ctx: &CheckContext<'_>) -> Vec<ElementError> {
    let mut errors = Vec::new();
    let id = element.id;

    let undefined = |variable: &VariableId, errors: &mut Vec<ElementError>| {
        if !ctx.variables.contains(variable) {
            errors.push(ElementError::error(
                id,
                format!("Variable '{}' is not defined", variable),
                "undefined-variable",
            ));
        }
    };

    for expr in element.kind.expressions() {
        expr.for_each_variable(&mut |v| undefined(v, &mut errors));
    }

    match &element.kind {
        ElementKind::Assign { variable, .. } => undefined(variable, &mut errors),

        ElementKind::Return { value } => match (value, ctx.returns_value) {
            (Some(_), false) => errors.push(ElementError::error(
                id,
                "Function has no return type, so it cannot return a value",
                "unexpected-return-value",
            )),
            (None, true) => errors.push(ElementError::warning(
                id,
                "Return without a value leaves the previous return value in place",
                "missing-return-value",
            )),
            _ => {}
        },

        ElementKind::While { body, .. } if body.is_empty() => errors.push(ElementError::warning(
            id,
            "Loop body is empty",
            "empty-loop",
        )),

        ElementKind::Invoke { effect, result, .. } => {
            if effect.trim().is_empty() {
                errors.push(ElementError::error(id, "Effect name is empty", "empty-effect"));
            }
            if let Some(result) = result {
                undefined(result, &mut errors);
            }
        }

        _ => {}
    }

    errors
}
