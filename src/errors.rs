//! Error taxonomy
//!
//! Two families of errors:
//! - [`EditError`] - structural and editing failures. Edits that fail leave the
//!   tree, variables and history untouched.
//! - [`ExecError`] - failures of a function run, including cooperative
//!   cancellation and statement-level [`RuntimeError`]s.

use thiserror::Error;

use crate::types::{ElementId, TypeId, VariableId};

/* ===================== Runtime Error Codes ===================== */

pub const TYPE_ERROR: &str = "TYPE_ERROR";
pub const DIVISION_BY_ZERO: &str = "DIVISION_BY_ZERO";
pub const INTEGER_OVERFLOW: &str = "INTEGER_OVERFLOW";
pub const UNDEFINED_VARIABLE: &str = "UNDEFINED_VARIABLE";
pub const UNKNOWN_EFFECT: &str = "UNKNOWN_EFFECT";
pub const EFFECT_FAILED: &str = "EFFECT_FAILED";
pub const NO_RETURN_VALUE: &str = "NO_RETURN_VALUE";

/* ===================== Execution Errors ===================== */

/// Error raised by a statement while it runs.
///
/// `element` is filled in by the statement executor with the innermost
/// statement that raised the error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code}: {message}")]
pub struct RuntimeError {
    pub code: &'static str,
    pub message: String,
    pub element: Option<ElementId>,
}

impl RuntimeError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            element: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(TYPE_ERROR, message)
    }

    pub fn undefined_variable(id: &VariableId) -> Self {
        Self::new(UNDEFINED_VARIABLE, format!("Variable '{}' is not defined", id))
    }
}

/// Failure of a function run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("expected {expected} parameters, got {actual}")]
    ArgumentMismatch { expected: usize, actual: usize },

    #[error("argument '{name}' ({argument}) has no backing variable")]
    MissingBinding { argument: VariableId, name: String },

    #[error("execution cancelled")]
    Cancelled,

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ExecError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled)
    }
}

/* ===================== Edit Errors ===================== */

/// Failure of a structural edit or of loading serialized state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("index {index} is out of range for a sequence of length {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("'{kind}' elements cannot be used as statements")]
    NotAStatement { kind: &'static str },

    #[error("element {0} not found")]
    ElementNotFound(ElementId),

    #[error("an element with id {0} is already in the tree")]
    DuplicateElement(ElementId),

    #[error("element {0} does not accept dropped statements in that slot")]
    NotADropTarget(ElementId),

    #[error("moving element {0} there would place it inside itself")]
    WouldCreateCycle(ElementId),

    #[error("failed to deserialize elements: {0}")]
    Deserialization(String),

    #[error("unknown type '{0}'")]
    UnknownType(TypeId),

    #[error("argument names must not be empty")]
    EmptyName,

    #[error("an argument named '{0}' already exists")]
    DuplicateName(String),

    #[error("variable ids must not be empty")]
    InvalidId,

    #[error("a variable with id {0} already exists")]
    DuplicateVariable(VariableId),

    #[error("variable {0} not found")]
    VariableNotFound(VariableId),

    #[error("argument {0} not found")]
    ArgumentNotFound(VariableId),

    #[error("variable {0} backs an argument; delete the argument instead")]
    VariableBackedByArgument(VariableId),

    #[error("the return variable cannot be deleted")]
    ReturnVariable,

    #[error("variable {variable} is still referenced by {references} element(s)")]
    VariableInUse {
        variable: VariableId,
        references: usize,
    },
}

impl From<serde_json::Error> for EditError {
    fn from(err: serde_json::Error) -> Self {
        EditError::Deserialization(err.to_string())
    }
}
