pub mod catalog;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod elements;
pub mod errors;
pub mod executor;
pub mod function;
pub mod history;
pub mod session;
pub mod types;
pub mod variables;

// Re-export main types
pub use types::*;

pub use catalog::{BuiltinCatalog, TypeCatalog, TypeDescriptor};
pub use clipboard::{Clipboard, ClipboardPayload, MemoryClipboard};
pub use config::Config;
pub use elements::{
    Capability, Element, ElementError, ElementKind, Elements, Expr, Owner, Severity, Slot, Target,
};
pub use errors::{EditError, ExecError, RuntimeError};
pub use executor::{Control, ExecutionContext, StatementExecutor};
pub use function::{Function, FunctionDefinition};
pub use history::{History, Snapshot};
pub use session::{EditSession, Selection};
pub use variables::{Argument, Variable, VariableOrigin, VariableStore};
