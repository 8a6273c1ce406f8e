//! # Element tree
//!
//! A function body is a forest of [`Element`]s. Each element is one of a
//! closed set of kinds ([`ElementKind`]); what an element can do is looked up
//! in a capability table ([`ElementKind::has`]) rather than by probing types
//! at runtime:
//!
//! | Kind         | Statement | ErrorSource | DropTarget |
//! |--------------|-----------|-------------|------------|
//! | `Block`      | yes       |             | `Body`     |
//! | `Assign`     | yes       | yes         |            |
//! | `Return`     | yes       | yes         |            |
//! | `If`         | yes       | yes         | `Then`, `Else` |
//! | `While`      | yes       | yes         | `Body`     |
//! | `Print`      | yes       | yes         |            |
//! | `Wait`       | yes       |             |            |
//! | `Invoke`     | yes       | yes         |            |
//! | `Comment`    | yes       |             |            |
//! | `Expression` |           |             |            |
//!
//! Containers own their children by value; children point back at their
//! container with a plain [`Owner`] value, never a reference.

mod container;
pub mod expr;
pub mod validate;


use serde::{Deserialize, Serialize};

pub use container::{Elements, Walk};
pub use expr::{BinaryOp, Expr, UnaryOp};
pub use validate::{CheckContext, ElementError, Severity};

use crate::errors::{EditError, RuntimeError};
use crate::types::{ElementId, FunctionId, VariableId};

/* ===================== Ownership ===================== */

/// Named child container of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Body,
    Then,
    Else,
}

/// Non-owning back-reference from a container (and its children) to whatever
/// holds it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Owner {
    /// Not placed in any tree
    #[default]
    Detached,
    /// Top-level sequence of a function
    Function(FunctionId),
    /// Child container of an element
    Element { id: ElementId, slot: Slot },
}

/// Where a drop or paste lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The function's top-level sequence
    Root,
    /// A child container of a drop-target element
    Slot { element: ElementId, slot: Slot },
}

/// Capabilities an element kind may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Can be placed in a sequence and executed
    Statement,
    /// Reports and clears validation/runtime errors
    ErrorSource,
    /// Accepts dropped statements into one or more slots
    DropTarget,
}

/* ===================== Element Kinds ===================== */

/// Element kind and its own data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ElementKind {
    Block {
        body: Elements,
    },
    Assign {
        variable: VariableId,
        value: Expr,
    },
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Expr>,
    },
    If {
        condition: Expr,
        then_body: Elements,
        #[serde(default)]
        else_body: Elements,
    },
    While {
        condition: Expr,
        body: Elements,
    },
    Print {
        value: Expr,
    },
    Wait {
        millis: u64,
    },
    Invoke {
        effect: String,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<VariableId>,
    },
    Comment {
        text: String,
    },
    /// A bare expression fragment. Never a statement.
    Expression {
        value: Expr,
    },
}

impl ElementKind {
    /// Capability table
    pub fn has(&self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            ElementKind::Block { .. } => matches!(capability, Statement | DropTarget),
            ElementKind::If { .. } | ElementKind::While { .. } => true,
            ElementKind::Assign { .. }
            | ElementKind::Return { .. }
            | ElementKind::Print { .. }
            | ElementKind::Invoke { .. } => matches!(capability, Statement | ErrorSource),
            ElementKind::Wait { .. } | ElementKind::Comment { .. } => capability == Statement,
            ElementKind::Expression { .. } => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Block { .. } => "block",
            ElementKind::Assign { .. } => "assign",
            ElementKind::Return { .. } => "return",
            ElementKind::If { .. } => "if",
            ElementKind::While { .. } => "while",
            ElementKind::Print { .. } => "print",
            ElementKind::Wait { .. } => "wait",
            ElementKind::Invoke { .. } => "invoke",
            ElementKind::Comment { .. } => "comment",
            ElementKind::Expression { .. } => "expression",
        }
    }

    /// The expressions this kind evaluates itself (not those of children)
    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            ElementKind::Assign { value, .. }
            | ElementKind::Print { value }
            | ElementKind::Expression { value } => vec![value],
            ElementKind::Return { value } => value.iter().collect(),
            ElementKind::If { condition, .. } | ElementKind::While { condition, .. } => {
                vec![condition]
            }
            ElementKind::Invoke { args, .. } => args.iter().collect(),
            ElementKind::Block { .. } | ElementKind::Wait { .. } | ElementKind::Comment { .. } => {
                Vec::new()
            }
        }
    }
}

/* ===================== Element ===================== */

/// A node in the element tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub id: ElementId,

    #[serde(flatten)]
    pub kind: ElementKind,

    #[serde(skip)]
    parent: Owner,

    /// Runtime errors recorded against this element during the last run
    #[serde(skip)]
    errors: Vec<ElementError>,
}

// Recorded errors are transient and do not take part in structural equality
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.kind == other.kind && self.parent == other.parent
    }
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        let mut element = Self {
            id: ElementId::new(),
            kind,
            parent: Owner::Detached,
            errors: Vec::new(),
        };
        element.relink(Owner::Detached);
        element
    }

    pub fn block(body: Vec<Element>) -> Self {
        Self::new(ElementKind::Block {
            body: Elements::from_items(body),
        })
    }

    pub fn assign(variable: impl Into<VariableId>, value: Expr) -> Self {
        Self::new(ElementKind::Assign {
            variable: variable.into(),
            value,
        })
    }

    pub fn return_value(value: Expr) -> Self {
        Self::new(ElementKind::Return { value: Some(value) })
    }

    pub fn return_none() -> Self {
        Self::new(ElementKind::Return { value: None })
    }

    pub fn if_else(condition: Expr, then_body: Vec<Element>, else_body: Vec<Element>) -> Self {
        Self::new(ElementKind::If {
            condition,
            then_body: Elements::from_items(then_body),
            else_body: Elements::from_items(else_body),
        })
    }

    pub fn while_loop(condition: Expr, body: Vec<Element>) -> Self {
        Self::new(ElementKind::While {
            condition,
            body: Elements::from_items(body),
        })
    }

    pub fn print(value: Expr) -> Self {
        Self::new(ElementKind::Print { value })
    }

    pub fn wait(millis: u64) -> Self {
        Self::new(ElementKind::Wait { millis })
    }

    pub fn invoke(effect: impl Into<String>, args: Vec<Expr>, result: Option<VariableId>) -> Self {
        Self::new(ElementKind::Invoke {
            effect: effect.into(),
            args,
            result,
        })
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::new(ElementKind::Comment { text: text.into() })
    }

    pub fn expression(value: Expr) -> Self {
        Self::new(ElementKind::Expression { value })
    }

    /* ===================== Accessors ===================== */

    /// The container this element currently sits in
    pub fn parent(&self) -> Owner {
        self.parent
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.kind.has(capability)
    }

    pub fn is_statement(&self) -> bool {
        self.has(Capability::Statement)
    }

    /// Child containers, in slot order
    pub fn slots(&self) -> Vec<(Slot, &Elements)> {
        match &self.kind {
            ElementKind::Block { body } | ElementKind::While { body, .. } => {
                vec![(Slot::Body, body)]
            }
            ElementKind::If {
                then_body,
                else_body,
                ..
            } => vec![(Slot::Then, then_body), (Slot::Else, else_body)],
            _ => Vec::new(),
        }
    }

    pub fn slots_mut(&mut self) -> Vec<(Slot, &mut Elements)> {
        match &mut self.kind {
            ElementKind::Block { body } | ElementKind::While { body, .. } => {
                vec![(Slot::Body, body)]
            }
            ElementKind::If {
                then_body,
                else_body,
                ..
            } => vec![(Slot::Then, then_body), (Slot::Else, else_body)],
            _ => Vec::new(),
        }
    }

    /// A specific child container, if this element has that slot
    pub fn slot_mut(&mut self, slot: Slot) -> Option<&mut Elements> {
        self.slots_mut()
            .into_iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, container)| container)
    }

    /// Whether this element reads or writes `variable` itself
    pub fn references(&self, variable: &VariableId) -> bool {
        let writes = match &self.kind {
            ElementKind::Assign { variable: target, .. } => target == variable,
            ElementKind::Invoke {
                result: Some(target),
                ..
            } => target == variable,
            _ => false,
        };
        writes
            || self
                .kind
                .expressions()
                .iter()
                .any(|expr| expr.references(variable))
    }

    /// Whether `id` is this element or one of its descendants
    pub fn contains(&self, id: ElementId) -> bool {
        self.id == id
            || self
                .slots()
                .iter()
                .any(|(_, container)| container.find(id).is_some())
    }

    /// Ids of this element and every descendant, in walk order
    pub fn subtree_ids(&self) -> Vec<ElementId> {
        let mut ids = vec![self.id];
        for (_, container) in self.slots() {
            ids.extend(container.walk().map(|e| e.id));
        }
        ids
    }

    /* ===================== Ownership Maintenance ===================== */

    /// Set this element's owner and re-point all nested containers at it
    pub(crate) fn relink(&mut self, owner: Owner) {
        self.parent = owner;
        let id = self.id;
        for (slot, container) in self.slots_mut() {
            container.relink(Owner::Element { id, slot });
        }
    }

    /// Give this element and every descendant a fresh id
    pub(crate) fn reidentify(&mut self) {
        self.id = ElementId::new();
        for (_, container) in self.slots_mut() {
            container.for_all_mut(&mut |element| element.id = ElementId::new());
        }
        self.relink(self.parent);
    }

    /// Fail unless this element and all descendants are statements
    pub(crate) fn ensure_statements(&self) -> Result<(), EditError> {
        if !self.is_statement() {
            return Err(EditError::NotAStatement {
                kind: self.kind.name(),
            });
        }
        for (_, container) in self.slots() {
            if let Some(bad) = container.walk().find(|e| !e.is_statement()) {
                return Err(EditError::NotAStatement {
                    kind: bad.kind.name(),
                });
            }
        }
        Ok(())
    }

    /* ===================== Error Source ===================== */

    /// Errors recorded against this element by the last run
    pub fn errors(&self) -> &[ElementError] {
        &self.errors
    }

    /// Record a runtime failure of this element. Ignored unless the element
    /// is an error source.
    pub(crate) fn record_error(&mut self, error: &RuntimeError) {
        if self.has(Capability::ErrorSource) {
            self.errors.push(ElementError::from_runtime(self.id, error));
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Recorded runtime errors followed by validation findings
    pub fn check_for_errors(&self, ctx: &CheckContext<'_>) -> Vec<ElementError> {
        if !self.has(Capability::ErrorSource) {
            return Vec::new();
        }
        let mut errors = self.errors.clone();
        errors.extend(validate::validate(self, ctx));
        errors
    }
}
