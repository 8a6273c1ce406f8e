//! # Function
//!
//! The unit of editing and execution. A function owns its arguments, its
//! variable store, its top-level element sequence and its undo history.
//!
//! Tree edits (`insert_element`, `remove_element`, `move_element`, `paste`)
//! are all-or-nothing: they validate first, mutate, then mark the function
//! dirty and push exactly one snapshot. Variable and argument edits mark the
//! function dirty but are not part of the undo history.
//!
//! `execute` takes `&mut self`, so one function instance can only ever run
//! once at a time and never while it is being edited.

mod definition;


use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub use definition::{Declaration, FunctionDefinition};

use crate::catalog::{self, TypeCatalog};
use crate::clipboard::ClipboardPayload;
use crate::config::HistoryConfig;
use crate::elements::{Capability, CheckContext, Element, ElementError, Elements, Owner, Target};
use crate::errors::{EditError, ExecError};
use crate::executor::ExecutionContext;
use crate::history::{History, Snapshot};
use crate::types::{ElementId, FunctionId, TypeId, Value, VariableId};
use crate::variables::{Argument, Variable, VariableOrigin, VariableStore};

#[derive(Debug, Clone)]
pub struct Function {
    id: FunctionId,
    name: String,
    return_type: Option<TypeId>,
    arguments: Vec<Argument>,
    variables: VariableStore,
    elements: Elements,
    dirty: bool,
    history: History,
}

impl Function {
    /// Create an empty function.
    ///
    /// When `return_type` is given the return variable is created with that
    /// type's default value.
    pub fn new(
        id: FunctionId,
        name: impl Into<String>,
        return_type: Option<TypeId>,
        catalog: &dyn TypeCatalog,
    ) -> Result<Self, EditError> {
        let mut variables = VariableStore::new();
        if let Some(type_id) = &return_type {
            let descriptor = catalog::require(catalog, type_id)?;
            variables.insert(Variable {
                id: VariableId::new(),
                name: "return".to_string(),
                type_id: type_id.clone(),
                value: descriptor.default,
                origin: VariableOrigin::Return,
            });
        }

        let elements = Elements::new(Owner::Function(id));
        let mut history = History::new(HistoryConfig::default().max_entries);
        history.reset(Snapshot::capture(&elements)?);

        Ok(Self {
            id,
            name: name.into(),
            return_type,
            arguments: Vec::new(),
            variables,
            elements,
            dirty: false,
            history,
        })
    }

    /// Limit the undo history to `max_entries` snapshots
    pub fn with_history_limit(mut self, max_entries: usize) -> Self {
        self.history.set_max_entries(max_entries);
        self
    }

    /* ===================== Accessors ===================== */

    pub fn id(&self) -> FunctionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.dirty = true;
    }

    pub fn return_type(&self) -> Option<&TypeId> {
        self.return_type.as_ref()
    }

    /// Arguments in call order
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// The top-level element sequence
    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    /// Depth-first, pre-order walk of every element in the function
    pub fn enumerate_all(&self) -> crate::elements::Walk<'_> {
        self.elements.walk()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the current state as saved
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /* ===================== Arguments & Variables ===================== */

    /// Append an argument and its backing variable. Returns the shared id.
    pub fn add_argument(
        &mut self,
        name: impl Into<String>,
        type_id: TypeId,
        catalog: &dyn TypeCatalog,
    ) -> Result<VariableId, EditError> {
        self.add_argument_with_id(VariableId::new(), name.into(), type_id, catalog)
    }

    pub(crate) fn add_argument_with_id(
        &mut self,
        id: VariableId,
        name: String,
        type_id: TypeId,
        catalog: &dyn TypeCatalog,
    ) -> Result<VariableId, EditError> {
        if id.as_str().is_empty() {
            return Err(EditError::InvalidId);
        }
        if name.is_empty() {
            return Err(EditError::EmptyName);
        }
        if self.arguments.iter().any(|a| a.name == name) {
            return Err(EditError::DuplicateName(name));
        }
        if self.variables.contains(&id) {
            return Err(EditError::DuplicateVariable(id));
        }
        let descriptor = catalog::require(catalog, &type_id)?;

        self.variables.insert(Variable {
            id: id.clone(),
            name: name.clone(),
            type_id: type_id.clone(),
            value: descriptor.default,
            origin: VariableOrigin::Argument,
        });
        self.arguments.push(Argument {
            id: id.clone(),
            name,
            type_id,
        });
        self.dirty = true;
        Ok(id)
    }

    /// Delete an argument. Its backing variable is deleted first, so this
    /// fails (and changes nothing) while the variable is still referenced.
    pub fn remove_argument(&mut self, id: &VariableId) -> Result<Argument, EditError> {
        let index = self
            .arguments
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| EditError::ArgumentNotFound(id.clone()))?;

        if self.variables.contains(id) {
            self.ensure_unreferenced(id)?;
            self.variables.remove(id);
        }
        self.dirty = true;
        Ok(self.arguments.remove(index))
    }

    /// Move an argument to a new call position
    pub fn move_argument(&mut self, id: &VariableId, index: usize) -> Result<(), EditError> {
        let from = self
            .arguments
            .iter()
            .position(|a| &a.id == id)
            .ok_or_else(|| EditError::ArgumentNotFound(id.clone()))?;
        if index >= self.arguments.len() {
            return Err(EditError::OutOfRange {
                index,
                len: self.arguments.len(),
            });
        }
        let argument = self.arguments.remove(from);
        self.arguments.insert(index, argument);
        self.dirty = true;
        Ok(())
    }

    /// Declare a local variable. Returns its id.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        type_id: TypeId,
        catalog: &dyn TypeCatalog,
    ) -> Result<VariableId, EditError> {
        self.add_variable_with_id(VariableId::new(), name.into(), type_id, catalog)
    }

    pub(crate) fn add_variable_with_id(
        &mut self,
        id: VariableId,
        name: String,
        type_id: TypeId,
        catalog: &dyn TypeCatalog,
    ) -> Result<VariableId, EditError> {
        if id.as_str().is_empty() {
            return Err(EditError::InvalidId);
        }
        if self.variables.contains(&id) {
            return Err(EditError::DuplicateVariable(id));
        }
        let descriptor = catalog::require(catalog, &type_id)?;
        self.variables.insert(Variable {
            id: id.clone(),
            name,
            type_id,
            value: descriptor.default,
            origin: VariableOrigin::Local,
        });
        self.dirty = true;
        Ok(id)
    }

    /// Delete a local variable.
    ///
    /// Argument-backed variables go away with their argument, the return
    /// variable never does, and a variable still referenced by an element
    /// stays.
    pub fn remove_variable(&mut self, id: &VariableId) -> Result<Variable, EditError> {
        let variable = self
            .variables
            .get(id)
            .ok_or_else(|| EditError::VariableNotFound(id.clone()))?;
        match variable.origin {
            VariableOrigin::Argument if self.arguments.iter().any(|a| &a.id == id) => {
                return Err(EditError::VariableBackedByArgument(id.clone()));
            }
            VariableOrigin::Return => return Err(EditError::ReturnVariable),
            _ => {}
        }
        self.ensure_unreferenced(id)?;

        self.dirty = true;
        self.variables
            .remove(id)
            .ok_or_else(|| EditError::VariableNotFound(id.clone()))
    }

    /// Number of elements that read or write `variable`
    pub fn references_to(&self, variable: &VariableId) -> usize {
        self.elements
            .walk()
            .filter(|e| e.references(variable))
            .count()
    }

    fn ensure_unreferenced(&self, id: &VariableId) -> Result<(), EditError> {
        match self.references_to(id) {
            0 => Ok(()),
            references => Err(EditError::VariableInUse {
                variable: id.clone(),
                references,
            }),
        }
    }

    /* ===================== Tree Editing ===================== */

    /// Container addressed by `target`
    pub fn container(&self, target: Target) -> Result<&Elements, EditError> {
        match target {
            Target::Root => Ok(&self.elements),
            Target::Slot { element, slot } => {
                let owner = self
                    .elements
                    .find(element)
                    .ok_or(EditError::ElementNotFound(element))?;
                if !owner.has(Capability::DropTarget) {
                    return Err(EditError::NotADropTarget(element));
                }
                owner
                    .slots()
                    .into_iter()
                    .find(|(s, _)| *s == slot)
                    .map(|(_, container)| container)
                    .ok_or(EditError::NotADropTarget(element))
            }
        }
    }

    fn container_mut(&mut self, target: Target) -> Result<&mut Elements, EditError> {
        match target {
            Target::Root => Ok(&mut self.elements),
            Target::Slot { element, slot } => {
                let owner = self
                    .elements
                    .find_mut(element)
                    .ok_or(EditError::ElementNotFound(element))?;
                if !owner.has(Capability::DropTarget) {
                    return Err(EditError::NotADropTarget(element));
                }
                owner
                    .slot_mut(slot)
                    .ok_or(EditError::NotADropTarget(element))
            }
        }
    }

    /// Whether statements may be dropped into `target`
    pub fn can_drop(&self, target: Target) -> bool {
        self.container(target).is_ok()
    }

    /// Insert a statement at `index` of `target`.
    ///
    /// Fails with [`EditError::DuplicateElement`] if the element, or anything
    /// nested in it, carries an id already present in the tree.
    pub fn insert_element(
        &mut self,
        target: Target,
        index: usize,
        element: Element,
    ) -> Result<ElementId, EditError> {
        self.ensure_fresh_ids(&element)?;
        let id = element.id;
        self.container_mut(target)?.insert(index, element)?;
        self.commit_edit()?;
        Ok(id)
    }

    /// Remove an element (and everything nested in it) from wherever it is
    pub fn remove_element(&mut self, id: ElementId) -> Result<Element, EditError> {
        let removed = self
            .elements
            .container_of_mut(id)
            .and_then(|container| container.remove(id))
            .ok_or(EditError::ElementNotFound(id))?;
        self.commit_edit()?;
        Ok(removed)
    }

    /// Remove several elements as one edit. Fails without change if any id
    /// is missing. Ids nested inside another removed element go with it.
    pub fn remove_elements(&mut self, ids: &[ElementId]) -> Result<Vec<Element>, EditError> {
        if let Some(missing) = ids.iter().find(|id| self.elements.find(**id).is_none()) {
            return Err(EditError::ElementNotFound(*missing));
        }
        let removed: Vec<Element> = ids
            .iter()
            .filter_map(|id| {
                self.elements
                    .container_of_mut(*id)
                    .and_then(|container| container.remove(*id))
            })
            .collect();
        if !removed.is_empty() {
            self.commit_edit()?;
        }
        Ok(removed)
    }

    /// Move an element to `index` of `target`. `index` is interpreted after
    /// the element has been taken out of its current container.
    pub fn move_element(
        &mut self,
        id: ElementId,
        target: Target,
        index: usize,
    ) -> Result<(), EditError> {
        let moving = self
            .elements
            .find(id)
            .ok_or(EditError::ElementNotFound(id))?;
        if let Target::Slot { element, .. } = target {
            if moving.contains(element) {
                return Err(EditError::WouldCreateCycle(id));
            }
        }
        let source = moving.parent();

        let container = self.container(target)?;
        let len = if container.owner() == source {
            container.len() - 1
        } else {
            container.len()
        };
        if index > len {
            return Err(EditError::OutOfRange { index, len });
        }

        let element = self
            .elements
            .container_of_mut(id)
            .and_then(|container| container.remove(id))
            .ok_or(EditError::ElementNotFound(id))?;
        self.container_mut(target)?.insert(index, element)?;
        self.commit_edit()
    }

    /// Insert the payload's items at `index` of `target`, as one edit.
    ///
    /// Every item must be a statement (recursively); otherwise nothing is
    /// inserted. Returns the ids of the inserted elements.
    pub fn paste(
        &mut self,
        target: Target,
        index: usize,
        payload: &ClipboardPayload,
    ) -> Result<Vec<ElementId>, EditError> {
        let items = payload.materialize()?;
        let container = self.container_mut(target)?;
        if index > container.len() {
            return Err(EditError::OutOfRange {
                index,
                len: container.len(),
            });
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ElementId> = items.iter().map(|item| item.id).collect();
        for (offset, item) in items.into_iter().enumerate() {
            container.insert(index + offset, item)?;
        }
        self.commit_edit()?;
        Ok(ids)
    }

    /// Drop a payload onto `target`. Returns `false`, leaving the function
    /// untouched, if the drop is rejected.
    pub fn drop_payload(
        &mut self,
        target: Target,
        index: usize,
        payload: &ClipboardPayload,
    ) -> bool {
        match self.paste(target, index, payload) {
            Ok(ids) => !ids.is_empty(),
            Err(err) => {
                debug!(function = %self.id, error = %err, "drop rejected");
                false
            }
        }
    }

    fn ensure_fresh_ids(&self, element: &Element) -> Result<(), EditError> {
        let mut seen: HashSet<ElementId> = self.elements.walk().map(|e| e.id).collect();
        match element.subtree_ids().into_iter().find(|id| !seen.insert(*id)) {
            Some(id) => Err(EditError::DuplicateElement(id)),
            None => Ok(()),
        }
    }

    fn commit_edit(&mut self) -> Result<(), EditError> {
        self.dirty = true;
        self.save_snapshot()
    }

    /* ===================== Errors ===================== */

    fn check_context(&self) -> CheckContext<'_> {
        CheckContext {
            variables: &self.variables,
            returns_value: self.return_type.is_some(),
        }
    }

    /// Findings of every error-source element, in tree order
    pub fn check_for_errors(&self) -> Vec<ElementError> {
        let ctx = self.check_context();
        self.elements
            .walk()
            .filter(|e| e.has(Capability::ErrorSource))
            .flat_map(|e| e.check_for_errors(&ctx))
            .collect()
    }

    /// Clear recorded errors on every error-source element
    pub fn clear_errors(&mut self) {
        self.elements.for_all_mut(&mut |e| {
            if e.has(Capability::ErrorSource) {
                e.clear_errors();
            }
        });
    }

    /* ===================== History ===================== */

    /// Push the current tree onto the history, discarding redo entries
    pub fn save_snapshot(&mut self) -> Result<(), EditError> {
        let snapshot = Snapshot::capture(&self.elements)?;
        self.history.push(snapshot);
        Ok(())
    }

    /// Replace the whole tree with `snapshot`.
    ///
    /// The new tree is built completely before the swap, so on failure the
    /// current tree is left as it was.
    pub fn apply_state(&mut self, snapshot: &Snapshot) -> Result<(), EditError> {
        self.elements = snapshot.restore(Owner::Function(self.id))?;
        Ok(())
    }

    /// Step back one edit. Returns `false` if there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EditError> {
        let cursor = self.history.cursor();
        let Some(snapshot) = self.history.undo() else {
            return Ok(false);
        };
        self.restore_from_history(&snapshot, cursor)
    }

    /// Step forward one edit. Returns `false` if there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, EditError> {
        let cursor = self.history.cursor();
        let Some(snapshot) = self.history.redo() else {
            return Ok(false);
        };
        self.restore_from_history(&snapshot, cursor)
    }

    fn restore_from_history(
        &mut self,
        snapshot: &Snapshot,
        cursor: usize,
    ) -> Result<bool, EditError> {
        if let Err(err) = self.apply_state(snapshot) {
            self.history.set_cursor(cursor);
            return Err(err);
        }
        trace!(function = %self.id, position = self.history.cursor(), "history applied");
        self.dirty = true;
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Drop all history and make the current tree the baseline
    pub(crate) fn reset_history(&mut self) -> Result<(), EditError> {
        self.history.reset(Snapshot::capture(&self.elements)?);
        Ok(())
    }

    /* ===================== Execution ===================== */

    /// Run the function.
    ///
    /// Binds `params` to the arguments in call order, clears recorded errors
    /// and runs the top-level sequence through `ctx`. Returns the value of
    /// the return variable, or `None` if the function has no return type.
    #[tracing::instrument(level = "debug", skip_all, fields(function = %self.name))]
    pub async fn execute<C>(
        &mut self,
        params: Vec<Value>,
        ctx: &mut C,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, ExecError>
    where
        C: ExecutionContext + ?Sized,
    {
        if params.len() != self.arguments.len() {
            return Err(ExecError::ArgumentMismatch {
                expected: self.arguments.len(),
                actual: params.len(),
            });
        }
        if cancel.is_cancelled() {
            return Err(ExecError::Cancelled);
        }
        if let Some(unbound) = self
            .arguments
            .iter()
            .find(|a| !self.variables.contains(&a.id))
        {
            return Err(ExecError::MissingBinding {
                argument: unbound.id.clone(),
                name: unbound.name.clone(),
            });
        }

        for (argument, value) in self.arguments.iter().zip(params) {
            self.variables.assign(&argument.id, value)?;
        }
        self.clear_errors();

        debug!("running top-level sequence");
        ctx.execute_statements(&mut self.elements, &mut self.variables, cancel)
            .await?;

        let result = match self.return_type {
            Some(_) => self.variables.return_variable().map(|v| v.value.clone()),
            None => None,
        };
        debug!(result = ?result, "function finished");
        Ok(result)
    }
}
