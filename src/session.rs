//! Editing session
//!
//! Wraps a [`Function`] with an explicit selection and a clipboard transport.
//! Every command is a plain method plus a `can_*` predicate, so an interface
//! layer can bind them however it likes.

use std::collections::HashSet;

use tracing::debug;

use crate::clipboard::{Clipboard, ClipboardPayload};
use crate::elements::{Element, Target};
use crate::errors::EditError;
use crate::function::Function;
use crate::types::ElementId;

/// Selected elements, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` to the selection
    pub fn select(&mut self, id: ElementId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    pub fn deselect(&mut self, id: ElementId) {
        self.ids.retain(|selected| *selected != id);
    }

    pub fn toggle(&mut self, id: ElementId) {
        if self.contains(id) {
            self.deselect(id);
        } else {
            self.select(id);
        }
    }

    /// Replace the selection
    pub fn set(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.ids.clear();
        for id in ids {
            self.select(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[ElementId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub struct EditSession<B: Clipboard> {
    function: Function,
    selection: Selection,
    clipboard: B,
}

impl<B: Clipboard> EditSession<B> {
    pub fn new(function: Function, clipboard: B) -> Self {
        Self {
            function,
            selection: Selection::new(),
            clipboard,
        }
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    /// Direct access for edits not covered by session commands
    pub fn function_mut(&mut self) -> &mut Function {
        &mut self.function
    }

    pub fn into_function(self) -> Function {
        self.function
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn clipboard(&self) -> &B {
        &self.clipboard
    }

    /// Selected elements that are still in the tree, in tree order, without
    /// those already inside another selected element
    fn selected_roots(&self) -> Vec<&Element> {
        let selected: Vec<&Element> = self
            .function
            .enumerate_all()
            .filter(|e| self.selection.contains(e.id))
            .collect();
        selected
            .iter()
            .copied()
            .filter(|e| !selected.iter().any(|other| other.id != e.id && other.contains(e.id)))
            .collect()
    }

    /* ===================== Commands ===================== */

    /// Copy the selection to the clipboard. Returns `false` if nothing is
    /// selected.
    pub fn copy(&mut self) -> Result<bool, EditError> {
        let items: Vec<Element> = self.selected_roots().into_iter().cloned().collect();
        if items.is_empty() {
            return Ok(false);
        }
        let text = ClipboardPayload::from_elements(items).to_text()?;
        self.clipboard.write(text);
        Ok(true)
    }

    /// Copy, then remove the selection as a single undo step
    pub fn cut(&mut self) -> Result<bool, EditError> {
        if !self.copy()? {
            return Ok(false);
        }
        self.delete_selection()
    }

    /// Remove the selection as a single undo step
    pub fn delete_selection(&mut self) -> Result<bool, EditError> {
        let ids: Vec<ElementId> = self.selected_roots().iter().map(|e| e.id).collect();
        if ids.is_empty() {
            return Ok(false);
        }
        self.function.remove_elements(&ids)?;
        self.selection.clear();
        Ok(true)
    }

    /// Paste the clipboard at `index` of `target`. The pasted elements become
    /// the selection.
    pub fn paste(&mut self, target: Target, index: usize) -> Result<Vec<ElementId>, EditError> {
        let Some(text) = self.clipboard.read() else {
            return Ok(Vec::new());
        };
        let payload = ClipboardPayload::from_text(&text)?;
        let ids = self.function.paste(target, index, &payload)?;
        debug!(count = ids.len(), "pasted elements");
        self.selection.set(ids.iter().copied());
        Ok(ids)
    }

    pub fn undo(&mut self) -> Result<bool, EditError> {
        let changed = self.function.undo()?;
        self.prune_selection();
        Ok(changed)
    }

    pub fn redo(&mut self) -> Result<bool, EditError> {
        let changed = self.function.redo()?;
        self.prune_selection();
        Ok(changed)
    }

    fn prune_selection(&mut self) {
        let present: HashSet<ElementId> = self.function.enumerate_all().map(|e| e.id).collect();
        self.selection.ids.retain(|id| present.contains(id));
    }

    /* ===================== Predicates ===================== */

    pub fn can_copy(&self) -> bool {
        !self.selected_roots().is_empty()
    }

    pub fn can_cut(&self) -> bool {
        self.can_copy()
    }

    pub fn can_delete(&self) -> bool {
        self.can_copy()
    }

    /// Whether the clipboard holds statements that `target` would accept
    pub fn can_paste(&self, target: Target) -> bool {
        self.function.can_drop(target)
            && self
                .clipboard
                .read()
                .and_then(|text| ClipboardPayload::from_text(&text).ok())
                .is_some_and(|payload| payload.can_accept())
    }

    pub fn can_undo(&self) -> bool {
        self.function.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.function.can_redo()
    }
}
