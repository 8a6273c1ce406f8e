//! Ordered element sequences
//!
//! An [`Elements`] container owns its children by value. Each child keeps a
//! non-owning [`Owner`] back-reference naming the container it sits in, so a
//! node can only ever be reachable from one container.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Element, Owner};
use crate::errors::EditError;
use crate::types::ElementId;

/// An ordered, owned sequence of elements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Elements {
    items: Vec<Element>,
    #[serde(skip)]
    owner: Owner,
}

impl Elements {
    /// Create an empty container belonging to `owner`
    pub fn new(owner: Owner) -> Self {
        Self {
            items: Vec::new(),
            owner,
        }
    }

    /// Build a detached container from already constructed elements.
    ///
    /// Ownership links are fixed up when the container is placed inside an
    /// element or a function.
    pub fn from_items(items: Vec<Element>) -> Self {
        Self {
            items,
            owner: Owner::Detached,
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.items.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Element> {
        self.items.iter_mut()
    }

    /// Index of the direct child with `id`
    pub fn position(&self, id: ElementId) -> Option<usize> {
        self.items.iter().position(|e| e.id == id)
    }

    /* ===================== Structural Edits ===================== */

    /// Insert `element` at `index` (0..=len).
    ///
    /// The element and all of its descendants must be statements. Does not
    /// mark anything dirty; callers decide whether the insert is an edit.
    pub fn insert(&mut self, index: usize, mut element: Element) -> Result<(), EditError> {
        if index > self.items.len() {
            return Err(EditError::OutOfRange {
                index,
                len: self.items.len(),
            });
        }
        element.ensure_statements()?;
        element.relink(self.owner);
        self.items.insert(index, element);
        Ok(())
    }

    /// Detach the direct child with `id`. No-op if absent.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        let index = self.position(id)?;
        let mut element = self.items.remove(index);
        element.relink(Owner::Detached);
        Some(element)
    }

    /// Detach the child at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<Element, EditError> {
        if index >= self.items.len() {
            return Err(EditError::OutOfRange {
                index,
                len: self.items.len(),
            });
        }
        let mut element = self.items.remove(index);
        element.relink(Owner::Detached);
        Ok(element)
    }

    /// Detach every child, in order
    pub fn take_all(&mut self) -> Vec<Element> {
        let mut items = std::mem::take(&mut self.items);
        for element in &mut items {
            element.relink(Owner::Detached);
        }
        items
    }

    /// Re-point this container (and, recursively, every nested container) at
    /// its owner
    pub(crate) fn relink(&mut self, owner: Owner) {
        self.owner = owner;
        for element in &mut self.items {
            element.relink(owner);
        }
    }

    /* ===================== Traversal ===================== */

    /// Depth-first, pre-order walk over every element reachable from this
    /// container, including the contents of nested containers.
    ///
    /// The walk is lazy and borrows the tree; calling `walk()` again starts
    /// over from the beginning.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![self.items.iter()],
        }
    }

    /// Apply `f` to every reachable element, in the same order as [`walk`](Self::walk)
    pub fn for_all_mut(&mut self, f: &mut dyn FnMut(&mut Element)) {
        for element in &mut self.items {
            f(&mut *element);
            for (_, child) in element.slots_mut() {
                child.for_all_mut(&mut *f);
            }
        }
    }

    /// Find an element anywhere in the tree
    pub fn find(&self, id: ElementId) -> Option<&Element> {
        self.walk().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        for element in &mut self.items {
            if element.id == id {
                return Some(element);
            }
            for (_, child) in element.slots_mut() {
                if let Some(found) = child.find_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// First id that occurs more than once anywhere in the tree
    pub(crate) fn duplicate_id(&self) -> Option<ElementId> {
        let mut seen = HashSet::new();
        self.walk().map(|e| e.id).find(|id| !seen.insert(*id))
    }

    /// The container that directly holds `id`
    pub(crate) fn container_of_mut(&mut self, id: ElementId) -> Option<&mut Elements> {
        if self.position(id).is_some() {
            return Some(self);
        }
        for element in &mut self.items {
            for (_, child) in element.slots_mut() {
                if let Some(found) = child.container_of_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }
}

/// Lazy depth-first, pre-order iterator over an element tree
pub struct Walk<'a> {
    stack: Vec<std::slice::Iter<'a, Element>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(element) => {
                    // Push nested containers last-slot-first so the first slot is
                    // visited first
                    for (_, child) in element.slots().into_iter().rev() {
                        self.stack.push(child.items.iter());
                    }
                    return Some(element);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
