//! Variable store
//!
//! Named, typed, mutable slots owned by a function. Slots keep their
//! declaration order so a function definition round-trips unchanged.

use serde::{Deserialize, Serialize};

use crate::errors::RuntimeError;
use crate::types::{TypeId, Value, VariableId};

/// Where a variable came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableOrigin {
    /// Declared by the user
    Local,
    /// Backs the argument with the same id
    Argument,
    /// The distinguished return variable
    Return,
}

/// A runtime slot
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    pub type_id: TypeId,
    pub value: Value,
    pub origin: VariableOrigin,
}

/// A declared input parameter. Shares its id with the backing variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub id: VariableId,
    pub name: String,
    #[serde(rename = "type")]
    pub type_id: TypeId,
}

/// Ordered collection of variables with unique ids
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    slots: Vec<Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable. Returns `false` (and adds nothing) if the id is taken.
    pub fn insert(&mut self, variable: Variable) -> bool {
        if self.contains(&variable.id) {
            return false;
        }
        self.slots.push(variable);
        true
    }

    pub fn remove(&mut self, id: &VariableId) -> Option<Variable> {
        let index = self.slots.iter().position(|v| &v.id == id)?;
        Some(self.slots.remove(index))
    }

    pub fn contains(&self, id: &VariableId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &VariableId) -> Option<&Variable> {
        self.slots.iter().find(|v| &v.id == id)
    }

    pub fn get_mut(&mut self, id: &VariableId) -> Option<&mut Variable> {
        self.slots.iter_mut().find(|v| &v.id == id)
    }

    /// Current value of a variable
    pub fn value(&self, id: &VariableId) -> Result<&Value, RuntimeError> {
        self.get(id)
            .map(|v| &v.value)
            .ok_or_else(|| RuntimeError::undefined_variable(id))
    }

    /// Overwrite the value of a variable
    pub fn assign(&mut self, id: &VariableId, value: Value) -> Result<(), RuntimeError> {
        let slot = self
            .get_mut(id)
            .ok_or_else(|| RuntimeError::undefined_variable(id))?;
        slot.value = value;
        Ok(())
    }

    /// The distinguished return variable, if the function returns a value
    pub fn return_variable(&self) -> Option<&Variable> {
        self.slots
            .iter()
            .find(|v| v.origin == VariableOrigin::Return)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(id: &str) -> Variable {
        Variable {
            id: VariableId::from(id),
            name: id.to_string(),
            type_id: TypeId::from("int"),
            value: Value::Int(0),
            origin: VariableOrigin::Local,
        }
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut store = VariableStore::new();
        assert!(store.insert(local("x")));
        assert!(!store.insert(local("x")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_assign_and_read() {
        let mut store = VariableStore::new();
        store.insert(local("x"));
        store.assign(&VariableId::from("x"), Value::Int(5)).unwrap();
        assert_eq!(store.value(&VariableId::from("x")).unwrap(), &Value::Int(5));
    }

    #[test]
    fn test_assign_unknown_variable_fails() {
        let mut store = VariableStore::new();
        let err = store.assign(&VariableId::from("nope"), Value::Null).unwrap_err();
        assert_eq!(err.code, crate::errors::UNDEFINED_VARIABLE);
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let mut store = VariableStore::new();
        for id in ["c", "a", "b"] {
            store.insert(local(id));
        }
        let order: Vec<_> = store.iter().map(|v| v.id.as_str().to_string()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
