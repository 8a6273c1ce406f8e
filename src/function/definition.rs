//! Serializable function definitions
//!
//! The JSON shape tooling uses to load and dump a function:
//!
//! ```json
//! {
//!   "name": "Add",
//!   "return_type": "int",
//!   "arguments": [{"id": "a", "name": "a", "type": "int"}, {"id": "b", "name": "b", "type": "int"}],
//!   "body": [{"t": "Return", "value": {"t": "Binary", "op": "Add",
//!             "lhs": {"t": "Var", "id": "a"}, "rhs": {"t": "Var", "id": "b"}}}]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::Function;
use crate::catalog::TypeCatalog;
use crate::elements::Elements;
use crate::errors::EditError;
use crate::types::{FunctionId, TypeId, VariableId};
use crate::variables::VariableOrigin;

/// A declared argument or local variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<VariableId>,
    pub name: String,
    #[serde(rename = "type")]
    pub type_id: TypeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeId>,
    /// In call order
    #[serde(default)]
    pub arguments: Vec<Declaration>,
    #[serde(default)]
    pub variables: Vec<Declaration>,
    #[serde(default)]
    pub body: Elements,
}

impl FunctionDefinition {
    pub fn from_json(text: &str) -> Result<Self, EditError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, EditError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Function {
    /// Build a function from a definition.
    ///
    /// The loaded body becomes the history baseline and the function starts
    /// clean.
    pub fn from_definition(
        definition: FunctionDefinition,
        catalog: &dyn TypeCatalog,
    ) -> Result<Self, EditError> {
        let FunctionDefinition {
            name,
            return_type,
            arguments,
            variables,
            mut body,
        } = definition;

        if let Some(id) = body.duplicate_id() {
            return Err(EditError::Deserialization(format!(
                "element id {} appears more than once in the body",
                id
            )));
        }

        let mut function = Function::new(FunctionId::new(), name, return_type, catalog)?;
        for argument in arguments {
            let id = argument.id.unwrap_or_default();
            function.add_argument_with_id(id, argument.name, argument.type_id, catalog)?;
        }
        for variable in variables {
            let id = variable.id.unwrap_or_default();
            function.add_variable_with_id(id, variable.name, variable.type_id, catalog)?;
        }
        for (index, element) in body.take_all().into_iter().enumerate() {
            function.elements.insert(index, element)?;
        }

        function.reset_history()?;
        function.dirty = false;
        Ok(function)
    }

    /// Describe this function as a definition
    pub fn to_definition(&self) -> FunctionDefinition {
        FunctionDefinition {
            name: self.name.clone(),
            return_type: self.return_type.clone(),
            arguments: self
                .arguments
                .iter()
                .map(|a| Declaration {
                    id: Some(a.id.clone()),
                    name: a.name.clone(),
                    type_id: a.type_id.clone(),
                })
                .collect(),
            variables: self
                .variables
                .iter()
                .filter(|v| v.origin == VariableOrigin::Local)
                .map(|v| Declaration {
                    id: Some(v.id.clone()),
                    name: v.name.clone(),
                    type_id: v.type_id.clone(),
                })
                .collect(),
            body: self.elements.clone(),
        }
    }
}
