//! Type catalog interface
//!
//! The core never interprets type ids. It only asks a catalog whether an id
//! resolves, and takes the default value for new variables from the
//! descriptor.

use std::collections::HashMap;

use crate::errors::EditError;
use crate::types::{TypeId, Value};

/// Resolved description of a type id
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub id: TypeId,
    /// Display name
    pub name: String,
    /// Initial value of a variable declared with this type
    pub default: Value,
}

/// Resolves type ids to descriptors.
///
/// Implemented by the hosting environment; [`BuiltinCatalog`] covers the
/// primitive types.
pub trait TypeCatalog: Send + Sync {
    fn resolve(&self, id: &TypeId) -> Option<TypeDescriptor>;
}

/// Resolve `id` or fail with [`EditError::UnknownType`]
pub fn require(catalog: &dyn TypeCatalog, id: &TypeId) -> Result<TypeDescriptor, EditError> {
    catalog
        .resolve(id)
        .ok_or_else(|| EditError::UnknownType(id.clone()))
}

/// Catalog of the primitive types: `int`, `float`, `bool`, `string`, `any`
#[derive(Debug, Clone)]
pub struct BuiltinCatalog {
    types: HashMap<TypeId, TypeDescriptor>,
}

impl BuiltinCatalog {
    pub fn new() -> Self {
        let mut catalog = Self {
            types: HashMap::new(),
        };
        catalog.register("int", "Int", Value::Int(0));
        catalog.register("float", "Float", Value::Float(0.0));
        catalog.register("bool", "Bool", Value::Bool(false));
        catalog.register("string", "String", Value::Str(String::new()));
        catalog.register("any", "Any", Value::Null);
        catalog
    }

    /// Add (or replace) a type
    pub fn register(&mut self, id: &str, name: &str, default: Value) {
        let id = TypeId::from(id);
        self.types.insert(
            id.clone(),
            TypeDescriptor {
                id,
                name: name.to_string(),
                default,
            },
        );
    }
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCatalog for BuiltinCatalog {
    fn resolve(&self, id: &TypeId) -> Option<TypeDescriptor> {
        self.types.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    #[test]
    fn test_builtin_defaults() {
        let catalog = BuiltinCatalog::new();
        let expected = hashmap! {
            "int" => Value::Int(0),
            "float" => Value::Float(0.0),
            "bool" => Value::Bool(false),
            "string" => Value::Str(String::new()),
            "any" => Value::Null,
        };
        for (id, default) in expected {
            let descriptor = catalog.resolve(&TypeId::from(id)).unwrap();
            assert_eq!(descriptor.default, default, "default for {}", id);
        }
    }

    #[test]
    fn test_require_unknown_type() {
        let catalog = BuiltinCatalog::new();
        let err = require(&catalog, &TypeId::from("matrix")).unwrap_err();
        assert_eq!(err, EditError::UnknownType(TypeId::from("matrix")));
    }

    #[test]
    fn test_register_custom_type() {
        let mut catalog = BuiltinCatalog::new();
        catalog.register("color", "Color", Value::Str("black".into()));
        let descriptor = require(&catalog, &TypeId::from("color")).unwrap();
        assert_eq!(descriptor.name, "Color");
    }
}
