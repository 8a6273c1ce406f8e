//! Test helpers for executor tests

use tokio_util::sync::CancellationToken;

use crate::elements::{Element, Elements, Owner};
use crate::errors::ExecError;
use crate::executor::{Control, ExecutionContext, StatementExecutor};
use crate::types::{FunctionId, TypeId, Value, VariableId};
use crate::variables::{Variable, VariableOrigin, VariableStore};

/// Id of the return variable created by [`store_with`]
pub const RET: &str = "ret";

/// Build a top-level sequence from `items`
pub fn root(items: Vec<Element>) -> Elements {
    let mut root = Elements::new(Owner::Function(FunctionId::new()));
    for (i, item) in items.into_iter().enumerate() {
        root.insert(i, item).expect("insert failed");
    }
    root
}

/// Variable store with the given locals plus a return variable `ret`
pub fn store_with(locals: &[(&str, Value)]) -> VariableStore {
    let mut store = VariableStore::new();
    for (id, value) in locals {
        store.insert(Variable {
            id: VariableId::from(*id),
            name: id.to_string(),
            type_id: TypeId::from("any"),
            value: value.clone(),
            origin: VariableOrigin::Local,
        });
    }
    store.insert(Variable {
        id: VariableId::from(RET),
        name: "return".to_string(),
        type_id: TypeId::from("any"),
        value: Value::Null,
        origin: VariableOrigin::Return,
    });
    store
}

pub fn value_of(store: &VariableStore, id: &str) -> Value {
    store.value(&VariableId::from(id)).unwrap().clone()
}

/// Run `elements` with a fresh token
pub async fn run(
    ctx: &mut StatementExecutor,
    elements: &mut Elements,
    variables: &mut VariableStore,
) -> Result<Control, ExecError> {
    let cancel = CancellationToken::new();
    ctx.execute_statements(elements, variables, &cancel).await
}
