//! Pet CRUD handlers backed by an in-process store.

use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use serde_json::{json, Map, Value};

use gantry_core::{Call, FunctionDef, HandlerError, HandlerResult, ModuleDef, ParamSpec};

pub const MODULE: ModuleDef = ModuleDef {
    name: "Pet",
    functions: &[
        FunctionDef {
            name: "show",
            params: &[ParamSpec::req("id")],
            call: show,
        },
        FunctionDef {
            name: "list",
            params: &[],
            call: list,
        },
        FunctionDef {
            name: "create",
            params: &[ParamSpec::opt("name"), ParamSpec::key("pet")],
            call: create,
        },
        FunctionDef {
            name: "update",
            params: &[ParamSpec::req("id"), ParamSpec::key("pet")],
            call: update,
        },
        FunctionDef {
            name: "delete",
            params: &[ParamSpec::req("id")],
            call: delete,
        },
    ],
};

static PETS: OnceLock<Mutex<BTreeMap<String, Value>>> = OnceLock::new();

fn pets() -> std::sync::MutexGuard<'static, BTreeMap<String, Value>> {
    PETS.get_or_init(|| Mutex::new(BTreeMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn id_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// GET pet/:id/show
fn show(call: Call) -> HandlerResult {
    let id = call.arg(0).cloned().unwrap_or(Value::Null);
    Ok(pets().get(&id_key(&id)).cloned().unwrap_or(Value::Null))
}

/// GET pet/list
fn list(_call: Call) -> HandlerResult {
    let mut all = Map::new();
    for (id, pet) in pets().iter() {
        all.insert(id.clone(), pet.clone());
    }
    Ok(Value::Object(all))
}

/// POST pet/create
fn create(call: Call) -> HandlerResult {
    let mut pet = call.kwarg("pet").cloned().unwrap_or_else(|| json!({}));
    if pet.get("name").map_or(true, Value::is_null) {
        return Ok(json!({ "status": 422, "body": { "error": "Missing name" } }));
    }
    if pet.get("error").is_some() {
        return Err(HandlerError::new("RuntimeError", "error thrown"));
    }
    if let Some(name) = call.arg(0).filter(|value| !value.is_null()) {
        pet["name"] = name.clone();
    }
    let id = pet.get("id").cloned().unwrap_or(Value::Null);
    pets().insert(id_key(&id), pet.clone());
    Ok(pet)
}

/// POST pet/:id/update
fn update(call: Call) -> HandlerResult {
    let id = call.arg(0).cloned().unwrap_or(Value::Null);
    let pet = call.kwarg("pet").cloned().unwrap_or_else(|| json!({}));
    let mut store = pets();
    if !store.contains_key(&id_key(&id)) {
        return Ok(Value::Null);
    }
    store.insert(id_key(&id), pet.clone());
    Ok(pet)
}

/// DELETE pet/:id/delete
fn delete(call: Call) -> HandlerResult {
    let id = call.arg(0).cloned().unwrap_or(Value::Null);
    Ok(pets().remove(&id_key(&id)).unwrap_or(Value::Null))
}

/// Test hook: drop every stored pet.
pub fn clear() {
    pets().clear();
}
