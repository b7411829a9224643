use serde_json::{json, Value};

use gantry_core::{GatewayEvent, HandlerResult, InvocationContext, ParamSpec, WrapperDef};

pub const AUTHORIZE: WrapperDef = WrapperDef {
    name: "Wrapper",
    method: "authorize",
    path: "wrapper",
    params: &[ParamSpec::key_req("event"), ParamSpec::key_req("context")],
    call: authorize,
};

pub const RENAME: WrapperDef = WrapperDef {
    name: "Wrapper",
    method: "rename",
    path: "wrapper",
    params: &[ParamSpec::key_req("event"), ParamSpec::key_req("context")],
    call: rename,
};

/// Token-based gate: `pass` continues, `block` answers 401, anything else
/// falls through to the generic 403.
fn authorize(event: &GatewayEvent, _context: &InvocationContext) -> HandlerResult {
    let token = event
        .header("Authorization")
        .and_then(|value| value.split_whitespace().last())
        .unwrap_or("");

    match token {
        "block" => Ok(json!({ "status": 401, "body": { "error": "Invalid token" } })),
        "pass" => Ok(json!(true)),
        _ => Ok(Value::Null),
    }
}

/// Parameter-injecting wrapper: every call gets a fixed name.
fn rename(_event: &GatewayEvent, _context: &InvocationContext) -> HandlerResult {
    Ok(json!({ "name": "Cleo" }))
}
