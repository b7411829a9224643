use serde_json::{json, Value};

use gantry_core::{Call, FunctionDef, HandlerError, HandlerResult, ModuleDef, ParamSpec};

pub const MODULE: ModuleDef = ModuleDef {
    name: "Calculator::Algebra",
    functions: &[FunctionDef {
        name: "sum",
        params: &[ParamSpec::req("x"), ParamSpec::req("y"), ParamSpec::opt("z")],
        call: sum,
    }],
};

/// GET calculator/algebra/:x/:y/sum
fn sum(call: Call) -> HandlerResult {
    let x = call.arg(0).cloned().unwrap_or(json!(0));
    let y = call.arg(1).cloned().unwrap_or(json!(0));
    let z = call.arg(2).cloned().unwrap_or(json!(0));

    let total = as_number(&x)? + as_number(&y)? + as_number(&z)?;
    let sum = if x.is_i64() && y.is_i64() && z.is_i64() {
        json!(total as i64)
    } else {
        json!(total)
    };

    Ok(json!({ "x": x, "y": y, "z": z, "sum": sum }))
}

fn as_number(value: &Value) -> Result<f64, HandlerError> {
    value
        .as_f64()
        .ok_or_else(|| HandlerError::new("TypeError", format!("{} is not a number", value)))
}
