//! The request dispatcher: one inbound event, one handler invocation, one
//! response envelope.
//!
//! The resolved registry entry is passed in directly. Routing happens
//! before dispatch, and nothing here resolves anything by name. Every
//! failure inside a dispatch is contained and mapped to a 500 envelope; the
//! dispatch loop never takes the process down.

pub mod coerce;

use std::backtrace::Backtrace;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::{json, Map, Value};

use gantry_core::{
    signature::is_event_context_signature, Call, GatewayEvent, HandlerResult, InvocationContext,
    RegisteredLambda, ResponseEnvelope, Verb,
};

/// Execute one handler invocation for one inbound event.
///
/// With `debug` set, 500 bodies carry a truncated backtrace.
pub fn dispatch(
    entry: &RegisteredLambda,
    event: &GatewayEvent,
    context: &InvocationContext,
    debug: bool,
) -> ResponseEnvelope {
    match run(entry, event, context) {
        Ok(envelope) => envelope,
        Err(failure) => failure.into_envelope(debug),
    }
}

struct Failure {
    class: String,
    message: String,
}

impl Failure {
    fn new(class: &str, message: impl Into<String>) -> Self {
        Self {
            class: class.to_string(),
            message: message.into(),
        }
    }

    fn into_envelope(self, debug: bool) -> ResponseEnvelope {
        stdio::error("dispatch", &format!("{}: {}", self.class, self.message));
        let mut error = Map::new();
        error.insert("class".to_string(), json!(self.class));
        error.insert("message".to_string(), json!(self.message));
        if debug {
            let backtrace = Backtrace::force_capture().to_string();
            let frames: Vec<&str> = backtrace.lines().take(20).collect();
            error.insert("backtrace".to_string(), json!(frames));
        }
        envelope(500, &json!({ "error": Value::Object(error) }))
    }
}

fn run(
    entry: &RegisteredLambda,
    event: &GatewayEvent,
    context: &InvocationContext,
) -> Result<ResponseEnvelope, Failure> {
    let descriptor = &entry.descriptor;
    let mut wrapper_params = Map::new();

    if let Some(wrapper) = &entry.wrapper {
        if !is_event_context_signature(&wrapper.params) {
            return Err(Failure::new(
                "ConfigurationError",
                format!(
                    "{} should accept event and context keyword arguments",
                    wrapper.reference.qualified()
                ),
            ));
        }

        stdio::debug(
            "dispatch",
            &format!("calling wrapper {}", wrapper.reference.qualified()),
        );
        let call = wrapper.call;
        let result = invoke(AssertUnwindSafe(move || call(event, context)))?;

        match classify_wrapper_result(result) {
            WrapperOutcome::Respond(status, body) => return Ok(envelope(status, &body)),
            WrapperOutcome::Block => {
                return Ok(envelope(
                    403,
                    &json!({ "forbidden": wrapper.reference.qualified() }),
                ))
            }
            WrapperOutcome::Params(map) => wrapper_params = map,
            WrapperOutcome::Pass => {}
        }
    }

    stdio::debug(
        "dispatch",
        &format!(
            "resolving {} {} to {}",
            descriptor.gateway.verb,
            descriptor.gateway.path,
            descriptor.qualified_target()
        ),
    );

    // coerce path values in placeholder order, then merge wrapper params
    // (wrapper wins on collision, new keys append)
    let mut merged: Vec<(String, Value)> = descriptor
        .gateway
        .placeholders()
        .into_iter()
        .filter_map(|name| {
            event
                .path_parameters
                .get(name)
                .map(|raw| (name.to_string(), coerce::coerce_path_value(raw)))
        })
        .collect();
    for (key, value) in wrapper_params {
        match merged.iter_mut().find(|(name, _)| *name == key) {
            Some(slot) => slot.1 = value,
            None => merged.push((key, value)),
        }
    }
    let args: Vec<Value> = merged.into_iter().map(|(_, value)| value).collect();

    let call = match descriptor.gateway.verb {
        Verb::Get | Verb::Delete => Call::positional(args),
        Verb::Post => {
            let raw = event.body.as_deref().unwrap_or("");
            let parsed: Value = serde_json::from_str(raw)
                .map_err(|err| Failure::new("ParseError", format!("invalid request body: {}", err)))?;

            // scope the whole payload to the first declared keyword parameter
            let payload = match descriptor.params.iter().find(|p| p.kind.is_keyword()) {
                Some(param) => {
                    let mut map = Map::new();
                    map.insert(param.name.clone(), parsed);
                    map
                }
                None => match parsed {
                    Value::Object(map) => map,
                    _ => {
                        return Err(Failure::new(
                            "TypeError",
                            format!(
                                "POST body for {} must be an object",
                                descriptor.qualified_target()
                            ),
                        ))
                    }
                },
            };

            Call {
                args,
                // an empty payload means no keyword arguments at all
                kwargs: if payload.is_empty() { None } else { Some(payload) },
            }
        }
        other => {
            return Err(Failure::new(
                "ConfigurationError",
                format!("verb should be GET, POST or DELETE, got {}", other),
            ))
        }
    };

    let handler = entry.handler;
    let result = invoke(AssertUnwindSafe(move || handler(call)))?;
    Ok(map_result(result))
}

enum WrapperOutcome {
    Respond(u16, Value),
    Block,
    Params(Map<String, Value>),
    Pass,
}

fn classify_wrapper_result(result: Value) -> WrapperOutcome {
    match result {
        Value::Null | Value::Bool(false) => WrapperOutcome::Block,
        Value::Object(map) => match status_field(&map) {
            Some(status) => {
                let body = map.get("body").cloned().unwrap_or(Value::Null);
                WrapperOutcome::Respond(status, body)
            }
            None => WrapperOutcome::Params(map),
        },
        _ => WrapperOutcome::Pass,
    }
}

fn status_field(map: &Map<String, Value>) -> Option<u16> {
    map.get("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
}

fn invoke<F>(f: AssertUnwindSafe<F>) -> Result<Value, Failure>
where
    F: FnOnce() -> HandlerResult,
{
    match catch_unwind(f) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Failure {
            class: err.class,
            message: err.message,
        }),
        Err(panic) => Err(Failure::new("Panic", panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn map_result(result: Value) -> ResponseEnvelope {
    if result.is_null() {
        return envelope(404, &Value::Null);
    }

    if let Value::Object(map) = &result {
        if let Some(status) = status_field(map) {
            let body = match map.get("body") {
                Some(body) if !body.is_null() => body.clone(),
                _ => result.clone(),
            };
            return envelope(status, &body);
        }
    }

    envelope(200, &result)
}

fn envelope(status: u16, body: &Value) -> ResponseEnvelope {
    let body = serde_json::to_string(body).unwrap_or_else(|_| "null".to_string());
    ResponseEnvelope::new(status, body)
}
