use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::json;

use gantry_core::{GatewayEvent, InvocationContext, Registry, ResponseEnvelope};

/// Shared state of one gateway process.
#[derive(Debug)]
pub struct RuntimeState {
    pub registry: Registry,
    pub debug: bool,
}

pub fn app_router(state: Arc<RuntimeState>) -> Router {
    Router::new().fallback(handle_request).with_state(state)
}

async fn handle_request(State(state): State<Arc<RuntimeState>>, request: Request) -> impl IntoResponse {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();
    if state.debug {
        tracing::info!("[gateway] request {} {}", method, path);
    }

    if path == "/" {
        let working_dir = std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|_| ".".to_string());
        return json_response(ResponseEnvelope::new(
            200,
            json!({ "working_dir": working_dir }).to_string(),
        ));
    }

    let mut headers = BTreeMap::new();
    for (key, value) in request.headers().iter() {
        headers.insert(
            key.as_str().to_string(),
            value.to_str().unwrap_or("").to_string(),
        );
    }

    let body = match axum::body::to_bytes(request.into_body(), usize::MAX).await {
        Ok(bytes) if bytes.is_empty() => None,
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).to_string()),
        Err(_) => None,
    };

    let envelope = match execute(&state, &method, &path, headers, body) {
        Some(envelope) => envelope,
        // no registered route matched
        None => ResponseEnvelope::new(404, ""),
    };
    if state.debug {
        tracing::info!("[gateway] response {} {}", envelope.status_code, path);
    }
    json_response(envelope)
}

/// Match the request against registered routes and dispatch. `None` means no
/// route matched.
pub fn execute(
    state: &RuntimeState,
    method: &str,
    path: &str,
    headers: BTreeMap<String, String>,
    body: Option<String>,
) -> Option<ResponseEnvelope> {
    let trimmed = path.trim_matches('/');
    for entry in state.registry.iter() {
        if !entry.descriptor.gateway.verb.as_str().eq_ignore_ascii_case(method) {
            continue;
        }
        let Some(params) = match_route(&entry.descriptor.gateway.path, trimmed) else {
            continue;
        };

        let mut event = GatewayEvent {
            headers: headers.clone(),
            body: body.clone(),
            ..Default::default()
        };
        for (name, value) in params {
            event.path_parameters.insert(name, value);
        }

        let context = InvocationContext {
            function_name: Some(entry.descriptor.name.clone()),
            request_id: None,
        };
        return Some(gantry_dispatch::dispatch(entry, &event, &context, state.debug));
    }
    None
}

/// Match a request path against a route template, collecting dynamic
/// segment values.
pub fn match_route(template: &str, path: &str) -> Option<Vec<(String, String)>> {
    let expected: Vec<&str> = template.split('/').collect();
    let actual: Vec<&str> = path.split('/').collect();
    if expected.len() != actual.len() {
        return None;
    }

    let mut params = Vec::new();
    for (fragment, value) in expected.iter().zip(actual.iter()) {
        match fragment.strip_prefix(':') {
            Some(name) => params.push((name.to_string(), (*value).to_string())),
            None => {
                if fragment != value {
                    return None;
                }
            }
        }
    }
    Some(params)
}

fn json_response(envelope: ResponseEnvelope) -> Response {
    let status = axum::http::StatusCode::from_u16(envelope.status_code)
        .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(envelope.body))
        .unwrap()
}
