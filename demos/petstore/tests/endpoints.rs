//! End-to-end flows through the local gateway's matching and dispatch.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use gantry_core::Registry;
use gantry_gateway::{execute, RuntimeState};

fn state() -> Arc<RuntimeState> {
    let mut registry = Registry::new();
    petstore::register(&mut registry).unwrap();
    Arc::new(RuntimeState {
        registry,
        debug: false,
    })
}

fn authorized() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Authorization".to_string(), "Bearer pass".to_string());
    headers
}

#[test]
fn sum_route_coerces_and_answers_200() {
    let state = state();
    let response = execute(
        &state,
        "GET",
        "/calculator/algebra/1/2/sum",
        BTreeMap::new(),
        None,
    )
    .unwrap();

    assert_eq!(response.status_code, 200);
    let parsed: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(parsed, json!({ "x": 1, "y": 2, "z": 0, "sum": 3 }));
}

#[test]
fn sum_route_handles_floats() {
    let state = state();
    let response = execute(
        &state,
        "GET",
        "/calculator/algebra/1/2.3/sum",
        BTreeMap::new(),
        None,
    )
    .unwrap();

    let parsed: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(parsed["sum"], json!(3.3));
}

#[test]
fn create_show_update_delete_round_trip() {
    let state = state();

    let created = execute(
        &state,
        "POST",
        "/pet/create",
        authorized(),
        Some(r#"{"id":71,"name":"Bubi"}"#.to_string()),
    )
    .unwrap();
    assert_eq!(created.status_code, 200);

    let shown = execute(&state, "GET", "/pet/71/show", BTreeMap::new(), None).unwrap();
    assert_eq!(shown.status_code, 200);
    let parsed: Value = serde_json::from_str(&shown.body).unwrap();
    assert_eq!(parsed["name"], json!("Bubi"));

    let updated = execute(
        &state,
        "POST",
        "/pet/71/update",
        BTreeMap::new(),
        Some(r#"{"id":71,"name":"Mirko"}"#.to_string()),
    )
    .unwrap();
    assert_eq!(updated.status_code, 200);

    let deleted = execute(&state, "DELETE", "/pet/71/delete", BTreeMap::new(), None).unwrap();
    assert_eq!(deleted.status_code, 200);
    let parsed: Value = serde_json::from_str(&deleted.body).unwrap();
    assert_eq!(parsed["name"], json!("Mirko"));

    let gone = execute(&state, "GET", "/pet/71/show", BTreeMap::new(), None).unwrap();
    assert_eq!(gone.status_code, 404);
}

#[test]
fn create_without_name_answers_422() {
    let state = state();
    let response = execute(
        &state,
        "POST",
        "/pet/create",
        authorized(),
        Some("{}".to_string()),
    )
    .unwrap();

    assert_eq!(response.status_code, 422);
    assert_eq!(response.body, r#"{"error":"Missing name"}"#);
}

#[test]
fn create_without_authorization_is_blocked() {
    let state = state();
    let response = execute(
        &state,
        "POST",
        "/pet/create",
        BTreeMap::new(),
        Some(r#"{"id":72,"name":"Nera"}"#.to_string()),
    )
    .unwrap();

    assert_eq!(response.status_code, 403);
    assert_eq!(response.body, r#"{"forbidden":"Wrapper.authorize"}"#);

    // the target never ran
    let shown = execute(&state, "GET", "/pet/72/show", BTreeMap::new(), None).unwrap();
    assert_eq!(shown.status_code, 404);
}

#[test]
fn create_with_bad_token_answers_401() {
    let state = state();
    let mut headers = BTreeMap::new();
    headers.insert("Authorization".to_string(), "Bearer block".to_string());
    let response = execute(
        &state,
        "POST",
        "/pet/create",
        headers,
        Some(r#"{"id":73,"name":"Ada"}"#.to_string()),
    )
    .unwrap();

    assert_eq!(response.status_code, 401);
    assert_eq!(response.body, r#"{"error":"Invalid token"}"#);
}

#[test]
fn raising_handler_answers_500_and_keeps_serving() {
    let state = state();
    let response = execute(
        &state,
        "POST",
        "/pet/create",
        authorized(),
        Some(r#"{"id":74,"name":"Iva","error":true}"#.to_string()),
    )
    .unwrap();

    assert_eq!(response.status_code, 500);
    let parsed: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(parsed["error"]["class"], json!("RuntimeError"));
    assert_eq!(parsed["error"]["message"], json!("error thrown"));

    // the loop is still alive
    let next = execute(
        &state,
        "GET",
        "/calculator/algebra/1/1/sum",
        BTreeMap::new(),
        None,
    )
    .unwrap();
    assert_eq!(next.status_code, 200);
}

#[test]
fn unmatched_routes_are_none() {
    let state = state();
    assert!(execute(&state, "GET", "/nope", BTreeMap::new(), None).is_none());
    assert!(execute(&state, "PUT", "/pet/list", BTreeMap::new(), None).is_none());
}
