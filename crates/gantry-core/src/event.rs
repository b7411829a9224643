use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The request-shaped event a dispatch consumes.
///
/// Only the fields the dispatcher reads are modeled: path parameters,
/// headers (read by wrappers) and the raw body (parsed only for POST).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayEvent {
    #[serde(rename = "pathParameters", default)]
    pub path_parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl GatewayEvent {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Invocation context handed to wrappers alongside the event.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub function_name: Option<String>,
    pub request_id: Option<String>,
}

/// What a dispatch returns: a status code and an already-serialized body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl ResponseEnvelope {
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }
}
