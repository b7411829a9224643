use std::fmt;

use serde_json::{Map, Value};

use crate::event::{GatewayEvent, InvocationContext};

/// Arguments for one handler invocation.
///
/// `kwargs: None` means the call carries no keyword arguments at all, which
/// is distinct from `Some` with an empty map. POST dispatch relies on the
/// difference when the parsed body is empty.
#[derive(Debug, Clone, Default)]
pub struct Call {
    pub args: Vec<Value>,
    pub kwargs: Option<Map<String, Value>>,
}

impl Call {
    pub fn positional(args: Vec<Value>) -> Self {
        Self { args, kwargs: None }
    }

    /// Positional argument by index.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Keyword argument by name.
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.as_ref().and_then(|map| map.get(name))
    }
}

/// Error raised by a handler or wrapper body.
///
/// `class` ends up in the 500 response body next to the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub class: String,
    pub message: String,
}

impl HandlerError {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }

    pub fn msg(message: impl Into<String>) -> Self {
        Self::new("HandlerError", message)
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

impl std::error::Error for HandlerError {}

pub type HandlerResult = Result<Value, HandlerError>;

/// A registered handler function. Resolved and validated at registration
/// time, invoked by the dispatcher.
pub type HandlerFn = fn(Call) -> HandlerResult;

/// A registered wrapper function, called with the inbound event and the
/// invocation context before the target handler.
pub type WrapperFn = fn(&GatewayEvent, &InvocationContext) -> HandlerResult;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kwargs_absent_vs_empty() {
        let bare = Call::positional(vec![json!(1)]);
        assert!(bare.kwargs.is_none());

        let empty = Call {
            args: Vec::new(),
            kwargs: Some(Map::new()),
        };
        assert!(empty.kwargs.is_some());
        assert_eq!(empty.kwarg("pet"), None);
    }
}
