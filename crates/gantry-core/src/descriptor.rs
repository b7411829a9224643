use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::signature::ParamDecl;

/// HTTP verb of a gateway route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "DELETE" => Ok(Verb::Delete),
            "PATCH" => Ok(Verb::Patch),
            other => Err(format!("unknown verb '{}'", other)),
        }
    }
}

/// A gateway route: verb plus a path template with `:name` placeholders for
/// required positional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRoute {
    pub verb: Verb,
    pub path: String,
}

impl GatewayRoute {
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
        }
    }

    /// Placeholder names in declaration order.
    pub fn placeholders(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .collect()
    }
}

/// Target reference: module path plus function name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    /// Qualified module name, e.g. `Calculator::Algebra`
    pub name: String,
    /// Short function name, e.g. `sum`
    pub method: String,
    /// Source path of the module, e.g. `calculator/algebra`
    pub path: String,
}

/// Wrapper reference, same shape as a target reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperRef {
    pub name: String,
    pub method: String,
    pub path: String,
}

impl WrapperRef {
    pub fn new(
        name: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
            path: path.into(),
        }
    }

    /// `Wrapper.authorize`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.name, self.method)
    }
}

/// Per-function resource settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub timeout: Option<u32>,
    pub memory_size: Option<u32>,
}

/// The compiled record combining a handler's route, target, wrapper,
/// environment and settings. Immutable once compiled into a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaDescriptor {
    /// Deterministic key, e.g. `calculator-algebra-sum`
    pub name: String,
    pub gateway: GatewayRoute,
    pub module: ModuleRef,
    pub wrapper: Option<WrapperRef>,
    pub env: BTreeMap<String, String>,
    pub settings: Settings,
    /// Declared parameter kinds, recorded at registration time.
    pub params: Vec<ParamDecl>,
}

impl LambdaDescriptor {
    /// `Calculator::Algebra.sum`
    pub fn qualified_target(&self) -> String {
        format!("{}.{}", self.module.name, self.module.method)
    }
}
