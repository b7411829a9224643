use serde::{Deserialize, Serialize};

/// Parameter kind of a declared handler signature.
///
/// Registered once per function and stored on the descriptor; never
/// re-derived at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Required positional parameter, becomes a `:name` path placeholder
    Req,
    /// Optional positional parameter with a default
    Opt,
    /// Variadic positional parameter
    Rest,
    /// Required keyword parameter
    KeyReq,
    /// Optional keyword parameter with a default
    Key,
    /// Variadic keyword parameter
    KeyRest,
}

impl ParamKind {
    pub fn is_keyword(self) -> bool {
        matches!(self, ParamKind::KeyReq | ParamKind::Key)
    }
}

/// Statically declared parameter, used in const function tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn req(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Req,
        }
    }

    pub const fn opt(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Opt,
        }
    }

    pub const fn rest(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Rest,
        }
    }

    pub const fn key_req(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::KeyReq,
        }
    }

    pub const fn key(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Key,
        }
    }

    pub const fn key_rest(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::KeyRest,
        }
    }
}

/// Owned parameter declaration as stored on a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub kind: ParamKind,
}

impl From<&ParamSpec> for ParamDecl {
    fn from(spec: &ParamSpec) -> Self {
        Self {
            name: spec.name.to_string(),
            kind: spec.kind,
        }
    }
}

pub fn to_decls(specs: &[ParamSpec]) -> Vec<ParamDecl> {
    specs.iter().map(ParamDecl::from).collect()
}

/// Wrappers must accept exactly two required keywords named `event` and
/// `context`.
pub fn is_event_context_signature(params: &[ParamDecl]) -> bool {
    params.len() == 2
        && params[0].kind == ParamKind::KeyReq
        && params[0].name == "event"
        && params[1].kind == ParamKind::KeyReq
        && params[1].name == "context"
}
