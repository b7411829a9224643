use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::descriptor::{GatewayRoute, LambdaDescriptor, ModuleRef, Settings, WrapperRef};
use crate::handler::{HandlerFn, WrapperFn};
use crate::route::infer_route;
use crate::signature::{is_event_context_signature, to_decls, ParamDecl, ParamSpec};
use crate::strings::module_components;

/// A module of handler functions, declared statically and registered as a
/// unit. The qualified name uses `::` separators, e.g. `Calculator::Algebra`.
#[derive(Debug, Clone, Copy)]
pub struct ModuleDef {
    pub name: &'static str,
    pub functions: &'static [FunctionDef],
}

/// One handler function with its declared parameter kinds.
#[derive(Debug, Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
    pub call: HandlerFn,
}

/// A wrapper function with its declared parameter kinds. Wrappers must
/// accept exactly `event:` and `context:` required keywords.
#[derive(Debug, Clone, Copy)]
pub struct WrapperDef {
    pub name: &'static str,
    pub method: &'static str,
    pub path: &'static str,
    pub params: &'static [ParamSpec],
    pub call: WrapperFn,
}

/// Group- and function-level registration overrides.
#[derive(Debug, Clone, Default)]
pub struct RegisterOpts {
    pub wrapper: Option<WrapperRef>,
    overrides: HashMap<&'static str, FunctionOverrides>,
}

impl RegisterOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a wrapper for every function in the module.
    pub fn wrapper(mut self, name: &str, method: &str, path: &str) -> Self {
        self.wrapper = Some(WrapperRef::new(name, method, path));
        self
    }

    /// Override one function's registration.
    pub fn function(mut self, name: &'static str, overrides: FunctionOverrides) -> Self {
        self.overrides.insert(name, overrides);
        self
    }

    fn for_function(&self, name: &str) -> Option<&FunctionOverrides> {
        self.overrides.get(name)
    }
}

/// Per-function overrides. An explicit gateway route replaces the inferred
/// one entirely; env and settings are taken as given; a wrapper here wins
/// over the group wrapper.
#[derive(Debug, Clone, Default)]
pub struct FunctionOverrides {
    pub gateway: Option<GatewayRoute>,
    pub wrapper: Option<WrapperRef>,
    pub env: BTreeMap<String, String>,
    pub settings: Option<Settings>,
}

/// A wrapper resolved at registration time.
#[derive(Debug, Clone)]
pub struct RegisteredWrapper {
    pub reference: WrapperRef,
    pub params: Vec<ParamDecl>,
    pub call: WrapperFn,
}

/// A descriptor plus its resolved handler and wrapper. What the dispatcher
/// consumes.
#[derive(Debug, Clone)]
pub struct RegisteredLambda {
    pub descriptor: LambdaDescriptor,
    pub handler: HandlerFn,
    pub wrapper: Option<RegisteredWrapper>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("lambda '{0}' is already registered")]
    DuplicateKey(String),
    #[error("wrapper '{0}' is not registered")]
    UnknownWrapper(String),
    #[error("wrapper '{0}' should accept event and context keyword arguments")]
    WrapperSignature(String),
    #[error("descriptor '{0}' has an empty {1} reference")]
    MalformedDescriptor(String, &'static str),
}

/// Ordered mapping from descriptor key to registered lambda.
///
/// Module registration inserts functions sorted by name, so keys enumerate
/// alphabetically within a module. Handlers and wrappers are resolved here,
/// once, at registration; dispatch never resolves anything by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<RegisteredLambda>,
    index: HashMap<String, usize>,
    wrappers: HashMap<String, RegisteredWrapper>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wrapper function. Its signature is validated here, not
    /// per-request.
    pub fn add_wrapper(&mut self, def: WrapperDef) -> Result<(), RegistryError> {
        let reference = WrapperRef::new(def.name, def.method, def.path);
        let params = to_decls(def.params);
        if !is_event_context_signature(&params) {
            return Err(RegistryError::WrapperSignature(reference.qualified()));
        }
        self.wrappers.insert(
            reference.qualified(),
            RegisteredWrapper {
                reference,
                params,
                call: def.call,
            },
        );
        Ok(())
    }

    /// Register every function of a module with inferred routes.
    pub fn register(&mut self, module: ModuleDef) -> Result<(), RegistryError> {
        self.register_with(module, RegisterOpts::new())
    }

    /// Register a module with overrides.
    pub fn register_with(
        &mut self,
        module: ModuleDef,
        opts: RegisterOpts,
    ) -> Result<(), RegistryError> {
        let components = module_components(module.name);
        let lowered: Vec<String> = components.iter().map(|c| c.to_lowercase()).collect();

        let mut functions: Vec<&FunctionDef> = module.functions.iter().collect();
        functions.sort_by_key(|function| function.name);

        for function in functions {
            let params = to_decls(function.params);
            let function_opts = opts.for_function(function.name);

            let gateway = function_opts
                .and_then(|o| o.gateway.clone())
                .unwrap_or_else(|| infer_route(&components, function.name, &params));

            let wrapper = function_opts
                .and_then(|o| o.wrapper.clone())
                .or_else(|| opts.wrapper.clone());

            let descriptor = LambdaDescriptor {
                name: format!("{}-{}", lowered.join("-"), function.name),
                gateway,
                module: ModuleRef {
                    name: module.name.to_string(),
                    method: function.name.to_string(),
                    path: lowered.join("/"),
                },
                wrapper,
                env: function_opts.map(|o| o.env.clone()).unwrap_or_default(),
                settings: function_opts.and_then(|o| o.settings).unwrap_or_default(),
                params,
            };

            self.insert(descriptor, function.call)?;
        }
        Ok(())
    }

    /// Register a fully explicit descriptor.
    pub fn register_descriptor(
        &mut self,
        descriptor: LambdaDescriptor,
        handler: HandlerFn,
    ) -> Result<(), RegistryError> {
        if descriptor.name.is_empty() {
            return Err(RegistryError::MalformedDescriptor(
                descriptor.name.clone(),
                "name",
            ));
        }
        if descriptor.module.name.is_empty() || descriptor.module.method.is_empty() {
            return Err(RegistryError::MalformedDescriptor(
                descriptor.name.clone(),
                "module",
            ));
        }
        self.insert(descriptor, handler)
    }

    fn insert(
        &mut self,
        descriptor: LambdaDescriptor,
        handler: HandlerFn,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateKey(descriptor.name.clone()));
        }

        let wrapper = match &descriptor.wrapper {
            Some(reference) => Some(
                self.wrappers
                    .get(&reference.qualified())
                    .cloned()
                    .ok_or_else(|| RegistryError::UnknownWrapper(reference.qualified()))?,
            ),
            None => None,
        };

        self.index
            .insert(descriptor.name.clone(), self.entries.len());
        self.entries.push(RegisteredLambda {
            descriptor,
            handler,
            wrapper,
        });
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&RegisteredLambda> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredLambda> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.descriptor.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
