pub mod descriptor;
pub mod event;
pub mod handler;
pub mod registry;
pub mod route;
pub mod signature;
pub mod strings;

pub use descriptor::{GatewayRoute, LambdaDescriptor, ModuleRef, Settings, Verb, WrapperRef};
pub use event::{GatewayEvent, InvocationContext, ResponseEnvelope};
pub use handler::{Call, HandlerError, HandlerFn, HandlerResult, WrapperFn};
pub use registry::{
    FunctionDef, FunctionOverrides, ModuleDef, RegisterOpts, RegisteredLambda, RegisteredWrapper,
    Registry, RegistryError, WrapperDef,
};
pub use route::infer_route;
pub use signature::{ParamDecl, ParamKind, ParamSpec};
