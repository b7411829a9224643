//! Sample gantry application: a pet store with a calculator on the side.

pub mod calculator;
pub mod pets;
pub mod wrapper;

use gantry_core::{FunctionOverrides, RegisterOpts, Registry, RegistryError, WrapperRef};

/// Register every handler. The create endpoint runs behind the authorize
/// wrapper; everything else is open.
pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.add_wrapper(wrapper::AUTHORIZE)?;
    registry.add_wrapper(wrapper::RENAME)?;

    registry.register_with(
        pets::MODULE,
        RegisterOpts::new().function(
            "create",
            FunctionOverrides {
                wrapper: Some(WrapperRef::new("Wrapper", "authorize", "wrapper")),
                ..Default::default()
            },
        ),
    )?;
    registry.register(calculator::MODULE)?;
    Ok(())
}
