use std::sync::Arc;

use gantry_gateway::RuntimeState;

use crate::registry::{CommandRegistry, CommandSpec};
use crate::CliContext;

const COMMAND: CommandSpec = CommandSpec {
    name: "serve",
    summary: "serve registered routes on a local gateway",
    aliases: &["start"],
    handler: cmd,
};

pub fn register(registry: &mut CommandRegistry) {
    registry.add_command(COMMAND);
}

fn cmd(context: &CliContext) {
    let port = context
        .args
        .param("--port")
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(gantry_gateway::DEFAULT_PORT);

    let state = Arc::new(RuntimeState {
        registry: context.app.registry.clone(),
        debug: context.debug,
    });

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            stdio::error("serve", &format!("failed to start runtime: {}", err));
            std::process::exit(1);
        }
    };

    if let Err(message) = runtime.block_on(gantry_gateway::serve(state, port)) {
        stdio::error("serve", &message);
        std::process::exit(1);
    }
}
