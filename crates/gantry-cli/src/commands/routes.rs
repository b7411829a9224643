use crate::registry::{CommandRegistry, CommandSpec};
use crate::CliContext;

const COMMAND: CommandSpec = CommandSpec {
    name: "routes",
    summary: "print the registered route table",
    aliases: &[],
    handler: cmd,
};

pub fn register(registry: &mut CommandRegistry) {
    registry.add_command(COMMAND);
}

fn cmd(context: &CliContext) {
    gantry_gateway::print_routes(&context.app.registry);
}
