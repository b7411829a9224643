use anyhow::anyhow;
use gantry_stack::{synthesize, AppPaths, MemoryStore};

use crate::registry::{CommandRegistry, CommandSpec};
use crate::CliContext;

const COMMAND: CommandSpec = CommandSpec {
    name: "preview",
    summary: "print the template without uploading anything",
    aliases: &[],
    handler: cmd,
};

pub fn register(registry: &mut CommandRegistry) {
    registry.add_command(COMMAND);
}

fn cmd(context: &CliContext) {
    if let Err(err) = run(context) {
        stdio::error("preview", &format!("{:#}", err));
        std::process::exit(1);
    }
}

fn run(context: &CliContext) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let paths = AppPaths::new(&cwd);
    let mut opts = super::stack_options(context);
    opts.skip_upload = true;
    let format = super::template_format(context).map_err(|message| anyhow!(message))?;

    let mut store = MemoryStore::new();
    let template = synthesize(&context.app.registry, &opts, &paths, &mut store)?;
    println!("{}", template.render(format)?);
    Ok(())
}
