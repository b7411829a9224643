use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context as _};
use gantry_stack::{synthesize, AppPaths, DirStore, TemplateFormat};

use crate::registry::{CommandRegistry, CommandSpec};
use crate::CliContext;

const COMMAND: CommandSpec = CommandSpec {
    name: "deploy",
    summary: "synthesize the stack, upload artifacts, write the template",
    aliases: &[],
    handler: cmd,
};

pub fn register(registry: &mut CommandRegistry) {
    registry.add_command(COMMAND);
}

fn cmd(context: &CliContext) {
    if let Err(err) = run(context) {
        stdio::error("deploy", &format!("{:#}", err));
        std::process::exit(1);
    }
}

fn run(context: &CliContext) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let paths = AppPaths::new(&cwd);
    let opts = super::stack_options(context);
    let format = super::template_format(context).map_err(|message| anyhow!(message))?;

    let mut store = DirStore::new(paths.hidden().join("store"));
    let template = synthesize(&context.app.registry, &opts, &paths, &mut store)?;
    let rendered = template.render(format)?;

    let out_path = match context.args.param("--out") {
        Some(path) => PathBuf::from(path),
        None => paths.hidden().join(match format {
            TemplateFormat::Json => "template.json",
            TemplateFormat::Yaml => "template.yaml",
        }),
    };
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&out_path, rendered)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    stdio::success(&format!("template written to {}", out_path.display()));
    Ok(())
}
