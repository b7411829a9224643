pub mod deploy;
pub mod preview;
pub mod routes;
pub mod serve;

use gantry_stack::{PolicySpec, StackOptions, TemplateFormat};

use crate::CliContext;

/// Build stack options from CLI params, falling back to app defaults.
pub(crate) fn stack_options(context: &CliContext) -> StackOptions {
    let app_name = context
        .args
        .param("--app")
        .unwrap_or(context.app.name)
        .to_string();
    let bucket = context
        .args
        .param("--bucket")
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("{}-artifacts", gantry_core::strings::dasherize(&app_name))
        });

    let mut opts = StackOptions::new(&app_name, &bucket);
    if let Some(envs) = context.args.param("--envs") {
        opts.app_envs = envs.split(',').map(|env| env.trim().to_string()).collect();
    }
    opts.timeout = context.args.param("--timeout").and_then(|v| v.parse().ok());
    opts.memory_size = context.args.param("--memory").and_then(|v| v.parse().ok());
    if let Some(policies) = context.args.param("--policies") {
        opts.policies = policies
            .split(',')
            .map(|name| PolicySpec::named(name.trim()))
            .collect();
    }
    opts
}

pub(crate) fn template_format(context: &CliContext) -> Result<TemplateFormat, String> {
    match context.args.param("--format") {
        Some(raw) => raw.parse(),
        None => Ok(TemplateFormat::Json),
    }
}
