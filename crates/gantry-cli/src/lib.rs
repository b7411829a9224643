//! Command-line entry points for gantry applications.
//!
//! An application builds its handler registry, then hands control here:
//!
//! ```no_run
//! use gantry_cli::App;
//! use gantry_core::Registry;
//!
//! let registry = Registry::new();
//! gantry_cli::run(App { name: "PetStore", registry });
//! ```

pub mod args;
pub mod commands;
pub mod registry;

use gantry_core::Registry;

pub use args::{format_parse_errors, Args, ParseError, ParseErrorKind, ParseOutcome};
pub use registry::{CommandRegistry, CommandSpec, FlagSpec, ParamSpec};

/// The application the CLI runs on behalf of.
#[derive(Debug)]
pub struct App {
    pub name: &'static str,
    pub registry: Registry,
}

/// Parsed arguments plus the application, handed to command handlers.
#[derive(Debug)]
pub struct CliContext<'a> {
    pub args: Args,
    pub app: &'a App,
    pub debug: bool,
}

pub fn register_global_flags(registry: &mut CommandRegistry) {
    registry.add_flag(FlagSpec {
        name: "--help",
        aliases: &["-H", "help"],
        description: "show help",
    });
    registry.add_flag(FlagSpec {
        name: "--version",
        aliases: &["-V", "version"],
        description: "show version",
    });
    registry.add_flag(FlagSpec {
        name: "--debug",
        aliases: &["-d", "debug"],
        description: "enable debug logging and error backtraces",
    });
}

pub fn register_global_params(registry: &mut CommandRegistry) {
    registry.add_param(ParamSpec {
        name: "--port",
        description: "gateway port",
    });
    registry.add_param(ParamSpec {
        name: "--app",
        description: "application name override",
    });
    registry.add_param(ParamSpec {
        name: "--bucket",
        description: "artifact bucket",
    });
    registry.add_param(ParamSpec {
        name: "--format",
        description: "template encoding: json or yaml",
    });
    registry.add_param(ParamSpec {
        name: "--out",
        description: "template output path",
    });
    registry.add_param(ParamSpec {
        name: "--timeout",
        description: "default function timeout in seconds",
    });
    registry.add_param(ParamSpec {
        name: "--memory",
        description: "default function memory size in MB",
    });
    registry.add_param(ParamSpec {
        name: "--envs",
        description: "comma-separated application environments",
    });
    registry.add_param(ParamSpec {
        name: "--policies",
        description: "comma-separated role policy names",
    });
}

/// Register the built-in commands and execute the invocation.
pub fn run(app: App) {
    let mut commands = CommandRegistry::new();
    register_global_flags(&mut commands);
    register_global_params(&mut commands);
    commands::deploy::register(&mut commands);
    commands::preview::register(&mut commands);
    commands::routes::register(&mut commands);
    commands::serve::register(&mut commands);

    execute(&app, &commands);
}

pub fn execute(app: &App, commands: &CommandRegistry) {
    let tokens: Vec<String> = std::env::args().skip(1).collect();
    let parsed = Args::collect(tokens, commands);
    if !parsed.errors.is_empty() {
        error(&format_parse_errors(&parsed.errors));
        return;
    }

    let args = parsed.args;
    let debug = args.flag("--debug", &["-d", "debug"]);

    let Some(name) = args.command.clone() else {
        if args.flag("--version", &["-V", "version"]) {
            version(app);
        } else {
            help(app, commands);
        }
        return;
    };

    if args.flag("--help", &["-H", "help"]) {
        help(app, commands);
        return;
    }

    // commands are validated during parsing, this lookup cannot miss
    let Some(command) = commands.command_named(&name) else {
        error("instructions unclear. try '--help' for guidance");
        return;
    };

    let context = CliContext { args, app, debug };
    (command.handler)(&context);
}

pub fn help(app: &App, commands: &CommandRegistry) {
    stdio::raw(app.name);
    stdio::raw("");
    stdio::raw(&format!("Usage: {} [options] [command]", app.name));
    stdio::raw(&format!(
        "gantry v{} - handlers in, endpoints out",
        env!("CARGO_PKG_VERSION")
    ));
    stdio::raw("");

    stdio::raw("commands");
    for command in commands.commands() {
        stdio::raw(&format!("  {}\t\t{}", command.name, command.summary));
    }
    stdio::raw("");

    if !commands.flags().is_empty() {
        stdio::raw("flags");
        for flag in commands.flags() {
            stdio::raw(&format!("  {}\t\t{}", flag.name, flag.description));
        }
        stdio::raw("");
    }

    if !commands.params().is_empty() {
        stdio::raw("params");
        for param in commands.params() {
            stdio::raw(&format!("  {}\t\t{}", param.name, param.description));
        }
        stdio::raw("");
    }
}

pub fn version(app: &App) {
    stdio::raw(&format!(
        "{} [gantry version {}]",
        app.name,
        env!("CARGO_PKG_VERSION")
    ));
}

fn error(message: &str) {
    stdio::error("cli", message.trim_end());
}
