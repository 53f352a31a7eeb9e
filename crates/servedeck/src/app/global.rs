use clap::{Arg, ArgAction, Command};

pub fn root_command() -> Command {
    Command::new("servedeck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Watch and control locally served LLM APIs")
        .long_about("servedeck talks to the serving backend over its Unix socket. It lists the managed APIs, polls their status, metrics and alerts, and starts, stops or deletes them.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
}
