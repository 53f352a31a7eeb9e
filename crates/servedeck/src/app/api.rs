use clap::{Arg, ArgAction, Command};

pub fn start_command() -> Command {
    Command::new("start")
        .about("Start a stopped API")
        .arg(
            Arg::new("id")
                .help("ID of the API to start")
                .required(true)
                .index(1),
        )
}

pub fn stop_command() -> Command {
    Command::new("stop")
        .about("Stop a running API")
        .arg(
            Arg::new("id")
                .help("ID of the API to stop")
                .required(true)
                .index(1),
        )
}

pub fn delete_command() -> Command {
    Command::new("delete")
        .about("Delete an API, stopping it first if it is running")
        .arg(
            Arg::new("id")
                .help("ID of the API to delete")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("yes")
                .long("yes")
                .short('y')
                .help("Skip confirmation prompts")
                .action(ArgAction::SetTrue),
        )
}
