use clap::{Arg, ArgAction, Command};

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Output in JSON format")
        .action(ArgAction::SetTrue)
}

fn id_arg(help: &'static str) -> Arg {
    Arg::new("id").help(help).required(true).index(1)
}

pub fn list_command() -> Command {
    Command::new("list")
        .about("List the APIs managed by the backend")
        .arg(json_flag())
}

pub fn status_command() -> Command {
    Command::new("status")
        .about("Show the current status of one API")
        .arg(id_arg("ID of the API to check"))
        .arg(json_flag())
}

pub fn metrics_command() -> Command {
    Command::new("metrics")
        .about("Show recent metrics of one API")
        .arg(id_arg("ID of the API"))
        .arg(json_flag())
}

pub fn alerts_command() -> Command {
    Command::new("alerts")
        .about("List active alerts")
        .arg(json_flag())
}

pub fn watch_command() -> Command {
    Command::new("watch")
        .about("Poll the backend and print every change until interrupted")
        .arg(
            Arg::new("id")
                .long("id")
                .help("Also follow status and metrics of this API"),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .help("Exit after this many API list updates")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
