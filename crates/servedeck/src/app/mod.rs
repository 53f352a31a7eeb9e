mod api;
mod global;
mod query;


use clap::Command;

pub fn build_cli() -> Command {
    global::root_command()
        .subcommand(query::list_command())
        .subcommand(query::status_command())
        .subcommand(query::metrics_command())
        .subcommand(query::alerts_command())
        .subcommand(query::watch_command())
        .subcommand(api::start_command())
        .subcommand(api::stop_command())
        .subcommand(api::delete_command())
}
