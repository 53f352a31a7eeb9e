use clap::ArgMatches;
use serde_json::json;
use tracing::{error, info};

use servedeck_core::normalize::{self, MetricSeries};
use servedeck_protocol::names::commands;

use super::helpers::{api_id_arg, load_config_with_warning, print_json, unexpected_payload};
use super::invoke_once;
use crate::color;
use crate::table::Table;

pub(crate) fn handle_metrics_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = api_id_arg(matches)?;
    let json_output = matches.get_flag("json");

    info!(event = "cli.metrics_started", api_id = %id, json_output = json_output);

    let config = load_config_with_warning();
    let payload = match invoke_once(&config, commands::GET_API_METRICS, json!({ "id": id })) {
        Ok(payload) => payload,
        Err(e) => {
            eprintln!("Could not get metrics of '{}': {}", id, e);
            error!(event = "cli.metrics_failed", api_id = %id, error = %e);
            return Err(e);
        }
    };

    let Some(series) = normalize::metrics(&payload) else {
        let message = unexpected_payload(commands::GET_API_METRICS, &payload);
        eprintln!("{}", color::error(&message));
        error!(event = "cli.metrics_failed", api_id = %id, error = %message);
        return Err(message.into());
    };

    if json_output {
        print_json(&series)?;
    } else if series.is_empty() {
        println!("No metrics recorded for '{}'.", id);
    } else {
        metrics_table(&series).print();
    }

    info!(event = "cli.metrics_completed", api_id = %id, series = series.len());
    Ok(())
}

/// One row per series: latest value, range and sample count.
pub(crate) fn metrics_table(series: &MetricSeries) -> Table {
    let mut table = Table::new(&[
        ("Metric", color::accent),
        ("Latest", color::bold),
        ("Min", color::plain),
        ("Max", color::plain),
        ("Samples", color::muted),
        ("At", color::muted),
    ]);
    for (name, points) in series {
        let Some(last) = points.last() else {
            continue;
        };
        let min = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
        let max = points
            .iter()
            .map(|p| p.value)
            .fold(f64::NEG_INFINITY, f64::max);
        table.push_row(vec![
            name.clone(),
            format_value(last.value),
            format_value(min),
            format_value(max),
            points.len().to_string(),
            last.timestamp.format("%H:%M:%S").to_string(),
        ]);
    }
    table
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}
