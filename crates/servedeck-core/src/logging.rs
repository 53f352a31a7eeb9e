use tracing_subscriber::EnvFilter;

/// Install the JSON `tracing` subscriber on stderr.
///
/// `RUST_LOG` wins when set. Otherwise the level is `error` when `quiet`
/// and `info` when not. Calling this twice is a no-op.
pub fn init_logging(quiet: bool) {
    let default_level = if quiet { "error" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
