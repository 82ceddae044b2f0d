use tracing_subscriber::EnvFilter;

/// Structured logging to stderr so command output on stdout stays clean.
///
/// `RUST_LOG` wins when set; otherwise `verbose` turns on debug output for
/// this crate.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "info,homeflix=debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
