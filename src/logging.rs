use tracing_subscriber::EnvFilter;

/// Overrides the `-v`/`-q` derived level when set
pub const LOG_ENV: &str = "PTANALYZER_LOG";

/// `-q` wins over any `-v`; otherwise 0 warn, 1 info, 2 debug, 3+ trace
pub const fn verbosity_to_directive(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Logs go to stderr so stdout only carries
/// the report. Safe to call more than once.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .try_init();
}
