use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "PIVOTDESK_LOG";

/// Install the stderr subscriber. `-v` flags win over `PIVOTDESK_LOG`;
/// without either the level is `warn`, or `error` when quiet.
pub fn init(verbose: u8, quiet: bool) {
    let filter = match (verbose, quiet) {
        (0, true) => EnvFilter::new("error"),
        (0, false) => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        (1, _) => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    // A second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
