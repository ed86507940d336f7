use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "STOCKGRID_LOG";

pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `STOCKGRID_LOG` wins, then the configured filter, then `-v` count.
pub fn build_filter(env_value: Option<&str>, configured: Option<&str>, verbosity: u8) -> EnvFilter {
    let fallback = level_from_verbosity(verbosity);
    let directives = env_value
        .filter(|value| !value.trim().is_empty())
        .or(configured.filter(|value| !value.trim().is_empty()));
    EnvFilter::builder()
        .with_default_directive(fallback.into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Installs the stderr subscriber. Safe to call more than once; later calls
/// leave the first subscriber in place.
pub fn init(configured: Option<&str>, verbosity: u8) {
    let env_value = std::env::var(LOG_ENV).ok();
    let filter = build_filter(env_value.as_deref(), configured, verbosity);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
