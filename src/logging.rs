use is_terminal::IsTerminal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber, writing to stderr so stdout stays clean
/// for progress lines and dry-run listings.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str) {
    let default_filter = format!("sweeprun={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(false)
                .with_thread_ids(false),
        )
        .try_init();
    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {}", e);
    }
}
