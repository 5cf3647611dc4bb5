use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber: human-readable lines on stderr.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` picks debug over info.
/// Calling this twice is harmless (the second call is ignored).
pub fn init_logging(verbose: bool) {
    let default = if verbose { "whdh_gold=debug" } else { "whdh_gold=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
