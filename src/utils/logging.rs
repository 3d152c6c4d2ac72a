//! Tracing subscriber setup for the CLI.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter directive for a `-v` count.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install a global subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise the level comes from `verbosity`.
/// Calling this twice is harmless, the second install is ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::try_new(level_for(verbosity)).unwrap_or_else(|_| EnvFilter::new("info")));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
