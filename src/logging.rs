// src/logging.rs
// =============================================================================
// Sets up tracing for the binary.
//
// Logs go to stderr. stdout is reserved for the report so it can be piped
// or parsed (the line format and --json both rely on that).
//
// RUST_LOG always wins. Without it we log our own crate at info, or at
// debug when --verbose is given.
// =============================================================================

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,onion_probe={default_level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
