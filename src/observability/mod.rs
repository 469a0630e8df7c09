//! Logging initialization.
//!
//! Structured logging via `tracing`, filtered through `RUST_LOG` with a
//! sensible default. Metrics are emitted with the `metrics` macros
//! throughout the crate; without an installed recorder they are no-ops,
//! which keeps library embedders free to install their own.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Initializes the global tracing subscriber once.
///
/// `RUST_LOG` wins when set; otherwise `verbose` selects `debug` over
/// `info` for this crate. Logs go to stderr so command output on stdout
/// stays machine-readable. Safe to call repeatedly; only the first call
/// installs anything.
pub fn init_logging(verbose: bool) {
    LOGGING_INIT.get_or_init(|| {
        let default_directive = if verbose {
            "corrlink=debug,info"
        } else {
            "corrlink=info,warn"
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(false);
        init_logging(true);
        init_logging(false);
    }
}
