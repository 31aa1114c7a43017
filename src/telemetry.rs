//! Tracing initialisation for the binaries.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber, logging to stderr.
///
/// `RUST_LOG` takes precedence; otherwise `info`, or `debug` for this crate
/// when `verbose` is set.
pub fn init(verbose: bool) {
    let default = if verbose {
        "info,appservice_admin=debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

/// Standardized span constructors for workflow observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for a vacate run.
    pub fn vacate(room_id: &str) -> Span {
        info_span!("vacate", room_id = %room_id)
    }

    /// Span for a send-message run.
    pub fn send(sender: &str, target: &str) -> Span {
        info_span!("send", sender = %sender, target = %target)
    }
}
