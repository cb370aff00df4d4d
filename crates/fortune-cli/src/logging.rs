//! Tracing initialization
//!
//! `RUST_LOG` selects levels per target (default `info`). Logs go to stderr
//! so stdout carries only command output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber; `json` switches to line-delimited JSON
pub(crate) fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
