//! Diagnostic logging setup.
//!
//! Logs go to stderr so stdout carries only command results. `RUST_LOG`
//! overrides the default filter; `--verbose` raises it to debug.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "folio=info,folio_core=info";
const VERBOSE_FILTER: &str = "folio=debug,folio_core=debug";

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .ok();
}
