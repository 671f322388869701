//! Diagnostic logging setup.
//!
//! Logs go to stderr through `tracing-subscriber`; stdout is reserved for
//! command output. The filter comes from `XOPSBOT_LOG` (standard `EnvFilter`
//! syntax) and falls back to `warn`, or `debug` when `--verbose` is set.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "XOPSBOT_LOG";

pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(fallback));

    // already initialised (e.g. by a test harness) is fine
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
