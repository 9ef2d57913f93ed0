//! Diagnostic logging setup.
//!
//! Filter precedence: `STARKNET_DOCKER_LOG`, then `RUST_LOG`, then `debug` with `--verbose`
//! and `warn` otherwise. Output goes to stderr so stdout stays with the containers.

use std::env;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

fn filter_directive(verbose: bool) -> String {
    env::var("STARKNET_DOCKER_LOG")
        .ok()
        .or_else(|| env::var("RUST_LOG").ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            let level = if verbose { "debug" } else { "warn" };
            level.to_string()
        })
}

/// Install the global fmt subscriber once; later calls are no-ops.
pub fn init_logging(verbose: bool) {
    if INIT.get().is_some() {
        return;
    }
    let directive = filter_directive(verbose);
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("starknet-docker: invalid log filter '{directive}': {e}; using 'warn'");
        EnvFilter::new("warn")
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("starknet-docker: logging init skipped (global subscriber already set)");
    }
    let _ = INIT.set(());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(false);
        init_logging(true);
        assert!(INIT.get().is_some());
    }
}
