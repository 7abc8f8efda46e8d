//! Logging setup.
//!
//! Priority: `QUIRE_LOG`, then `RUST_LOG`, then a default of `warn`
//! (`debug` for the quire crates with `--verbose`). Output goes to stderr so
//! it never mixes with command output.

use std::env;
use tracing_subscriber::{fmt, EnvFilter};

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,quire=debug,quireapp=debug"
    } else {
        "warn"
    }
}

fn create_filter(verbose: bool) -> EnvFilter {
    let from_env = env::var("QUIRE_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok());
    from_env.unwrap_or_else(|| EnvFilter::new(default_directives(verbose)))
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let _ = fmt()
        .with_env_filter(create_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
