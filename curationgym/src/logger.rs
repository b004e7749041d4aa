// src/logger.rs
//! Logger initialization for the `curationgym` binary.

use env_logger::{Builder, Env};

/// Initializes `env_logger` with a default level resolved from, in order:
/// `--debug` (Debug), `--quiet` (Off), the `LOG_LEVEL` env var, then `info`.
/// `--debug` wins over `--quiet` if both are somehow set.
pub fn init_logger(debug: bool, quiet: bool) {
    let default_level = if debug {
        "debug"
    } else if quiet {
        "off"
    } else {
        "info"
    };

    Builder::from_env(Env::default().filter_or("LOG_LEVEL", default_level))
        .format_timestamp_millis()
        .init();
}
