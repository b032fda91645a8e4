// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Console logging for the binary.  `RUST_LOG` wins when it is set;
//! otherwise the number of `-v` flags picks the level.

use tracing_subscriber::EnvFilter;

/// The level selected by `verbosity` repeated `-v` flags.
pub fn level_for(verbosity: u64) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs a stderr subscriber.  Returns false if one was already
/// installed, which only happens when called twice.
pub fn init(verbosity: u64) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mandeltiles={}", level_for(verbosity))));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
