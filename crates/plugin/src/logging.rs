//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber
///
/// `RUST_LOG` wins over the config's debug flag. A subscriber left over from
/// an earlier load in the same process is kept.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
