//! Subscriber setup for hosts that want the lifecycle's logs on stderr.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber writing to standard error, filtered by
/// `RUST_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
   let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

   tracing_subscriber::fmt()
      .with_env_filter(filter)
      .with_writer(std::io::stderr)
      .try_init()
      .is_ok()
}
