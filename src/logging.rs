//! Log output for the command line tools.

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// The filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "info,chama_rs=debug";

/// Install a pretty logger filtered by the `RUST_LOG` environment
/// variable.
///
/// Logs go to stderr so that tools can print data to stdout.
pub fn setup_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let stderr_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_log).init();
}
