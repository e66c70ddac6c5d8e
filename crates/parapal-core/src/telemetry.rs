//! Tracing setup shared by `parapal` and `parapald`.
//!
//! Filter precedence: `PARAPAL_LOG`, then `RUST_LOG`, then the level passed
//! by the binary. Only the first [`init_tracing`] call in a process installs
//! a subscriber.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "PARAPAL_LOG";

/// Install the global subscriber. Logs always go to stderr; stdout is
/// reserved for command output.
pub fn init_tracing(json: bool, level: Level) {
    let registry = tracing_subscriber::registry().with(build_filter(level));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let _ = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
}

fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}
