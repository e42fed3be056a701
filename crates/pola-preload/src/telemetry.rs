//! Opt-in diagnostics for the preloaded library.
//!
//! Nothing is installed unless `POLA_LOG` is set, so the target program's own
//! stderr and tracing setup are left alone by default.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding `EnvFilter` directives.
pub(crate) const LOG_VAR: &str = "POLA_LOG";

/// Install a stderr subscriber if [`LOG_VAR`] is set.
pub(crate) fn init() {
    let Some(directives) = std::env::var_os(LOG_VAR) else {
        return;
    };
    let filter = EnvFilter::builder().parse_lossy(directives.to_string_lossy());

    // Another subscriber may already be installed by the host program.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
