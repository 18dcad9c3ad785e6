//! Log output for the `vaiae` binary.

use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directive for the chosen verbosity.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Install a stderr fmt subscriber at info level, or debug level when `debug` is set.
///
/// Stdout is left to command output. A second call is a no-op.
pub fn init_logging(debug: bool) {
    let filter = EnvFilter::new(default_directive(debug));
    let _ = Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .try_init();
}
