use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT_LOGGING: Once = Once::new();

/// Install the global `tracing` subscriber. Safe to call more than once.
///
/// The filter comes from `RUST_LOG`, then `KLINIKA_LOG_LEVEL`, then `info`.
/// Output goes to stderr so the console prompt on stdout stays readable.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(std::env::var("KLINIKA_LOG_LEVEL").unwrap_or_else(|_| "info".into())))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);

        if tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .is_err()
        {
            eprintln!("[klinika][WARN] A tracing subscriber was already installed");
        }

        tracing::debug!("Structured logging initialized");
    });
}
