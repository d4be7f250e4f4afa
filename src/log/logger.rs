use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_logger(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // a second call (tests, embedding) keeps the first subscriber
    if tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init().is_ok() {
        debug!("logger initialized");
    }
}
