pub mod app;
pub mod domain;
pub mod infra;

use tracing_subscriber::EnvFilter;

/// Install the stderr log subscriber, honouring `RUST_LOG` before `default_filter`.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
