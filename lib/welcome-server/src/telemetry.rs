use tracing_subscriber::EnvFilter;

/// `RUST_LOG` takes precedence over the configured level
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
