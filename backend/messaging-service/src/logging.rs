use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
