use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize a tracing subscriber with default configuration.
///
/// Prints formatted logs to stdout, honoring the `RUST_LOG`
/// environment variable and defaulting to "info".
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
