// Tracing subscriber setup shared by the Lambda bootstrap and the replay CLI

use crate::{LogConfig, LogFormat};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init_tracing(config: &LogConfig) {
    // RUST_LOG-style directives are accepted, e.g. "info,sqs2s3_writer=debug"
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let _ = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
    };
}
