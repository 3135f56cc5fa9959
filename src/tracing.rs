use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, prelude::*};

use crate::config::Config;

/// Append log lines (timestamp, level, message) to the configured log file.
/// `RUST_LOG` can override the default `info` level.
pub fn init_tracing(config: &Config) {
    let mut layers = Vec::new();

    layers.push(
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy()
            .boxed(),
    );

    let file_appender = tracing_appender::rolling::never(&config.logging.dir, &config.logging.file);

    layers.push(
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(file_appender)
            .boxed(),
    );

    tracing_subscriber::registry().with(layers).init();
}
