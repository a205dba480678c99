//! Logging setup shared by the binaries.
//!
//! `RUST_LOG` wins over the configured level, so one run can be turned up
//! without editing the config file.

use crate::config::LogConfig;
use tracing_subscriber::EnvFilter;

pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // a second init (tests, embedding) keeps the first subscriber
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
