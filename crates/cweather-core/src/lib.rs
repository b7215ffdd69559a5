pub mod config;
pub mod error;

pub use config::{
    CacheConfig, Config, RequestorConfig, ServerConfig, TransportConfig, ValidationResult,
    WeatherConfig,
};
pub use error::{AppError, ConfigError, TransportError};

use anyhow::Result;

/// Initialize logging for a cweather binary.
///
/// Logs go to stderr so that stdout stays free for command output.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!("cweather core initialized");
    Ok(())
}
