pub mod config;
pub mod error;

pub use config::{ApiConfig, Config, FiltersConfig, QueryConfig, ValidationResult};
pub use error::{AppError, ConfigError, FailureKind};

use anyhow::Result;

/// Initialize logging for the dashboard
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Meteodash core initialized");
    Ok(())
}
