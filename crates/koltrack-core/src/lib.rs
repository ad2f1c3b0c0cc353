mod app_config;
mod config;
mod platform;
pub mod trend;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, ProxyConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use platform::{PlatformKind, ScrapeOutcome, ScrapeStatus};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("validation error: {0}")]
    Validation(String),
}
