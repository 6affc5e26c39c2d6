mod tests;
mod logging_config;
mod transfer_config;
pub mod config;

pub use config::{Config, ConfigError};
pub use logging_config::LoggingConfig;
pub use transfer_config::{CacheConfig, DestinationConfig, SourceConfig};
