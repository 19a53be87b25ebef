pub mod config;
pub mod error;

pub use config::{Config, DbConfig, MigrateConfig, ServerConfig, DEFAULT_LOCK_KEY};
pub use error::ConfigError;
