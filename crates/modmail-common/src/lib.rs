//! # modmail-common
//!
//! Shared utilities: environment-based configuration and tracing setup.

pub mod config;
pub mod telemetry;

pub use config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, Environment, PlatformConfig, RedisConfig,
    SchedulerConfig, SnowflakeConfig,
};
pub use telemetry::{init_tracing, try_init_tracing, TracingConfig};
