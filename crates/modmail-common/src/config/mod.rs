//! Configuration loading

mod app_config;

pub use app_config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, Environment, PlatformConfig, RedisConfig,
    SchedulerConfig, SnowflakeConfig,
};
