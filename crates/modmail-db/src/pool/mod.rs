//! Database connection pool

mod postgres;

pub use postgres::{create_pool, create_pool_from_env, DatabaseConfig};

/// Re-export of the SQLx PostgreSQL pool type
pub use sqlx::PgPool;
