//! # modmail-db
//!
//! Database layer implementing the modmail repository traits with PostgreSQL
//! via SQLx (runtime queries, no macros).
//!
//! Conversations keep their embedded message log in a JSONB column so that
//! append/edit/delete and the retention cap are single atomic statements,
//! matching the document-store shape of the domain. The `user_id` primary key
//! is the serialization point for concurrent conversation creation: one
//! insert wins, the rest observe a conflict.

pub mod migrate;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use migrate::run_migrations;
pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use repositories::{PgBanRepository, PgConversationRepository, PgGuildConfigRepository};
