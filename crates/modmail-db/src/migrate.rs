//! Runtime migration runner
//!
//! The SQLx macros feature is disabled workspace-wide, so migrations are
//! loaded from disk at startup instead of being embedded at compile time.

use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::path::Path;
use tracing::info;

/// Apply pending migrations from the given directory.
pub async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<(), sqlx::Error> {
    let migrator = Migrator::new(dir).await?;
    migrator.run(pool).await?;
    info!(dir = %dir.display(), "Database migrations applied");
    Ok(())
}
