//! Modmail bot entry point
//!
//! Run with:
//! ```bash
//! cargo run -p modmail-bot
//! ```
//!
//! Loads configuration from environment variables, connects the stores,
//! builds the service context and keeps the inactivity scheduler running
//! until ctrl-c. The realtime event feed plugs into `EventRouter` from the
//! platform socket layer.

use std::path::Path;
use std::sync::Arc;

use modmail_cache::{ConversationCacheStore, GuildConfigCacheStore, RedisPool, RedisPoolConfig, SchedulerLease};
use modmail_common::{try_init_tracing, AppConfig, TracingConfig};
use modmail_core::SnowflakeGenerator;
use modmail_db::{create_pool, run_migrations, DatabaseConfig, PgBanRepository, PgConversationRepository, PgGuildConfigRepository};
use modmail_gateway::RestGateway;
use modmail_service::{InactivityScheduler, ServiceContextBuilder};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Modmail bot failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let tracing_config = if config.app.env.is_production() {
        TracingConfig::production()
    } else {
        TracingConfig::development()
    };
    if let Err(e) = try_init_tracing(tracing_config) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(env = ?config.app.env, "Starting modmail bot");

    // PostgreSQL
    let db_config = DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..DatabaseConfig::default()
    };
    let pool = create_pool(&db_config).await?;

    let migrations_dir = std::env::var("MIGRATIONS_DIR")
        .unwrap_or_else(|_| "crates/modmail-db/migrations".to_string());
    run_migrations(&pool, Path::new(&migrations_dir)).await?;

    // Redis
    let redis_pool = RedisPool::new(RedisPoolConfig::from(&config.redis))?;

    // Platform adapter
    let gateway = Arc::new(RestGateway::new(&config.platform)?);

    // Service context
    let ctx = ServiceContextBuilder::new()
        .conversation_repo(Arc::new(PgConversationRepository::new(pool.clone())))
        .guild_config_repo(Arc::new(PgGuildConfigRepository::new(pool.clone())))
        .ban_repo(Arc::new(PgBanRepository::new(pool)))
        .gateway(gateway)
        .conversation_cache(ConversationCacheStore::new(redis_pool.clone()))
        .guild_config_cache(GuildConfigCacheStore::new(redis_pool.clone()))
        .snowflake_generator(Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id)))
        .build()?;

    // Scheduler with its single-owner lease
    let node_id = format!("modmail-{}-{}", config.snowflake.worker_id, std::process::id());
    let lease = SchedulerLease::new(redis_pool, node_id);
    let scheduler = Arc::new(InactivityScheduler::new(
        ctx,
        config.scheduler.clone(),
        Some(lease),
    ));

    let runner = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run().await })
    };

    info!("Modmail bot running; press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    runner.abort();
    scheduler.shutdown().await;
    Ok(())
}
