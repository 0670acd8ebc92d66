//! Composition root: builds every collaborator once and wires the services.

use std::sync::Arc;

use tracing::info;

use crate::adapter::outbound::memory::{ChannelRepairQueue, MemoryCache};
use crate::adapter::outbound::sqlite::database::connection::{
    create_pool_with, run_migrations, DbPool,
};
use crate::adapter::outbound::sqlite::{SqliteDatabase, SqliteUserDirectory};
use crate::application::cache::{MembershipCache, RelationshipCache};
use crate::application::graph::SocialGraph;
use crate::application::repair::{RepairStats, RepairWorker, RepairWorkerHandle};
use crate::error::Result;
use crate::infrastructure::config::service::DatabaseConfig;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::cache::KeyValueCache;

/// Open the connection pool and bring the schema up to date.
pub fn open_database(config: &DatabaseConfig) -> Result<DbPool> {
    let pool = create_pool_with(&config.path, config.pool_options())?;
    run_migrations(&pool)?;
    info!(path = %config.path, pool_size = config.pool_size, "Database ready");
    Ok(pool)
}

/// The running service graph plus its background repair worker.
pub struct Services {
    pub graph: Arc<SocialGraph<SqliteDatabase>>,
    repair: RepairWorkerHandle,
}

impl Services {
    /// Stop the repair worker once queued jobs are drained.
    pub async fn shutdown(self) -> Result<RepairStats> {
        let Self { graph, repair } = self;
        // The graph owns the queue's sender side.
        drop(graph);
        repair.shutdown().await
    }
}

/// Wire the services over `pool`. Must run inside a Tokio runtime because
/// the repair worker is spawned here.
pub fn build_services(config: &Config, pool: DbPool) -> Services {
    let settings = config.graph_settings();
    let db = Arc::new(SqliteDatabase::new(pool.clone()));
    let cache: Arc<dyn KeyValueCache> = Arc::new(MemoryCache::new());
    let (queue, receiver) = ChannelRepairQueue::new(config.repair.queue_capacity);

    let repair = RepairWorker::new(
        db.clone(),
        RelationshipCache::new(cache.clone(), settings.cache_op_timeout),
        MembershipCache::new(cache.clone(), settings.cache_op_timeout),
        config.repair.max_attempts,
        config.repair.backoff(),
    )
    .spawn(receiver);

    let graph = SocialGraph::new(
        db,
        cache,
        Arc::new(queue),
        Arc::new(SqliteUserDirectory::new(pool)),
        settings,
    );
    info!(
        max_friends = settings.max_friends,
        default_max_members = settings.default_max_members,
        "Social graph services ready"
    );

    Services {
        graph: Arc::new(graph),
        repair,
    }
}

/// Run until ctrl-c, then drain the repair queue.
pub async fn serve(config: Config) -> Result<()> {
    let pool = open_database(&config.database)?;
    let services = build_services(&config, pool);
    info!("rapport serving");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    let stats = services.shutdown().await?;
    info!(
        completed = stats.completed,
        abandoned = stats.abandoned,
        "rapport stopped"
    );
    Ok(())
}
