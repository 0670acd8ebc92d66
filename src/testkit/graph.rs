//! A fully wired [`SocialGraph`] over a temporary database.

use std::sync::Arc;

use crate::adapter::outbound::sqlite::{SqliteDatabase, SqliteUserDirectory};
use crate::application::graph::{GraphSettings, SocialGraph};

use super::cache::FlakyCache;
use super::config;
use super::db::TempDb;
use super::queue::RecordingQueue;

/// Graph plus handles on every collaborator for inspection and fault
/// injection.
pub struct TestGraph {
    pub db: TempDb,
    pub cache: Arc<FlakyCache>,
    pub queue: Arc<RecordingQueue>,
    pub graph: SocialGraph<SqliteDatabase>,
}

impl TestGraph {
    pub fn new() -> Self {
        Self::with_settings(config::graph_settings())
    }

    pub fn with_settings(settings: GraphSettings) -> Self {
        let db = TempDb::new();
        let cache = Arc::new(FlakyCache::new());
        let queue = Arc::new(RecordingQueue::new());
        let graph = SocialGraph::new(
            Arc::new(db.database()),
            cache.clone(),
            queue.clone(),
            Arc::new(SqliteUserDirectory::new(db.pool().clone())),
            settings,
        );
        Self {
            db,
            cache,
            queue,
            graph,
        }
    }

    /// A handle on the same database the graph uses.
    pub fn database(&self) -> SqliteDatabase {
        self.db.database()
    }
}

impl Default for TestGraph {
    fn default() -> Self {
        Self::new()
    }
}
