use std::sync::Arc;

use debridfs_core::{
    Config, GarbageCollector, Reconciler, SanitizedConfig, SqliteIndex, StreamResolver,
};

/// Shared application state
pub struct AppState {
    config: Config,
    index: Arc<SqliteIndex>,
    reconciler: Arc<Reconciler>,
    resolver: Arc<StreamResolver>,
    gc: Arc<GarbageCollector>,
}

impl AppState {
    pub fn new(
        config: Config,
        index: Arc<SqliteIndex>,
        reconciler: Arc<Reconciler>,
        resolver: Arc<StreamResolver>,
        gc: Arc<GarbageCollector>,
    ) -> Self {
        Self {
            config,
            index,
            reconciler,
            resolver,
            gc,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn index(&self) -> &SqliteIndex {
        &self.index
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn resolver(&self) -> &StreamResolver {
        &self.resolver
    }

    pub fn gc(&self) -> &GarbageCollector {
        &self.gc
    }
}
