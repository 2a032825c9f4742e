//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::store::FullStore;
use crate::notify::{LogDispatcher, NotificationDispatcher};
use crate::registry::{CrudEngine, EntityRegistry};
use crate::scheduler::SchedulingService;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CrudEngine>,
    pub scheduler: Arc<SchedulingService>,
    pub store: Arc<dyn FullStore>,
}

impl AppState {
    /// Wire the default registry and log-based notifications over `store`.
    pub fn new(store: Arc<dyn FullStore>) -> Self {
        Self::with_parts(store, EntityRegistry::with_defaults(), Arc::new(LogDispatcher))
    }

    pub fn with_parts(
        store: Arc<dyn FullStore>,
        registry: EntityRegistry,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let engine = Arc::new(CrudEngine::new(registry, store.clone()));
        let scheduler = Arc::new(SchedulingService::new(store.clone(), notifier));
        Self {
            engine,
            scheduler,
            store,
        }
    }
}
