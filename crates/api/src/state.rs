use std::sync::Arc;

use chrono::TimeDelta;
use tasklane_core::clock::{Clock, WeightGenerator};
use tasklane_core::mutation::ItemService;
use tasklane_core::ports::Store;
use tasklane_core::undo::UndoEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState<S>>`.
///
/// Generic over the storage backend: the binary runs on Postgres, the
/// integration tests on the in-memory store. Cloning only bumps `Arc`s.
pub struct AppState<S: Store> {
    /// Storage backend (also used by the health probe).
    pub store: Arc<S>,
    /// Mutation facade.
    pub items: Arc<ItemService<S>>,
    /// Undo engine redeeming tokens.
    pub undo: Arc<UndoEngine<S>>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl<S: Store> AppState<S> {
    /// Wire the services over `store`, sharing one clock and weight generator.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: ServerConfig) -> Self {
        let undo = Arc::new(UndoEngine::with_ttl(
            Arc::clone(&store),
            Arc::clone(&clock),
            TimeDelta::seconds(config.undo_ttl_secs),
        ));
        let weights = Arc::new(WeightGenerator::new(Arc::clone(&clock)));
        let items = Arc::new(ItemService::new(
            Arc::clone(&store),
            undo.clone(),
            clock,
            weights,
        ));
        Self {
            store,
            items,
            undo,
            config: Arc::new(config),
        }
    }
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            items: Arc::clone(&self.items),
            undo: Arc::clone(&self.undo),
            config: Arc::clone(&self.config),
        }
    }
}
