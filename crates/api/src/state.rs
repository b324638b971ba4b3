use std::sync::Arc;

use leasetrack_core::store::RecordStore;
use leasetrack_db::DbPool;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Storage every request reads and writes through.
    pub store: Arc<dyn RecordStore>,
    /// Database pool behind `store`, when it is PostgreSQL-backed.
    pub pool: Option<DbPool>,
    pub config: Arc<ServerConfig>,
}
