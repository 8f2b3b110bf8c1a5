use std::sync::Arc;

use crate::config::ServerConfig;

/// State handed to every handler through `State<AppState>`.
///
/// Cloning is cheap: the pool is internally reference-counted and the
/// config sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: elms_db::DbPool,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pool: elms_db::DbPool, config: ServerConfig) -> Self {
        AppState {
            pool,
            config: Arc::new(config),
        }
    }
}
