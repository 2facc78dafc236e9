use std::sync::Arc;

use roster_engine::ProjectService;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub projects: Arc<ProjectService>,
}
