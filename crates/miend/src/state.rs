use std::sync::Arc;

use crate::config::Config;
use crate::engine::EngineHandle;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub config: Arc<Config>,
}
