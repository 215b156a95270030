use std::sync::Arc;

use crate::config::Config;
use crate::storage::Connector;

pub type SharedState = Arc<AppState>;

/// Holds no open store handle: each request opens its own through `store`.
pub struct AppState {
    pub config: Config,
    pub store: Connector,
}
