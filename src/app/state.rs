//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::MatchHandle;
use crate::session::ConnectionManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connections: Arc<ConnectionManager>,
    pub match_handle: MatchHandle,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        connections: Arc<ConnectionManager>,
        match_handle: MatchHandle,
    ) -> Self {
        Self {
            config,
            connections,
            match_handle,
        }
    }
}
