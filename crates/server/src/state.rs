use std::sync::Arc;

use cinetrack_browse::Catalog;

use crate::sessions::SessionManager;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(catalog: Arc<Catalog>, sessions: SessionManager) -> Self {
        Self {
            catalog,
            sessions: Arc::new(sessions),
        }
    }
}
