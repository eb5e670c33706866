use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use cinetrack_browse::BrowseContext;
use tokio::sync::Mutex;
use tracing::info;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(900);

/// A browsing context registered under an opaque id.
pub struct BrowseSession {
    pub id: String,
    pub context: Arc<BrowseContext>,
    pub created_at: DateTime<Utc>,
    pub last_ping: Instant,
}

impl BrowseSession {
    pub fn ping(&mut self) {
        self.last_ping = Instant::now();
    }

    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_ping.elapsed() >= timeout
    }
}

/// Manages all open browsing sessions.
pub struct SessionManager {
    idle_timeout: Duration,
    sessions: Mutex<HashMap<String, BrowseSession>>,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Register a context. Returns the new session id and its creation time.
    pub async fn open(&self, context: Arc<BrowseContext>) -> (String, DateTime<Utc>) {
        let id = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let session = BrowseSession {
            id: id.clone(),
            context,
            created_at,
            last_ping: Instant::now(),
        };
        self.sessions.lock().await.insert(id.clone(), session);
        info!(session_id = %id, "browse session opened");
        (id, created_at)
    }

    /// Look up a session's context, marking it as active.
    pub async fn get(&self, id: &str) -> Option<Arc<BrowseContext>> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(id)?;
        session.ping();
        Some(session.context.clone())
    }

    pub async fn close(&self, id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "browse session closed");
        }
        removed
    }

    /// Drop sessions untouched for longer than the idle timeout.
    pub async fn cleanup_idle(&self) -> usize {
        let timeout = self.idle_timeout;
        let mut sessions = self.sessions.lock().await;
        let idle_ids: Vec<String> = sessions
            .values()
            .filter(|s| s.is_idle(timeout))
            .map(|s| s.id.clone())
            .collect();

        for id in &idle_ids {
            if let Some(session) = sessions.remove(id) {
                info!(
                    session_id = %id,
                    opened = %session.created_at.to_rfc3339(),
                    "evicted idle browse session"
                );
            }
        }
        idle_ids.len()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use cinetrack_browse::{BrowseConfig, Catalog, FeedScope};
    use cinetrack_core::MediaKind;
    use cinetrack_metadata::{
        CatalogError, CatalogSource, DiscoverParams, GenreEntry, KindedRecord, RawRecord,
    };

    use super::*;

    struct EmptySource;

    #[async_trait]
    impl CatalogSource for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        async fn fetch_popular_page(
            &self,
            _kind: MediaKind,
            _page: u32,
        ) -> Result<Vec<RawRecord>, CatalogError> {
            Ok(vec![])
        }

        async fn fetch_genre_list(&self, _kind: MediaKind) -> Result<Vec<GenreEntry>, CatalogError> {
            Ok(vec![])
        }

        async fn fetch_discover(
            &self,
            _kind: MediaKind,
            _params: &DiscoverParams,
        ) -> Result<Vec<RawRecord>, CatalogError> {
            Ok(vec![])
        }

        async fn fetch_multi_search(&self, _term: &str) -> Result<Vec<KindedRecord>, CatalogError> {
            Ok(vec![])
        }
    }

    fn context() -> Arc<BrowseContext> {
        let catalog = Arc::new(Catalog::new(Arc::new(EmptySource), BrowseConfig::default()));
        Arc::new(BrowseContext::new(
            catalog,
            FeedScope::Popular {
                kind: MediaKind::Movie,
            },
        ))
    }

    #[tokio::test]
    async fn open_get_close() {
        let manager = SessionManager::default();
        let (id, _) = manager.open(context()).await;

        assert!(manager.get(&id).await.is_some());
        assert_eq!(manager.active_count().await, 1);
        assert!(manager.close(&id).await);
        assert!(!manager.close(&id).await);
        assert!(manager.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let manager = SessionManager::new(Duration::ZERO);
        manager.open(context()).await;
        manager.open(context()).await;

        assert_eq!(manager.cleanup_idle().await, 2);
        assert_eq!(manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn active_sessions_survive_cleanup() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let (id, _) = manager.open(context()).await;

        assert_eq!(manager.cleanup_idle().await, 0);
        assert!(manager.get(&id).await.is_some());
    }
}
