//! Process-lifetime genre directory, populated once per kind.
//!
//! Concurrent first callers for a kind share one in-flight upstream fetch.
//! A failed fetch is handed to every caller that waited on it and then
//! forgotten, so the next caller starts a fresh attempt. Successful entries
//! are never invalidated.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cinetrack_core::MediaKind;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::normalize::collation_key;
use crate::provider::CatalogSource;
use crate::CatalogError;

/// Genre id to display name, ordered by id.
pub type GenreMap = BTreeMap<u32, String>;

type PendingMap = Shared<BoxFuture<'static, Result<Arc<GenreMap>, CatalogError>>>;

enum Slot {
    Ready(Arc<GenreMap>),
    Pending { attempt: u64, fetch: PendingMap },
}

pub struct GenreDirectory {
    source: Arc<dyn CatalogSource>,
    slots: Mutex<HashMap<MediaKind, Slot>>,
    attempts: std::sync::atomic::AtomicU64,
}

impl GenreDirectory {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
            attempts: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Full id→name mapping for a kind, fetching it on first use.
    pub async fn resolve(&self, kind: MediaKind) -> Result<Arc<GenreMap>, CatalogError> {
        let (attempt, fetch) = {
            let mut slots = self.slots.lock().await;
            match slots.get(&kind) {
                Some(Slot::Ready(map)) => return Ok(map.clone()),
                Some(Slot::Pending { attempt, fetch }) => {
                    debug!(kind = %kind, attempt, "joining in-flight genre fetch");
                    (*attempt, fetch.clone())
                }
                None => {
                    let attempt = self
                        .attempts
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    let fetch = populate(self.source.clone(), kind).boxed().shared();
                    slots.insert(
                        kind,
                        Slot::Pending {
                            attempt,
                            fetch: fetch.clone(),
                        },
                    );
                    (attempt, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut slots = self.slots.lock().await;
        let still_ours = matches!(
            slots.get(&kind),
            Some(Slot::Pending { attempt: current, .. }) if *current == attempt
        );
        if still_ours {
            match &result {
                Ok(map) => {
                    slots.insert(kind, Slot::Ready(map.clone()));
                }
                Err(err) => {
                    warn!(kind = %kind, error = %err, "genre directory population failed");
                    slots.remove(&kind);
                }
            }
        }
        result
    }

    /// Resolve both kinds concurrently.
    pub async fn prime(&self) -> Result<(), CatalogError> {
        futures::try_join!(
            self.resolve(MediaKind::Movie),
            self.resolve(MediaKind::Series)
        )?;
        Ok(())
    }

    /// Display names for a kind in collation order.
    pub async fn names(&self, kind: MediaKind) -> Result<Vec<String>, CatalogError> {
        let map = self.resolve(kind).await?;
        let mut names: Vec<String> = map.values().cloned().collect();
        names.sort_by_cached_key(|n| collation_key(n));
        Ok(names)
    }

    /// Already-populated mapping, without triggering a fetch.
    pub async fn cached(&self, kind: MediaKind) -> Option<Arc<GenreMap>> {
        match self.slots.lock().await.get(&kind) {
            Some(Slot::Ready(map)) => Some(map.clone()),
            _ => None,
        }
    }
}

async fn populate(
    source: Arc<dyn CatalogSource>,
    kind: MediaKind,
) -> Result<Arc<GenreMap>, CatalogError> {
    let entries = source
        .fetch_genre_list(kind)
        .await
        .map_err(|e| CatalogError::DirectoryUnavailable {
            kind,
            reason: e.to_string(),
        })?;
    let map: GenreMap = entries.into_iter().map(|g| (g.id, g.name)).collect();
    info!(kind = %kind, genres = map.len(), "genre directory populated");
    Ok(Arc::new(map))
}
