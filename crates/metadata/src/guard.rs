//! Per-call timeout with a single retry around any [`CatalogSource`].

use std::future::Future;
use std::time::Duration;

use cinetrack_core::MediaKind;
use tracing::warn;

use crate::provider::CatalogSource;
use crate::{CatalogError, DiscoverParams, GenreEntry, KindedRecord, RawRecord};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Only a timed-out attempt is retried; an upstream error returns at once.
const MAX_ATTEMPTS: u32 = 2;

pub struct GuardedSource<S> {
    inner: S,
    timeout: Duration,
}

impl<S: CatalogSource> GuardedSource<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn guarded<T, F, Fut>(&self, op: &'static str, call: F) -> Result<T, CatalogError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, CatalogError>> + Send,
        T: Send,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => return result,
                Err(_) => warn!(
                    source = self.inner.name(),
                    op,
                    attempt,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "upstream call timed out"
                ),
            }
        }
        Err(CatalogError::Timeout(self.timeout))
    }
}

#[async_trait::async_trait]
impl<S: CatalogSource> CatalogSource for GuardedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_popular_page(
        &self,
        kind: MediaKind,
        page: u32,
    ) -> Result<Vec<RawRecord>, CatalogError> {
        self.guarded("popular", || self.inner.fetch_popular_page(kind, page))
            .await
    }

    async fn fetch_genre_list(&self, kind: MediaKind) -> Result<Vec<GenreEntry>, CatalogError> {
        self.guarded("genre_list", || self.inner.fetch_genre_list(kind))
            .await
    }

    async fn fetch_discover(
        &self,
        kind: MediaKind,
        params: &DiscoverParams,
    ) -> Result<Vec<RawRecord>, CatalogError> {
        self.guarded("discover", || self.inner.fetch_discover(kind, params))
            .await
    }

    async fn fetch_multi_search(&self, term: &str) -> Result<Vec<KindedRecord>, CatalogError> {
        self.guarded("multi_search", || self.inner.fetch_multi_search(term))
            .await
    }
}
