//! In-memory catalog source for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cinetrack_core::MediaKind;
use cinetrack_metadata::{
    CatalogError, CatalogSource, DiscoverParams, GenreEntry, KindedRecord, RawRecord,
};

use crate::{BrowseConfig, Catalog};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Popular(MediaKind, u32),
    Genres(MediaKind),
    Discover(MediaKind, DiscoverParams),
    Search(String),
}

#[derive(Default)]
pub(crate) struct FakeSource {
    popular: HashMap<MediaKind, Vec<Vec<RawRecord>>>,
    genres: HashMap<MediaKind, Vec<GenreEntry>>,
    discover: HashMap<MediaKind, Vec<RawRecord>>,
    search: Vec<KindedRecord>,
    failing_page: Option<u32>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_popular(mut self, kind: MediaKind, pages: Vec<Vec<RawRecord>>) -> Self {
        self.popular.insert(kind, pages);
        self
    }

    pub(crate) fn with_genres(mut self, kind: MediaKind, genres: &[(u32, &str)]) -> Self {
        self.genres.insert(
            kind,
            genres
                .iter()
                .map(|(id, name)| GenreEntry {
                    id: *id,
                    name: name.to_string(),
                })
                .collect(),
        );
        self
    }

    pub(crate) fn with_discover(mut self, kind: MediaKind, records: Vec<RawRecord>) -> Self {
        self.discover.insert(kind, records);
        self
    }

    pub(crate) fn with_search(mut self, records: Vec<KindedRecord>) -> Self {
        self.search = records;
        self
    }

    pub(crate) fn failing_page(mut self, page: u32) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn popular_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Popular(..)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl CatalogSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_popular_page(
        &self,
        kind: MediaKind,
        page: u32,
    ) -> Result<Vec<RawRecord>, CatalogError> {
        self.record(Call::Popular(kind, page));
        self.pause().await;
        if self.failing_page == Some(page) {
            return Err(CatalogError::UpstreamUnavailable(format!(
                "page {page} unavailable"
            )));
        }
        Ok(self
            .popular
            .get(&kind)
            .and_then(|pages| pages.get(page as usize - 1))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_genre_list(&self, kind: MediaKind) -> Result<Vec<GenreEntry>, CatalogError> {
        self.record(Call::Genres(kind));
        Ok(self.genres.get(&kind).cloned().unwrap_or_default())
    }

    async fn fetch_discover(
        &self,
        kind: MediaKind,
        params: &DiscoverParams,
    ) -> Result<Vec<RawRecord>, CatalogError> {
        self.record(Call::Discover(kind, params.clone()));
        if params.page > 1 {
            return Ok(vec![]);
        }
        Ok(self.discover.get(&kind).cloned().unwrap_or_default())
    }

    async fn fetch_multi_search(&self, term: &str) -> Result<Vec<KindedRecord>, CatalogError> {
        self.record(Call::Search(term.to_string()));
        Ok(self.search.clone())
    }
}

pub(crate) fn catalog(source: &Arc<FakeSource>) -> Arc<Catalog> {
    Arc::new(Catalog::new(source.clone(), BrowseConfig::default()))
}

pub(crate) fn movie(id: u64, title: &str, date: &str, rating: f64, genre_ids: &[u32]) -> RawRecord {
    RawRecord {
        id: Some(id),
        title: Some(title.to_string()),
        release_date: Some(date.to_string()),
        vote_average: Some(serde_json::json!(rating)),
        genre_ids: Some(genre_ids.to_vec()),
        ..Default::default()
    }
}

pub(crate) fn series(id: u64, name: &str, date: &str, genre_ids: &[u32]) -> RawRecord {
    RawRecord {
        id: Some(id),
        name: Some(name.to_string()),
        first_air_date: Some(date.to_string()),
        genre_ids: Some(genre_ids.to_vec()),
        ..Default::default()
    }
}

/// `count` numbered movies starting at `first_id`.
pub(crate) fn movie_page(first_id: u64, count: usize) -> Vec<RawRecord> {
    (0..count as u64)
        .map(|n| {
            let id = first_id + n;
            movie(id, &format!("Movie {id}"), "2020-01-01", 6.0, &[28])
        })
        .collect()
}
