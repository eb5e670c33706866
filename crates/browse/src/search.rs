//! Strategy-chained search over both kinds.

use std::sync::LazyLock;

use cinetrack_core::MediaKind;
use cinetrack_metadata::{
    CatalogError, CatalogSource, DiscoverParams, GenreDirectory, GenreMap, KindedRecord, RawRecord,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{4}$").unwrap());

/// Which query produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Year,
    Genre,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub term: String,
    /// `None` when the term was blank and nothing was queried.
    pub strategy: Option<SearchStrategy>,
    /// Movies first, then series, capped at the configured limit.
    pub records: Vec<KindedRecord>,
}

pub struct SearchAggregator<'a> {
    source: &'a dyn CatalogSource,
    directory: &'a GenreDirectory,
    limit: usize,
}

impl<'a> SearchAggregator<'a> {
    pub fn new(source: &'a dyn CatalogSource, directory: &'a GenreDirectory, limit: usize) -> Self {
        Self {
            source,
            directory,
            limit,
        }
    }

    /// A four-digit term is a year and only the year query runs. Otherwise
    /// genre names are tried first, falling back to free text when no genre
    /// matches or the matching genres return nothing.
    pub async fn search(&self, term: &str) -> Result<SearchOutcome, CatalogError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(SearchOutcome {
                term: String::new(),
                strategy: None,
                records: Vec::new(),
            });
        }

        let (strategy, mut records) = if is_year(term) {
            (SearchStrategy::Year, self.by_year(term).await?)
        } else {
            let by_genre = self.by_genre(term).await?;
            if by_genre.is_empty() {
                (SearchStrategy::Text, self.by_text(term).await?)
            } else {
                (SearchStrategy::Genre, by_genre)
            }
        };

        let found = records.len();
        records.truncate(self.limit);
        info!(
            term,
            strategy = ?strategy,
            found,
            kept = records.len(),
            "search complete"
        );
        Ok(SearchOutcome {
            term: term.to_string(),
            strategy: Some(strategy),
            records,
        })
    }

    async fn by_year(&self, year: &str) -> Result<Vec<KindedRecord>, CatalogError> {
        let params = DiscoverParams::for_year(year);
        let (movies, series) = futures::try_join!(
            self.source.fetch_discover(MediaKind::Movie, &params),
            self.source.fetch_discover(MediaKind::Series, &params)
        )?;
        Ok(tag(movies, series))
    }

    async fn by_genre(&self, term: &str) -> Result<Vec<KindedRecord>, CatalogError> {
        let (movie_map, series_map) = futures::try_join!(
            self.directory.resolve(MediaKind::Movie),
            self.directory.resolve(MediaKind::Series)
        )?;
        let movie_ids = matching_genre_ids(term, &movie_map);
        let series_ids = matching_genre_ids(term, &series_map);
        if movie_ids.is_empty() && series_ids.is_empty() {
            debug!(term, "no genre name matches");
            return Ok(Vec::new());
        }

        let (movies, series) = futures::try_join!(
            self.discover_genres(MediaKind::Movie, movie_ids),
            self.discover_genres(MediaKind::Series, series_ids)
        )?;
        Ok(tag(movies, series))
    }

    async fn discover_genres(
        &self,
        kind: MediaKind,
        ids: Vec<u32>,
    ) -> Result<Vec<RawRecord>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.source
            .fetch_discover(kind, &DiscoverParams::for_genres(ids))
            .await
    }

    async fn by_text(&self, term: &str) -> Result<Vec<KindedRecord>, CatalogError> {
        let needle = term.to_lowercase();
        let records = self.source.fetch_multi_search(term).await?;
        Ok(records
            .into_iter()
            .filter(|r| {
                let title_hit = r
                    .record
                    .display_title()
                    .is_some_and(|t| t.to_lowercase().contains(&needle));
                title_hit || r.record.year_for(r.kind) == term
            })
            .collect())
    }
}

/// Exactly four ASCII digits.
pub fn is_year(term: &str) -> bool {
    YEAR_RE.is_match(term)
}

/// Ids whose name contains `term`, ignoring case.
pub fn matching_genre_ids(term: &str, genres: &GenreMap) -> Vec<u32> {
    let needle = term.to_lowercase();
    genres
        .iter()
        .filter(|(_, name)| name.to_lowercase().contains(&needle))
        .map(|(id, _)| *id)
        .collect()
}

fn tag(movies: Vec<RawRecord>, series: Vec<RawRecord>) -> Vec<KindedRecord> {
    movies
        .into_iter()
        .map(|r| KindedRecord::new(MediaKind::Movie, r))
        .chain(series.into_iter().map(|r| KindedRecord::new(MediaKind::Series, r)))
        .collect()
}
