//! Raw upstream record → canonical [`MediaItem`].
//!
//! Field anomalies fall back to defaults instead of failing: a missing title
//! becomes `"Untitled"`, a non-numeric rating is dropped, and genre ids the
//! directory does not know are skipped. Only a record without an id is
//! rejected.

use std::collections::HashSet;
use std::sync::Arc;

use cinetrack_core::{MediaItem, MediaKind};
use tracing::warn;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::genres::{GenreDirectory, GenreMap};
use crate::{CatalogError, KindedRecord, RawRecord};

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const POSTER_SIZE: &str = "w500";
const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone)]
pub struct PosterConfig {
    pub base_url: String,
    pub size: String,
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            base_url: IMAGE_BASE.to_string(),
            size: POSTER_SIZE.to_string(),
        }
    }
}

impl PosterConfig {
    pub fn url_for(&self, path: Option<&str>) -> String {
        match path.filter(|p| !p.is_empty()) {
            Some(p) => format!("{}/{}{p}", self.base_url, self.size),
            None => String::new(),
        }
    }
}

pub struct MediaNormalizer {
    directory: Arc<GenreDirectory>,
    posters: PosterConfig,
}

impl MediaNormalizer {
    pub fn new(directory: Arc<GenreDirectory>, posters: PosterConfig) -> Self {
        Self { directory, posters }
    }

    pub fn directory(&self) -> &Arc<GenreDirectory> {
        &self.directory
    }

    /// Normalize one record, populating the kind's genre directory if needed.
    pub async fn normalize(
        &self,
        raw: &RawRecord,
        kind: Option<MediaKind>,
    ) -> Result<MediaItem, CatalogError> {
        let kind = resolve_kind(raw, kind);
        let genres = self.directory.resolve(kind).await?;
        normalize_with(raw, kind, &genres, &self.posters)
    }

    /// Normalize a single-kind page. Records without an id are skipped.
    pub async fn normalize_page(
        &self,
        records: &[RawRecord],
        kind: MediaKind,
    ) -> Result<Vec<MediaItem>, CatalogError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let genres = self.directory.resolve(kind).await?;
        Ok(records
            .iter()
            .filter_map(|raw| self.lenient(raw, kind, &genres))
            .collect())
    }

    /// Normalize records tagged with their kinds, resolving every needed
    /// directory up front (concurrently when both kinds appear).
    pub async fn normalize_kinded(
        &self,
        records: &[KindedRecord],
    ) -> Result<Vec<MediaItem>, CatalogError> {
        let needs = |kind: MediaKind| records.iter().any(|r| r.kind == kind);
        let (movies, series) = futures::try_join!(
            self.resolve_if(needs(MediaKind::Movie), MediaKind::Movie),
            self.resolve_if(needs(MediaKind::Series), MediaKind::Series)
        )?;

        Ok(records
            .iter()
            .filter_map(|r| {
                let genres = match r.kind {
                    MediaKind::Movie => movies.as_deref(),
                    MediaKind::Series => series.as_deref(),
                }?;
                self.lenient(&r.record, r.kind, genres)
            })
            .collect())
    }

    async fn resolve_if(
        &self,
        needed: bool,
        kind: MediaKind,
    ) -> Result<Option<Arc<GenreMap>>, CatalogError> {
        if needed {
            self.directory.resolve(kind).await.map(Some)
        } else {
            Ok(None)
        }
    }

    fn lenient(&self, raw: &RawRecord, kind: MediaKind, genres: &GenreMap) -> Option<MediaItem> {
        match normalize_with(raw, kind, genres, &self.posters) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(kind = %kind, error = %err, "skipping upstream record");
                None
            }
        }
    }
}

/// Explicit kind, else the record's discriminator, else a guess from which
/// title field is present. The guess is a heuristic: a record carrying both
/// `title` and `name` is taken to be a movie.
pub fn resolve_kind(raw: &RawRecord, explicit: Option<MediaKind>) -> MediaKind {
    if let Some(kind) = explicit {
        return kind;
    }
    if let Some(kind) = raw.media_type.as_deref().and_then(MediaKind::parse) {
        return kind;
    }
    let has = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.is_empty());
    if !has(&raw.title) && has(&raw.name) {
        MediaKind::Series
    } else {
        MediaKind::Movie
    }
}

pub fn normalize_with(
    raw: &RawRecord,
    kind: MediaKind,
    genres: &GenreMap,
    posters: &PosterConfig,
) -> Result<MediaItem, CatalogError> {
    let id = raw.id.ok_or_else(|| {
        CatalogError::MalformedRecord(format!(
            "{kind} record without id (title: {:?})",
            raw.display_title()
        ))
    })?;

    let mut seen = HashSet::new();
    let genre_names = raw
        .genre_id_list()
        .into_iter()
        .filter(|gid| seen.insert(*gid))
        .filter_map(|gid| genres.get(&gid).cloned())
        .collect();

    Ok(MediaItem {
        id,
        kind,
        title: raw.display_title().unwrap_or(UNTITLED).to_string(),
        year: raw.year_for(kind),
        poster_url: posters.url_for(raw.poster_path.as_deref()),
        rating: raw.vote_average.as_ref().and_then(format_rating),
        genres: genre_names,
    })
}

/// One-decimal rating for numeric values only.
pub fn format_rating(value: &serde_json::Value) -> Option<String> {
    value.as_f64().map(|v| format!("{v:.1}"))
}

/// Accent- and case-insensitive sort key.
pub fn collation_key(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
