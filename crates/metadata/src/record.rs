//! Upstream record shapes at the ingestion boundary.

use cinetrack_core::MediaKind;
use serde::{Deserialize, Serialize};

/// One record as the upstream returns it, before normalization.
///
/// Movies carry `title`/`release_date`, series carry `name`/`first_air_date`.
/// Genres arrive either as `genre_ids` (list endpoints) or as nested
/// `genres` objects (detail endpoints).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Kept loose: a non-numeric value means "no rating", not a parse failure.
    #[serde(default)]
    pub vote_average: Option<serde_json::Value>,
    #[serde(default)]
    pub genre_ids: Option<Vec<u32>>,
    #[serde(default)]
    pub genres: Option<Vec<RawGenre>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGenre {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawRecord {
    /// Primary title, then the series name field.
    pub fn display_title(&self) -> Option<&str> {
        non_empty(self.title.as_deref()).or_else(|| non_empty(self.name.as_deref()))
    }

    /// Date field for the given kind, falling back to the other kind's field.
    pub fn date_for(&self, kind: MediaKind) -> Option<&str> {
        let (primary, secondary) = match kind {
            MediaKind::Movie => (&self.release_date, &self.first_air_date),
            MediaKind::Series => (&self.first_air_date, &self.release_date),
        };
        non_empty(primary.as_deref()).or_else(|| non_empty(secondary.as_deref()))
    }

    /// Four-character year prefix of the kind's date field, or empty.
    pub fn year_for(&self, kind: MediaKind) -> String {
        self.date_for(kind)
            .map(|d| d.chars().take(4).collect())
            .unwrap_or_default()
    }

    /// Genre ids in source order: the explicit list wins over nested objects.
    pub fn genre_id_list(&self) -> Vec<u32> {
        if let Some(ids) = &self.genre_ids {
            return ids.clone();
        }
        self.genres
            .as_ref()
            .map(|gs| gs.iter().filter_map(|g| g.id).collect())
            .unwrap_or_default()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A raw record paired with the kind the upstream tagged it with.
#[derive(Debug, Clone, PartialEq)]
pub struct KindedRecord {
    pub kind: MediaKind,
    pub record: RawRecord,
}

impl KindedRecord {
    pub fn new(kind: MediaKind, record: RawRecord) -> Self {
        Self { kind, record }
    }
}

/// One `(id, name)` pair from a kind's genre list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreEntry {
    pub id: u32,
    pub name: String,
}

/// Constraints for a discovery query. Results are popularity ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverParams {
    #[serde(default)]
    pub year: Option<String>,
    /// Matched with OR semantics.
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

impl DiscoverParams {
    pub fn for_year(year: impl Into<String>) -> Self {
        Self {
            year: Some(year.into()),
            genre_ids: Vec::new(),
            page: 1,
        }
    }

    pub fn for_genres(genre_ids: Vec<u32>) -> Self {
        Self {
            year: None,
            genre_ids,
            page: 1,
        }
    }

    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}
