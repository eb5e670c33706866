//! Filtered and sorted projection of a buffer.

use std::cmp::Reverse;
use std::collections::HashSet;

use cinetrack_core::{MediaItem, MediaKind};
use cinetrack_metadata::normalize::collation_key;
use serde::{Deserialize, Serialize};

/// How multiple selected genres combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMode {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Keep buffered (upstream popularity) order.
    #[default]
    #[serde(alias = "relevance", alias = "pop-desc")]
    Default,
    RatingDesc,
    YearDesc,
    YearAsc,
    TitleAsc,
    TitleDesc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub sort: SortKey,
    /// Empty means every kind.
    #[serde(default)]
    pub kinds: Vec<MediaKind>,
}

impl FilterState {
    pub fn with_genres<I, S>(genres: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            genres: genres.into_iter().map(Into::into).collect(),
            mode,
            ..Default::default()
        }
    }

    pub fn sorted(sort: SortKey) -> Self {
        Self {
            sort,
            ..Default::default()
        }
    }

    /// Selected genre names in comparison form, deduplicated, blanks dropped.
    pub fn selected_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.genres
            .iter()
            .map(|g| genre_key(g))
            .filter(|g| !g.is_empty() && seen.insert(g.clone()))
            .collect()
    }
}

fn genre_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Derive the view for `items` under `filter`. Never touches `items`.
pub fn build(items: &[MediaItem], filter: &FilterState) -> Vec<MediaItem> {
    let selected = filter.selected_keys();
    let mut view: Vec<MediaItem> = items
        .iter()
        .filter(|item| filter.kinds.is_empty() || filter.kinds.contains(&item.kind))
        .filter(|item| matches_genres(&item.genres, &selected, filter.mode))
        .cloned()
        .collect();
    sort_view(&mut view, filter.sort);
    view
}

/// `selected` must already be in comparison form (see [`FilterState::selected_keys`]).
pub fn matches_genres(item_genres: &[String], selected: &[String], mode: MatchMode) -> bool {
    if selected.is_empty() {
        return true;
    }
    let have: HashSet<String> = item_genres.iter().map(|g| genre_key(g)).collect();
    match mode {
        MatchMode::And => selected.iter().all(|s| have.contains(s)),
        MatchMode::Or => selected.iter().any(|s| have.contains(s)),
    }
}

/// Stable in-place sort; ties keep their buffered order.
pub fn sort_view(view: &mut [MediaItem], sort: SortKey) {
    match sort {
        SortKey::Default => {}
        SortKey::RatingDesc => {
            view.sort_by(|a, b| b.rating_value().total_cmp(&a.rating_value()))
        }
        SortKey::YearDesc => view.sort_by_key(|item| Reverse(item.year_value())),
        SortKey::YearAsc => view.sort_by_key(|item| item.year_value()),
        SortKey::TitleAsc => view.sort_by_cached_key(|item| collation_key(&item.title)),
        SortKey::TitleDesc => {
            view.sort_by_cached_key(|item| Reverse(collation_key(&item.title)))
        }
    }
}

/// Distinct genre names present in `items`, in collation order.
pub fn genre_facets(items: &[MediaItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names: Vec<String> = items
        .iter()
        .flat_map(|item| item.genres.iter())
        .filter(|g| seen.insert(genre_key(g)))
        .cloned()
        .collect();
    names.sort_by_cached_key(|n| collation_key(n));
    names
}
