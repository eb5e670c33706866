#![allow(clippy::type_complexity)]
pub mod genres;
pub mod guard;
pub mod normalize;
pub mod provider;
pub mod record;
pub mod tmdb;

use std::time::Duration;

use cinetrack_core::MediaKind;
use thiserror::Error;

pub use genres::{GenreDirectory, GenreMap};
pub use normalize::{MediaNormalizer, PosterConfig};
pub use provider::CatalogSource;
pub use record::{DiscoverParams, GenreEntry, KindedRecord, RawGenre, RawRecord};

/// Failures surfaced by the catalog pipeline.
///
/// `Clone` so a single shared directory fetch can hand its error to every
/// caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("genre directory unavailable for {kind}: {reason}")]
    DirectoryUnavailable { kind: MediaKind, reason: String },
    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),
    #[error("superseded by a newer request")]
    Superseded,
}
