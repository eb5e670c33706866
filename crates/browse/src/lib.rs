//! Incremental catalog views: a growing buffer of upstream pages, a filtered
//! and sorted projection of it, and fixed-size pages served from that
//! projection.

pub mod buffer;
pub mod context;
pub mod generation;
pub mod pager;
pub mod search;
pub mod view;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use cinetrack_metadata::{CatalogSource, GenreDirectory, MediaNormalizer, PosterConfig};

pub use buffer::{FeedScope, FetchBuffer};
pub use context::{BrowseContext, SearchResults};
pub use generation::{Generation, Ticket};
pub use pager::{Page, PageServer};
pub use search::{SearchAggregator, SearchOutcome, SearchStrategy};
pub use view::{FilterState, MatchMode, SortKey};

pub const PAGE_SIZE: usize = 15;
pub const SEARCH_RESULT_LIMIT: usize = 60;

#[derive(Debug, Clone)]
pub struct BrowseConfig {
    pub page_size: usize,
    pub search_limit: usize,
    pub posters: PosterConfig,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            search_limit: SEARCH_RESULT_LIMIT,
            posters: PosterConfig::default(),
        }
    }
}

/// Process-lifetime collaborators shared by every browsing context: the
/// upstream source, the genre directory and the normalizer built on it.
pub struct Catalog {
    source: Arc<dyn CatalogSource>,
    normalizer: MediaNormalizer,
    config: BrowseConfig,
}

impl Catalog {
    pub fn new(source: Arc<dyn CatalogSource>, config: BrowseConfig) -> Self {
        let directory = Arc::new(GenreDirectory::new(source.clone()));
        let normalizer = MediaNormalizer::new(directory, config.posters.clone());
        Self {
            source,
            normalizer,
            config,
        }
    }

    pub fn source(&self) -> &dyn CatalogSource {
        self.source.as_ref()
    }

    pub fn directory(&self) -> &GenreDirectory {
        self.normalizer.directory()
    }

    pub fn normalizer(&self) -> &MediaNormalizer {
        &self.normalizer
    }

    pub fn config(&self) -> &BrowseConfig {
        &self.config
    }

    pub fn search_aggregator(&self) -> SearchAggregator<'_> {
        SearchAggregator::new(self.source(), self.directory(), self.config.search_limit)
    }
}
