use cinetrack_core::MediaKind;

use crate::{CatalogError, DiscoverParams, GenreEntry, KindedRecord, RawRecord};

/// The upstream catalog: paginated popularity lists, discovery, genre lists
/// and multi-kind text search.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    fn name(&self) -> &str;

    /// One page (1-based) of the popularity list for a kind.
    /// An empty list means the upstream has no more pages.
    async fn fetch_popular_page(
        &self,
        kind: MediaKind,
        page: u32,
    ) -> Result<Vec<RawRecord>, CatalogError>;

    /// Full genre list for a kind.
    async fn fetch_genre_list(&self, kind: MediaKind) -> Result<Vec<GenreEntry>, CatalogError>;

    /// Popularity-ordered discovery query constrained by `params`.
    async fn fetch_discover(
        &self,
        kind: MediaKind,
        params: &DiscoverParams,
    ) -> Result<Vec<RawRecord>, CatalogError>;

    /// Free-text search across kinds. Records of kinds outside
    /// [`MediaKind`] are dropped by the implementation.
    async fn fetch_multi_search(&self, term: &str) -> Result<Vec<KindedRecord>, CatalogError>;
}
