//! One browsing session: a page server plus the generation counter that
//! lets a newer action cancel an older one.

use std::sync::Arc;

use cinetrack_metadata::CatalogError;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::buffer::{FeedScope, FetchBuffer};
use crate::generation::{Generation, Ticket};
use crate::pager::{Page, PageServer};
use crate::search::SearchStrategy;
use crate::view::{self, FilterState};
use crate::Catalog;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub term: String,
    pub strategy: Option<SearchStrategy>,
    pub page: Page,
}

/// Actions are serialized by the state lock. Each one bumps the generation
/// before waiting for the lock, so a queued action stales the running one
/// and the running one's in-flight fetch is discarded instead of committed.
pub struct BrowseContext {
    catalog: Arc<Catalog>,
    generation: Generation,
    server: Mutex<PageServer>,
}

impl BrowseContext {
    pub fn new(catalog: Arc<Catalog>, scope: FeedScope) -> Self {
        let page_size = catalog.config().page_size;
        Self {
            catalog,
            generation: Generation::new(),
            server: Mutex::new(PageServer::new(FetchBuffer::new(scope), page_size)),
        }
    }

    /// A context with no results yet, to be filled by [`Self::search`].
    pub fn for_search(catalog: Arc<Catalog>) -> Self {
        Self::new(catalog, FeedScope::Fixed)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub async fn scope(&self) -> FeedScope {
        self.server.lock().await.buffer().scope().clone()
    }

    pub async fn filter(&self) -> FilterState {
        self.server.lock().await.filter().clone()
    }

    pub async fn current_page(&self) -> u32 {
        self.server.lock().await.current_page()
    }

    /// Page-change.
    pub async fn get_page(&self, page: u32) -> Result<Page, CatalogError> {
        let ticket = self.generation.advance();
        let mut server = self.server.lock().await;
        check(&ticket)?;
        server.get_page(&self.catalog, page, &ticket).await
    }

    /// Filter-change or sort-change: replaces the whole filter state and
    /// serves page 1 of the rebuilt view. A failed change leaves the
    /// previous filter and page in place.
    pub async fn apply_filter(&self, filter: FilterState) -> Result<Page, CatalogError> {
        let ticket = self.generation.advance();
        let mut server = self.server.lock().await;
        check(&ticket)?;
        debug!(
            genres = ?filter.genres,
            mode = ?filter.mode,
            sort = ?filter.sort,
            "applying filter"
        );
        server.apply_filter(&self.catalog, filter, &ticket).await
    }

    /// Search-submit: replaces the buffer with the normalized results of
    /// `term`, keeping the current filter, and serves page 1.
    pub async fn search(&self, term: &str) -> Result<SearchResults, CatalogError> {
        let ticket = self.generation.advance();
        let outcome = self.catalog.search_aggregator().search(term).await?;
        let items = self
            .catalog
            .normalizer()
            .normalize_kinded(&outcome.records)
            .await?;

        let mut server = self.server.lock().await;
        check(&ticket)?;
        info!(term = %outcome.term, results = items.len(), "installing search results");
        let page = server
            .replace_buffer(&self.catalog, FetchBuffer::fixed(items), &ticket)
            .await?;
        Ok(SearchResults {
            term: outcome.term,
            strategy: outcome.strategy,
            page,
        })
    }

    /// Distinct genre names across everything buffered so far.
    pub async fn facets(&self) -> Vec<String> {
        let server = self.server.lock().await;
        view::genre_facets(server.buffer().items())
    }
}

fn check(ticket: &Ticket) -> Result<(), CatalogError> {
    if ticket.is_current() {
        Ok(())
    } else {
        Err(CatalogError::Superseded)
    }
}
