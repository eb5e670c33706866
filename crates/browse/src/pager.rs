//! Fixed-size pages over a view, growing the buffer on demand.

use cinetrack_core::MediaItem;
use cinetrack_metadata::CatalogError;
use serde::Serialize;
use tracing::debug;

use crate::buffer::FetchBuffer;
use crate::generation::Ticket;
use crate::view::{self, FilterState};
use crate::Catalog;

/// Numbered pages shown either side of the current one.
const NEARBY_SPAN: u32 = 3;

/// One served page plus navigation metadata.
///
/// `has_next` only reflects what has been fetched so far: it is true while
/// the view holds more items or the upstream is not yet exhausted, so a
/// filtered view can advertise a next page that turns out empty. The
/// upstream total is never known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<MediaItem>,
    /// Page actually served, after stepping back from empty pages.
    pub page: u32,
    pub requested_page: u32,
    pub has_prev: bool,
    pub has_next: bool,
    /// 1-based inclusive positions in the view; both 0 for an empty page.
    pub range_start: usize,
    pub range_end: usize,
    pub total_so_far: usize,
    pub exhausted: bool,
    pub nearby: Vec<u32>,
}

#[derive(Debug)]
pub struct PageServer {
    buffer: FetchBuffer,
    filter: FilterState,
    view: Vec<MediaItem>,
    page_size: usize,
    current_page: u32,
}

impl PageServer {
    pub fn new(buffer: FetchBuffer, page_size: usize) -> Self {
        let filter = FilterState::default();
        let view = view::build(buffer.items(), &filter);
        Self {
            buffer,
            filter,
            view,
            page_size: page_size.max(1),
            current_page: 1,
        }
    }

    pub fn buffer(&self) -> &FetchBuffer {
        &self.buffer
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn view(&self) -> &[MediaItem] {
        &self.view
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Replace the filter, rebuild the view and go back to page 1.
    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
        self.rebuild();
        self.current_page = 1;
    }

    /// Switch to `filter` and serve page 1. On failure the previous filter,
    /// view and current page are restored.
    pub async fn apply_filter(
        &mut self,
        catalog: &Catalog,
        filter: FilterState,
        ticket: &Ticket,
    ) -> Result<Page, CatalogError> {
        let previous = std::mem::replace(&mut self.filter, filter);
        let previous_page = self.current_page;
        self.rebuild();
        match self.get_page(catalog, 1, ticket).await {
            Ok(page) => Ok(page),
            Err(e) => {
                self.filter = previous;
                self.rebuild();
                self.current_page = previous_page;
                Err(e)
            }
        }
    }

    /// Swap in a different buffer (a new search), keeping the filter, and
    /// serve page 1. On failure the previous buffer and page are restored.
    pub async fn replace_buffer(
        &mut self,
        catalog: &Catalog,
        buffer: FetchBuffer,
        ticket: &Ticket,
    ) -> Result<Page, CatalogError> {
        let previous = std::mem::replace(&mut self.buffer, buffer);
        let previous_page = self.current_page;
        self.rebuild();
        match self.get_page(catalog, 1, ticket).await {
            Ok(page) => Ok(page),
            Err(e) => {
                self.buffer = previous;
                self.rebuild();
                self.current_page = previous_page;
                Err(e)
            }
        }
    }

    fn rebuild(&mut self) {
        self.view = view::build(self.buffer.items(), &self.filter);
    }

    /// Serve `requested` (1-based; 0 is read as 1), fetching upstream pages
    /// until the view covers it or the upstream runs dry. A page past the
    /// end of an exhausted view is served as the last non-empty page (or 1).
    ///
    /// Errors from the upstream propagate; pages fetched successfully before
    /// the failure stay buffered, the failed one is not committed.
    pub async fn get_page(
        &mut self,
        catalog: &Catalog,
        requested: u32,
        ticket: &Ticket,
    ) -> Result<Page, CatalogError> {
        let requested = requested.max(1);
        self.fill(catalog, requested, ticket).await?;
        let mut page = requested;
        if self.buffer.is_exhausted() && self.offset(page) >= self.view.len() {
            page = self.last_page();
        }

        if !ticket.is_current() {
            return Err(CatalogError::Superseded);
        }
        if page != requested {
            debug!(requested, served = page, "stepped back to last non-empty page");
        }
        self.current_page = page;
        Ok(self.slice(page, requested))
    }

    async fn fill(
        &mut self,
        catalog: &Catalog,
        page: u32,
        ticket: &Ticket,
    ) -> Result<(), CatalogError> {
        let needed = (page as usize).saturating_mul(self.page_size);
        while self.view.len() < needed && !self.buffer.is_exhausted() {
            if self.buffer.advance(catalog, ticket).await? {
                self.rebuild();
            }
        }
        Ok(())
    }

    fn offset(&self, page: u32) -> usize {
        (page as usize - 1).saturating_mul(self.page_size)
    }

    /// Last page holding any item of the current view; 1 when it is empty.
    fn last_page(&self) -> u32 {
        let pages = self.view.len().div_ceil(self.page_size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    fn slice(&self, page: u32, requested: u32) -> Page {
        let total = self.view.len();
        let start = self.offset(page).min(total);
        let end = start.saturating_add(self.page_size).min(total);
        let items = self.view[start..end].to_vec();
        let exhausted = self.buffer.is_exhausted();

        let (range_start, range_end) = if items.is_empty() {
            (0, 0)
        } else {
            (start + 1, end)
        };

        Page {
            has_prev: page > 1,
            has_next: total > end || !exhausted,
            range_start,
            range_end,
            total_so_far: total,
            exhausted,
            nearby: self.nearby(page, exhausted),
            items,
            page,
            requested_page: requested,
        }
    }

    fn nearby(&self, page: u32, exhausted: bool) -> Vec<u32> {
        let first = page.saturating_sub(NEARBY_SPAN).max(1);
        let mut last = page.saturating_add(NEARBY_SPAN);
        if exhausted {
            last = last.min(self.last_page().max(page));
        }
        (first..=last).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cinetrack_core::MediaKind;

    use super::*;
    use crate::buffer::FeedScope;
    use crate::testing::{catalog, movie, movie_page, FakeSource};
    use crate::view::{MatchMode, SortKey};

    fn popular_server() -> PageServer {
        PageServer::new(
            FetchBuffer::new(FeedScope::Popular {
                kind: MediaKind::Movie,
            }),
            crate::PAGE_SIZE,
        )
    }

    #[tokio::test]
    async fn first_page_from_buffered_items_needs_no_fetch() {
        let source = Arc::new(
            FakeSource::new().with_popular(MediaKind::Movie, vec![movie_page(1, 20)]),
        );
        let catalog = catalog(&source);
        let ticket = Ticket::detached();
        let mut server = popular_server();

        server.get_page(&catalog, 1, &ticket).await.unwrap();
        assert_eq!(server.buffer().len(), 20);
        let calls = source.popular_calls();

        let page = server.get_page(&catalog, 1, &ticket).await.unwrap();
        assert_eq!(source.popular_calls(), calls);
        assert_eq!(page.items.len(), 15);
        assert_eq!(page.items[0].id, 1);
        assert_eq!((page.range_start, page.range_end), (1, 15));
        assert!(!page.has_prev);
        assert!(page.has_next);
        assert_eq!(page.total_so_far, 20);
    }

    #[tokio::test]
    async fn page_past_the_end_steps_back() {
        let source = Arc::new(
            FakeSource::new().with_popular(MediaKind::Movie, vec![movie_page(1, 10)]),
        );
        let catalog = catalog(&source);
        let mut server = popular_server();

        let page = server.get_page(&catalog, 3, &Ticket::detached()).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.requested_page, 3);
        assert_eq!(page.items.len(), 10);
        assert!(page.exhausted);
        assert!(!page.has_next);
        assert_eq!(page.nearby, vec![1]);
        assert_eq!(server.current_page(), 1);
        // One page of data, then the empty page that exhausted the feed.
        assert_eq!(source.popular_calls(), 2);
    }

    #[tokio::test]
    async fn grows_buffer_across_upstream_pages() {
        let source = Arc::new(FakeSource::new().with_popular(
            MediaKind::Movie,
            vec![movie_page(1, 20), movie_page(21, 20), movie_page(41, 20)],
        ));
        let catalog = catalog(&source);
        let mut server = popular_server();

        let page = server.get_page(&catalog, 3, &Ticket::detached()).await.unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.items.first().map(|i| i.id), Some(31));
        assert_eq!(page.items.len(), 15);
        assert_eq!((page.range_start, page.range_end), (31, 45));
        assert_eq!(server.buffer().len(), 60);
        assert_eq!(source.popular_calls(), 3);
        assert_eq!(page.nearby, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn filtered_view_keeps_fetching_until_page_is_covered() {
        // Only every other item is a comedy, so page 1 needs two upstream pages.
        let page_of = |first: u64| -> Vec<_> {
            (first..first + 20)
                .map(|id| {
                    let genres: &[u32] = if id % 2 == 0 { &[35] } else { &[28] };
                    movie(id, &format!("Movie {id}"), "2020-01-01", 6.0, genres)
                })
                .collect()
        };
        let source = Arc::new(
            FakeSource::new()
                .with_genres(MediaKind::Movie, &[(28, "Action"), (35, "Comedy")])
                .with_popular(MediaKind::Movie, vec![page_of(1), page_of(21)]),
        );
        let catalog = catalog(&source);
        let mut server = popular_server();
        server.set_filter(FilterState::with_genres(["comedy"], MatchMode::Or));

        let page = server.get_page(&catalog, 1, &Ticket::detached()).await.unwrap();
        assert_eq!(page.items.len(), 15);
        assert!(page.items.iter().all(|i| i.genres == vec!["Comedy"]));
        assert_eq!(source.popular_calls(), 2);
    }

    #[tokio::test]
    async fn failure_keeps_previous_state() {
        let source = Arc::new(
            FakeSource::new()
                .with_popular(MediaKind::Movie, vec![movie_page(1, 20), movie_page(21, 20)])
                .failing_page(2),
        );
        let catalog = catalog(&source);
        let ticket = Ticket::detached();
        let mut server = popular_server();

        server.get_page(&catalog, 1, &ticket).await.unwrap();
        let buffer_before = server.buffer().clone();

        let err = server.get_page(&catalog, 2, &ticket).await.unwrap_err();
        assert!(matches!(err, CatalogError::UpstreamUnavailable(_)));
        assert_eq!(server.buffer(), &buffer_before);
        assert_eq!(server.current_page(), 1);
        assert_eq!(server.view().len(), 20);
    }

    #[tokio::test]
    async fn set_filter_resets_to_first_page() {
        let source = Arc::new(
            FakeSource::new().with_popular(MediaKind::Movie, vec![movie_page(1, 40)]),
        );
        let catalog = catalog(&source);
        let ticket = Ticket::detached();
        let mut server = popular_server();

        server.get_page(&catalog, 2, &ticket).await.unwrap();
        assert_eq!(server.current_page(), 2);

        server.set_filter(FilterState::sorted(SortKey::TitleDesc));
        assert_eq!(server.current_page(), 1);
        let page = server.get_page(&catalog, 1, &ticket).await.unwrap();
        assert_eq!(page.items[0].title, "Movie 9");
    }

    #[tokio::test]
    async fn huge_page_number_jumps_to_last_page() {
        let source = Arc::new(
            FakeSource::new()
                .with_popular(MediaKind::Movie, vec![movie_page(1, 20), movie_page(21, 20)]),
        );
        let catalog = catalog(&source);
        let mut server = popular_server();

        let page = server.get_page(&catalog, u32::MAX, &Ticket::detached()).await.unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.requested_page, u32::MAX);
        assert_eq!(page.items.len(), 10);
        assert_eq!((page.range_start, page.range_end), (31, 40));
        assert_eq!(page.nearby, vec![1, 2, 3]);
        assert_eq!(server.current_page(), 3);
        assert_eq!(source.popular_calls(), 3);
    }

    #[tokio::test]
    async fn huge_page_number_on_empty_fixed_buffer() {
        let source = Arc::new(FakeSource::new());
        let catalog = catalog(&source);
        let mut server = PageServer::new(FetchBuffer::fixed(vec![]), crate::PAGE_SIZE);

        let page = server.get_page(&catalog, u32::MAX, &Ticket::detached()).await.unwrap();
        assert_eq!(page.page, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.nearby, vec![1]);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_filter_change_restores_previous_filter() {
        let source = Arc::new(
            FakeSource::new()
                .with_popular(MediaKind::Movie, vec![movie_page(1, 20), movie_page(21, 20)])
                .failing_page(2),
        );
        let catalog = catalog(&source);
        let ticket = Ticket::detached();
        let mut server = popular_server();
        server.get_page(&catalog, 1, &ticket).await.unwrap();

        let mut filter = FilterState::with_genres(["Nope"], MatchMode::And);
        filter.sort = SortKey::TitleDesc;
        assert!(server.apply_filter(&catalog, filter, &ticket).await.is_err());
        assert_eq!(server.filter(), &FilterState::default());
        assert_eq!(server.view().len(), 20);
        assert_eq!(server.current_page(), 1);
        assert_eq!(server.view()[0].id, 1);
    }

    #[tokio::test]
    async fn superseded_search_keeps_previous_buffer() {
        let source = Arc::new(
            FakeSource::new().with_popular(MediaKind::Movie, vec![movie_page(1, 20)]),
        );
        let catalog = catalog(&source);
        let generation = crate::generation::Generation::new();
        let ticket = generation.advance();
        let mut server = popular_server();
        server.get_page(&catalog, 1, &ticket).await.unwrap();

        generation.advance();
        let err = server
            .replace_buffer(&catalog, FetchBuffer::fixed(vec![]), &ticket)
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::Superseded);
        assert_eq!(server.buffer().len(), 20);
        assert_eq!(server.view().len(), 20);
    }

    #[tokio::test]
    async fn page_zero_is_first_page() {
        let source = Arc::new(
            FakeSource::new().with_popular(MediaKind::Movie, vec![movie_page(1, 20)]),
        );
        let catalog = catalog(&source);
        let mut server = popular_server();

        let page = server.get_page(&catalog, 0, &Ticket::detached()).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 15);
    }

    #[tokio::test]
    async fn empty_catalog_serves_empty_first_page() {
        let source = Arc::new(FakeSource::new());
        let catalog = catalog(&source);
        let mut server = popular_server();

        let page = server.get_page(&catalog, 2, &Ticket::detached()).await.unwrap();
        assert_eq!(page.page, 1);
        assert!(page.items.is_empty());
        assert_eq!((page.range_start, page.range_end), (0, 0));
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }
}
