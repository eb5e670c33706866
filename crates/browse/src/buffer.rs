use cinetrack_core::{MediaItem, MediaKind};
use cinetrack_metadata::{CatalogError, DiscoverParams};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::generation::Ticket;
use crate::Catalog;

/// Which upstream listing a buffer grows from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "feed", rename_all = "snake_case")]
pub enum FeedScope {
    Popular { kind: MediaKind },
    Discover { kind: MediaKind, params: DiscoverParams },
    /// Items supplied up front, such as search results. Never fetches.
    Fixed,
}

impl FeedScope {
    pub fn kind(&self) -> Option<MediaKind> {
        match self {
            Self::Popular { kind } | Self::Discover { kind, .. } => Some(*kind),
            Self::Fixed => None,
        }
    }
}

/// Append-only collection of normalized items fetched so far.
///
/// `items.len()` and `next_page` never decrease and `exhausted` never
/// resets. Items are kept in upstream order without deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchBuffer {
    scope: FeedScope,
    items: Vec<MediaItem>,
    next_page: u32,
    exhausted: bool,
}

impl FetchBuffer {
    pub fn new(scope: FeedScope) -> Self {
        let exhausted = scope == FeedScope::Fixed;
        Self {
            scope,
            items: Vec::new(),
            next_page: 1,
            exhausted,
        }
    }

    /// An exhausted buffer holding `items` as-is.
    pub fn fixed(items: Vec<MediaItem>) -> Self {
        Self {
            scope: FeedScope::Fixed,
            items,
            next_page: 1,
            exhausted: true,
        }
    }

    pub fn scope(&self) -> &FeedScope {
        &self.scope
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch and append exactly one more upstream page.
    ///
    /// Returns `Ok(true)` when a page was consumed. An empty page marks the
    /// buffer exhausted and returns `Ok(false)`, as does any call on an
    /// exhausted buffer. On error, or when `ticket` has been superseded by
    /// the time the page arrives, the buffer is left untouched.
    pub async fn advance(
        &mut self,
        catalog: &Catalog,
        ticket: &Ticket,
    ) -> Result<bool, CatalogError> {
        if self.exhausted {
            return Ok(false);
        }

        let page = self.next_page;
        let (kind, records) = match &self.scope {
            FeedScope::Popular { kind } => {
                (*kind, catalog.source().fetch_popular_page(*kind, page).await?)
            }
            FeedScope::Discover { kind, params } => (
                *kind,
                catalog
                    .source()
                    .fetch_discover(*kind, &params.at_page(page))
                    .await?,
            ),
            FeedScope::Fixed => return Ok(false),
        };
        let items = catalog.normalizer().normalize_page(&records, kind).await?;

        if !ticket.is_current() {
            debug!(kind = %kind, page, "dropping page fetched for a superseded action");
            return Err(CatalogError::Superseded);
        }

        if records.is_empty() {
            self.exhausted = true;
            info!(kind = %kind, page, buffered = self.items.len(), "upstream exhausted");
            return Ok(false);
        }

        self.next_page += 1;
        self.items.extend(items);
        debug!(kind = %kind, page, buffered = self.items.len(), "buffer advanced");
        Ok(true)
    }
}
