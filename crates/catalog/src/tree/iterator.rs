//! Lazy, page-by-page listing of a category's products.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;
use virtual_catalog_core::CategoryId;

use crate::backend::CatalogBackend;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::CatalogError;
use crate::service::CatalogService;

use super::node::CatalogNode;

/// Progress of a [`CategoryProductsIterator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    /// No page requested yet.
    NotStarted,
    /// This many pages have been fetched and more may follow.
    FetchedPages(u32),
    /// No further page will be requested.
    Exhausted,
}

/// Forward-only sequence over the products of one category.
///
/// Pages are fetched from the service one at a time, only when the buffered
/// products have all been read. Fetching stops when a page comes back empty or
/// when as many products as the announced total have been fetched. Not meant
/// to be shared between tasks.
pub struct CategoryProductsIterator<B> {
    service: CatalogService<B>,
    parent_path: String,
    category_id: CategoryId,
    page_size: u32,
    store_view: String,
    buffer: VecDeque<CatalogNode>,
    fetched: u32,
    total_count: Option<u32>,
    state: IteratorState,
}

impl<B: CatalogBackend> CategoryProductsIterator<B> {
    /// List the products of `category_id`, placing them below `parent_path`.
    ///
    /// `page_size` defaults to [`DEFAULT_PAGE_SIZE`].
    #[must_use]
    pub fn new(
        service: CatalogService<B>,
        parent_path: impl Into<String>,
        category_id: CategoryId,
        page_size: Option<u32>,
        store_view: impl Into<String>,
    ) -> Self {
        Self {
            service,
            parent_path: parent_path.into(),
            category_id,
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1),
            store_view: store_view.into(),
            buffer: VecDeque::new(),
            fetched: 0,
            total_count: None,
            state: IteratorState::NotStarted,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> IteratorState {
        self.state
    }

    /// Total announced by the last fetched page.
    #[must_use]
    pub const fn total_count(&self) -> Option<u32> {
        self.total_count
    }

    /// Whether another product is available, fetching one more page if the
    /// buffer is empty and more pages may exist.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching the next page fails. The iterator stays
    /// where it was and the call may be retried.
    pub async fn has_next(&mut self) -> Result<bool, CatalogError> {
        if !self.buffer.is_empty() {
            return Ok(true);
        }
        if !self.can_load_more() {
            self.state = IteratorState::Exhausted;
            return Ok(false);
        }

        let page = self.fetched / self.page_size + 1;
        let products = self
            .service
            .category_products(self.category_id, page, self.page_size, &self.store_view)
            .await?;
        self.total_count = products.total_count;

        if products.items.is_empty() {
            debug!(id = %self.category_id, page, "Empty page, listing done");
            self.state = IteratorState::Exhausted;
            return Ok(false);
        }

        self.state = match self.state {
            IteratorState::FetchedPages(k) => IteratorState::FetchedPages(k + 1),
            _ => IteratorState::FetchedPages(1),
        };

        for product in &products.items {
            let path = format!("{}/{}", self.parent_path, product.sku);
            self.buffer
                .push_back(CatalogNode::product(path, Arc::new(product.clone())));
        }
        self.fetched = self
            .fetched
            .saturating_add(u32::try_from(products.items.len()).unwrap_or(u32::MAX));

        Ok(!self.buffer.is_empty())
    }

    /// The next product, if [`Self::has_next`] reported one.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<CatalogNode> {
        self.buffer.pop_front()
    }

    /// Read every remaining product.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching any page fails.
    pub async fn collect_remaining(&mut self) -> Result<Vec<CatalogNode>, CatalogError> {
        let mut nodes = Vec::new();
        while self.has_next().await? {
            nodes.extend(self.next());
        }
        Ok(nodes)
    }

    fn can_load_more(&self) -> bool {
        if self.state == IteratorState::Exhausted {
            return false;
        }
        self.total_count.is_none_or(|total| total > self.fetched)
    }
}
