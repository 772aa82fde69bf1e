//! In-memory catalog backend for tests.
//!
//! Counts calls per operation and can be told to fail or to respond slowly,
//! which is what cache and degradation tests need.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use virtual_catalog_core::{CatalogProduct, CategoryId, CategoryNode, CategoryProducts};

use crate::backend::{CatalogBackend, MAX_CATEGORY_DEPTH};
use crate::error::CatalogError;

/// Backend operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ProductBySku,
    SearchProducts,
    CategoryTree,
    CategoriesByUrlKey,
    CategoryProducts,
}

impl Operation {
    const ALL: [Self; 5] = [
        Self::ProductBySku,
        Self::SearchProducts,
        Self::CategoryTree,
        Self::CategoriesByUrlKey,
        Self::CategoryProducts,
    ];

    const fn index(self) -> usize {
        match self {
            Self::ProductBySku => 0,
            Self::SearchProducts => 1,
            Self::CategoryTree => 2,
            Self::CategoriesByUrlKey => 3,
            Self::CategoryProducts => 4,
        }
    }
}

/// A category stored flat, linked to its parent by id.
#[derive(Debug, Clone)]
struct StoredCategory {
    node: CategoryNode,
    parent: Option<CategoryId>,
}

#[derive(Debug, Default)]
struct Data {
    products: HashMap<String, CatalogProduct>,
    categories: Vec<StoredCategory>,
    listings: HashMap<CategoryId, Vec<String>>,
    announced_totals: HashMap<CategoryId, u32>,
    short_pages: HashMap<CategoryId, u32>,
    failing: HashSet<Operation>,
    latency: Duration,
}

/// Catalog backend holding its data in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<InMemoryBackendInner>,
}

#[derive(Debug, Default)]
struct InMemoryBackendInner {
    data: Mutex<Data>,
    calls: [AtomicUsize; 5],
}

impl InMemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> MutexGuard<'_, Data> {
        self.inner.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) a product that is not listed in any category.
    pub fn add_product(&self, product: CatalogProduct) {
        self.data().products.insert(product.sku.clone(), product);
    }

    /// Add a product and list it under `category`, after the products already listed.
    pub fn add_category_product(&self, category: CategoryId, product: CatalogProduct) {
        let mut data = self.data();
        data.listings
            .entry(category)
            .or_default()
            .push(product.sku.clone());
        data.products.insert(product.sku.clone(), product);
    }

    /// Add a category below `parent`. Children stored on `node` are ignored.
    pub fn add_category(&self, node: CategoryNode, parent: Option<CategoryId>) {
        let node = CategoryNode {
            children: Vec::new(),
            ..node
        };
        self.data().categories.push(StoredCategory { node, parent });
    }

    /// Announce a total for `category` that differs from its listed products.
    pub fn announce_total(&self, category: CategoryId, total: u32) {
        self.data().announced_totals.insert(category, total);
    }

    /// Make every page of `category` from `page` on come back empty.
    pub fn truncate_from_page(&self, category: CategoryId, page: u32) {
        self.data().short_pages.insert(category, page);
    }

    /// Make `operation` fail until [`Self::recover`] is called.
    pub fn fail(&self, operation: Operation) {
        self.data().failing.insert(operation);
    }

    /// Make every operation fail.
    pub fn fail_all(&self) {
        self.data().failing.extend(Operation::ALL);
    }

    /// Stop failing `operation`.
    pub fn recover(&self, operation: Operation) {
        self.data().failing.remove(&operation);
    }

    /// Delay every response by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.data().latency = latency;
    }

    /// Number of calls made to `operation`.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.inner.calls[operation.index()].load(Ordering::SeqCst)
    }

    /// Number of calls made to any operation.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        Operation::ALL.iter().map(|op| self.calls(*op)).sum()
    }

    async fn enter(&self, operation: Operation) -> Result<(), CatalogError> {
        self.inner.calls[operation.index()].fetch_add(1, Ordering::SeqCst);
        let (latency, failing) = {
            let data = self.data();
            (data.latency, data.failing.contains(&operation))
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if failing {
            return Err(CatalogError::Backend(format!("{operation:?} unavailable")));
        }
        Ok(())
    }

    fn build_tree(data: &Data, node: &CategoryNode, depth: usize) -> CategoryNode {
        let child_nodes: Vec<&CategoryNode> = data
            .categories
            .iter()
            .filter(|c| c.parent == Some(node.id))
            .map(|c| &c.node)
            .collect();

        let children = if depth <= 1 {
            Vec::new()
        } else {
            child_nodes
                .iter()
                .map(|child| Arc::new(Self::build_tree(data, child, depth - 1)))
                .collect()
        };

        CategoryNode {
            children_count: u32::try_from(child_nodes.len()).unwrap_or(u32::MAX),
            children,
            ..node.clone()
        }
    }
}

fn page_bounds(page: u32, page_size: u32, len: usize) -> (usize, usize) {
    let page_size = page_size as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(page_size).min(len);
    let end = start.saturating_add(page_size).min(len);
    (start, end)
}

impl CatalogBackend for InMemoryBackend {
    async fn product_by_sku(
        &self,
        sku: &str,
        _store_view: &str,
    ) -> Result<Option<CatalogProduct>, CatalogError> {
        self.enter(Operation::ProductBySku).await?;
        Ok(self.data().products.get(sku).cloned())
    }

    async fn search_products(
        &self,
        text: &str,
        page: u32,
        page_size: u32,
        _store_view: &str,
    ) -> Result<Vec<CatalogProduct>, CatalogError> {
        self.enter(Operation::SearchProducts).await?;
        let needle = text.to_lowercase();
        let data = self.data();
        let mut matches: Vec<&CatalogProduct> = data
            .products
            .values()
            .filter(|p| {
                needle.is_empty()
                    || p.sku.to_lowercase().contains(&needle)
                    || p.name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .collect();
        matches.sort_by(|a, b| a.sku.cmp(&b.sku));

        let (start, end) = page_bounds(page, page_size, matches.len());
        Ok(matches
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|p| (*p).clone())
            .collect())
    }

    async fn category_tree(
        &self,
        id: CategoryId,
        depth: usize,
        _store_view: &str,
    ) -> Result<Option<CategoryNode>, CatalogError> {
        self.enter(Operation::CategoryTree).await?;
        let data = self.data();
        let depth = depth.clamp(1, MAX_CATEGORY_DEPTH);
        Ok(data
            .categories
            .iter()
            .find(|c| c.node.id == id)
            .map(|c| Self::build_tree(&data, &c.node, depth)))
    }

    async fn categories_by_url_key(
        &self,
        url_key: &str,
        _store_view: &str,
    ) -> Result<Vec<CategoryNode>, CatalogError> {
        self.enter(Operation::CategoriesByUrlKey).await?;
        let data = self.data();
        Ok(data
            .categories
            .iter()
            .filter(|c| c.node.url_key.as_deref() == Some(url_key))
            .map(|c| Self::build_tree(&data, &c.node, 2))
            .collect())
    }

    async fn category_products(
        &self,
        id: CategoryId,
        page: u32,
        page_size: u32,
        _store_view: &str,
    ) -> Result<CategoryProducts, CatalogError> {
        self.enter(Operation::CategoryProducts).await?;
        let data = self.data();
        let listed = data.listings.get(&id).map(Vec::as_slice).unwrap_or_default();
        let total = data
            .announced_totals
            .get(&id)
            .copied()
            .unwrap_or_else(|| u32::try_from(listed.len()).unwrap_or(u32::MAX));

        if data.short_pages.get(&id).is_some_and(|from| page >= *from) {
            return Ok(CategoryProducts {
                items: Vec::new(),
                total_count: Some(total),
            });
        }

        let (start, end) = page_bounds(page, page_size, listed.len());
        let items = listed
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .filter_map(|sku| data.products.get(sku).cloned())
            .collect();

        Ok(CategoryProducts {
            items,
            total_count: Some(total),
        })
    }
}

/// Build a simple product for tests.
#[must_use]
pub fn product(sku: &str, name: &str) -> CatalogProduct {
    CatalogProduct {
        id: None,
        sku: sku.to_string(),
        name: Some(name.to_string()),
        description: None,
        url_key: Some(sku.to_string()),
        price: None,
        image_url: None,
        thumbnail_url: None,
        updated_at: None,
        variants: Vec::new(),
    }
}

/// Build a category for tests; `url_path` is relative to the catalog root.
#[must_use]
pub fn category(id: i32, name: &str, url_path: &str) -> CategoryNode {
    CategoryNode {
        id: CategoryId::new(id),
        name: Some(name.to_string()),
        url_key: url_path.rsplit('/').next().map(String::from),
        url_path: Some(url_path.to_string()),
        product_count: 0,
        children_count: 0,
        children: Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_and_totals() {
        let backend = InMemoryBackend::new();
        let id = CategoryId::new(1);
        for i in 1..=5 {
            backend.add_category_product(id, product(&format!("product-{i}"), "P"));
        }

        let page = backend.category_products(id, 2, 2, "default").await.unwrap();
        let skus: Vec<_> = page.items.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["product-3", "product-4"]);
        assert_eq!(page.total_count, Some(5));

        let past_end = backend.category_products(id, 9, 2, "default").await.unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(backend.calls(Operation::CategoryProducts), 2);
    }

    #[tokio::test]
    async fn test_tree_depth_and_children_count() {
        let backend = InMemoryBackend::new();
        backend.add_category(category(1, "Root", "root"), None);
        backend.add_category(category(2, "Men", "men"), Some(CategoryId::new(1)));
        backend.add_category(category(3, "Coats", "men/coats"), Some(CategoryId::new(2)));

        let tree = backend
            .category_tree(CategoryId::new(1), 2, "default")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tree.children.len(), 1);
        let men = &tree.children[0];
        assert!(men.has_unloaded_children());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = InMemoryBackend::new();
        backend.fail(Operation::ProductBySku);
        assert!(backend.product_by_sku("a", "default").await.is_err());
        backend.recover(Operation::ProductBySku);
        assert!(backend.product_by_sku("a", "default").await.unwrap().is_none());
        assert_eq!(backend.calls(Operation::ProductBySku), 2);
    }
}
