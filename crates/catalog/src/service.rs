//! Cached access to a catalog backend.

use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, instrument};
use virtual_catalog_core::{CatalogProduct, CategoryId, CategoryNode, CategoryProducts};

use crate::backend::{CatalogBackend, MAX_CATEGORY_DEPTH};
use crate::cache::{
    self, CategoryKey, CategoryProductsKey, CategoryValue, ProductKey, get_or_load,
};
use crate::config::{CacheSettings, CatalogConfig};
use crate::error::CatalogError;

/// Catalog backend fronted by bounded, time-expiring caches.
///
/// Cheap to clone; clones share the backend and the caches.
pub struct CatalogService<B> {
    inner: Arc<CatalogServiceInner<B>>,
}

struct CatalogServiceInner<B> {
    backend: B,
    products: Option<Cache<ProductKey, Option<Arc<CatalogProduct>>>>,
    category_products: Option<Cache<CategoryProductsKey, Arc<CategoryProducts>>>,
    categories: Option<Cache<CategoryKey, CategoryValue>>,
}

impl<B> Clone for CatalogService<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CatalogBackend> CatalogService<B> {
    /// Create a service with the cache settings of `config`.
    #[must_use]
    pub fn new(backend: B, config: &CatalogConfig) -> Self {
        Self::with_caches(
            backend,
            &config.product_cache,
            &config.category_products_cache,
            &config.category_cache,
        )
    }

    /// Create a service with explicit cache settings.
    #[must_use]
    pub fn with_caches(
        backend: B,
        product_cache: &CacheSettings,
        category_products_cache: &CacheSettings,
        category_cache: &CacheSettings,
    ) -> Self {
        Self {
            inner: Arc::new(CatalogServiceInner {
                backend,
                products: cache::build(product_cache),
                category_products: cache::build(category_products_cache),
                categories: cache::build(category_cache),
            }),
        }
    }

    /// Get a base product, with its variants, by SKU.
    ///
    /// Absent products are cached as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(sku = %sku, store = %store_view))]
    pub async fn product_by_sku(
        &self,
        sku: &str,
        store_view: &str,
    ) -> Result<Option<Arc<CatalogProduct>>, CatalogError> {
        let key = ProductKey {
            sku: sku.to_string(),
            store_view: store_view.to_string(),
        };

        let (product, fresh) = get_or_load(self.inner.products.as_ref(), key, async {
            let product = self.inner.backend.product_by_sku(sku, store_view).await?;
            Ok(product.map(Arc::new))
        })
        .await?;

        if !fresh {
            debug!("Cache hit for product");
        }
        Ok(product)
    }

    /// Get one page of a category's products.
    ///
    /// Every product on the page is also placed in the product cache when
    /// not already there.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(id = %id, page, page_size, store = %store_view))]
    pub async fn category_products(
        &self,
        id: CategoryId,
        page: u32,
        page_size: u32,
        store_view: &str,
    ) -> Result<Arc<CategoryProducts>, CatalogError> {
        let key = CategoryProductsKey {
            id,
            page,
            page_size,
            store_view: store_view.to_string(),
        };

        let (products, fresh) = get_or_load(self.inner.category_products.as_ref(), key, async {
            let products = self
                .inner
                .backend
                .category_products(id, page, page_size, store_view)
                .await?;
            debug!(count = products.items.len(), total = ?products.total_count, "Fetched category products");
            Ok(Arc::new(products))
        })
        .await?;

        if !fresh {
            debug!("Cache hit for category products");
        }
        self.warm_products(&products, store_view).await;
        Ok(products)
    }

    async fn warm_products(&self, products: &CategoryProducts, store_view: &str) {
        let Some(cache) = &self.inner.products else {
            return;
        };
        for product in &products.items {
            let key = ProductKey {
                sku: product.sku.clone(),
                store_view: store_view.to_string(),
            };
            cache
                .entry(key)
                .or_insert_with(async { Some(Arc::new(product.clone())) })
                .await;
        }
    }

    /// Get a category with up to three levels of descendants.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(id = %id, store = %store_view))]
    pub async fn category_by_id(
        &self,
        id: CategoryId,
        store_view: &str,
    ) -> Result<Option<Arc<CategoryNode>>, CatalogError> {
        let key = CategoryKey::Id {
            id,
            store_view: store_view.to_string(),
        };

        let (value, fresh) = get_or_load(self.inner.categories.as_ref(), key, async {
            let tree = self
                .inner
                .backend
                .category_tree(id, MAX_CATEGORY_DEPTH, store_view)
                .await?;
            Ok(CategoryValue::Tree(tree.map(Arc::new)))
        })
        .await?;

        if !fresh {
            debug!("Cache hit for category");
        }
        match value {
            CategoryValue::Tree(tree) => Ok(tree),
            CategoryValue::Candidates(_) => Ok(None),
        }
    }

    /// Get the category whose URL path is exactly `url_path`.
    ///
    /// Categories are looked up by the last non-blank path segment (their URL
    /// key); among those sharing that key the one with a matching URL path wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(url_path = %url_path, store = %store_view))]
    pub async fn category_by_path(
        &self,
        url_path: &str,
        store_view: &str,
    ) -> Result<Option<Arc<CategoryNode>>, CatalogError> {
        let Some(url_key) = url_path.rsplit('/').find(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };

        let key = CategoryKey::UrlKey {
            url_key: url_key.to_string(),
            store_view: store_view.to_string(),
        };

        let (value, fresh) = get_or_load(self.inner.categories.as_ref(), key, async {
            let candidates = self
                .inner
                .backend
                .categories_by_url_key(url_key, store_view)
                .await?;
            Ok(CategoryValue::Candidates(
                candidates.into_iter().map(Arc::new).collect(),
            ))
        })
        .await?;

        if !fresh {
            debug!("Cache hit for category path");
        }
        let CategoryValue::Candidates(candidates) = value else {
            return Ok(None);
        };
        Ok(candidates
            .iter()
            .find(|c| c.url_path.as_deref() == Some(url_path))
            .cloned())
    }

    /// Full-text product search, most relevant first. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(text = %text, page, page_size, store = %store_view))]
    pub async fn search_products(
        &self,
        text: &str,
        page: u32,
        page_size: u32,
        store_view: &str,
    ) -> Result<Vec<CatalogProduct>, CatalogError> {
        let products = self
            .inner
            .backend
            .search_products(text, page, page_size, store_view)
            .await?;
        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Drop the cached entry of one product.
    pub async fn invalidate_product(&self, sku: &str, store_view: &str) {
        if let Some(cache) = &self.inner.products {
            cache
                .invalidate(&ProductKey {
                    sku: sku.to_string(),
                    store_view: store_view.to_string(),
                })
                .await;
        }
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.inner.products {
            cache.invalidate_all();
        }
        if let Some(cache) = &self.inner.category_products {
            cache.invalidate_all();
        }
        if let Some(cache) = &self.inner.categories {
            cache.invalidate_all();
        }
    }
}
