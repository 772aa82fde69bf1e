//! Outbound interface toward the remote commerce catalog.

use std::future::Future;

use virtual_catalog_core::{CatalogProduct, CategoryId, CategoryNode, CategoryProducts};

use crate::error::CatalogError;

/// Deepest category tree a single backend call returns (root included).
pub const MAX_CATEGORY_DEPTH: usize = 4;

/// Source of catalog data.
///
/// Every call is a single request/response round trip. Absent entities are
/// `Ok(None)` (or an empty list); transport failures, non-success responses and
/// malformed payloads are `Err`.
pub trait CatalogBackend: Send + Sync + 'static {
    /// Fetch a base product, with its variants, by SKU.
    fn product_by_sku(
        &self,
        sku: &str,
        store_view: &str,
    ) -> impl Future<Output = Result<Option<CatalogProduct>, CatalogError>> + Send;

    /// Full-text product search, most relevant first. Empty text matches
    /// every product. `page` is 1-indexed.
    fn search_products(
        &self,
        text: &str,
        page: u32,
        page_size: u32,
        store_view: &str,
    ) -> impl Future<Output = Result<Vec<CatalogProduct>, CatalogError>> + Send;

    /// Fetch a category and its descendants, `depth` levels deep
    /// (clamped to [`MAX_CATEGORY_DEPTH`]).
    fn category_tree(
        &self,
        id: CategoryId,
        depth: usize,
        store_view: &str,
    ) -> impl Future<Output = Result<Option<CategoryNode>, CatalogError>> + Send;

    /// Every category whose URL key equals `url_key`, each with its direct children.
    fn categories_by_url_key(
        &self,
        url_key: &str,
        store_view: &str,
    ) -> impl Future<Output = Result<Vec<CategoryNode>, CatalogError>> + Send;

    /// One page of a category's products, sorted by name. `page` is 1-indexed.
    fn category_products(
        &self,
        id: CategoryId,
        page: u32,
        page_size: u32,
        store_view: &str,
    ) -> impl Future<Output = Result<CategoryProducts, CatalogError>> + Send;
}
