//! Maps paths of the virtual tree to catalog categories and products.

use std::sync::Arc;

use tracing::{debug, error, instrument, warn};
use virtual_catalog_core::{CatalogProduct, CategoryNode};

use crate::backend::CatalogBackend;
use crate::config::{ConfigError, TreeConfig};
use crate::error::CatalogError;
use crate::service::CatalogService;

use super::iterator::CategoryProductsIterator;
use super::node::{CatalogNode, IMAGE_NODE_NAME, NodeKind};

/// Most trailing segments a product path may have below its category
/// (product SKU, then variant SKU).
const MAX_PRODUCT_SEGMENTS: usize = 2;

/// The catalog seen as a tree of paths below a configured root.
///
/// Categories sit at `root/<url path>`, products directly below the category
/// they are listed in, and variants directly below their product. Backend
/// failures never escape: lookups degrade to "not found" and listings to a
/// single error node.
pub struct CatalogTree<B> {
    service: CatalogService<B>,
    config: TreeConfig,
}

impl<B> Clone for CatalogTree<B> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            config: self.config.clone(),
        }
    }
}

/// A product path split at its category boundary.
struct ProductParts<'a> {
    sku: &'a str,
    variant_sku: Option<&'a str>,
}

impl<B: CatalogBackend> CatalogTree<B> {
    /// Create a tree over `service`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree configuration is invalid.
    pub fn new(config: TreeConfig, service: CatalogService<B>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { service, config })
    }

    /// Path of the tree root.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.config.root_path
    }

    /// Tree configuration.
    #[must_use]
    pub const fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The catalog service behind the tree.
    #[must_use]
    pub const fn service(&self) -> &CatalogService<B> {
        &self.service
    }

    /// Path below the root, without leading slash; `""` for the root itself.
    fn sub_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.root())?;
        if rest.is_empty() {
            return Some("");
        }
        rest.strip_prefix('/')
    }

    fn category_path(&self, category: &CategoryNode) -> Option<String> {
        let url_path = category.url_path.as_deref()?;
        Some(format!("{}/{url_path}", self.root()))
    }

    /// Resolve any path of the tree.
    #[instrument(skip(self))]
    pub async fn resolve(&self, path: &str) -> Option<CatalogNode> {
        let path = path.strip_suffix("/.").unwrap_or(path);
        let sub_path = self.sub_path(path)?;

        if sub_path.is_empty() {
            return self.resolve_category(path).await;
        }
        if path
            .rsplit_once('/')
            .is_some_and(|(_, last)| last == IMAGE_NODE_NAME)
        {
            return self.resolve_product_image(path).await;
        }

        match self.resolve_category(path).await {
            Some(node) => Some(node),
            None => self.resolve_product(path).await,
        }
    }

    /// Resolve a category path. The root path yields the root category.
    #[instrument(skip(self))]
    pub async fn resolve_category(&self, path: &str) -> Option<CatalogNode> {
        let sub_path = self.sub_path(path)?;
        let store_view = &self.config.store_view;

        let category = if sub_path.is_empty() {
            self.service
                .category_by_id(self.config.root_category_id, store_view)
                .await
        } else {
            self.service.category_by_path(sub_path, store_view).await
        };

        match category {
            Ok(None) if sub_path.is_empty() => {
                warn!(id = %self.config.root_category_id, "Root category not found, catalog is empty");
                None
            }
            Ok(category) => category.map(|c| CatalogNode::category(path, c)),
            Err(e) => {
                error!(path, error = %e, "Failed to resolve category");
                None
            }
        }
    }

    /// Resolve a product or variant path.
    ///
    /// The longest leading part of the path that names a category is the
    /// category boundary; what follows is the product SKU and, optionally,
    /// the variant SKU. A variant SKU the product does not list still yields
    /// a variant node, whose fields fall back to the first variant and then
    /// to the base product.
    #[instrument(skip(self))]
    pub async fn resolve_product(&self, path: &str) -> Option<CatalogNode> {
        self.try_resolve_product(path).await.unwrap_or_else(|e| {
            error!(path, error = %e, "Failed to resolve product");
            None
        })
    }

    async fn try_resolve_product(&self, path: &str) -> Result<Option<CatalogNode>, CatalogError> {
        let Some(parts) = self.product_parts(path).await? else {
            return Ok(None);
        };
        let Some(product) = self.fetch_product(parts.sku).await? else {
            return Ok(None);
        };

        Ok(Some(match parts.variant_sku {
            None => CatalogNode::product(path, product),
            Some(variant_sku) => {
                if product.variant(variant_sku).is_none() {
                    debug!(variant_sku, "Unknown variant, using base product values");
                }
                CatalogNode::variant(path, product, variant_sku)
            }
        }))
    }

    /// Resolve the image node below a product or variant path.
    #[instrument(skip(self))]
    pub async fn resolve_product_image(&self, path: &str) -> Option<CatalogNode> {
        self.try_resolve_product_image(path)
            .await
            .unwrap_or_else(|e| {
                error!(path, error = %e, "Failed to resolve product image");
                None
            })
    }

    async fn try_resolve_product_image(
        &self,
        path: &str,
    ) -> Result<Option<CatalogNode>, CatalogError> {
        let Some(product_path) = path
            .strip_suffix(IMAGE_NODE_NAME)
            .and_then(|p| p.strip_suffix('/'))
        else {
            return Ok(None);
        };
        let Some(parts) = self.product_parts(product_path).await? else {
            return Ok(None);
        };
        let Some(product) = self.fetch_product(parts.sku).await? else {
            return Ok(None);
        };

        let url = product.view(parts.variant_sku).image_url().map(String::from);
        Ok(url.map(|url| CatalogNode::image(path, url)))
    }

    async fn fetch_product(&self, sku: &str) -> Result<Option<Arc<CatalogProduct>>, CatalogError> {
        self.service
            .product_by_sku(sku, &self.config.store_view)
            .await
    }

    /// Split a product path at its category boundary, backtracking from the
    /// end one segment at a time.
    async fn product_parts<'a>(
        &self,
        path: &'a str,
    ) -> Result<Option<ProductParts<'a>>, CatalogError> {
        let Some(sub_path) = self.sub_path(path) else {
            return Ok(None);
        };
        let segments: Vec<&str> = sub_path.split('/').filter(|s| !s.is_empty()).collect();

        for trailing in 1..=MAX_PRODUCT_SEGMENTS.min(segments.len()) {
            let (category, product) = segments.split_at(segments.len() - trailing);
            let is_category = category.is_empty()
                || self
                    .service
                    .category_by_path(&category.join("/"), &self.config.store_view)
                    .await?
                    .is_some();

            if is_category {
                return Ok(product.first().copied().map(|sku| ProductParts {
                    sku,
                    variant_sku: product.get(1).copied(),
                }));
            }
        }

        debug!(path, "No category boundary within product segments");
        Ok(None)
    }

    /// Children of any node.
    pub async fn list_children(&self, node: &CatalogNode) -> Vec<CatalogNode> {
        match node.kind() {
            NodeKind::Category(_) => self.list_category_children(node).await,
            NodeKind::Product(_) => self.list_product_children(node).await,
            NodeKind::Variant { .. } | NodeKind::Image { .. } | NodeKind::Error => Vec::new(),
        }
    }

    /// Child categories of a category node or, for a category without child
    /// categories, its products.
    #[instrument(skip(self, node), fields(path = %node.path()))]
    pub async fn list_category_children(&self, node: &CatalogNode) -> Vec<CatalogNode> {
        let Some(category) = node.as_category() else {
            return Vec::new();
        };

        let category = if category.has_unloaded_children() {
            match self
                .service
                .category_by_id(category.id, &self.config.store_view)
                .await
            {
                Ok(Some(loaded)) => loaded,
                Ok(None) => Arc::clone(category),
                Err(e) => {
                    error!(id = %category.id, error = %e, "Failed to fetch child categories");
                    return vec![CatalogNode::error(node.path())];
                }
            }
        } else {
            Arc::clone(category)
        };

        let children: Vec<CatalogNode> = category
            .children
            .iter()
            .filter(|child| {
                let addressable = child.is_addressable();
                if !addressable {
                    warn!(id = %child.id, "Ignoring category with empty url path and/or name");
                }
                addressable
            })
            .filter_map(|child| {
                self.category_path(child)
                    .map(|path| CatalogNode::category(path, Arc::clone(child)))
            })
            .collect();

        if !children.is_empty() {
            return children;
        }

        let mut products = CategoryProductsIterator::new(
            self.service.clone(),
            node.path(),
            category.id,
            Some(self.config.page_size),
            self.config.store_view.clone(),
        );
        match products.collect_remaining().await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!(id = %category.id, error = %e, "Failed to fetch category products");
                vec![CatalogNode::error(node.path())]
            }
        }
    }

    /// Image and variants of a product node, image first.
    #[instrument(skip(self, node), fields(path = %node.path()))]
    pub async fn list_product_children(&self, node: &CatalogNode) -> Vec<CatalogNode> {
        let NodeKind::Product(listed) = node.kind() else {
            return Vec::new();
        };

        let product = match self.fetch_product(&listed.sku).await {
            Ok(Some(product)) => product,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!(sku = %listed.sku, error = %e, "Failed to fetch product variants");
                return vec![CatalogNode::error(node.path())];
            }
        };

        let mut children = Vec::with_capacity(product.variants.len() + 1);
        if let Some(url) = product.image_or_first_variant_image() {
            children.push(CatalogNode::image(
                format!("{}/{IMAGE_NODE_NAME}", node.path()),
                url,
            ));
        }
        for variant in &product.variants {
            children.push(CatalogNode::variant(
                format!("{}/{}", node.path(), variant.sku),
                Arc::clone(&product),
                variant.sku.clone(),
            ));
        }
        children
    }

    /// Lazy listing of the products of a category node.
    #[must_use]
    pub fn category_products(&self, node: &CatalogNode) -> Option<CategoryProductsIterator<B>> {
        let category = node.as_category()?;
        Some(CategoryProductsIterator::new(
            self.service.clone(),
            node.path(),
            category.id,
            Some(self.config.page_size),
            self.config.store_view.clone(),
        ))
    }

    /// Product nodes matching a full-text search, placed directly below the root.
    #[instrument(skip(self))]
    pub async fn search_products(&self, text: &str, page: u32, page_size: u32) -> Vec<CatalogNode> {
        match self
            .service
            .search_products(text, page.max(1), page_size.max(1), &self.config.store_view)
            .await
        {
            Ok(products) => products
                .into_iter()
                .map(|product| {
                    let path = format!("{}/{}", self.root(), product.sku);
                    CatalogNode::product(path, Arc::new(product))
                })
                .collect(),
            Err(e) => {
                error!(text, error = %e, "Product search failed");
                vec![CatalogNode::error(self.root())]
            }
        }
    }
}
