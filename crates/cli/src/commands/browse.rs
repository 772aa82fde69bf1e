//! Tree browsing commands.
//!
//! # Environment Variables
//!
//! - `CATALOG_GRAPHQL_ENDPOINT` - GraphQL endpoint of the commerce backend
//! - `CATALOG_ROOT_CATEGORY_ID` - Category shown at the tree root
//!
//! See `CatalogConfig::from_env` for the optional settings.

use serde::Serialize;
use thiserror::Error;
use virtual_catalog::{
    CatalogConfig, CatalogError, CatalogNode, CatalogService, CatalogTree, ConfigError,
    GraphqlCatalogClient,
};

/// Errors that can occur while browsing.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The catalog backend could not be reached.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Output could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Nothing exists at the path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The path does not name a category.
    #[error("Not a category: {0}")]
    NotCategory(String),
}

/// Build the tree from environment configuration.
pub fn open_tree() -> Result<CatalogTree<GraphqlCatalogClient>, BrowseError> {
    let config = CatalogConfig::from_env()?;
    let client = GraphqlCatalogClient::new(&config.graphql)?;
    tracing::debug!(endpoint = %client.endpoint(), root = %config.tree.root_path, "Opening catalog");

    let service = CatalogService::new(client, &config);
    Ok(CatalogTree::new(config.tree, service)?)
}

/// Print the node at `path`.
pub async fn resolve(tree: &CatalogTree<GraphqlCatalogClient>, path: &str) -> Result<(), BrowseError> {
    let node = find(tree, path).await?;
    print_json(&node)
}

/// Print the children of the node at `path`.
pub async fn list(tree: &CatalogTree<GraphqlCatalogClient>, path: &str) -> Result<(), BrowseError> {
    let node = find(tree, path).await?;
    let children = tree.list_children(&node).await;
    tracing::info!(path = %node.path(), count = children.len(), "Listed children");
    print_json(&children)
}

/// Print the products of the category at `path`, up to `limit`.
pub async fn products(
    tree: &CatalogTree<GraphqlCatalogClient>,
    path: &str,
    limit: Option<usize>,
) -> Result<(), BrowseError> {
    let node = find(tree, path).await?;
    let mut products = tree
        .category_products(&node)
        .ok_or_else(|| BrowseError::NotCategory(node.path().to_string()))?;

    let limit = limit.unwrap_or(usize::MAX);
    let mut nodes = Vec::new();
    while nodes.len() < limit && products.has_next().await? {
        nodes.extend(products.next());
    }

    tracing::info!(
        path = %node.path(),
        count = nodes.len(),
        total = ?products.total_count(),
        "Listed category products"
    );
    print_json(&nodes)
}

/// Print the products matching `text`.
pub async fn search(
    tree: &CatalogTree<GraphqlCatalogClient>,
    text: &str,
    page: u32,
    page_size: u32,
) -> Result<(), BrowseError> {
    let nodes = tree.search_products(text, page, page_size).await;
    print_json(&nodes)
}

async fn find(tree: &CatalogTree<GraphqlCatalogClient>, path: &str) -> Result<CatalogNode, BrowseError> {
    let path = absolute_path(tree.root(), path);
    let node = tree.resolve(&path).await;
    node.ok_or(BrowseError::NotFound(path))
}

/// Paths not starting with `/` are taken relative to the tree root.
fn absolute_path(root: &str, path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        let relative = path.trim_end_matches('/');
        if relative.is_empty() {
            root.to_string()
        } else {
            format!("{root}/{relative}")
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BrowseError> {
    let json = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}
