//! Virtual catalog library.
//!
//! Exposes a remote GraphQL commerce catalog as a tree of paths: categories
//! at their URL path below a configured root, products below their category,
//! variants below their product. Backend lookups go through bounded,
//! time-expiring caches with one in-flight load per key, and category
//! listings are fetched lazily page by page.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
mod cache;
pub mod config;
pub mod error;
pub mod graphql;
pub mod service;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod tree;

pub use backend::{CatalogBackend, MAX_CATEGORY_DEPTH};
pub use config::{CacheSettings, CatalogConfig, ConfigError, GraphqlConfig, TreeConfig};
pub use error::CatalogError;
pub use graphql::GraphqlCatalogClient;
pub use service::CatalogService;
pub use tree::{CatalogNode, CatalogTree, CategoryProductsIterator, IteratorState, NodeKind};
