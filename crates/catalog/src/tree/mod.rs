//! The catalog as a virtual tree of paths.

mod iterator;
mod mapper;
pub mod node;

pub use iterator::{CategoryProductsIterator, IteratorState};
pub use mapper::CatalogTree;
pub use node::{CatalogNode, NodeKind};
