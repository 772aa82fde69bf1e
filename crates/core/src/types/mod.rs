//! Core types for the virtual catalog.
//!
//! This module provides the immutable catalog entities fetched from the
//! remote commerce backend.

pub mod category;
pub mod id;
pub mod price;
pub mod product;

pub use category::{CategoryNode, CategoryProducts};
pub use id::*;
pub use price::Price;
pub use product::{CatalogProduct, ProductVariant, ProductView};
