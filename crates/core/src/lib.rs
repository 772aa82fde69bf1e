//! Virtual Catalog Core - Catalog data model.
//!
//! This crate provides the types shared by every virtual catalog component:
//! - `virtual-catalog` - Catalog cache, path resolver, and paged listings
//! - `virtual-catalog-cli` - Terminal browser for the virtual tree
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no caches, no HTTP clients.
//! Values are built once from a backend response and never mutated afterwards.
//!
//! # Modules
//!
//! - [`types`] - Category ids, prices, products with variants, and category trees

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
