//! GraphQL catalog backend.
//!
//! Uses `graphql_client` derived queries and response envelopes with `reqwest` 0.13 for
//! HTTP. Every request carries the store view in the `Store` header.

mod client;
mod conversions;
pub mod queries;

pub use client::GraphqlCatalogClient;
