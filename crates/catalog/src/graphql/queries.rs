//! GraphQL query definitions for the commerce catalog API.
//!
//! Uses `graphql_client` to generate typed variables and responses from the
//! schema subset and query documents under `graphql/`.

use graphql_client::GraphQLQuery;

// =============================================================================
// Product queries
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/products.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetProductBySku;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/products.graphql",
    response_derives = "Debug, Clone"
)]
pub struct SearchProducts;

/// Lists every product; used when the search text is empty.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/products.graphql",
    response_derives = "Debug, Clone"
)]
pub struct SearchAllProducts;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/products.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetCategoryProducts;

// =============================================================================
// Category queries
// =============================================================================

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/categories.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetCategoryTree;

#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/categories.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetCategoriesByUrlKey;
