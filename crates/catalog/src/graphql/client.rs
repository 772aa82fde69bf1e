//! HTTP client for the catalog GraphQL endpoint.

use std::sync::Arc;

use graphql_client::{GraphQLQuery, PathFragment, Response};
use secrecy::ExposeSecret;
use tracing::{debug, instrument};
use virtual_catalog_core::{CatalogProduct, CategoryId, CategoryNode, CategoryProducts};

use crate::backend::{CatalogBackend, MAX_CATEGORY_DEPTH};
use crate::config::GraphqlConfig;
use crate::error::{CatalogError, GraphQLError, GraphQLErrorLocation};

use super::conversions::{
    convert_categories_by_url_key, convert_category_products, convert_category_tree,
    convert_product_by_sku, convert_search, convert_search_all,
};
use super::queries::{
    GetCategoriesByUrlKey, GetCategoryProducts, GetCategoryTree, GetProductBySku,
    SearchAllProducts, SearchProducts, get_categories_by_url_key, get_category_products,
    get_category_tree, get_product_by_sku, search_all_products, search_products,
};

/// Header selecting the store view a request is answered for.
const STORE_HEADER: &str = "Store";

/// Longest response excerpt written to the log.
const LOG_BODY_LIMIT: usize = 500;

/// Catalog backend speaking GraphQL over HTTP.
#[derive(Clone)]
pub struct GraphqlCatalogClient {
    inner: Arc<GraphqlCatalogClientInner>,
}

struct GraphqlCatalogClientInner {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl GraphqlCatalogClient {
    /// Create a client for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &GraphqlConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(GraphqlCatalogClientInner {
                client,
                endpoint: config.endpoint.clone(),
                auth_token: config
                    .auth_token
                    .as_ref()
                    .map(|t| t.expose_secret().to_string()),
            }),
        })
    }

    /// The GraphQL endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Execute a GraphQL query against one store view.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
        store_view: &str,
    ) -> Result<Q::ResponseData, CatalogError>
    where
        Q::Variables: serde::Serialize,
    {
        let request_body = Q::build_query(variables);

        let mut request = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header(STORE_HEADER, store_view)
            .header("Content-Type", "application/json");
        if let Some(token) = &self.inner.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.json(&request_body).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CatalogError::RateLimited(retry_after));
        }

        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                operation = request_body.operation_name,
                body = %excerpt(&response_text, LOG_BODY_LIMIT),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::graphql_message(format!(
                "HTTP {status}: {}",
                excerpt(&response_text, 200)
            )));
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    operation = request_body.operation_name,
                    body = %excerpt(&response_text, LOG_BODY_LIMIT),
                    "Failed to parse catalog GraphQL response"
                );
                return Err(CatalogError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");
            return Err(CatalogError::GraphQL(
                errors.into_iter().map(convert_graphql_error).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                operation = request_body.operation_name,
                body = %excerpt(&response_text, LOG_BODY_LIMIT),
                "Catalog GraphQL response has no data and no errors"
            );
            CatalogError::graphql_message("No data in response")
        })
    }
}

impl CatalogBackend for GraphqlCatalogClient {
    #[instrument(skip(self), fields(sku = %sku, store = %store_view))]
    async fn product_by_sku(
        &self,
        sku: &str,
        store_view: &str,
    ) -> Result<Option<CatalogProduct>, CatalogError> {
        let data = self
            .execute::<GetProductBySku>(
                get_product_by_sku::Variables {
                    sku: sku.to_string(),
                },
                store_view,
            )
            .await?;

        Ok(convert_product_by_sku(data)
            .into_iter()
            .find(|p| p.sku == sku))
    }

    #[instrument(skip(self), fields(text = %text, store = %store_view))]
    async fn search_products(
        &self,
        text: &str,
        page: u32,
        page_size: u32,
        store_view: &str,
    ) -> Result<Vec<CatalogProduct>, CatalogError> {
        let current_page = i64::from(page);
        let page_size = i64::from(page_size);

        let results = if text.is_empty() {
            let data = self
                .execute::<SearchAllProducts>(
                    search_all_products::Variables {
                        current_page,
                        page_size,
                    },
                    store_view,
                )
                .await?;
            convert_search_all(data)
        } else {
            let data = self
                .execute::<SearchProducts>(
                    search_products::Variables {
                        search: text.to_string(),
                        current_page,
                        page_size,
                    },
                    store_view,
                )
                .await?;
            convert_search(data)
        };

        Ok(results.items)
    }

    #[instrument(skip(self), fields(id = %id, store = %store_view))]
    async fn category_tree(
        &self,
        id: CategoryId,
        depth: usize,
        store_view: &str,
    ) -> Result<Option<CategoryNode>, CatalogError> {
        let data = self
            .execute::<GetCategoryTree>(
                get_category_tree::Variables { id: id.to_string() },
                store_view,
            )
            .await?;

        let depth = depth.clamp(1, MAX_CATEGORY_DEPTH);
        Ok(convert_category_tree(data)
            .into_iter()
            .find(|c| c.id == id)
            .map(|c| c.pruned(depth)))
    }

    #[instrument(skip(self), fields(url_key = %url_key, store = %store_view))]
    async fn categories_by_url_key(
        &self,
        url_key: &str,
        store_view: &str,
    ) -> Result<Vec<CategoryNode>, CatalogError> {
        let data = self
            .execute::<GetCategoriesByUrlKey>(
                get_categories_by_url_key::Variables {
                    url_key: url_key.to_string(),
                },
                store_view,
            )
            .await?;

        Ok(convert_categories_by_url_key(data))
    }

    #[instrument(skip(self), fields(id = %id, page, store = %store_view))]
    async fn category_products(
        &self,
        id: CategoryId,
        page: u32,
        page_size: u32,
        store_view: &str,
    ) -> Result<CategoryProducts, CatalogError> {
        let data = self
            .execute::<GetCategoryProducts>(
                get_category_products::Variables {
                    id: i64::from(id.as_i32()),
                    current_page: i64::from(page),
                    page_size: i64::from(page_size),
                },
                store_view,
            )
            .await?;

        Ok(convert_category_products(data))
    }
}

fn convert_graphql_error(e: graphql_client::Error) -> GraphQLError {
    GraphQLError {
        message: e.message,
        locations: e.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: e.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    PathFragment::Key(s) => serde_json::Value::String(s),
                    PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
    }
}

fn excerpt(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
