//! GraphQL backend tests against a local mock endpoint.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use virtual_catalog::{CatalogBackend, CatalogError, GraphqlCatalogClient, GraphqlConfig};
use virtual_catalog_core::CategoryId;
use virtual_catalog_integration_tests::{
    MockCatalogServer, MockResponse, category_json, product_json,
};

async fn client(server: &MockCatalogServer) -> GraphqlCatalogClient {
    GraphqlCatalogClient::new(&server.config(Some("secret-token"))).unwrap()
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_product_by_sku_sends_store_and_token() {
    let server = MockCatalogServer::start().await;
    let mut coat = product_json("meskwielt", "El Gordo Down Jacket");
    coat["__typename"] = json!("ConfigurableProduct");
    coat["variants"] = json!([{ "product": product_json("meskwielt-s", "") }]);
    server.respond(
        "GetProductBySku",
        MockResponse::data(json!({ "products": { "items": [coat] } })),
    );

    let product = client(&server)
        .await
        .product_by_sku("meskwielt", "french")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(product.sku, "meskwielt");
    assert_eq!(product.variants.len(), 1);
    assert_eq!(product.price.as_ref().unwrap().formatted(), "USD 29.5");
    assert_eq!(product.view(Some("meskwielt-s")).name(), Some("El Gordo Down Jacket"));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.store.as_deref(), Some("french"));
    assert_eq!(request.authorization.as_deref(), Some("Bearer secret-token"));
    assert_eq!(request.variables["sku"], "meskwielt");
    assert!(request.query.contains("ConfigurableProduct"));
}

#[tokio::test]
async fn test_unknown_sku_is_none() {
    let server = MockCatalogServer::start().await;
    server.respond(
        "GetProductBySku",
        MockResponse::data(json!({ "products": { "items": [] } })),
    );

    let product = client(&server).await.product_by_sku("nope", "default").await.unwrap();
    assert!(product.is_none());
}

#[tokio::test]
async fn test_search_products_variables() {
    let server = MockCatalogServer::start().await;
    server.respond(
        "SearchProducts",
        MockResponse::data(json!({ "products": { "total_count": 2, "items": [
            product_json("sku-1", "Jacket"),
            product_json("sku-2", "Down Jacket")
        ] } })),
    );

    let products = client(&server)
        .await
        .search_products("jacket", 2, 10, "default")
        .await
        .unwrap();
    assert_eq!(products.len(), 2);

    let request = &server.requests()[0];
    assert_eq!(request.variables["search"], "jacket");
    assert_eq!(request.variables["currentPage"], 2);
    assert_eq!(request.variables["pageSize"], 10);
}

#[tokio::test]
async fn test_empty_search_lists_all_products() {
    let server = MockCatalogServer::start().await;
    server.respond(
        "SearchAllProducts",
        MockResponse::data(json!({ "products": { "total_count": 3, "items": [
            product_json("sku-1", "Jacket"),
            product_json("sku-2", "Parka"),
            product_json("sku-3", "Trench")
        ] } })),
    );

    let products = client(&server)
        .await
        .search_products("", 1, 20, "default")
        .await
        .unwrap();
    assert_eq!(products.len(), 3);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.operation_name, "SearchAllProducts");
    assert!(request.variables.get("search").is_none());
    assert_eq!(request.variables["currentPage"], 1);
    assert_eq!(request.variables["pageSize"], 20);
    assert!(request.query.contains(r#"filter: { price: { from: "" } }"#));
    assert!(request.query.contains("sort: { relevance: DESC }"));
}

#[tokio::test]
async fn test_category_products_page() {
    let server = MockCatalogServer::start().await;
    server.respond(
        "GetCategoryProducts",
        MockResponse::data(json!({ "category": { "products": {
            "total_count": 8,
            "items": [product_json("product-4", "Four"), product_json("product-5", "Five")]
        } } })),
    );

    let page = client(&server)
        .await
        .category_products(CategoryId::new(1), 2, 3, "default")
        .await
        .unwrap();
    assert_eq!(page.total_count, Some(8));
    assert_eq!(page.items.len(), 2);

    let request = &server.requests()[0];
    assert_eq!(request.variables["id"], 1);
    assert_eq!(request.variables["currentPage"], 2);
    assert_eq!(request.variables["pageSize"], 3);
}

// ============================================================================
// Categories
// ============================================================================

#[tokio::test]
async fn test_category_tree_is_pruned_to_depth() {
    let server = MockCatalogServer::start().await;
    let coats = category_json(3, "Coats", "men/coats", &[]);
    let men = category_json(2, "Men", "men", &[coats]);
    let root = category_json(1, "Root", "", &[men]);
    server.respond(
        "GetCategoryTree",
        MockResponse::data(json!({ "categoryList": [root] })),
    );

    let tree = client(&server)
        .await
        .category_tree(CategoryId::new(1), 2, "default")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(tree.children.len(), 1);
    let men = &tree.children[0];
    assert!(men.children.is_empty());
    assert!(men.has_unloaded_children());
    assert_eq!(server.requests()[0].variables["id"], "1");
}

#[tokio::test]
async fn test_categories_by_url_key() {
    let server = MockCatalogServer::start().await;
    server.respond_with("GetCategoriesByUrlKey", |variables| {
        let key = variables["urlKey"].as_str().unwrap_or_default();
        MockResponse::data(json!({ "categoryList": [
            category_json(3, "Coats", &format!("men/{key}"), &[]),
            category_json(5, "Coats", &format!("women/{key}"), &[])
        ] }))
    });

    let categories = client(&server)
        .await
        .categories_by_url_key("coats", "default")
        .await
        .unwrap();
    let paths: Vec<_> = categories.iter().filter_map(|c| c.url_path.as_deref()).collect();
    assert_eq!(paths, vec!["men/coats", "women/coats"]);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_rate_limited_honors_retry_after() {
    let server = MockCatalogServer::start().await;
    server.respond(
        "GetProductBySku",
        MockResponse::raw(StatusCode::TOO_MANY_REQUESTS, "slow down").with_header("Retry-After", "7"),
    );

    let err = client(&server).await.product_by_sku("a", "default").await.unwrap_err();
    assert!(matches!(err, CatalogError::RateLimited(7)));
}

#[tokio::test]
async fn test_server_error_status() {
    let server = MockCatalogServer::start().await;
    server.respond(
        "GetProductBySku",
        MockResponse::raw(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
    );

    let err = client(&server).await.product_by_sku("a", "default").await.unwrap_err();
    assert!(matches!(err, CatalogError::GraphQL(_)));
    assert!(err.to_string().contains("HTTP 500"));
}

#[tokio::test]
async fn test_graphql_errors() {
    let server = MockCatalogServer::start().await;
    server.respond("GetProductBySku", MockResponse::errors(&["Unknown store"]));

    let err = client(&server).await.product_by_sku("a", "default").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "GraphQL errors: Unknown store path: products.0 at line 2:3"
    );
}

#[tokio::test]
async fn test_malformed_json() {
    let server = MockCatalogServer::start().await;
    server.respond("GetProductBySku", MockResponse::raw(StatusCode::OK, "{not json"));

    let err = client(&server).await.product_by_sku("a", "default").await.unwrap_err();
    assert!(matches!(err, CatalogError::Parse(_)));
}

#[tokio::test]
async fn test_missing_data() {
    let server = MockCatalogServer::start().await;
    server.respond(
        "GetProductBySku",
        MockResponse::json(StatusCode::OK, &json!({ "data": null })),
    );

    let err = client(&server).await.product_by_sku("a", "default").await.unwrap_err();
    assert!(err.to_string().contains("No data in response"));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let config = GraphqlConfig {
        endpoint: "http://127.0.0.1:1/graphql".to_string(),
        auth_token: None,
        timeout: Duration::from_secs(2),
    };

    let client = GraphqlCatalogClient::new(&config).unwrap();
    let err = client.product_by_sku("a", "default").await.unwrap_err();
    assert!(matches!(err, CatalogError::Http(_)));
}
