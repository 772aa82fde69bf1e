//! Virtual tree tests over the full stack: GraphQL client, caches, and
//! path mapping, against a local mock endpoint.

use axum::http::StatusCode;
use serde_json::{Value, json};
use virtual_catalog::tree::node::props;
use virtual_catalog::{
    CacheSettings, CatalogService, CatalogTree, GraphqlCatalogClient, NodeKind, TreeConfig,
};
use virtual_catalog_core::CategoryId;
use virtual_catalog_integration_tests::{
    MockCatalogServer, MockResponse, category_json, product_json,
};

const ROOT: &str = "/var/commerce/products/catalog";

fn coats() -> Value {
    category_json(3, "Coats", "men/coats", &[])
}

fn men() -> Value {
    category_json(2, "Men", "men", &[coats()])
}

fn jacket() -> Value {
    let mut jacket = product_json("meskwielt", "El Gordo Down Jacket");
    jacket["__typename"] = json!("ConfigurableProduct");
    jacket["variants"] = json!([
        { "product": product_json("meskwielt-s", "") },
        { "product": product_json("meskwielt-m", "") }
    ]);
    jacket
}

/// Mock serving a small catalog: Root > Men > Coats, with three coats.
async fn catalog_server() -> MockCatalogServer {
    let server = MockCatalogServer::start().await;

    server.respond(
        "GetCategoryTree",
        MockResponse::data(json!({
            "categoryList": [category_json(1, "Root", "", &[men()])]
        })),
    );
    server.respond_with("GetCategoriesByUrlKey", |variables| {
        let categories = match variables["urlKey"].as_str() {
            Some("men") => vec![men()],
            Some("coats") => vec![coats(), category_json(7, "Coats", "women/coats", &[])],
            _ => Vec::new(),
        };
        MockResponse::data(json!({ "categoryList": categories }))
    });
    server.respond_with("GetProductBySku", |variables| {
        let items = match variables["sku"].as_str() {
            Some("meskwielt") => vec![jacket()],
            Some(sku @ ("parka" | "trench")) => vec![product_json(sku, "Coat")],
            _ => Vec::new(),
        };
        MockResponse::data(json!({ "products": { "items": items } }))
    });
    server.respond_with("GetCategoryProducts", |variables| {
        let all = [jacket(), product_json("parka", "Parka"), product_json("trench", "Trench")];
        let page = variables["currentPage"].as_u64().unwrap_or(1);
        let size = variables["pageSize"].as_u64().unwrap_or(20);
        let items: Vec<Value> = all
            .iter()
            .skip(usize::try_from((page - 1) * size).unwrap())
            .take(usize::try_from(size).unwrap())
            .cloned()
            .collect();
        MockResponse::data(json!({
            "category": { "products": { "total_count": all.len(), "items": items } }
        }))
    });

    server
}

fn tree(server: &MockCatalogServer) -> CatalogTree<GraphqlCatalogClient> {
    let client = GraphqlCatalogClient::new(&server.config(None)).unwrap();
    let service = CatalogService::with_caches(
        client,
        &CacheSettings::product_default(),
        &CacheSettings::category_products_default(),
        &CacheSettings::category_default(),
    );
    let config = TreeConfig {
        root_path: ROOT.to_string(),
        root_category_id: CategoryId::new(1),
        store_view: "default".to_string(),
        page_size: 2,
    };
    CatalogTree::new(config, service).unwrap()
}

fn paths(nodes: &[virtual_catalog::CatalogNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.path()).collect()
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn test_resolve_root_and_categories() {
    let server = catalog_server().await;
    let tree = tree(&server);

    let root = tree.resolve(ROOT).await.unwrap();
    assert_eq!(root.as_category().unwrap().id, CategoryId::new(1));

    let coats = tree.resolve(&format!("{ROOT}/men/coats")).await.unwrap();
    assert_eq!(coats.title(), Some("Coats"));
    assert_eq!(coats.as_category().unwrap().id, CategoryId::new(3));

    let women = tree.resolve(&format!("{ROOT}/women/coats")).await.unwrap();
    assert_eq!(women.as_category().unwrap().id, CategoryId::new(7));
}

#[tokio::test]
async fn test_resolve_product_and_variant() {
    let server = catalog_server().await;
    let tree = tree(&server);

    let product = tree
        .resolve(&format!("{ROOT}/men/coats/meskwielt"))
        .await
        .unwrap();
    assert!(matches!(product.kind(), NodeKind::Product(_)));
    assert_eq!(product.title(), Some("El Gordo Down Jacket"));

    let variant = tree
        .resolve(&format!("{ROOT}/men/coats/meskwielt/meskwielt-m"))
        .await
        .unwrap();
    assert!(matches!(variant.kind(), NodeKind::Variant { .. }));
    assert_eq!(variant.property(props::SKU), Some(&json!("meskwielt-m")));
    assert_eq!(variant.title(), Some("El Gordo Down Jacket"));

    let image = tree
        .resolve(&format!("{ROOT}/men/coats/meskwielt/image"))
        .await
        .unwrap();
    assert_eq!(
        image.property(props::IMAGE_URL),
        Some(&json!("https://img.example.com/meskwielt.jpg"))
    );
}

#[tokio::test]
async fn test_resolve_unknown_paths() {
    let server = catalog_server().await;
    let tree = tree(&server);

    assert!(tree.resolve("/somewhere/else").await.is_none());
    assert!(tree.resolve(&format!("{ROOT}/men/coats/nope")).await.is_none());
    assert!(
        tree.resolve(&format!("{ROOT}/men/coats/a/b/c"))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_unknown_variant_resolves_with_base_values() {
    let server = catalog_server().await;
    let tree = tree(&server);

    let node = tree
        .resolve(&format!("{ROOT}/men/coats/meskwielt/meskwielt-xl"))
        .await
        .unwrap();
    assert!(matches!(node.kind(), NodeKind::Variant { sku, .. } if sku == "meskwielt-xl"));
    assert_eq!(node.title(), Some("El Gordo Down Jacket"));
}

#[tokio::test]
async fn test_repeated_resolution_is_cached() {
    let server = catalog_server().await;
    let tree = tree(&server);
    let path = format!("{ROOT}/men/coats/meskwielt");

    tree.resolve(&path).await.unwrap();
    let after_first = server.requests().len();
    tree.resolve(&path).await.unwrap();

    assert_eq!(server.requests().len(), after_first);
    assert_eq!(server.request_count("GetProductBySku"), 1);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_category_children() {
    let server = catalog_server().await;
    let tree = tree(&server);

    let root = tree.resolve(ROOT).await.unwrap();
    let children = tree.list_children(&root).await;
    assert_eq!(paths(&children), vec![format!("{ROOT}/men")]);

    let coats = tree.resolve(&format!("{ROOT}/men/coats")).await.unwrap();
    let products = tree.list_children(&coats).await;
    assert_eq!(
        paths(&products),
        vec![
            format!("{ROOT}/men/coats/meskwielt"),
            format!("{ROOT}/men/coats/parka"),
            format!("{ROOT}/men/coats/trench"),
        ]
    );
    assert_eq!(server.request_count("GetCategoryProducts"), 2);
}

#[tokio::test]
async fn test_list_product_children() {
    let server = catalog_server().await;
    let tree = tree(&server);

    let product = tree
        .resolve(&format!("{ROOT}/men/coats/meskwielt"))
        .await
        .unwrap();
    let children = tree.list_children(&product).await;
    assert_eq!(
        paths(&children),
        vec![
            format!("{ROOT}/men/coats/meskwielt/image"),
            format!("{ROOT}/men/coats/meskwielt/meskwielt-s"),
            format!("{ROOT}/men/coats/meskwielt/meskwielt-m"),
        ]
    );
}

#[tokio::test]
async fn test_listing_warms_product_cache() {
    let server = catalog_server().await;
    let tree = tree(&server);

    let coats = tree.resolve(&format!("{ROOT}/men/coats")).await.unwrap();
    tree.list_children(&coats).await;
    tree.resolve(&format!("{ROOT}/men/coats/parka")).await.unwrap();

    assert_eq!(server.request_count("GetProductBySku"), 0);
}

#[tokio::test]
async fn test_backend_failure_lists_error_node() {
    let server = catalog_server().await;
    let tree = tree(&server);
    let coats = tree.resolve(&format!("{ROOT}/men/coats")).await.unwrap();

    server.respond(
        "GetCategoryProducts",
        MockResponse::raw(StatusCode::INTERNAL_SERVER_ERROR, "down"),
    );
    let children = tree.list_children(&coats).await;

    assert_eq!(children.len(), 1);
    assert!(children[0].is_error());
    assert_eq!(children[0].path(), format!("{ROOT}/men/coats/error"));
}

#[tokio::test]
async fn test_search_places_products_below_root() {
    let server = catalog_server().await;
    server.respond(
        "SearchProducts",
        MockResponse::data(json!({ "products": { "items": [product_json("parka", "Parka")] } })),
    );
    let tree = tree(&server);

    let found = tree.search_products("parka", 1, 10).await;
    assert_eq!(paths(&found), vec![format!("{ROOT}/parka")]);
}
