//! Conversions from GraphQL response types to catalog domain types.
//!
//! Every query module carries its own copy of the generated fragment types,
//! so each is first lowered into a [`ProductRecord`] or [`CategoryRecord`].

use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::warn;
use virtual_catalog_core::{
    CatalogProduct, CategoryId, CategoryNode, CategoryProducts, Price, ProductId, ProductVariant,
};

use super::queries::{
    get_categories_by_url_key, get_category_products, get_category_tree, get_product_by_sku,
    search_all_products, search_products,
};

/// Timestamp format used by the catalog backend.
const UPDATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Product fields common to every query module.
#[derive(Debug)]
pub struct ProductRecord {
    id: Option<i64>,
    sku: Option<String>,
    name: Option<String>,
    description: Option<String>,
    url_key: Option<String>,
    updated_at: Option<String>,
    image_url: Option<String>,
    thumbnail_url: Option<String>,
    price: Option<Price>,
    variants: Vec<Self>,
}

/// Category fields common to every query module.
#[derive(Debug)]
pub struct CategoryRecord {
    id: Option<i64>,
    name: Option<String>,
    url_key: Option<String>,
    url_path: Option<String>,
    product_count: Option<i64>,
    children_count: Option<String>,
}

/// Flatten a nullable list of nullable entries.
fn present<T>(list: Option<Vec<Option<T>>>) -> impl Iterator<Item = T> {
    list.unwrap_or_default().into_iter().flatten()
}

macro_rules! product_conversions {
    ($module:ident, $items_on:ident) => {
        impl From<$module::ProductFields> for ProductRecord {
            fn from(fields: $module::ProductFields) -> Self {
                let price = fields
                    .price
                    .and_then(|p| p.regular_price)
                    .and_then(|p| p.amount)
                    .and_then(|money| {
                        let currency = match money.currency {
                            Some($module::CurrencyEnum::Other(code)) => code,
                            Some(code) => format!("{code:?}"),
                            None => String::new(),
                        };
                        convert_price(money.value?, currency)
                    });

                Self {
                    id: fields.id,
                    sku: fields.sku,
                    name: fields.name,
                    description: fields.description.map(|d| d.html),
                    url_key: fields.url_key,
                    updated_at: fields.updated_at,
                    image_url: fields.image.and_then(|i| i.url),
                    thumbnail_url: fields.thumbnail.and_then(|i| i.url),
                    price,
                    variants: Vec::new(),
                }
            }
        }

        impl From<$module::$items_on> for Vec<ProductRecord> {
            fn from(on: $module::$items_on) -> Self {
                match on {
                    $module::$items_on::ConfigurableProduct(configurable) => {
                        present(configurable.variants)
                            .filter_map(|variant| variant.product)
                            .map(ProductRecord::from)
                            .collect()
                    }
                    _ => Vec::new(),
                }
            }
        }
    };
}

product_conversions!(get_product_by_sku, GetProductBySkuProductsItemsOn);
product_conversions!(search_products, SearchProductsProductsItemsOn);
product_conversions!(search_all_products, SearchAllProductsProductsItemsOn);
product_conversions!(
    get_category_products,
    GetCategoryProductsCategoryProductsItemsOn
);

macro_rules! category_conversions {
    ($($module:ident),+) => {$(
        impl From<$module::CategoryFields> for CategoryRecord {
            fn from(fields: $module::CategoryFields) -> Self {
                Self {
                    id: fields.id,
                    name: fields.name,
                    url_key: fields.url_key,
                    url_path: fields.url_path,
                    product_count: fields.product_count,
                    children_count: fields.children_count,
                }
            }
        }
    )+};
}

category_conversions!(get_category_tree, get_categories_by_url_key);

// =============================================================================
// Products
// =============================================================================

/// Products from a `GetProductBySku` response.
pub fn convert_product_by_sku(data: get_product_by_sku::ResponseData) -> Vec<CatalogProduct> {
    let Some(products) = data.products else {
        return Vec::new();
    };
    convert_items(
        present(products.items).map(|item| {
            (
                ProductRecord::from(item.product_fields),
                Vec::<ProductRecord>::from(item.on),
            )
        }),
    )
}

/// A page of search results.
pub fn convert_search(data: search_products::ResponseData) -> CategoryProducts {
    let Some(products) = data.products else {
        return CategoryProducts::default();
    };
    convert_page(
        products.total_count,
        present(products.items).map(|item| {
            (
                ProductRecord::from(item.product_fields),
                Vec::<ProductRecord>::from(item.on),
            )
        }),
    )
}

/// A page of the unfiltered product listing.
pub fn convert_search_all(data: search_all_products::ResponseData) -> CategoryProducts {
    let Some(products) = data.products else {
        return CategoryProducts::default();
    };
    convert_page(
        products.total_count,
        present(products.items).map(|item| {
            (
                ProductRecord::from(item.product_fields),
                Vec::<ProductRecord>::from(item.on),
            )
        }),
    )
}

/// A page of the products assigned to a category.
pub fn convert_category_products(data: get_category_products::ResponseData) -> CategoryProducts {
    let Some(products) = data.category.and_then(|c| c.products) else {
        return CategoryProducts::default();
    };
    convert_page(
        products.total_count,
        present(products.items).map(|item| {
            (
                ProductRecord::from(item.product_fields),
                Vec::<ProductRecord>::from(item.on),
            )
        }),
    )
}

fn convert_page(
    total_count: Option<i64>,
    items: impl Iterator<Item = (ProductRecord, Vec<ProductRecord>)>,
) -> CategoryProducts {
    CategoryProducts {
        items: convert_items(items),
        total_count: total_count.and_then(|n| u32::try_from(n).ok()),
    }
}

fn convert_items(
    items: impl Iterator<Item = (ProductRecord, Vec<ProductRecord>)>,
) -> Vec<CatalogProduct> {
    items
        .filter_map(|(record, variants)| convert_product(ProductRecord { variants, ..record }))
        .collect()
}

/// Convert a product and its variants. Returns `None` for entries without a SKU.
fn convert_product(record: ProductRecord) -> Option<CatalogProduct> {
    let Some(sku) = record.sku.filter(|s| !s.is_empty()) else {
        warn!(id = ?record.id, "Skipping product without SKU");
        return None;
    };

    let variants = record
        .variants
        .into_iter()
        .filter_map(convert_variant)
        .collect();

    Some(CatalogProduct {
        id: convert_product_id(record.id),
        sku,
        name: record.name,
        description: record.description,
        url_key: record.url_key,
        price: record.price,
        image_url: record.image_url,
        thumbnail_url: record.thumbnail_url,
        updated_at: record.updated_at.as_deref().and_then(parse_updated_at),
        variants,
    })
}

fn convert_variant(record: ProductRecord) -> Option<ProductVariant> {
    let Some(sku) = record.sku.filter(|s| !s.is_empty()) else {
        warn!(id = ?record.id, "Skipping variant without SKU");
        return None;
    };

    Some(ProductVariant {
        id: convert_product_id(record.id),
        sku,
        name: record.name,
        description: record.description,
        url_key: record.url_key,
        price: record.price,
        image_url: record.image_url,
        thumbnail_url: record.thumbnail_url,
        updated_at: record.updated_at.as_deref().and_then(parse_updated_at),
    })
}

fn convert_product_id(id: Option<i64>) -> Option<ProductId> {
    id.and_then(|n| i32::try_from(n).ok()).map(ProductId::new)
}

fn convert_price(value: f64, currency: String) -> Option<Price> {
    let amount = Decimal::try_from(value).ok()?;
    Some(Price::new(amount, currency))
}

fn parse_updated_at(value: &str) -> Option<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(value, UPDATED_AT_FORMAT) {
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!(value, error = %e, "Unparseable updated_at");
            None
        }
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Category subtrees from a `GetCategoryTree` response (four levels deep).
pub fn convert_category_tree(data: get_category_tree::ResponseData) -> Vec<CategoryNode> {
    present(data.category_list)
        .filter_map(|root| {
            let children = present(root.children)
                .filter_map(|child| {
                    let grandchildren = present(child.children)
                        .filter_map(|grandchild| {
                            let leaves = present(grandchild.children)
                                .filter_map(|leaf| convert_category(leaf.into(), Vec::new()))
                                .collect();
                            convert_category(grandchild.category_fields.into(), leaves)
                        })
                        .collect();
                    convert_category(child.category_fields.into(), grandchildren)
                })
                .collect();
            convert_category(root.category_fields.into(), children)
        })
        .collect()
}

/// Categories from a `GetCategoriesByUrlKey` response, with their direct children.
pub fn convert_categories_by_url_key(
    data: get_categories_by_url_key::ResponseData,
) -> Vec<CategoryNode> {
    present(data.category_list)
        .filter_map(|category| {
            let children = present(category.children)
                .filter_map(|child| convert_category(child.into(), Vec::new()))
                .collect();
            convert_category(category.category_fields.into(), children)
        })
        .collect()
}

/// Build one category node. Returns `None` for entries without a usable id.
fn convert_category(record: CategoryRecord, children: Vec<CategoryNode>) -> Option<CategoryNode> {
    let Some(id) = record.id.and_then(|n| i32::try_from(n).ok()) else {
        warn!(id = ?record.id, name = ?record.name, "Skipping category without id");
        return None;
    };

    let announced = record
        .children_count
        .as_deref()
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let loaded = u32::try_from(children.len()).unwrap_or(u32::MAX);

    Some(CategoryNode {
        id: CategoryId::new(id),
        name: record.name,
        url_key: record.url_key,
        url_path: record.url_path,
        product_count: record
            .product_count
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        children_count: announced.max(loaded),
        children: children.into_iter().map(Arc::new).collect(),
    })
}
