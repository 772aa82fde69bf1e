//! Nodes of the virtual catalog tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde::ser::SerializeStruct;
use serde_json::Value;
use virtual_catalog_core::{CatalogProduct, CategoryNode, ProductView};

/// Provider name reported by every node.
pub const COMMERCE_PROVIDER: &str = "graphql";

/// Last path segment of error nodes.
pub const ERROR_NODE_NAME: &str = "error";

/// Last path segment of product image nodes.
pub const IMAGE_NODE_NAME: &str = "image";

/// Property keys of the node value map.
pub mod props {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const IDENTIFIER: &str = "identifier";
    pub const SKU: &str = "sku";
    pub const SLUG: &str = "slug";
    pub const LAST_MODIFIED: &str = "lastModified";
    pub const FORMATTED_PRICE: &str = "formattedPrice";
    pub const COMMERCE_TYPE: &str = "commerceType";
    pub const COMMERCE_PROVIDER: &str = "commerceProvider";
    pub const CIF_ID: &str = "cifId";
    pub const IS_LEAF: &str = "isLeaf";
    pub const IMAGE_URL: &str = "imageUrl";
    pub const IS_ERROR: &str = "isError";
    pub const HAS_CHILDREN: &str = "hasChildren";
}

/// What a node represents, with the data it was built from.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Category(Arc<CategoryNode>),
    Product(Arc<CatalogProduct>),
    Variant {
        product: Arc<CatalogProduct>,
        sku: String,
    },
    Image {
        url: String,
    },
    Error,
}

impl NodeKind {
    /// Lowercase name of the kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Category(_) => "category",
            Self::Product(_) => "product",
            Self::Variant { .. } => "variant",
            Self::Image { .. } => "image",
            Self::Error => "error",
        }
    }
}

/// A node of the virtual tree: a path, its kind, and a flat value map.
#[derive(Debug, Clone)]
pub struct CatalogNode {
    path: String,
    kind: NodeKind,
    properties: BTreeMap<String, Value>,
}

impl CatalogNode {
    /// Node for a category.
    #[must_use]
    pub fn category(path: impl Into<String>, category: Arc<CategoryNode>) -> Self {
        let mut properties = base_properties("category");
        properties.insert(props::CIF_ID.into(), category.id.as_i32().into());
        properties.insert(props::IS_LEAF.into(), category.is_leaf().into());
        properties.insert(props::HAS_CHILDREN.into(), (!category.is_leaf()).into());
        properties.insert(
            props::TITLE.into(),
            category
                .name
                .clone()
                .unwrap_or_else(|| COMMERCE_PROVIDER.to_string())
                .into(),
        );
        insert_opt(&mut properties, props::SLUG, category.url_key.as_deref());

        Self {
            path: path.into(),
            kind: NodeKind::Category(category),
            properties,
        }
    }

    /// Node for a base product.
    #[must_use]
    pub fn product(path: impl Into<String>, product: Arc<CatalogProduct>) -> Self {
        let properties = product_properties(&product.view(None));
        Self {
            path: path.into(),
            kind: NodeKind::Product(product),
            properties,
        }
    }

    /// Node for a product seen through the variant `sku`.
    #[must_use]
    pub fn variant(
        path: impl Into<String>,
        product: Arc<CatalogProduct>,
        sku: impl Into<String>,
    ) -> Self {
        let sku = sku.into();
        let properties = product_properties(&product.view(Some(sku.as_str())));
        Self {
            path: path.into(),
            kind: NodeKind::Variant { product, sku },
            properties,
        }
    }

    /// Node for a product image.
    #[must_use]
    pub fn image(path: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let mut properties = base_properties("image");
        properties.insert(props::TITLE.into(), IMAGE_NODE_NAME.into());
        properties.insert(props::IMAGE_URL.into(), url.clone().into());
        properties.insert(props::HAS_CHILDREN.into(), false.into());
        Self {
            path: path.into(),
            kind: NodeKind::Image { url },
            properties,
        }
    }

    /// Placeholder reported in place of the children of `parent_path`
    /// when they could not be fetched.
    #[must_use]
    pub fn error(parent_path: &str) -> Self {
        let mut properties = base_properties("category");
        properties.insert(props::TITLE.into(), "Server error".into());
        properties.insert(props::IS_LEAF.into(), true.into());
        properties.insert(props::HAS_CHILDREN.into(), false.into());
        properties.insert(props::IS_ERROR.into(), true.into());
        Self {
            path: format!("{parent_path}/{ERROR_NODE_NAME}"),
            kind: NodeKind::Error,
            properties,
        }
    }

    /// Absolute path of the node.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// What the node represents.
    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The value map.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// One value of the value map.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.property(props::TITLE).and_then(Value::as_str)
    }

    /// Whether this is an error placeholder.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, NodeKind::Error)
    }

    /// The category behind a category node.
    #[must_use]
    pub fn as_category(&self) -> Option<&Arc<CategoryNode>> {
        match &self.kind {
            NodeKind::Category(category) => Some(category),
            _ => None,
        }
    }

    /// The base product behind a product or variant node.
    #[must_use]
    pub fn as_product(&self) -> Option<&Arc<CatalogProduct>> {
        match &self.kind {
            NodeKind::Product(product) | NodeKind::Variant { product, .. } => Some(product),
            _ => None,
        }
    }

    /// The product behind a product or variant node, with the variant active.
    #[must_use]
    pub fn product_view(&self) -> Option<ProductView<'_>> {
        match &self.kind {
            NodeKind::Product(product) => Some(product.view(None)),
            NodeKind::Variant { product, sku } => Some(product.view(Some(sku.as_str()))),
            _ => None,
        }
    }
}

impl Serialize for CatalogNode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut node = serializer.serialize_struct("CatalogNode", 3)?;
        node.serialize_field("path", &self.path)?;
        node.serialize_field("kind", self.kind.name())?;
        node.serialize_field("properties", &self.properties)?;
        node.end()
    }
}

fn base_properties(commerce_type: &str) -> BTreeMap<String, Value> {
    let mut properties = BTreeMap::new();
    properties.insert(props::COMMERCE_TYPE.into(), commerce_type.into());
    properties.insert(props::COMMERCE_PROVIDER.into(), COMMERCE_PROVIDER.into());
    properties
}

fn product_properties(view: &ProductView<'_>) -> BTreeMap<String, Value> {
    let mut properties = base_properties(if view.is_variant() {
        "variant"
    } else {
        "product"
    });

    properties.insert(props::SKU.into(), view.sku().into());
    insert_opt(&mut properties, props::TITLE, view.name());
    insert_opt(&mut properties, props::DESCRIPTION, view.description());
    insert_opt(&mut properties, props::SLUG, view.url_key());
    insert_opt(&mut properties, props::IMAGE_URL, view.image_url());
    if let Some(id) = view.id() {
        properties.insert(props::IDENTIFIER.into(), id.as_i32().into());
    }
    if let Some(updated_at) = view.updated_at() {
        properties.insert(
            props::LAST_MODIFIED.into(),
            updated_at.format("%Y-%m-%dT%H:%M:%S").to_string().into(),
        );
    }
    if let Some(price) = view.price() {
        properties.insert(props::FORMATTED_PRICE.into(), price.formatted().into());
    }

    let has_children = !view.is_variant()
        && (!view.product().variants.is_empty()
            || view.product().image_or_first_variant_image().is_some());
    properties.insert(props::HAS_CHILDREN.into(), has_children.into());
    properties
}

fn insert_opt(properties: &mut BTreeMap<String, Value>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        properties.insert(key.into(), value.into());
    }
}
