//! Catalog products, their variants, and the variant-aware product view.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product as returned by the remote catalog, keyed by SKU.
///
/// Configurable products carry their purchasable variants; simple products
/// have an empty `variants` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Backend product id.
    pub id: Option<ProductId>,
    /// Stock-keeping unit (unique key).
    pub sku: String,
    /// Display name.
    pub name: Option<String>,
    /// HTML description.
    pub description: Option<String>,
    /// URL key (slug).
    pub url_key: Option<String>,
    /// Regular price.
    pub price: Option<Price>,
    /// Main image URL.
    pub image_url: Option<String>,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Last update time as reported by the backend.
    pub updated_at: Option<NaiveDateTime>,
    /// Purchasable variants (configurable products only).
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

/// A purchasable variant of a configurable product, keyed by its own SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Backend product id of the variant.
    pub id: Option<ProductId>,
    /// Variant SKU.
    pub sku: String,
    /// Display name.
    pub name: Option<String>,
    /// HTML description.
    pub description: Option<String>,
    /// URL key (slug).
    pub url_key: Option<String>,
    /// Regular price.
    pub price: Option<Price>,
    /// Main image URL.
    pub image_url: Option<String>,
    /// Thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Last update time as reported by the backend.
    pub updated_at: Option<NaiveDateTime>,
}

impl CatalogProduct {
    /// Find a variant by SKU.
    #[must_use]
    pub fn variant(&self, sku: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.sku == sku)
    }

    /// View this product, optionally with an active variant selected.
    #[must_use]
    pub fn view<'a>(&'a self, active_variant_sku: Option<&'a str>) -> ProductView<'a> {
        ProductView::new(self, active_variant_sku)
    }

    /// Image URL of the product, falling back to the first variant's image.
    #[must_use]
    pub fn image_or_first_variant_image(&self) -> Option<&str> {
        non_empty(self.image_url.as_deref()).or_else(|| {
            self.variants
                .first()
                .and_then(|v| non_empty(v.image_url.as_deref()))
        })
    }
}

/// A base product seen through one of its variants.
///
/// With an active variant every field comes from the variant when non-empty
/// and falls back to the base product. Without one, the base product wins and
/// the first variant fills the gaps.
#[derive(Debug, Clone, Copy)]
pub struct ProductView<'a> {
    product: &'a CatalogProduct,
    master_variant: Option<&'a ProductVariant>,
    active_variant_sku: Option<&'a str>,
}

impl<'a> ProductView<'a> {
    /// Build a view. An unknown `active_variant_sku` keeps the SKU as active
    /// but reads variant fields from the first variant.
    #[must_use]
    pub fn new(product: &'a CatalogProduct, active_variant_sku: Option<&'a str>) -> Self {
        let master_variant = active_variant_sku
            .and_then(|sku| product.variant(sku))
            .or_else(|| product.variants.first());

        Self {
            product,
            master_variant,
            active_variant_sku,
        }
    }

    /// The base product.
    #[must_use]
    pub const fn product(&self) -> &'a CatalogProduct {
        self.product
    }

    /// SKU of the active variant, if any.
    #[must_use]
    pub const fn active_variant_sku(&self) -> Option<&'a str> {
        self.active_variant_sku
    }

    /// Whether this view represents a variant rather than the base product.
    #[must_use]
    pub const fn is_variant(&self) -> bool {
        self.active_variant_sku.is_some()
    }

    fn pick(&self, base: Option<&'a str>, variant: Option<&'a str>) -> Option<&'a str> {
        let (base, variant) = (non_empty(base), non_empty(variant));
        if self.is_variant() {
            variant.or(base)
        } else {
            base.or(variant)
        }
    }

    fn pick_ref<T>(&self, base: Option<&'a T>, variant: Option<&'a T>) -> Option<&'a T> {
        if self.is_variant() {
            variant.or(base)
        } else {
            base.or(variant)
        }
    }

    /// Backend id of the active variant, or of the base product.
    #[must_use]
    pub fn id(&self) -> Option<ProductId> {
        if self.is_variant() {
            self.master_variant.and_then(|v| v.id).or(self.product.id)
        } else {
            self.product.id
        }
    }

    /// SKU of the active variant, or of the base product.
    #[must_use]
    pub fn sku(&self) -> &'a str {
        self.active_variant_sku.unwrap_or(self.product.sku.as_str())
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        self.pick(
            self.product.name.as_deref(),
            self.master_variant.and_then(|v| v.name.as_deref()),
        )
    }

    /// HTML description.
    #[must_use]
    pub fn description(&self) -> Option<&'a str> {
        self.pick(
            self.product.description.as_deref(),
            self.master_variant.and_then(|v| v.description.as_deref()),
        )
    }

    /// URL key (slug).
    #[must_use]
    pub fn url_key(&self) -> Option<&'a str> {
        self.pick(
            self.product.url_key.as_deref(),
            self.master_variant.and_then(|v| v.url_key.as_deref()),
        )
    }

    /// Main image URL.
    #[must_use]
    pub fn image_url(&self) -> Option<&'a str> {
        self.pick(
            self.product.image_url.as_deref(),
            self.master_variant.and_then(|v| v.image_url.as_deref()),
        )
    }

    /// Thumbnail URL.
    #[must_use]
    pub fn thumbnail_url(&self) -> Option<&'a str> {
        self.pick(
            self.product.thumbnail_url.as_deref(),
            self.master_variant.and_then(|v| v.thumbnail_url.as_deref()),
        )
    }

    /// Regular price.
    #[must_use]
    pub fn price(&self) -> Option<&'a Price> {
        self.pick_ref(
            self.product.price.as_ref(),
            self.master_variant.and_then(|v| v.price.as_ref()),
        )
    }

    /// Last update time.
    #[must_use]
    pub fn updated_at(&self) -> Option<&'a NaiveDateTime> {
        self.pick_ref(
            self.product.updated_at.as_ref(),
            self.master_variant.and_then(|v| v.updated_at.as_ref()),
        )
    }

    /// One view per variant of the base product, each with that variant active.
    #[must_use]
    pub fn variants(&self) -> Vec<ProductView<'a>> {
        self.product
            .variants
            .iter()
            .map(|v| ProductView::new(self.product, Some(v.sku.as_str())))
            .collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
