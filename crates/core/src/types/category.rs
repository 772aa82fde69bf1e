//! Category trees and paged category product listings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::id::CategoryId;
use super::product::CatalogProduct;

/// A node of the remote category tree.
///
/// Children are shared (`Arc`) so that a subtree fetched once can be cached
/// and handed out independently of its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    /// Category id, unique within a catalog.
    pub id: CategoryId,
    /// Display name.
    pub name: Option<String>,
    /// Last URL segment of the category.
    pub url_key: Option<String>,
    /// Full URL path below the catalog root (e.g. `men/coats`).
    pub url_path: Option<String>,
    /// Number of products in this category and its descendants.
    pub product_count: u32,
    /// Number of direct child categories announced by the backend.
    pub children_count: u32,
    /// Child categories that were fetched along with this node.
    #[serde(default)]
    pub children: Vec<Arc<CategoryNode>>,
}

impl CategoryNode {
    /// Whether the category has no child categories.
    ///
    /// A node fetched at the depth limit may have no `children` loaded while
    /// still announcing some through `children_count`; it is not a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.children_count == 0
    }

    /// Whether `children_count` announces children that were not fetched.
    #[must_use]
    pub fn has_unloaded_children(&self) -> bool {
        self.children.is_empty() && self.children_count > 0
    }

    /// Whether this node can be placed in the virtual tree.
    #[must_use]
    pub fn is_addressable(&self) -> bool {
        let present = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        present(&self.name) && present(&self.url_path)
    }

    /// Copy of this tree truncated to `depth` levels (1 = this node only).
    #[must_use]
    pub fn pruned(&self, depth: usize) -> Self {
        let children = if depth <= 1 {
            Vec::new()
        } else {
            self.children
                .iter()
                .map(|child| Arc::new(child.pruned(depth - 1)))
                .collect()
        };

        Self {
            children,
            ..self.clone_shallow()
        }
    }

    fn clone_shallow(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            url_key: self.url_key.clone(),
            url_path: self.url_path.clone(),
            product_count: self.product_count,
            children_count: self.children_count,
            children: Vec::new(),
        }
    }
}

/// One page of products of a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryProducts {
    /// Products on this page, in backend order.
    pub items: Vec<CatalogProduct>,
    /// Total number of products in the category, if announced.
    pub total_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i32, path: &str, children: Vec<CategoryNode>) -> CategoryNode {
        CategoryNode {
            id: CategoryId::new(id),
            name: Some(path.rsplit('/').next().unwrap_or(path).to_string()),
            url_key: path.rsplit('/').next().map(String::from),
            url_path: Some(path.to_string()),
            product_count: 0,
            children_count: u32::try_from(children.len()).unwrap_or(u32::MAX),
            children: children.into_iter().map(Arc::new).collect(),
        }
    }

    #[test]
    fn test_leaf_detection() {
        let leaf = node(3, "men/coats", vec![]);
        assert!(leaf.is_leaf());

        let parent = node(2, "men", vec![leaf]);
        assert!(!parent.is_leaf());
    }

    #[test]
    fn test_unloaded_children_are_not_a_leaf() {
        let mut shallow = node(2, "men", vec![]);
        shallow.children_count = 4;
        assert!(!shallow.is_leaf());
        assert!(shallow.has_unloaded_children());
    }

    #[test]
    fn test_pruned_keeps_requested_levels() {
        let tree = node(
            1,
            "",
            vec![node(2, "men", vec![node(3, "men/coats", vec![])])],
        );

        let pruned = tree.pruned(2);
        assert_eq!(pruned.children.len(), 1);
        assert!(pruned.children.iter().all(|c| c.children.is_empty()));
        assert_eq!(pruned.children_count, 1);
    }

    #[test]
    fn test_addressable_requires_name_and_path() {
        let mut category = node(2, "men", vec![]);
        assert!(category.is_addressable());
        category.url_path = Some("  ".to_string());
        assert!(!category.is_addressable());
    }
}
