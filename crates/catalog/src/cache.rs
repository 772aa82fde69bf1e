//! Cache keys, cached values, and the single-flight load helper.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use virtual_catalog_core::{CategoryId, CategoryNode};

use crate::config::{CacheSettings, MAX_CACHE_TTL_MINUTES};
use crate::error::CatalogError;

/// Key of the product cache.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ProductKey {
    pub sku: String,
    pub store_view: String,
}

/// Key of the category-products cache.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CategoryProductsKey {
    pub id: CategoryId,
    pub page: u32,
    pub page_size: u32,
    pub store_view: String,
}

/// Key of the category cache, shared by lookups by id and by URL key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CategoryKey {
    Id { id: CategoryId, store_view: String },
    UrlKey { url_key: String, store_view: String },
}

/// Cached category data.
#[derive(Debug, Clone)]
pub enum CategoryValue {
    Tree(Option<Arc<CategoryNode>>),
    Candidates(Arc<[Arc<CategoryNode>]>),
}

/// Build a cache for `settings`, or `None` when caching is disabled.
///
/// The time to live is capped at [`MAX_CACHE_TTL_MINUTES`].
pub fn build<K, V>(settings: &CacheSettings) -> Option<Cache<K, V>>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    settings.is_active().then(|| {
        Cache::builder()
            .max_capacity(settings.max_size)
            .time_to_live(settings.ttl.min(Duration::from_secs(MAX_CACHE_TTL_MINUTES * 60)))
            .eviction_policy(EvictionPolicy::lru())
            .build()
    })
}

/// Look `key` up, running `load` on a miss.
///
/// Concurrent misses on the same key share one `load`. A failed load is not
/// stored. Returns the value and whether it was loaded by this call.
pub async fn get_or_load<K, V, F>(
    cache: Option<&Cache<K, V>>,
    key: K,
    load: F,
) -> Result<(V, bool), CatalogError>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: Future<Output = Result<V, CatalogError>>,
{
    let Some(cache) = cache else {
        return load.await.map(|value| (value, true));
    };

    let entry = cache.entry(key).or_try_insert_with(load).await?;
    let fresh = entry.is_fresh();
    Ok((entry.into_value(), fresh))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_settings_build_no_cache() {
        assert!(build::<String, u32>(&CacheSettings::disabled()).is_none());

        let zero = CacheSettings {
            enabled: true,
            max_size: 0,
            ttl: Duration::from_secs(60),
        };
        assert!(build::<String, u32>(&zero).is_none());
        assert!(build::<String, u32>(&CacheSettings::product_default()).is_some());
    }

    #[test]
    fn test_oversized_ttl_is_capped() {
        let forever = CacheSettings::minutes(10, u64::MAX);
        assert!(build::<String, u32>(&forever).is_some());
    }

    #[tokio::test]
    async fn test_failed_load_is_not_stored() {
        let cache = build::<String, u32>(&CacheSettings::minutes(10, 5));

        let err = get_or_load(cache.as_ref(), "k".to_string(), async {
            Err(CatalogError::Backend("down".to_string()))
        })
        .await;
        assert!(err.is_err());

        let (value, fresh) = get_or_load(cache.as_ref(), "k".to_string(), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(fresh);

        let (value, fresh) = get_or_load(cache.as_ref(), "k".to_string(), async { Ok(8) })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(!fresh);
    }
}
