//! Catalog configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_GRAPHQL_ENDPOINT` - GraphQL endpoint of the commerce backend
//! - `CATALOG_ROOT_CATEGORY_ID` - Id of the category mounted at the tree root
//!
//! ## Optional
//! - `CATALOG_AUTH_TOKEN` - Bearer token sent with every request
//! - `CATALOG_HTTP_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `CATALOG_STORE_VIEW` - Store view sent in the `Store` header (default: default)
//! - `CATALOG_ROOT_PATH` - Virtual tree root (default: /var/commerce/products/catalog)
//! - `CATALOG_PAGE_SIZE` - Category product page size (default: 20)
//! - `CATALOG_PRODUCT_CACHE_ENABLED` / `_SIZE` / `_TTL_MINUTES` (default: true / 1000 / 5)
//! - `CATALOG_CATEGORY_PRODUCTS_CACHE_ENABLED` / `_SIZE` / `_TTL_MINUTES` (default: true / 100 / 5)
//! - `CATALOG_CATEGORY_CACHE_ENABLED` / `_SIZE` / `_TTL_MINUTES` (default: true / 100 / 60)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use virtual_catalog_core::CategoryId;

/// Default virtual tree root.
pub const DEFAULT_ROOT_PATH: &str = "/var/commerce/products/catalog";
/// Default store view.
pub const DEFAULT_STORE_VIEW: &str = "default";
/// Default number of products fetched per category page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Longest cache time to live the cache builder accepts (1000 years).
pub const MAX_CACHE_TTL_MINUTES: u64 = 1000 * 365 * 24 * 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Invalid tree root {0:?}: {1}")]
    InvalidRootPath(String, String),
}

/// Complete catalog configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// GraphQL backend connection
    pub graphql: GraphqlConfig,
    /// Virtual tree mounting
    pub tree: TreeConfig,
    /// Caching of single products by SKU
    pub product_cache: CacheSettings,
    /// Caching of category product pages
    pub category_products_cache: CacheSettings,
    /// Caching of category trees and path lookups
    pub category_cache: CacheSettings,
}

/// GraphQL backend connection settings.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct GraphqlConfig {
    /// Endpoint URL (e.g. <https://shop.example.com/graphql>)
    pub endpoint: String,
    /// Optional bearer token
    pub auth_token: Option<SecretString>,
    /// Request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for GraphqlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphqlConfig")
            .field("endpoint", &self.endpoint)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Where and how the catalog is mounted in the virtual tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Absolute root path, without trailing slash
    pub root_path: String,
    /// Category shown at the root
    pub root_category_id: CategoryId,
    /// Store view (locale) used for every lookup
    pub store_view: String,
    /// Products fetched per page when listing a category
    pub page_size: u32,
}

/// Size and lifetime of one cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// When false the cache is bypassed entirely
    pub enabled: bool,
    /// Maximum number of entries (LRU eviction beyond it)
    pub max_size: u64,
    /// Time to live from insertion
    pub ttl: Duration,
}

impl CacheSettings {
    /// Enabled cache with the given size and TTL in minutes.
    #[must_use]
    pub const fn minutes(max_size: u64, ttl_minutes: u64) -> Self {
        Self {
            enabled: true,
            max_size,
            ttl: Duration::from_secs(ttl_minutes.saturating_mul(60)),
        }
    }

    /// A cache that is always bypassed.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            max_size: 0,
            ttl: Duration::ZERO,
        }
    }

    /// Whether lookups should go through the cache.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.enabled && self.max_size > 0 && !self.ttl.is_zero()
    }

    /// Default product cache: 1000 entries, 5 minutes.
    #[must_use]
    pub const fn product_default() -> Self {
        Self::minutes(1000, 5)
    }

    /// Default category product page cache: 100 entries, 5 minutes.
    #[must_use]
    pub const fn category_products_default() -> Self {
        Self::minutes(100, 5)
    }

    /// Default category cache: 100 entries, 60 minutes.
    #[must_use]
    pub const fn category_default() -> Self {
        Self::minutes(100, 60)
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Vars(&lookup);

        Ok(Self {
            graphql: GraphqlConfig::from_vars(&env)?,
            tree: TreeConfig::from_vars(&env)?,
            product_cache: CacheSettings::from_vars(
                &env,
                "CATALOG_PRODUCT_CACHE",
                CacheSettings::product_default(),
            )?,
            category_products_cache: CacheSettings::from_vars(
                &env,
                "CATALOG_CATEGORY_PRODUCTS_CACHE",
                CacheSettings::category_products_default(),
            )?,
            category_cache: CacheSettings::from_vars(
                &env,
                "CATALOG_CATEGORY_CACHE",
                CacheSettings::category_default(),
            )?,
        })
    }
}

impl GraphqlConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(env: &Vars<'_, F>) -> Result<Self, ConfigError> {
        let endpoint = env.required("CATALOG_GRAPHQL_ENDPOINT")?;
        url::Url::parse(&endpoint).map_err(|e| {
            ConfigError::InvalidEnvVar("CATALOG_GRAPHQL_ENDPOINT".to_string(), e.to_string())
        })?;

        Ok(Self {
            endpoint,
            auth_token: env.optional("CATALOG_AUTH_TOKEN").map(SecretString::from),
            timeout: Duration::from_secs(env.parsed_or("CATALOG_HTTP_TIMEOUT_SECS", 30)?),
        })
    }
}

impl TreeConfig {
    fn from_vars<F: Fn(&str) -> Option<String>>(env: &Vars<'_, F>) -> Result<Self, ConfigError> {
        let root_category_id: i32 = env
            .required("CATALOG_ROOT_CATEGORY_ID")?
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidEnvVar("CATALOG_ROOT_CATEGORY_ID".to_string(), e.to_string())
            })?;
        if root_category_id <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_ROOT_CATEGORY_ID".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let page_size: u32 = env.parsed_or("CATALOG_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_PAGE_SIZE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let config = Self {
            root_path: env.or_default("CATALOG_ROOT_PATH", DEFAULT_ROOT_PATH),
            root_category_id: CategoryId::new(root_category_id),
            store_view: env.or_default("CATALOG_STORE_VIEW", DEFAULT_STORE_VIEW),
            page_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the root path is absolute and has no trailing slash.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRootPath` describing the problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::InvalidRootPath(
                self.root_path.clone(),
                reason.to_string(),
            ))
        };

        if !self.root_path.starts_with('/') {
            return invalid("must be absolute");
        }
        if self.root_path.len() > 1 && self.root_path.ends_with('/') {
            return invalid("must not end with a slash");
        }
        if self.root_path == "/" {
            return invalid("cannot be the repository root");
        }
        if self.page_size == 0 {
            return invalid("page size must be greater than zero");
        }
        Ok(())
    }
}

impl CacheSettings {
    fn from_vars<F: Fn(&str) -> Option<String>>(
        env: &Vars<'_, F>,
        prefix: &str,
        defaults: Self,
    ) -> Result<Self, ConfigError> {
        let enabled = env.bool_or(&format!("{prefix}_ENABLED"), defaults.enabled)?;
        let max_size = env.parsed_or(&format!("{prefix}_SIZE"), defaults.max_size)?;
        let ttl_key = format!("{prefix}_TTL_MINUTES");
        let ttl_minutes: u64 = env.parsed_or(&ttl_key, defaults.ttl.as_secs() / 60)?;
        let ttl_secs = ttl_minutes
            .checked_mul(60)
            .filter(|_| ttl_minutes <= MAX_CACHE_TTL_MINUTES)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    ttl_key,
                    format!("must be at most {MAX_CACHE_TTL_MINUTES} minutes"),
                )
            })?;

        Ok(Self {
            enabled,
            max_size,
            ttl: Duration::from_secs(ttl_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the error mapping shared by every section.
struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable, treating blank values as absent.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to a default when unset.
    fn parsed_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Parse a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
    fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got {other:?}"),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<CatalogConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CatalogConfig::from_vars(|key| map.get(key).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("CATALOG_GRAPHQL_ENDPOINT", "https://shop.example.com/graphql"),
        ("CATALOG_ROOT_CATEGORY_ID", "2"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(MINIMAL).unwrap();
        assert_eq!(config.tree.root_path, DEFAULT_ROOT_PATH);
        assert_eq!(config.tree.store_view, "default");
        assert_eq!(config.tree.page_size, 20);
        assert_eq!(config.tree.root_category_id, CategoryId::new(2));
        assert_eq!(config.graphql.timeout, Duration::from_secs(30));
        assert!(config.graphql.auth_token.is_none());
        assert_eq!(config.product_cache, CacheSettings::minutes(1000, 5));
        assert_eq!(config.category_products_cache, CacheSettings::minutes(100, 5));
        assert_eq!(config.category_cache, CacheSettings::minutes(100, 60));
    }

    #[test]
    fn test_missing_endpoint() {
        let err = load(&[("CATALOG_ROOT_CATEGORY_ID", "2")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "CATALOG_GRAPHQL_ENDPOINT"));
    }

    #[test]
    fn test_missing_root_category() {
        let err = load(&[("CATALOG_GRAPHQL_ENDPOINT", "https://shop.example.com/graphql")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "CATALOG_ROOT_CATEGORY_ID"));
    }

    #[test]
    fn test_invalid_root_category() {
        let mut vars = MINIMAL.to_vec();
        vars[1] = ("CATALOG_ROOT_CATEGORY_ID", "men");
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));

        vars[1] = ("CATALOG_ROOT_CATEGORY_ID", "0");
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut vars = MINIMAL.to_vec();
        vars[0] = ("CATALOG_GRAPHQL_ENDPOINT", "not a url");
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_cache_overrides() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("CATALOG_PRODUCT_CACHE_ENABLED", "false"));
        vars.push(("CATALOG_CATEGORY_CACHE_SIZE", "7"));
        vars.push(("CATALOG_CATEGORY_CACHE_TTL_MINUTES", "2"));
        let config = load(&vars).unwrap();

        assert!(!config.product_cache.is_active());
        assert_eq!(config.category_cache.max_size, 7);
        assert_eq!(config.category_cache.ttl, Duration::from_secs(120));
    }

    #[test]
    fn test_cache_ttl_limit() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("CATALOG_PRODUCT_CACHE_TTL_MINUTES", "525600000"));
        let config = load(&vars).unwrap();
        assert_eq!(config.product_cache.ttl.as_secs(), MAX_CACHE_TTL_MINUTES * 60);

        for too_long in ["600000000", "18446744073709551615"] {
            let mut vars = MINIMAL.to_vec();
            vars.push(("CATALOG_PRODUCT_CACHE_TTL_MINUTES", too_long));
            let err = load(&vars).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "CATALOG_PRODUCT_CACHE_TTL_MINUTES")
            );
        }
    }

    #[test]
    fn test_invalid_boolean() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("CATALOG_CATEGORY_CACHE_ENABLED", "maybe"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("CATALOG_PAGE_SIZE", "0"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_root_path_validation() {
        for bad in ["relative/path", "/var/commerce/", "/"] {
            let mut vars = MINIMAL.to_vec();
            vars.push(("CATALOG_ROOT_PATH", bad));
            assert!(
                matches!(load(&vars), Err(ConfigError::InvalidRootPath(_, _))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_disabled_cache_is_inactive() {
        assert!(!CacheSettings::disabled().is_active());
        assert!(CacheSettings::product_default().is_active());
        let zero_size = CacheSettings {
            max_size: 0,
            ..CacheSettings::product_default()
        };
        assert!(!zero_size.is_active());
    }

    #[test]
    fn test_graphql_config_debug_redacts_token() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("CATALOG_AUTH_TOKEN", "super_secret_bearer_token"));
        let config = load(&vars).unwrap();

        assert_eq!(
            config.graphql.auth_token.as_ref().unwrap().expose_secret(),
            "super_secret_bearer_token"
        );

        let debug_output = format!("{:?}", config.graphql);
        assert!(debug_output.contains("shop.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer_token"));
    }
}
