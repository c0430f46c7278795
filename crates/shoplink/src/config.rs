//! Configuration loaded from environment variables.
//!
//! Every component receives its configuration explicitly through a
//! constructor; nothing reads the process environment after startup.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPLINK_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//! - `SHOPIFY_STORE` - storefront domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ACCESS_TOKEN` - Admin API access token
//! - `EBAY_OAUTH_TOKEN` - supplier API OAuth token
//!
//! ## Optional
//! - `SHOPIFY_API_VERSION` - API version (default: 2024-10)
//! - `EBAY_API_BASE` - supplier API base URL (default: <https://api.ebay.com>)
//! - `META_ACCESS_TOKEN` / `META_AD_ACCOUNT_ID` - ad platform credentials
//!   (both or neither; ad-spend sync is disabled when absent)
//! - `FETCH_MAX_ATTEMPTS` - attempts per supplier reference (default: 3)
//! - `FETCH_BASE_DELAY_MS` - first retry delay (default: 500)
//! - `FETCH_BACKOFF_MULTIPLIER` - delay multiplier per retry (default: 2)
//! - `FETCH_CONCURRENCY` - concurrent supplier fetches (default: 10)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
///
/// Any of these is fatal: configuration is validated before pipeline work
/// begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection URL (contains password).
    pub database_url: SecretString,
    /// Marketplace (storefront) API configuration.
    pub shopify: ShopifyConfig,
    /// Supplier API configuration.
    pub ebay: EbayConfig,
    /// Ad platform configuration (optional - disables spend sync if absent).
    pub meta: Option<MetaConfig>,
    /// Supplier fetch retry/concurrency policy.
    pub fetch: FetchConfig,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Store domain (e.g., your-store.myshopify.com).
    pub store: String,
    /// API version (e.g., 2024-10).
    pub api_version: String,
    /// Admin API access token.
    pub access_token: SecretString,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Supplier (eBay) API configuration.
///
/// Implements `Debug` manually to redact the OAuth token.
#[derive(Clone)]
pub struct EbayConfig {
    /// API base URL; overridable for tests and sandboxes.
    pub api_base: String,
    /// OAuth bearer token.
    pub oauth_token: SecretString,
}

impl std::fmt::Debug for EbayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EbayConfig")
            .field("api_base", &self.api_base)
            .field("oauth_token", &"[REDACTED]")
            .finish()
    }
}

/// Ad platform (Meta) API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct MetaConfig {
    /// Graph API access token.
    pub access_token: SecretString,
    /// Ad account id (e.g., `act_1234567890`).
    pub ad_account_id: String,
}

impl std::fmt::Debug for MetaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaConfig")
            .field("access_token", &"[REDACTED]")
            .field("ad_account_id", &self.ad_account_id)
            .finish()
    }
}

/// Retry and fan-out policy for supplier order fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Total attempts per reference, including the first (minimum 1).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Each subsequent retry multiplies the delay by this factor.
    pub multiplier: u32,
    /// Maximum concurrent in-flight fetches. Bounded to stay under provider
    /// rate limits during large backfills.
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            multiplier: 2,
            concurrency: 10,
        }
    }
}

impl AppConfig {
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

        Ok(Self {
            database_url: get_database_url("SHOPLINK_DATABASE_URL")?,
            shopify: ShopifyConfig::from_env()?,
            ebay: EbayConfig::from_env()?,
            meta: MetaConfig::from_env()?,
            fetch: FetchConfig::from_env()?,
        })
    }
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2024-10"),
            access_token: get_required_secret("SHOPIFY_ACCESS_TOKEN")?,
        })
    }
}

impl EbayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: get_env_or_default("EBAY_API_BASE", "https://api.ebay.com"),
            oauth_token: get_required_secret("EBAY_OAUTH_TOKEN")?,
        })
    }
}

impl MetaConfig {
    /// Both variables must be set together; neither disables spend sync.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let access_token = get_optional_env("META_ACCESS_TOKEN");
        let ad_account_id = get_optional_env("META_AD_ACCOUNT_ID");

        match (access_token, ad_account_id) {
            (Some(token), Some(account)) => Ok(Some(Self {
                access_token: SecretString::from(token),
                ad_account_id: account,
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "META_*".to_string(),
                "Both META_ACCESS_TOKEN and META_AD_ACCOUNT_ID must be set together".to_string(),
            )),
        }
    }
}

impl FetchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_attempts = parse_env_or("FETCH_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "FETCH_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let concurrency = parse_env_or("FETCH_CONCURRENCY", 10)?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "FETCH_CONCURRENCY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_attempts,
            base_delay: Duration::from_millis(parse_env_or("FETCH_BASE_DELAY_MS", 500)?),
            multiplier: parse_env_or("FETCH_BACKOFF_MULTIPLIER", 2)?,
            concurrency,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    Ok(SecretString::from(get_required_env(key)?))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, using a default when unset.
fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
