//! Customer Web configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_API_BASE_URL` - Catalog API base URL (production only; development
//!   defaults to `http://localhost:5252/`)
//!
//! ## Optional
//! - `CUSTOMER_WEB_ENV` - `development` or `production` (default: development)
//! - `CUSTOMER_WEB_HOST` - Bind address for operational endpoints (default: 127.0.0.1)
//! - `CUSTOMER_WEB_PORT` - Listen port for operational endpoints (default: 5000)
//! - `CATALOG_PRODUCT_TTL_SECS` - Product cache TTL (default: 300)
//! - `CATALOG_CATEGORY_TTL_SECS` - Category cache TTL (default: 3600)
//! - `CATALOG_CACHE_CAPACITY` - Maximum cached entries (default: 10000)
//! - `CATALOG_RETRY_COUNT` - Retries after the first attempt (default: 3)
//! - `CATALOG_RETRY_UNIT_MS` - Backoff unit; delay is `unit * 2^attempt` (default: 1000)
//! - `CATALOG_BREAKER_THRESHOLD` - Consecutive failures that open the circuit (default: 5)
//! - `CATALOG_BREAKER_COOLDOWN_SECS` - How long the circuit stays open (default: 30)
//! - `STOCK_REFRESH_INTERVAL_SECS` - Background refresh interval (default: 300)
//! - `STOCK_REFRESH_ERROR_INTERVAL_SECS` - Delay after a failed refresh (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEVELOPMENT_BASE_URL: &str = "http://localhost:5252/";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Customer Web application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    /// IP address to bind the operational endpoints to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Catalog API client configuration
    pub catalog: CatalogConfig,
    /// Background stock refresh configuration
    pub refresh: StockRefreshConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Catalog API client configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL of the catalog API, always ending in `/`
    pub base_url: Url,
    /// TTL for the product list and single products
    pub product_ttl: Duration,
    /// TTL for the category list and single categories
    pub category_ttl: Duration,
    /// Maximum number of cache entries
    pub cache_capacity: u64,
    /// Retry and circuit breaker settings
    pub resilience: ResilienceConfig,
}

/// Retry and circuit breaker settings for catalog API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResilienceConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff unit; retry `n` waits `unit * 2^n`
    pub backoff_unit: Duration,
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a probe is allowed
    pub break_duration: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
            failure_threshold: 5,
            break_duration: Duration::from_secs(30),
        }
    }
}

/// Background stock refresh cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRefreshConfig {
    /// Delay after a successful refresh
    pub interval: Duration,
    /// Delay after a failed refresh
    pub error_interval: Duration,
}

impl Default for StockRefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            error_interval: Duration::from_secs(30),
        }
    }
}

impl CatalogConfig {
    /// Default settings for the given base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            product_ttl: Duration::from_secs(300),
            category_ttl: Duration::from_secs(3600),
            cache_capacity: 10_000,
            resilience: ResilienceConfig::default(),
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

        Self::from_source(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    fn from_source(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment: Environment = parse_or_default(env, "CUSTOMER_WEB_ENV", Environment::Development)?;
        let host = parse_or_default(env, "CUSTOMER_WEB_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_or_default(env, "CUSTOMER_WEB_PORT", 5000_u16)?;

        let catalog = CatalogConfig::from_source(env, environment)?;
        let refresh = StockRefreshConfig {
            interval: secs_or_default(env, "STOCK_REFRESH_INTERVAL_SECS", 300)?,
            error_interval: secs_or_default(env, "STOCK_REFRESH_ERROR_INTERVAL_SECS", 30)?,
        };

        Ok(Self {
            environment,
            host,
            port,
            catalog,
            refresh,
            sentry_dsn: env("SENTRY_DSN"),
            sentry_environment: env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CatalogConfig {
    fn from_source(
        env: &dyn Fn(&str) -> Option<String>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let raw_base_url = match (env("CATALOG_API_BASE_URL"), environment) {
            (Some(url), _) => url,
            (None, Environment::Development) => DEVELOPMENT_BASE_URL.to_string(),
            (None, Environment::Production) => {
                return Err(ConfigError::MissingEnvVar("CATALOG_API_BASE_URL".to_string()));
            }
        };

        let resilience = ResilienceConfig {
            max_retries: parse_or_default(env, "CATALOG_RETRY_COUNT", 3)?,
            backoff_unit: Duration::from_millis(parse_or_default(env, "CATALOG_RETRY_UNIT_MS", 1000)?),
            failure_threshold: parse_or_default(env, "CATALOG_BREAKER_THRESHOLD", 5)?,
            break_duration: secs_or_default(env, "CATALOG_BREAKER_COOLDOWN_SECS", 30)?,
        };

        if resilience.failure_threshold == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_BREAKER_THRESHOLD".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            base_url: normalize_base_url(&raw_base_url)?,
            product_ttl: secs_or_default(env, "CATALOG_PRODUCT_TTL_SECS", 300)?,
            category_ttl: secs_or_default(env, "CATALOG_CATEGORY_TTL_SECS", 3600)?,
            cache_capacity: parse_or_default(env, "CATALOG_CACHE_CAPACITY", 10_000)?,
            resilience,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse an environment variable, falling back to `default` when unset.
fn parse_or_default<T>(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse a whole-seconds duration.
fn secs_or_default(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    parse_or_default(env, key, default).map(Duration::from_secs)
}

/// Parse the base URL and make sure relative API paths join beneath it.
fn normalize_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut value = raw.trim().to_string();
    if !value.ends_with('/') {
        value.push('/');
    }

    let url = Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_API_BASE_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "CATALOG_API_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url)
}
