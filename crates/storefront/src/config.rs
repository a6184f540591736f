//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `MIDTRANS_SERVER_KEY` - Midtrans server key (server-side only)
//! - `MIDTRANS_CLIENT_KEY` - Midtrans client key (used by Snap.js in the browser)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `MIDTRANS_IS_PRODUCTION` - Use the production gateway (default: false)
//! - `CORS_ALLOWED_ORIGINS` - Comma-separated origins (default: base URL)
//! - `REDIS_URL` - Shared cache; the in-process cache is used alone when unset
//! - `CACHE_TTL_SECONDS` - Catalog cache TTL (default: 300)
//! - `CACHE_MAX_ENTRIES` - In-process cache capacity (default: 1000)
//! - `STORAGE_DIR` - Root of uploaded files (default: ./storage)
//! - `GA4_MEASUREMENT_ID` - Google Analytics 4 measurement ID
//! - `PAYMENT_RECONCILE_INTERVAL_SECONDS` - Pending payment sweep (default: 300)
//! - `PAYMENT_PENDING_TIMEOUT_HOURS` - Age at which pending payments expire (default: 24)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront, without trailing slash
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Midtrans payment gateway configuration
    pub midtrans: MidtransConfig,
    /// Origins allowed to call the JSON API from a browser
    pub cors_allowed_origins: Vec<String>,
    /// Catalog cache configuration
    pub cache: CacheConfig,
    /// Root directory of uploaded images and scores
    pub storage_dir: PathBuf,
    /// Analytics tracking configuration
    pub analytics: AnalyticsConfig,
    /// Background payment reconciliation
    pub reconcile: ReconcileConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. production, staging)
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
    /// Log output format
    pub log_format: LogFormat,
}

/// Midtrans configuration.
///
/// Implements `Debug` manually to redact the server key.
#[derive(Clone)]
pub struct MidtransConfig {
    /// Server key, used for API basic auth and notification signatures
    pub server_key: SecretString,
    /// Client key, safe to expose to the browser
    pub client_key: String,
    /// Production gateway instead of sandbox
    pub is_production: bool,
}

impl std::fmt::Debug for MidtransConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidtransConfig")
            .field("server_key", &"[REDACTED]")
            .field("client_key", &self.client_key)
            .field("is_production", &self.is_production)
            .finish()
    }
}

/// Catalog cache configuration.
#[derive(Clone)]
pub struct CacheConfig {
    /// Redis connection URL (may contain a password)
    pub redis_url: Option<SecretString>,
    pub ttl: Duration,
    pub max_entries: u64,
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("ttl", &self.ttl)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl: Duration::from_secs(300),
            max_entries: 1000,
        }
    }
}

/// Analytics configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfig {
    /// Google Analytics 4 measurement ID
    pub ga4_measurement_id: Option<String>,
}

/// Pending payment reconciliation settings.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileConfig {
    /// How often pending transactions are re-checked
    pub interval: Duration,
    /// Age after which a still-pending transaction is expired
    pub pending_timeout: chrono::Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            pending_timeout: chrono::Duration::hours(24),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = parse_base_url(
            "STOREFRONT_BASE_URL",
            &get_required_env("STOREFRONT_BASE_URL")?,
        )?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let midtrans = MidtransConfig::from_env()?;
        let cors_allowed_origins = parse_origins(
            get_optional_env("CORS_ALLOWED_ORIGINS").as_deref(),
            &base_url,
        );

        let cache = CacheConfig {
            redis_url: get_optional_env("REDIS_URL").map(SecretString::from),
            ttl: Duration::from_secs(parse_env("CACHE_TTL_SECONDS", "300")?),
            max_entries: parse_env("CACHE_MAX_ENTRIES", "1000")?,
        };

        let reconcile = ReconcileConfig {
            interval: Duration::from_secs(parse_env("PAYMENT_RECONCILE_INTERVAL_SECONDS", "300")?),
            pending_timeout: chrono::Duration::hours(parse_env(
                "PAYMENT_PENDING_TIMEOUT_HOURS",
                "24",
            )?),
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            midtrans,
            cors_allowed_origins,
            cache,
            storage_dir: PathBuf::from(get_env_or_default("STORAGE_DIR", "./storage")),
            analytics: AnalyticsConfig {
                ga4_measurement_id: get_optional_env("GA4_MEASUREMENT_ID"),
            },
            reconcile,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
            log_format: LogFormat::parse(get_optional_env("LOG_FORMAT").as_deref()),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl MidtransConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let is_production = get_env_or_default("MIDTRANS_IS_PRODUCTION", "false")
            .parse::<bool>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MIDTRANS_IS_PRODUCTION".to_string(), e.to_string())
            })?;

        Ok(Self {
            server_key: get_validated_secret("MIDTRANS_SERVER_KEY")?,
            client_key: get_required_env("MIDTRANS_CLIENT_KEY")?,
            is_production,
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

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Validate an absolute http(s) URL and strip the trailing slash.
fn parse_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let normalized = normalize_base_url(raw);
    let parsed = url::Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http or https URL".to_string(),
        ));
    }
    Ok(normalized)
}

/// Split the CORS allow-list; an empty list allows the storefront itself.
fn parse_origins(raw: Option<&str>, base_url: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();

    if origins.is_empty() {
        vec![base_url.to_string()]
    } else {
        origins
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
