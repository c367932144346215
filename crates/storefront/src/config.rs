//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_API_BASE_URL` - Base URL of the shop REST API (e.g. `https://shop.example.com/api/`)
//!
//! ## Optional
//! - `STOREFRONT_AUTH_TOKEN` - Bearer token; when set, the session starts authenticated
//! - `STOREFRONT_STORAGE_DIR` - Directory for the local key-value store (default: .adroit)
//! - `STOREFRONT_HTTP_TIMEOUT_SECS` - Backend request timeout (default: 15)
//! - `STOREFRONT_CATALOG_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Storefront cart configuration.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Base URL of the REST API; always ends with `/`
    pub api_base_url: Url,
    /// Bearer token for an authenticated session
    pub auth_token: Option<SecretString>,
    /// Directory backing the local key-value store
    pub storage_dir: PathBuf,
    /// Timeout applied to every backend request
    pub request_timeout: Duration,
    /// How long the catalog listing stays cached
    pub catalog_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("storage_dir", &self.storage_dir)
            .field("request_timeout", &self.request_timeout)
            .field("catalog_ttl", &self.catalog_ttl)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
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
    /// if the auth token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(&get_required_env("STOREFRONT_API_BASE_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_API_BASE_URL".to_string(), e))?;
        let auth_token = get_optional_env("STOREFRONT_AUTH_TOKEN")
            .map(|token| validated_secret(token, "STOREFRONT_AUTH_TOKEN"))
            .transpose()?;
        let storage_dir = PathBuf::from(get_env_or_default("STOREFRONT_STORAGE_DIR", ".adroit"));
        let request_timeout =
            Duration::from_secs(get_env_secs("STOREFRONT_HTTP_TIMEOUT_SECS", "15")?);
        let catalog_ttl = Duration::from_secs(get_env_secs("STOREFRONT_CATALOG_TTL_SECS", "300")?);

        Ok(Self {
            api_base_url,
            auth_token,
            storage_dir,
            request_timeout,
            catalog_ttl,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration for a base URL with every optional setting at its default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let api_base_url = parse_base_url(base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_API_BASE_URL".to_string(), e))?;
        Ok(Self {
            api_base_url,
            auth_token: None,
            storage_dir: PathBuf::from(".adroit"),
            request_timeout: Duration::from_secs(15),
            catalog_ttl: Duration::from_secs(300),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }
}

/// Validate a bearer token handed over at login.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` for placeholders and low-entropy values.
pub fn validate_auth_token(token: String) -> Result<SecretString, ConfigError> {
    validated_secret(token, "auth token")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL, forcing a trailing slash so relative joins keep the path.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if url.cannot_be_a_base() {
        return Err("URL cannot be used as a base".to_string());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a whole number of seconds from the environment.
fn get_env_secs(key: &str, default: &str) -> Result<u64, ConfigError> {
    get_env_or_default(key, default)
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
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

    // Real API tokens are long random strings
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the token issued at login."
            ),
        ));
    }

    Ok(())
}

/// Validate a secret value and wrap it.
fn validated_secret(value: String, key: &str) -> Result<SecretString, ConfigError> {
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-token-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_sanctum_style_token() {
        let result = validate_secret_strength("42|k9Tq2ZrV7mXw1bLpNcY8sHdF3gJe6uAo", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_auth_token() {
        assert!(validate_auth_token("changeme".to_string()).is_err());
        assert!(validate_auth_token("42|k9Tq2ZrV7mXw1bLpNcY8sHdF3gJe6uAo".to_string()).is_ok());
    }

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("https://shop.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://shop.example.com/api/");
        assert_eq!(
            url.join("cart/view").unwrap().as_str(),
            "https://shop.example.com/api/cart/view"
        );
    }

    #[test]
    fn test_parse_base_url_keeps_existing_slash() {
        let url = parse_base_url("http://127.0.0.1:8080/api/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/api/");
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(parse_base_url("not a url").is_err());
        assert!(parse_base_url("mailto:shop@example.com").is_err());
    }

    #[test]
    fn test_for_base_url_defaults() {
        let config = StorefrontConfig::for_base_url("http://localhost:8000/api").unwrap();
        assert!(config.auth_token.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.catalog_ttl, Duration::from_secs(300));
        assert_eq!(config.storage_dir, PathBuf::from(".adroit"));
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let mut config = StorefrontConfig::for_base_url("http://localhost:8000/api").unwrap();
        config.auth_token = Some(SecretString::from("super_secret_bearer_token"));

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("localhost:8000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer_token"));
    }
}
