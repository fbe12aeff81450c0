//! Webhook configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STRIPE_WEBHOOK_SECRET` - Signing secret of the Stripe webhook endpoint
//! - `NETLIFY_IDENTITY_ADMIN_TOKEN` - Identity admin API bearer token
//! - `NETLIFY_IDENTITY_URL` - Identity base URL, or `URL` (site URL) from which
//!   `{URL}/.netlify/identity` is derived
//!
//! ## Optional
//! - `WEBHOOK_HOST` - Bind address (default: 0.0.0.0)
//! - `WEBHOOK_PORT` - Listen port (default: 8888)
//! - `STRIPE_SECRET_KEY` - Stripe API key (enables the price allow-list)
//! - `ALLOWED_PRICE_IDS` - Comma-separated price ids allowed to provision
//! - `STRIPE_API_BASE` - Stripe API base URL (default: <https://api.stripe.com/v1>)
//! - `STRIPE_WEBHOOK_TOLERANCE_SECS` - Signature timestamp tolerance (default: 300)
//! - `HTTP_TIMEOUT_SECS` - Outbound request timeout (default: 10)
//! - `LOG_FORMAT` - `json` for structured logs, text otherwise
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use subscriber_sync_core::PriceId;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const DEFAULT_TOLERANCE_SECS: u64 = 300;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
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

/// Webhook service configuration.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Identity admin API configuration
    pub identity: IdentityConfig,
    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Stripe webhook and API configuration.
///
/// Implements `Debug` manually to redact secrets.
#[derive(Clone)]
pub struct StripeConfig {
    /// Endpoint signing secret (whsec_...)
    pub webhook_secret: SecretString,
    /// API secret key, only needed for the price allow-list
    pub secret_key: Option<SecretString>,
    /// Price ids that may provision an account; empty disables the gate
    pub allowed_price_ids: Vec<PriceId>,
    /// API base URL without trailing slash
    pub api_base: String,
    /// Maximum age of a signed webhook timestamp
    pub tolerance: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("webhook_secret", &"[REDACTED]")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("allowed_price_ids", &self.allowed_price_ids)
            .field("api_base", &self.api_base)
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl StripeConfig {
    /// Returns the API key when the price allow-list is usable.
    ///
    /// The gate needs both a non-empty allow-list and an API key to fetch
    /// line items. With either missing every checkout is provisioned.
    #[must_use]
    pub fn price_gate_key(&self) -> Option<&SecretString> {
        if self.allowed_price_ids.is_empty() {
            return None;
        }
        self.secret_key.as_ref()
    }

    fn from_env() -> Result<Self, ConfigError> {
        let webhook_secret = get_required_secret("STRIPE_WEBHOOK_SECRET")?;
        warn_weak_secret(&webhook_secret, "STRIPE_WEBHOOK_SECRET");

        let secret_key = get_optional_env("STRIPE_SECRET_KEY").map(SecretString::from);
        if let Some(key) = &secret_key {
            warn_weak_secret(key, "STRIPE_SECRET_KEY");
        }

        let allowed_price_ids =
            parse_price_ids(&get_optional_env("ALLOWED_PRICE_IDS").unwrap_or_default());

        let api_base = parse_base_url(
            "STRIPE_API_BASE",
            &get_env_or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
        )?;

        let tolerance = Duration::from_secs(parse_env_or_default(
            "STRIPE_WEBHOOK_TOLERANCE_SECS",
            DEFAULT_TOLERANCE_SECS,
        )?);

        Ok(Self {
            webhook_secret,
            secret_key,
            allowed_price_ids,
            api_base,
            tolerance,
        })
    }
}

/// Identity admin API configuration.
///
/// Implements `Debug` manually to redact the admin token.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Identity base URL without trailing slash (e.g. `https://site/.netlify/identity`)
    pub base_url: String,
    /// Admin API bearer token
    pub admin_token: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("base_url", &self.base_url)
            .field("admin_token", &"[REDACTED]")
            .finish()
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = identity_base_url(
            get_optional_env("NETLIFY_IDENTITY_URL").as_deref(),
            get_optional_env("URL").as_deref(),
        )?;

        let admin_token = get_required_secret("NETLIFY_IDENTITY_ADMIN_TOKEN")?;
        warn_weak_secret(&admin_token, "NETLIFY_IDENTITY_ADMIN_TOKEN");

        Ok(Self {
            base_url,
            admin_token,
        })
    }
}

impl WebhookConfig {
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

        let host = get_env_or_default("WEBHOOK_HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("WEBHOOK_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("WEBHOOK_PORT", "8888")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("WEBHOOK_PORT".to_string(), e.to_string()))?;

        let stripe = StripeConfig::from_env()?;
        let identity = IdentityConfig::from_env()?;

        let http_timeout = Duration::from_secs(parse_env_or_default(
            "HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            stripe,
            identity,
            http_timeout,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Split a comma-separated allow-list, trimming entries and dropping blanks.
#[must_use]
pub fn parse_price_ids(raw: &str) -> Vec<PriceId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PriceId::from)
        .collect()
}

/// Resolve the identity base URL.
///
/// An explicit identity URL wins; otherwise it is derived from the site URL
/// as `{site}/.netlify/identity`.
fn identity_base_url(
    identity_url: Option<&str>,
    site_url: Option<&str>,
) -> Result<String, ConfigError> {
    if let Some(url) = identity_url {
        return parse_base_url("NETLIFY_IDENTITY_URL", url);
    }

    let site = site_url
        .ok_or_else(|| ConfigError::MissingEnvVar("NETLIFY_IDENTITY_URL (or URL)".to_string()))?;
    let site = parse_base_url("URL", site)?;
    Ok(format!("{site}/.netlify/identity"))
}

/// Validate an absolute http(s) URL and strip any trailing slash.
fn parse_base_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    non_blank(std::env::var(key).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a numeric environment variable, falling back to `default` when unset.
fn parse_env_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
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
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Check that a secret is not a placeholder and has sufficient entropy.
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Secrets are issued by Stripe and Netlify, so weak ones only warrant a warning.
fn warn_weak_secret(secret: &SecretString, var_name: &str) {
    if let Err(e) = validate_secret_strength(secret.expose_secret(), var_name) {
        tracing::warn!("{var_name} validation warning: {e}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stripe_config(allowed: &str, secret_key: Option<&str>) -> StripeConfig {
        StripeConfig {
            webhook_secret: SecretString::from("whsec_test"),
            secret_key: secret_key.map(SecretString::from),
            allowed_price_ids: parse_price_ids(allowed),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            tolerance: Duration::from_secs(DEFAULT_TOLERANCE_SECS),
        }
    }

    #[test]
    fn test_parse_price_ids_trims_and_drops_blanks() {
        let ids = parse_price_ids(" price_a, ,price_b,,  ");
        assert_eq!(ids, vec![PriceId::from("price_a"), PriceId::from("price_b")]);
        assert!(parse_price_ids("").is_empty());
    }

    #[test]
    fn test_price_gate_requires_list_and_key() {
        assert!(stripe_config("price_a", Some("sk_test_1")).price_gate_key().is_some());
        assert!(stripe_config("", Some("sk_test_1")).price_gate_key().is_none());
        assert!(stripe_config("price_a", None).price_gate_key().is_none());
    }

    #[test]
    fn test_parse_base_url_strips_trailing_slash() {
        let url = parse_base_url("X", "https://site.test/.netlify/identity/").unwrap();
        assert_eq!(url, "https://site.test/.netlify/identity");
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(matches!(
            parse_base_url("X", "not a url"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            parse_base_url("X", "ftp://site.test"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_identity_url_prefers_explicit_value() {
        let url = identity_base_url(
            Some("https://id.example.org/.netlify/identity/"),
            Some("https://site.example.org"),
        )
        .unwrap();
        assert_eq!(url, "https://id.example.org/.netlify/identity");
    }

    #[test]
    fn test_identity_url_derived_from_site() {
        let url = identity_base_url(None, Some("https://site.example.org/")).unwrap();
        assert_eq!(url, "https://site.example.org/.netlify/identity");
    }

    #[test]
    fn test_identity_url_requires_one_source() {
        assert!(matches!(
            identity_base_url(None, None),
            Err(ConfigError::MissingEnvVar(_))
        ));
        assert!(matches!(
            identity_base_url(None, Some("not a url")),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "URL"
        ));
    }

    #[test]
    fn test_blank_identity_url_falls_back_to_site() {
        let explicit = non_blank(Some("  ".to_string()));
        assert!(explicit.is_none());

        let url = identity_base_url(explicit.as_deref(), Some("https://site.example.org")).unwrap();
        assert_eq!(url, "https://site.example.org/.netlify/identity");
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("whsec_placeholder", "X").is_err());
        assert!(validate_secret_strength("aaaaaaaaaaaaaaaa", "X").is_err());
        assert!(validate_secret_strength("whsec_9fK2mQ7xL4pZ8vR1", "X").is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = stripe_config("price_a", Some("sk_live_supersecret"));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("whsec_test"));
        assert!(!rendered.contains("sk_live_supersecret"));
        assert!(rendered.contains("price_a"));
    }
}
