//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SOUQ_BASE_URL` - Public URL of the server
//!
//! ## Optional
//! - `SOUQ_HOST` - Bind address (default: 127.0.0.1)
//! - `SOUQ_PORT` - Listen port (default: 3000)
//! - `SOUQ_BACKEND` - `memory`, `script` or `postgres` (default: memory)
//! - `SOUQ_AUTOSAVE_DEBOUNCE_MS` - Quiet period before saving (default: 2500)
//! - `SOUQ_AUTOSAVE_SUCCESS_MS` - How long `success` is shown (default: 2000)
//! - `SOUQ_AUTOSAVE_ERROR_MS` - How long `error` is shown (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Script backend
//! - `SOUQ_SCRIPT_URL` - Endpoint receiving `{ storeId, action, payload }`
//! - `SOUQ_SCRIPT_API_KEY` - Bearer token sent with every call (optional)
//!
//! ## Postgres backend
//! - `SOUQ_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

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

/// Which persistence adapter to use.
#[derive(Clone)]
pub enum BackendConfig {
    /// In-process maps; data is lost on restart.
    Memory,
    /// Serverless script endpoint.
    Script {
        url: Url,
        api_key: Option<SecretString>,
    },
    /// `PostgreSQL` JSONB documents.
    Postgres { database_url: SecretString },
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::Script { url, api_key } => f
                .debug_struct("Script")
                .field("url", &url.as_str())
                .field("api_key", &api_key.as_ref().map(|_| "[REDACTED]"))
                .finish(),
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .finish(),
        }
    }
}

impl BackendConfig {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Script { .. } => "script",
            Self::Postgres { .. } => "postgres",
        }
    }

    /// Read `SOUQ_BACKEND` and the variables the chosen backend needs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unknown backends, missing URLs or weak
    /// API keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        match get_env_or_default("SOUQ_BACKEND", "memory").as_str() {
            "memory" => Ok(Self::Memory),
            "script" => {
                let raw = get_required_env("SOUQ_SCRIPT_URL")?;
                let url = Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("SOUQ_SCRIPT_URL".to_string(), e.to_string())
                })?;
                let api_key = match get_optional_env("SOUQ_SCRIPT_API_KEY") {
                    Some(key) => {
                        validate_secret_strength(&key, "SOUQ_SCRIPT_API_KEY")?;
                        Some(SecretString::from(key))
                    }
                    None => None,
                };
                Ok(Self::Script { url, api_key })
            }
            "postgres" => Ok(Self::Postgres {
                database_url: get_database_url("SOUQ_DATABASE_URL")?,
            }),
            other => Err(ConfigError::InvalidEnvVar(
                "SOUQ_BACKEND".to_string(),
                format!("unknown backend '{other}' (expected memory, script or postgres)"),
            )),
        }
    }
}

/// Autosave timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    /// Quiet period after the last mutation before a save starts.
    pub debounce: Duration,
    /// How long `success` is shown before reverting to `idle`.
    pub success_display: Duration,
    /// How long `error` is shown before reverting to `idle`.
    pub error_display: Duration,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(2500),
            success_display: Duration::from_millis(2000),
            error_display: Duration::from_millis(3000),
        }
    }
}

impl AutosaveConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            debounce: get_millis("SOUQ_AUTOSAVE_DEBOUNCE_MS", 2500)?,
            success_display: get_millis("SOUQ_AUTOSAVE_SUCCESS_MS", 2000)?,
            error_display: get_millis("SOUQ_AUTOSAVE_ERROR_MS", 3000)?,
        })
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct SouqConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Persistence adapter
    pub backend: BackendConfig,
    /// Autosave timings
    pub autosave: AutosaveConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl SouqConfig {
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

        let host = get_env_or_default("SOUQ_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("SOUQ_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("SOUQ_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SOUQ_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("SOUQ_BASE_URL")?;

        let backend = BackendConfig::from_env()?;
        let autosave = AutosaveConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            autosave,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Configuration for tests and local demos: memory backend, no Sentry.
    #[must_use]
    pub fn for_testing(autosave: AutosaveConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://localhost".to_string(),
            backend: BackendConfig::Memory,
            autosave,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
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

fn get_millis(key: &str, default: u64) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(Duration::from_millis(default)), |raw| {
        raw.parse::<u64>()
            .map(Duration::from_millis)
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
    let len = s.len() as f64;
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
