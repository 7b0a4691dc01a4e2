//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional (server)
//! - `SEARCHGATE_HOST` - Bind address (default: 127.0.0.1)
//! - `SEARCHGATE_PORT` - Listen port (default: 8000)
//! - `SEARCHGATE_DATABASE_URL` - Product store URL, falls back to `DATABASE_URL`
//!   (default: `sqlite://products.db?mode=rwc`)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `HTTP_TIMEOUT_SECS` - Timeout for outbound collaborator requests (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Optional (search pipeline)
//! - `SEARCH_BACKEND` - `azure` (default) or `memory` for local runs
//! - `AZURE_SEARCH_ENDPOINT` + `AZURE_SEARCH_API_KEY` - Search service (set together)
//! - `AZURE_SEARCH_API_VERSION` - REST API version (default: 2024-07-01)
//! - `AZURE_STORAGE_CONNECTION_STRING` - Blob storage account
//! - `SEARCH_INDEX_NAME` (default: documents-index-01)
//! - `SEARCH_INDEXER_NAME` (default: my-indexer-01)
//! - `SEARCH_DATA_SOURCE_NAME` (default: my-datasource-01)
//! - `SEARCH_CONTAINER_NAME` (default: mycontainer01)
//! - `SEARCH_INDEXER_SCHEDULE` - ISO-8601 interval; unset means manual runs only
//!
//! ## Optional (chat)
//! - `AZURE_OPENAI_DEPLOYMENT_ENDPOINT`, `AZURE_OPENAI_DEPLOYMENT_API_KEY`,
//!   `AZURE_OPENAI_DEPLOYMENT` - Chat completions deployment (set together)
//! - `AZURE_OPENAI_API_VERSION` - REST API version (default: 2024-06-01)
//!
//! ## Optional (TLS)
//! - `SEARCHGATE_TLS_CERT` - PEM-encoded certificate chain
//! - `SEARCHGATE_TLS_KEY` - PEM-encoded private key
//!
//! A collaborator whose variables are absent is left unconfigured; requests
//! that need it fail at call time instead of at startup.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use searchgate_core::{ContainerName, IndexerSchedule, ResourceName};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_DATABASE_URL: &str = "sqlite://products.db?mode=rwc";
const DEFAULT_SEARCH_API_VERSION: &str = "2024-07-01";
const DEFAULT_OPENAI_API_VERSION: &str = "2024-06-01";
const DEFAULT_INDEX_NAME: &str = "documents-index-01";
const DEFAULT_INDEXER_NAME: &str = "my-indexer-01";
const DEFAULT_DATA_SOURCE_NAME: &str = "my-datasource-01";
const DEFAULT_CONTAINER_NAME: &str = "mycontainer01";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

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

/// Which implementation backs the search pipeline collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchBackend {
    /// Azure AI Search and Azure Blob Storage REST APIs.
    #[default]
    Azure,
    /// Process-local collaborators; state is lost on restart.
    Memory,
}

impl std::str::FromStr for SearchBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "azure" => Ok(Self::Azure),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown backend '{other}' (expected azure or memory)")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Product store connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Collaborator implementation for the search pipeline
    pub search_backend: SearchBackend,
    /// Search service (optional)
    pub search: Option<SearchServiceConfig>,
    /// Blob storage (optional)
    pub storage: Option<StorageConfig>,
    /// Chat completions deployment (optional)
    pub chat: Option<ChatConfig>,
    /// Names of the resources the pipeline manages
    pub pipeline: PipelineNames,
    /// Timeout for outbound collaborator requests
    pub http_timeout: Duration,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Search service configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SearchServiceConfig {
    /// Service endpoint, e.g. `https://my-search.search.windows.net`
    pub endpoint: Url,
    /// Admin API key
    pub api_key: SecretString,
    /// REST API version
    pub api_version: String,
}

impl std::fmt::Debug for SearchServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchServiceConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Blob storage configuration.
///
/// The connection string doubles as the data source descriptor handed to
/// the search service, so it is kept verbatim.
#[derive(Clone)]
pub struct StorageConfig {
    pub connection_string: SecretString,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("connection_string", &"[REDACTED]")
            .finish()
    }
}

/// Chat completions deployment configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct ChatConfig {
    /// Resource endpoint, e.g. `https://my-openai.openai.azure.com`
    pub endpoint: Url,
    /// Deployment API key
    pub api_key: SecretString,
    /// Deployment name (also used as the model name)
    pub deployment: String,
    /// REST API version
    pub api_version: String,
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Names of the search resources driven by the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineNames {
    pub index_name: ResourceName,
    pub indexer_name: ResourceName,
    pub data_source_name: ResourceName,
    pub container_name: ContainerName,
    pub schedule: Option<IndexerSchedule>,
}

impl Default for PipelineNames {
    fn default() -> Self {
        Self {
            index_name: default_name(DEFAULT_INDEX_NAME),
            indexer_name: default_name(DEFAULT_INDEXER_NAME),
            data_source_name: default_name(DEFAULT_DATA_SOURCE_NAME),
            container_name: ContainerName::parse(DEFAULT_CONTAINER_NAME)
                .unwrap_or_else(|_| unreachable!("default container name is valid")),
            schedule: None,
        }
    }
}

fn default_name(name: &str) -> ResourceName {
    ResourceName::parse(name).unwrap_or_else(|_| unreachable!("default resource names are valid"))
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        pair(
            "SEARCHGATE_TLS_*",
            get_optional_env("SEARCHGATE_TLS_CERT"),
            get_optional_env("SEARCHGATE_TLS_KEY"),
        )
        .map(|tls| {
            tls.map(|(cert, key)| Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })
        })
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is malformed, or if only half of a
    /// variable group that must be set together is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SEARCHGATE_DATABASE_URL");
        let host = parse_env("SEARCHGATE_HOST", "127.0.0.1")?;
        let port = parse_env("SEARCHGATE_PORT", "8000")?;
        let search_backend = parse_env("SEARCH_BACKEND", "azure")?;
        let http_timeout = Duration::from_secs(parse_env(
            "HTTP_TIMEOUT_SECS",
            &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
        )?);
        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|f| f == "json");

        let search = SearchServiceConfig::from_env()?;
        let storage = StorageConfig::from_env();
        let chat = ChatConfig::from_env()?;
        let pipeline = PipelineNames::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            search_backend,
            search,
            storage,
            chat,
            pipeline,
            http_timeout,
            json_logs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SearchServiceConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some((endpoint, api_key)) = pair(
            "AZURE_SEARCH_*",
            get_optional_env("AZURE_SEARCH_ENDPOINT"),
            get_optional_env("AZURE_SEARCH_API_KEY"),
        )?
        else {
            return Ok(None);
        };

        warn_on_weak_secret(&api_key, "AZURE_SEARCH_API_KEY");

        Ok(Some(Self {
            endpoint: parse_url("AZURE_SEARCH_ENDPOINT", &endpoint)?,
            api_key: SecretString::from(api_key),
            api_version: get_env_or_default("AZURE_SEARCH_API_VERSION", DEFAULT_SEARCH_API_VERSION),
        }))
    }
}

impl StorageConfig {
    fn from_env() -> Option<Self> {
        get_optional_env("AZURE_STORAGE_CONNECTION_STRING").map(|value| Self {
            connection_string: SecretString::from(value),
        })
    }
}

impl ChatConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let endpoint = get_optional_env("AZURE_OPENAI_DEPLOYMENT_ENDPOINT");
        let api_key = get_optional_env("AZURE_OPENAI_DEPLOYMENT_API_KEY");
        let deployment = get_optional_env("AZURE_OPENAI_DEPLOYMENT");

        match (endpoint, api_key, deployment) {
            (Some(endpoint), Some(api_key), Some(deployment)) => {
                warn_on_weak_secret(&api_key, "AZURE_OPENAI_DEPLOYMENT_API_KEY");
                Ok(Some(Self {
                    endpoint: parse_url("AZURE_OPENAI_DEPLOYMENT_ENDPOINT", &endpoint)?,
                    api_key: SecretString::from(api_key),
                    deployment,
                    api_version: get_env_or_default(
                        "AZURE_OPENAI_API_VERSION",
                        DEFAULT_OPENAI_API_VERSION,
                    ),
                }))
            }
            (None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "AZURE_OPENAI_*".to_string(),
                "AZURE_OPENAI_DEPLOYMENT_ENDPOINT, AZURE_OPENAI_DEPLOYMENT_API_KEY and AZURE_OPENAI_DEPLOYMENT must be set together".to_string(),
            )),
        }
    }
}

impl PipelineNames {
    fn from_env() -> Result<Self, ConfigError> {
        let schedule = get_optional_env("SEARCH_INDEXER_SCHEDULE")
            .map(|interval| {
                IndexerSchedule::parse(&interval).map_err(|e| {
                    ConfigError::InvalidEnvVar("SEARCH_INDEXER_SCHEDULE".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            index_name: parse_env("SEARCH_INDEX_NAME", DEFAULT_INDEX_NAME)?,
            indexer_name: parse_env("SEARCH_INDEXER_NAME", DEFAULT_INDEXER_NAME)?,
            data_source_name: parse_env("SEARCH_DATA_SOURCE_NAME", DEFAULT_DATA_SOURCE_NAME)?,
            container_name: parse_env("SEARCH_CONTAINER_NAME", DEFAULT_CONTAINER_NAME)?,
            schedule,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> SecretString {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_or_else(
            |_| SecretString::from(DEFAULT_DATABASE_URL),
            SecretString::from,
        )
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
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

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Two variables that must be set together.
fn pair(
    group: &str,
    first: Option<String>,
    second: Option<String>,
) -> Result<Option<(String, String)>, ConfigError> {
    match (first, second) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        _ => Err(ConfigError::InvalidEnvVar(
            group.to_string(),
            "both variables must be set together".to_string(),
        )),
    }
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

/// API keys are issued by the remote services, so a weak-looking key is only
/// reported, never rejected.
fn warn_on_weak_secret(secret: &str, var_name: &str) {
    if let Err(e) = validate_secret_strength(secret, var_name) {
        tracing::warn!("{var_name} validation warning: {e}");
    }
}
