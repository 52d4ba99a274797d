//! Configuration management for the warehouse analytics server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with ALM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::Language;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Backing store connection and paging limits
    pub store: StoreConfig,

    /// Table and procedure names in the backing store
    pub collections: CollectionsConfig,

    /// Query-driven view behaviour
    pub views: ViewsConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Base URL of the REST endpoint (without `/rest/v1`)
    pub url: String,

    /// Anonymous or service key sent as `apikey` and bearer token
    pub api_key: String,

    /// Rows requested per page
    pub page_size: usize,

    /// Hard ceiling on rows drained for one query
    pub max_rows: usize,

    /// Keys per `IN (...)` lookup
    pub in_batch_size: usize,

    /// Lookup batches allowed in flight at once
    pub max_concurrent_batches: usize,

    /// Timeout for a single HTTP round-trip
    pub request_timeout_secs: u64,

    /// Timeout for a whole query including enrichment
    pub query_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectionsConfig {
    pub issue_lines: String,
    pub issue_headers: String,
    pub personnel: String,
    pub installations: String,
    pub articles: String,
    pub expense_categories: String,
    pub projection_procedure: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewsConfig {
    /// Quiet period before a parameter change triggers a query
    pub debounce_ms: u64,

    /// View sessions kept before idle ones are pruned
    pub max_sessions: usize,

    /// Language used when a request does not name one
    pub default_language: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("ALM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("store.url", "http://localhost:54321")?
            .set_default("store.api_key", "")?
            .set_default("store.page_size", 1000)?
            .set_default("store.max_rows", 50_000)?
            .set_default("store.in_batch_size", 200)?
            .set_default("store.max_concurrent_batches", 4)?
            .set_default("store.request_timeout_secs", 30)?
            .set_default("store.query_timeout_secs", 120)?
            .set_default("collections.issue_lines", "detalle_salidas")?
            .set_default("collections.issue_headers", "salidas")?
            .set_default("collections.personnel", "personal")?
            .set_default("collections.installations", "instalaciones")?
            .set_default("collections.articles", "articulos")?
            .set_default("collections.expense_categories", "categorias_gasto")?
            .set_default("collections.projection_procedure", "proyeccion_compras")?
            .set_default("views.debounce_ms", 350)?
            .set_default("views.max_sessions", 1024)?
            .set_default("views.default_language", "es")?
            .set_default("logging.format", "pretty")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (ALM_ prefix)
            .add_source(
                Environment::with_prefix("ALM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make paging or batching impossible
    pub fn validate(&self) -> Result<(), ConfigError> {
        let store = &self.store;
        if store.url.trim().is_empty() {
            return Err(ConfigError::Message("store.url must not be empty".into()));
        }
        if store.page_size == 0 {
            return Err(ConfigError::Message("store.page_size must be positive".into()));
        }
        if store.max_rows < store.page_size {
            return Err(ConfigError::Message(
                "store.max_rows must be at least store.page_size".into(),
            ));
        }
        if store.in_batch_size == 0 || store.max_concurrent_batches == 0 {
            return Err(ConfigError::Message(
                "store.in_batch_size and store.max_concurrent_batches must be positive".into(),
            ));
        }
        if store.request_timeout_secs == 0 || store.query_timeout_secs == 0 {
            return Err(ConfigError::Message("store timeouts must be positive".into()));
        }
        if self.views.max_sessions == 0 {
            return Err(ConfigError::Message("views.max_sessions must be positive".into()));
        }
        Ok(())
    }

    pub fn default_language(&self) -> Language {
        Language::from_code(&self.views.default_language)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            collections: CollectionsConfig::default(),
            views: ViewsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            page_size: 1000,
            max_rows: 50_000,
            in_batch_size: 200,
            max_concurrent_batches: 4,
            request_timeout_secs: 30,
            query_timeout_secs: 120,
        }
    }
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            issue_lines: "detalle_salidas".to_string(),
            issue_headers: "salidas".to_string(),
            personnel: "personal".to_string(),
            installations: "instalaciones".to_string(),
            articles: "articulos".to_string(),
            expense_categories: "categorias_gasto".to_string(),
            projection_procedure: "proyeccion_compras".to_string(),
        }
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 350,
            max_sessions: 1024,
            default_language: "es".to_string(),
        }
    }
}
