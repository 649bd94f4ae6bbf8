//! Configuration management for InspireQA services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// LLM inference endpoint
    pub llm: LlmConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Vector database holding chunked full text
    pub vector_store: VectorStoreConfig,

    /// Rerank API configuration
    pub reranker: RerankerConfig,

    /// INSPIRE literature search backends
    #[serde(default)]
    pub inspire: InspireConfig,

    /// Export endpoint protection
    #[serde(default)]
    pub export: ExportConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Build/deployment metadata stored with each query record
    #[serde(default)]
    pub app: AppMetaConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL, without the `/v1` suffix
    pub api_base: String,

    pub api_key: Option<String>,

    /// Overrides the `Host` header when the endpoint sits behind an ingress
    pub host_header: Option<String>,

    /// Model used when a request does not name one
    #[serde(default = "default_llm_model")]
    pub default_model: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    pub api_base: String,

    pub api_key: Option<String>,

    pub host_header: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    /// OpenSearch base URL including any path prefix
    pub url: String,

    pub index: String,

    pub username: Option<String>,

    pub password: Option<String>,

    #[serde(default = "default_vector_timeout")]
    pub timeout_secs: u64,

    /// Candidates fetched before reranking
    #[serde(default = "default_top_k")]
    pub k: usize,

    #[serde(default = "default_vector_field")]
    pub vector_field: String,

    #[serde(default = "default_text_field")]
    pub text_field: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RerankerConfig {
    pub api_base: String,

    pub api_key: Option<String>,

    pub host_header: Option<String>,

    #[serde(default = "default_rerank_model")]
    pub model: String,

    /// Documents kept after reranking
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_rerank_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InspireConfig {
    /// Public literature REST API
    #[serde(default = "default_inspire_api_url")]
    pub api_url: String,

    #[serde(default = "default_inspire_api_size")]
    pub api_size: usize,

    /// OpenSearch cluster backing full-text highlight search
    pub opensearch_url: Option<String>,

    #[serde(default = "default_inspire_index")]
    pub opensearch_index: String,

    pub opensearch_username: Option<String>,

    pub opensearch_password: Option<String>,

    #[serde(default = "default_highlight_size")]
    pub highlight_size: usize,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExportConfig {
    /// SHA-256 hex digest of the export API key; export is disabled when unset
    pub api_key_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppMetaConfig {
    pub backend_version: Option<String>,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 120 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_llm_model() -> String { "llama31".to_string() }
fn default_llm_timeout() -> u64 { 20 }
fn default_top_p() -> f32 { 1.0 }
fn default_max_tokens() -> u32 { 4096 }
fn default_embedding_model() -> String { "bge-m3".to_string() }
fn default_embedding_timeout() -> u64 { 15 }
fn default_vector_timeout() -> u64 { 30 }
fn default_top_k() -> usize { 25 }
fn default_vector_field() -> String { "vector_field".to_string() }
fn default_text_field() -> String { "text".to_string() }
fn default_rerank_model() -> String { "jina-reranker-v2-base-multilingual".to_string() }
fn default_top_n() -> usize { 10 }
fn default_rerank_timeout() -> u64 { 40 }
fn default_inspire_api_url() -> String { "https://inspirehep.net/api/literature".to_string() }
fn default_inspire_api_size() -> usize { 10 }
fn default_inspire_index() -> String { "records-hep".to_string() }
fn default_highlight_size() -> usize { 5 }
fn default_search_timeout() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "inspireqa".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for InspireConfig {
    fn default() -> Self {
        Self {
            api_url: default_inspire_api_url(),
            api_size: default_inspire_api_size(),
            opensearch_url: None,
            opensearch_index: default_inspire_index(),
            opensearch_username: None,
            opensearch_password: None,
            highlight_size: default_highlight_size(),
            timeout_secs: default_search_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__LLM__API_BASE=http://vllm:8000
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/inspireqa".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            llm: LlmConfig {
                api_base: "http://localhost:8000".to_string(),
                api_key: None,
                host_header: None,
                default_model: default_llm_model(),
                timeout_secs: default_llm_timeout(),
                temperature: 0.0,
                top_p: default_top_p(),
                max_tokens: default_max_tokens(),
            },
            embedding: EmbeddingConfig {
                api_base: "http://localhost:8001".to_string(),
                api_key: None,
                host_header: None,
                model: default_embedding_model(),
                timeout_secs: default_embedding_timeout(),
            },
            vector_store: VectorStoreConfig {
                url: "http://localhost:9200".to_string(),
                index: "inspire-chunks".to_string(),
                username: None,
                password: None,
                timeout_secs: default_vector_timeout(),
                k: default_top_k(),
                vector_field: default_vector_field(),
                text_field: default_text_field(),
            },
            reranker: RerankerConfig {
                api_base: "http://localhost:8002".to_string(),
                api_key: None,
                host_header: None,
                model: default_rerank_model(),
                top_n: default_top_n(),
                timeout_secs: default_rerank_timeout(),
            },
            inspire: InspireConfig::default(),
            export: ExportConfig::default(),
            observability: ObservabilityConfig::default(),
            app: AppMetaConfig::default(),
        }
    }
}
