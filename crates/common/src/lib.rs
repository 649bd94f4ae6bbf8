//! InspireQA Common Library
//!
//! Question answering over the INSPIRE-HEP literature corpus:
//! - Literature search tools and embedding-based retrieval
//! - Prompt context construction and citation reconciliation
//! - Per-model LLM chains and the search/RAG orchestrators
//! - Database models and repository patterns
//! - Error types, configuration, authentication and metrics

pub mod auth;
pub mod citation;
pub mod config;
pub mod context;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod export;
pub mod llm;
pub mod metrics;
pub mod pipeline;
pub mod retrieval;
pub mod search;

mod http;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use pipeline::{RagOrchestrator, RagResources, SearchOrchestrator};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
