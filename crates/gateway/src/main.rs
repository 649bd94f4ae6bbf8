//! InspireQA API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Search and RAG question answering
//! - Answer feedback and search quality reports
//! - Key-protected export endpoints
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use inspireqa_common::{
    auth::ExportKeyHash,
    config::AppConfig,
    db::DbPool,
    embeddings::OpenAIEmbedder,
    llm::{ChainRegistry, CompletionClient, LanguageModel, LlmFactory},
    metrics,
    retrieval::{HttpReranker, OpenSearchVectorStore},
    search::{InspireApiSearch, InspireFullTextSearch, SearchTool},
    RagOrchestrator, RagResources, Repository, Result, SearchOrchestrator,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{signal, sync::Notify};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub search: Arc<SearchOrchestrator>,
    pub rag: Arc<RagOrchestrator>,
    pub export_key: ExportKeyHash,
    /// Full-text cluster client, shared with the search pipeline
    pub full_text: Option<Arc<InspireFullTextSearch>>,
    /// Full-text highlight search is configured
    pub use_highlights: bool,
}

impl FromRef<AppState> for ExportKeyHash {
    fn from_ref(state: &AppState) -> Self {
        state.export_key.clone()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting InspireQA API Gateway v{}",
        inspireqa_common::VERSION
    );

    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    let config = Arc::new(config);
    let db = DbPool::new(&config.database).await?;
    let state = build_state(config.clone(), Repository::new(db))?;

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let stopping = Arc::new(Notify::new());
    let signalled = stopping.clone();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                signalled.notify_one();
            })
            .await
    };

    serve_with_grace(
        server,
        async move { stopping.notified().await },
        config.shutdown_timeout(),
    )
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Wire collaborators, chains and orchestrators once for the process
fn build_state(config: Arc<AppConfig>, repo: Repository) -> anyhow::Result<AppState> {
    let llm_config = config.llm.clone();
    let factory: LlmFactory = Arc::new(move |model: &str| -> Result<Arc<dyn LanguageModel>> {
        let client = CompletionClient::new(&llm_config, model)?;
        Ok(Arc::new(client) as Arc<dyn LanguageModel>)
    });
    let chains = Arc::new(ChainRegistry::new(factory));

    let abstract_search: Arc<dyn SearchTool> = Arc::new(InspireApiSearch::new(&config.inspire)?);
    let full_text = match config.inspire.opensearch_url {
        Some(_) => Some(Arc::new(InspireFullTextSearch::new(&config.inspire)?)),
        None => {
            tracing::warn!("inspire.opensearch_url not set, highlight search disabled");
            None
        }
    };
    let highlight_search = full_text
        .clone()
        .map(|tool| tool as Arc<dyn SearchTool>);
    let use_highlights = full_text.is_some();

    let resources = RagResources {
        embedder: Arc::new(OpenAIEmbedder::new(&config.embedding)?),
        vector_store: Arc::new(OpenSearchVectorStore::new(&config.vector_store)?),
        reranker: Arc::new(HttpReranker::new(&config.reranker)?),
        k: config.vector_store.k,
        top_n: config.reranker.top_n,
    };

    if config.export.api_key_hash.is_none() {
        tracing::warn!("export.api_key_hash not set, export endpoints will reject all requests");
    }

    Ok(AppState {
        search: Arc::new(SearchOrchestrator::new(
            chains.clone(),
            abstract_search,
            highlight_search,
        )),
        rag: Arc::new(RagOrchestrator::new(chains, resources)),
        export_key: ExportKeyHash(config.export.api_key_hash.clone()),
        full_text,
        use_highlights,
        repo,
        config,
    })
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Question answering
        .route("/query", post(handlers::query::submit_query))
        .route("/search", post(handlers::query::search))
        .route("/query-playground", post(handlers::query::playground))
        .route("/query-rag", post(handlers::rag::query_rag))
        .route("/query/{id}", get(handlers::query::get_query))
        // Feedback
        .route(
            "/query/{id}/feedback",
            get(handlers::feedback::get_feedback).put(handlers::feedback::upsert_feedback),
        )
        .route("/search-feedback", post(handlers::feedback::create_search_feedback))
        // Export (API key)
        .route("/export-ir", get(handlers::export::export_queries))
        .route(
            "/export-search-feedback",
            get(handlers::export::export_search_feedback),
        )
        .route("/query-os", post(handlers::export::query_os))
        .route_layer(axum::middleware::from_fn(middleware::metrics::track_metrics));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors)
                .layer(TimeoutLayer::new(state.config.request_timeout())),
        )
        .with_state(state)
}

/// Drive `server` to completion, allowing it at most `grace` to drain
/// in-flight requests once `stopping` resolves.
async fn serve_with_grace<S, T>(server: S, stopping: T, grace: Duration) -> std::io::Result<()>
where
    S: Future<Output = std::io::Result<()>>,
    T: Future<Output = ()>,
{
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => return res,
        _ = stopping => {}
    }

    match tokio::time::timeout(grace, server).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Shutdown grace period elapsed, dropping open connections"
            );
            Ok(())
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_server_exit_without_signal() {
        let res = serve_with_grace(
            async { Ok(()) },
            std::future::pending(),
            Duration::from_millis(10),
        )
        .await;
        assert_ok!(res);
    }

    #[tokio::test]
    async fn test_server_error_propagates() {
        let res = serve_with_grace(
            async { Err(std::io::Error::other("accept failed")) },
            std::future::pending(),
            Duration::from_millis(10),
        )
        .await;
        assert_err!(res);
    }

    #[tokio::test]
    async fn test_stalled_drain_is_cut_off() {
        let started = tokio::time::Instant::now();
        let res = serve_with_grace(
            std::future::pending(),
            async {},
            Duration::from_millis(20),
        )
        .await;

        assert_ok!(res);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_drain_within_grace_completes() {
        let res = serve_with_grace(
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(())
            },
            async {},
            Duration::from_secs(5),
        )
        .await;
        assert_ok!(res);
    }
}
