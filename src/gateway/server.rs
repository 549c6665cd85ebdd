//! HTTP server setup and shared state.

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::types::ModelEntry;
use crate::config::Settings;
use crate::registry::{self, ModelFilter, SharedTables, Tables};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Current provider/token snapshot, swapped wholesale on reload
    pub tables: SharedTables,
    pub http_client: Client,
    pub settings: Arc<Settings>,
    pub model_filter: Arc<ModelFilter>,
    /// Aggregated `/v1/models` result, cleared on reload
    pub models_cache: Arc<Mutex<Option<Vec<ModelEntry>>>>,
}

impl AppState {
    /// Build state from settings and an initial table snapshot.
    pub fn new(settings: Settings, tables: Tables) -> crate::error::Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.upstream_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let model_filter = ModelFilter::from_patterns(&settings.supported_models);

        Ok(Self {
            tables: registry::shared(tables),
            http_client,
            settings: Arc::new(settings),
            model_filter: Arc::new(model_filter),
            models_cache: Arc::new(Mutex::new(None)),
        })
    }

    /// Clone out the current table snapshot. Requests keep working against
    /// the clone even if a reload swaps the tables mid-flight.
    pub async fn snapshot(&self) -> Arc<Tables> {
        self.tables.read().await.clone()
    }
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // OpenAI-compatible endpoints
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/models", get(handlers::list_models))
        .route("/v1/reload", post(handlers::reload))
        // gateway extensions
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/providers", get(handlers::list_providers))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run_server(settings: Settings) -> anyhow::Result<()> {
    let listen_addr = settings.listen.clone();

    let tables = registry::load_tables(&settings)?;
    tracing::info!(
        providers = tables.provider_count(),
        tokens = tables.token_count(),
        "Loaded provider and token tables"
    );

    let state = AppState::new(settings, tables)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting aigate gateway");

    axum::serve(listener, app).await?;

    Ok(())
}
