//! HTTP API server

pub mod http;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::ledger::ConversationLedger;
use crate::llm::CompletionClient;
use crate::relay::BackendRelay;
use crate::story::StoryGenerator;

/// Shared server state
#[derive(Clone)]
pub struct AppState {
    pub relay: BackendRelay,
    pub generator: StoryGenerator,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let relay = BackendRelay::from_config(config);
        let ledger = Arc::new(ConversationLedger::new());
        let client = CompletionClient::new(config.openai_api_key.clone());
        let generator = StoryGenerator::new(ledger, client, relay.clone());
        Self { relay, generator }
    }
}

/// Build the API router. Split out of [`start`] so tests can drive it
/// directly.
pub fn router(state: AppState) -> Router {
    // Frontend runs on another origin; allow everything
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(http::welcome_handler))
        .route("/transcript", post(http::transcript_handler))
        .route("/generate_story", post(http::generate_story_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server and serve until shutdown.
pub async fn start(config: Arc<Config>) -> Result<()> {
    let state = AppState::from_config(&config);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Narra API listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
