mod config;
mod db;
mod discovery;
mod errors;
mod models;
mod routes;
mod search_client;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::discovery::existing_jobs::PgJobsSource;
use crate::discovery::fetcher::HttpPageFetcher;
use crate::discovery::tool::JobSearchTool;
use crate::routes::build_router;
use crate::search_client::SerpApiClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobScout API v{}", env!("CARGO_PKG_VERSION"));

    // CRM connection (existing-jobs collaborator)
    let db = create_pool(&config.database_url).await?;

    let settings = config.tool_settings();
    info!(
        max_per_turn = settings.max_searches_per_turn,
        max_in_flight = settings.max_concurrent_searches,
        verify_dates = settings.verify_posting_dates,
        "Job search tool configured"
    );

    let tool = JobSearchTool::new(
        Arc::new(SerpApiClient::new(config.serpapi_api_key.clone())),
        Arc::new(PgJobsSource::new(db)),
        Arc::new(HttpPageFetcher::new()),
        settings,
    );

    let state = AppState {
        tool: Arc::new(tool),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
