mod configuration;
mod error;
mod routes;
mod state;

use filing_agent::providers::factory;
use filing_agent::systems::FilingSystem;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = configuration::Settings::new()?;
    let addr = settings.server.socket_addr()?;

    if settings.search.api_key.is_none() {
        tracing::warn!("no search API key configured; search tools will report errors");
    }

    let provider = factory::get_provider(settings.provider.into_config())?;
    let system = FilingSystem::new(settings.search.into_system_config())?;

    let state = state::AppState {
        provider,
        system: Arc::new(system),
        max_rounds: settings.agent.max_rounds,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
