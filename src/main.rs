use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use nutriplan_api::{
    config::Config,
    routes::{create_router, AppState},
    services::{
        catalog::RecipeCatalog, predictor::CentroidScorer,
        recommendation::RecommendationEngine,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nutriplan_api=debug,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // The scorer is acquired once here and owned by the engine for the whole
    // session; drop releases it on every exit path.
    let scorer = CentroidScorer::load(Path::new(&config.model_path)).await?;
    let catalog = RecipeCatalog::new(&config.catalog_path);
    let engine = RecommendationEngine::new(Arc::new(scorer), catalog);

    let state = Arc::new(AppState {
        engine: Arc::new(engine),
    });
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "nutriplan API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
