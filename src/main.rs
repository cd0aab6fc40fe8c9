use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farmer_api::{
    api::{cors_layer, create_router, AppState},
    config::Config,
    db::{create_pool, PgRecommendationStore},
    services::{Catalog, ScorerProvider},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farmer_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let catalog = Arc::new(Catalog::load(config.catalog_path.as_deref())?);

    let scorer = Arc::new(ScorerProvider::new(
        catalog,
        config.model_path.clone(),
        config.kernel_bandwidth,
    ));
    if config.lazy_model {
        tracing::info!("Model initialisation deferred to first request");
    } else {
        scorer.get().await?;
    }

    let mut state = AppState::new(scorer);
    match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url, config.db_max_connections).await?;
            tracing::info!("Database connection pool established");
            state = state.with_store(Arc::new(PgRecommendationStore::new(pool)));
        }
        None => tracing::warn!("DATABASE_URL not set, recommendation history disabled"),
    }

    let app = create_router(state).layer(cors_layer(&config.cors_origins));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
